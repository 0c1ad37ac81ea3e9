// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::ParallelModeParseError;
use serde::{Deserialize, Deserializer};
use std::{fmt, str::FromStr};

/// Type for the parallel config key: what the runner may run concurrently.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ParallelMode {
    /// Run every unit one after the other, on the calling thread.
    #[default]
    None,

    /// Run the top-level nodes of a plan concurrently. Units within a group run in order.
    Groups,

    /// Run the top-level nodes and the children of every group concurrently.
    All,
}

impl ParallelMode {
    /// Returns the string representations of all known variants.
    pub fn variants() -> &'static [&'static str] {
        &["none", "groups", "all"]
    }

    /// Returns the string representation of this mode.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Groups => "groups",
            Self::All => "all",
        }
    }

    /// Returns true if top-level nodes run concurrently.
    pub fn top_level_concurrent(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Returns true if the children of groups run concurrently.
    pub fn children_concurrent(self) -> bool {
        matches!(self, Self::All)
    }
}

impl FromStr for ParallelMode {
    type Err = ParallelModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "groups" => Ok(Self::Groups),
            "all" => Ok(Self::All),
            other => Err(ParallelModeParseError::new(other)),
        }
    }
}

impl fmt::Display for ParallelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ParallelMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
