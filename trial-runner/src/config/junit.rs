// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

/// JUnit configuration stored within a profile.
///
/// Returned by [`RunnerProfile::junit`](super::RunnerProfile::junit).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct JunitConfig {
    path: Utf8PathBuf,
    report_name: String,
}

impl JunitConfig {
    /// Creates a configuration that writes a report named `report_name` to `path`.
    pub fn new(path: impl Into<Utf8PathBuf>, report_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            report_name: report_name.into(),
        }
    }

    pub(super) fn from_profile(
        config_root: &Utf8Path,
        custom_data: Option<&JunitImpl>,
        default_data: &JunitImpl,
    ) -> Option<Self> {
        let path = custom_data
            .and_then(|custom| custom.path.as_deref())
            .or(default_data.path.as_deref())?;
        let report_name = custom_data
            .and_then(|custom| custom.report_name.as_deref())
            .or(default_data.report_name.as_deref())
            .unwrap_or(Self::DEFAULT_REPORT_NAME);
        Some(Self::new(config_root.join(path), report_name))
    }

    const DEFAULT_REPORT_NAME: &'static str = "trial-run";

    /// Returns the path the report is written to.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns the name of the JUnit report.
    pub fn report_name(&self) -> &str {
        &self.report_name
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(super) struct JunitImpl {
    #[serde(default)]
    path: Option<Utf8PathBuf>,
    #[serde(default)]
    report_name: Option<String>,
}
