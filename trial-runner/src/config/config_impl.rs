// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{JunitConfig, JunitImpl, ParallelMode, TestThreads};
use crate::errors::{ConfigParseError, ConfigParseErrorKind, ProfileNotFound};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::{
    collections::{BTreeSet, HashMap},
    time::Duration,
};
use tracing::warn;

/// Overall configuration for trial.
///
/// Settings are managed through [profiles](RunnerProfile), obtained through the
/// [`profile`](Self::profile) method. The configuration is an explicit value handed to the
/// [`TestRunnerBuilder`](crate::runner::TestRunnerBuilder); there is no process-wide state.
#[derive(Clone, Debug)]
pub struct RunnerConfig {
    config_root: Utf8PathBuf,
    inner: RunnerConfigImpl,
}

impl RunnerConfig {
    /// The default location of the config within the root: `.config/trial.toml`.
    pub const CONFIG_PATH: &'static str = ".config/trial.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Repository-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../../default-config.toml");

    /// The name of the default profile.
    pub const DEFAULT_PROFILE: &'static str = "default";

    /// Reads the config from the given file, or if not specified from `.config/trial.toml` in
    /// `config_root`.
    ///
    /// If no config file is specified and `config_root` doesn't have `.config/trial.toml`, uses
    /// the default config options. Relative paths in the config are resolved against
    /// `config_root`.
    pub fn from_sources(
        config_root: impl Into<Utf8PathBuf>,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        let config_root = config_root.into();
        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = config_root.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        let (config, unknown) = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;

        if !unknown.is_empty() {
            let unknown_str = unknown
                .iter()
                .map(|path| path.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            warn!("ignoring unknown configuration keys in config file {config_file}: {unknown_str}");
        }

        Ok(Self {
            config_root,
            inner: config.into_config_impl(),
        })
    }

    /// Returns the default configuration, without reading any files.
    pub fn default_config(config_root: impl Into<Utf8PathBuf>) -> Self {
        let (config, _unknown) = Self::build_and_deserialize_config(&Self::make_default_config())
            .expect("default config is always valid");
        Self {
            config_root: config_root.into(),
            inner: config.into_config_impl(),
        }
    }

    /// Returns the directory relative paths in the config are resolved against.
    pub fn config_root(&self) -> &Utf8Path {
        &self.config_root
    }

    /// Returns the names of all known profiles, sorted.
    pub fn profile_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.inner.all_profiles().collect();
        names.sort_unstable();
        names
    }

    /// Returns the profile with the given name, or an error if a profile was specified but not
    /// found.
    pub fn profile(&self, name: impl AsRef<str>) -> Result<RunnerProfile, ProfileNotFound> {
        let name = name.as_ref();
        let custom = self.inner.get_profile(name)?;
        let default = &self.inner.default_profile;

        Ok(RunnerProfile {
            name: name.to_owned(),
            test_threads: custom
                .and_then(|profile| profile.test_threads)
                .unwrap_or(default.test_threads),
            parallel: custom
                .and_then(|profile| profile.parallel)
                .unwrap_or(default.parallel),
            default_timeout: custom
                .and_then(|profile| profile.default_timeout)
                .or(default.default_timeout),
            fail_fast: custom
                .and_then(|profile| profile.fail_fast)
                .unwrap_or(default.fail_fast),
            junit: JunitConfig::from_profile(
                &self.config_root,
                custom.map(|profile| &profile.junit),
                &default.junit,
            ),
        })
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    /// This returns a tuple of (config, ignored paths).
    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(RunnerConfigDeserialize, BTreeSet<String>), ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config: RunnerConfigDeserialize = serde_path_to_error::deserialize(ignored_de)
            .map_err(|error| {
                // Both serde_path_to_error and the config crate report the key. Drop the key from
                // the config error for consistency.
                let path = error.path().clone();
                let config_error = error.into_inner();
                let error = match config_error {
                    ConfigError::At { error, .. } => *error,
                    other => other,
                };
                ConfigParseErrorKind::DeserializeError(Box::new(serde_path_to_error::Error::new(
                    path, error,
                )))
            })?;

        Ok((config, ignored))
    }
}

/// A set of runner settings, resolved from a named profile.
///
/// Settings that a custom profile doesn't specify are taken from the default profile.
#[derive(Clone, Debug)]
pub struct RunnerProfile {
    name: String,
    test_threads: TestThreads,
    parallel: ParallelMode,
    default_timeout: Option<Duration>,
    fail_fast: bool,
    junit: Option<JunitConfig>,
}

impl RunnerProfile {
    /// Returns the name of the profile.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of threads to run units with in parallel modes.
    pub fn test_threads(&self) -> TestThreads {
        self.test_threads
    }

    /// Returns what runs concurrently.
    pub fn parallel(&self) -> ParallelMode {
        self.parallel
    }

    /// Returns the deadline for units that don't configure one, if any.
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout
    }

    /// Returns true if the run should stop after the first failure.
    pub fn fail_fast(&self) -> bool {
        self.fail_fast
    }

    /// Returns the JUnit configuration, if a report should be written.
    pub fn junit(&self) -> Option<&JunitConfig> {
        self.junit.as_ref()
    }
}

#[derive(Clone, Debug)]
struct RunnerConfigImpl {
    default_profile: DefaultProfileImpl,
    other_profiles: HashMap<String, CustomProfileImpl>,
}

impl RunnerConfigImpl {
    fn get_profile(&self, profile: &str) -> Result<Option<&CustomProfileImpl>, ProfileNotFound> {
        let custom_profile = match profile {
            RunnerConfig::DEFAULT_PROFILE => None,
            other => Some(
                self.other_profiles
                    .get(other)
                    .ok_or_else(|| ProfileNotFound::new(profile, self.all_profiles()))?,
            ),
        };
        Ok(custom_profile)
    }

    fn all_profiles(&self) -> impl Iterator<Item = &str> {
        self.other_profiles
            .keys()
            .map(|key| key.as_str())
            .chain(std::iter::once(RunnerConfig::DEFAULT_PROFILE))
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RunnerConfigDeserialize {
    #[serde(rename = "profile")]
    profiles: HashMap<String, CustomProfileImpl>,
}

impl RunnerConfigDeserialize {
    fn into_config_impl(mut self) -> RunnerConfigImpl {
        let p = self
            .profiles
            .remove(RunnerConfig::DEFAULT_PROFILE)
            .expect("default profile should exist");
        RunnerConfigImpl {
            default_profile: DefaultProfileImpl::new(p),
            other_profiles: self.profiles,
        }
    }
}

#[derive(Clone, Debug)]
struct DefaultProfileImpl {
    test_threads: TestThreads,
    parallel: ParallelMode,
    default_timeout: Option<Duration>,
    fail_fast: bool,
    junit: JunitImpl,
}

impl DefaultProfileImpl {
    fn new(p: CustomProfileImpl) -> Self {
        Self {
            test_threads: p
                .test_threads
                .expect("test-threads present in default profile"),
            parallel: p.parallel.expect("parallel present in default profile"),
            default_timeout: p.default_timeout,
            fail_fast: p.fail_fast.expect("fail-fast present in default profile"),
            junit: p.junit,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CustomProfileImpl {
    #[serde(default)]
    test_threads: Option<TestThreads>,
    #[serde(default)]
    parallel: Option<ParallelMode>,
    #[serde(default, with = "humantime_serde")]
    default_timeout: Option<Duration>,
    #[serde(default)]
    fail_fast: Option<bool>,
    #[serde(default)]
    junit: JunitImpl,
}
