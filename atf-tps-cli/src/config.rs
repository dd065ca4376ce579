// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for `atf-tps`.

use atf_tps::{EventPolicy, ReaderOptions};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::warn;

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse atf-tps config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8Path {
        &self.config_file
    }

    /// Returns the kind of error this is.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of [`ConfigParseError`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),
}

/// Receives warnings produced while loading configuration.
pub trait ConfigWarnings {
    /// Called when the config file contains keys that `atf-tps` does not know
    /// about.
    fn unknown_config_keys(&mut self, config_file: &Utf8Path, unknown: &BTreeSet<String>);
}

/// Default implementation of [`ConfigWarnings`] that logs warnings using the
/// tracing crate.
pub struct DefaultConfigWarnings;

impl ConfigWarnings for DefaultConfigWarnings {
    fn unknown_config_keys(&mut self, config_file: &Utf8Path, unknown: &BTreeSet<String>) {
        let mut unknown_str = String::new();
        if unknown.len() == 1 {
            // Print this on the same line.
            unknown_str.push_str("key: ");
            unknown_str.extend(unknown.iter().map(String::as_str));
        } else {
            unknown_str.push_str("keys:\n");
            for ignored_key in unknown {
                unknown_str.push_str("\n  - ");
                unknown_str.push_str(ignored_key);
            }
        }

        warn!("in config file {config_file}, ignoring unknown configuration {unknown_str}");
    }
}

/// Overall configuration for `atf-tps`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TpsConfig {
    report: ReportConfig,
    junit: JunitConfig,
}

impl TpsConfig {
    /// The default location of the config within the current directory.
    pub const CONFIG_PATH: &'static str = ".config/atf-tps.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Repository-specific configuration is layered on top of the default
    /// config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Reads the config from the given file, or if not specified from
    /// `.config/atf-tps.toml` within `dir`.
    ///
    /// An explicitly specified file must exist; the default location may be
    /// missing.
    pub fn from_sources(
        dir: &Utf8Path,
        file: Option<&Utf8Path>,
        warnings: &mut impl ConfigWarnings,
    ) -> Result<Self, ConfigParseError> {
        let (config_file, source) = match file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = dir.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        let (config, unknown) = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;

        if !unknown.is_empty() {
            warnings.unknown_config_keys(&config_file, &unknown);
        }

        Ok(config)
    }

    /// Returns the default config, without reading any files.
    pub fn default_config() -> Result<Self, ConfigParseError> {
        let (config, _unknown) = Self::build_and_deserialize_config(&Self::make_default_config())
            .map_err(|kind| ConfigParseError::new("<default config>", kind))?;
        Ok(config)
    }

    /// Returns the report configuration.
    pub fn report(&self) -> &ReportConfig {
        &self.report
    }

    /// Returns the JUnit configuration.
    pub fn junit(&self) -> &JunitConfig {
        &self.junit
    }

    /// Returns reader options derived from this config.
    pub fn reader_options(&self) -> ReaderOptions {
        let mut options = ReaderOptions::new();
        options.set_event_policy(self.report.event_policy.into());
        options
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    /// This returns a tuple of (config, ignored paths).
    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(Self, BTreeSet<String>), ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config: Self = serde_path_to_error::deserialize(ignored_de).map_err(|error| {
            // Both serde_path_to_error and the config crate report the key.
            // Drop the key from the config error.
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

/// The `[report]` section.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReportConfig {
    event_policy: EventPolicySetting,
    fail_on_diagnostics: bool,
}

impl ReportConfig {
    /// Returns the configured event policy.
    pub fn event_policy(&self) -> EventPolicy {
        self.event_policy.into()
    }

    /// Returns true if parse diagnostics should fail the command.
    pub fn fail_on_diagnostics(&self) -> bool {
        self.fail_on_diagnostics
    }
}

#[derive(Copy, Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum EventPolicySetting {
    Always,
    UntilFirstError,
}

impl From<EventPolicySetting> for EventPolicy {
    fn from(setting: EventPolicySetting) -> Self {
        match setting {
            EventPolicySetting::Always => EventPolicy::Always,
            EventPolicySetting::UntilFirstError => EventPolicy::UntilFirstError,
        }
    }
}

/// The `[junit]` section.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JunitConfig {
    report_name: String,
    store_success_output: bool,
    store_failure_output: bool,
}

impl JunitConfig {
    /// Returns the name of the JUnit report.
    pub fn report_name(&self) -> &str {
        &self.report_name
    }

    /// Returns true if success output should be stored.
    pub fn store_success_output(&self) -> bool {
        self.store_success_output
    }

    /// Returns true if failure output should be stored.
    pub fn store_failure_output(&self) -> bool {
        self.store_failure_output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use indoc::indoc;

    #[derive(Default)]
    struct TestConfigWarnings {
        unknown: Vec<(Utf8PathBuf, BTreeSet<String>)>,
    }

    impl ConfigWarnings for TestConfigWarnings {
        fn unknown_config_keys(&mut self, config_file: &Utf8Path, unknown: &BTreeSet<String>) {
            self.unknown.push((config_file.to_owned(), unknown.clone()));
        }
    }

    fn write_config(dir: &Utf8TempDir, contents: &str) -> Utf8PathBuf {
        let path = dir.path().join("atf-tps.toml");
        std::fs::write(&path, contents).expect("wrote config");
        path
    }

    #[test]
    fn default_config_is_valid() {
        let config = TpsConfig::default_config().expect("default config is valid");
        assert_eq!(config.report().event_policy(), EventPolicy::Always);
        assert!(config.report().fail_on_diagnostics());
        assert_eq!(config.junit().report_name(), "atf-tps-run");
        assert!(!config.junit().store_success_output());
        assert!(config.junit().store_failure_output());
    }

    #[test]
    fn missing_default_location_is_fine() {
        let dir = Utf8TempDir::new().expect("created temp dir");
        let mut warnings = TestConfigWarnings::default();
        let config =
            TpsConfig::from_sources(dir.path(), None, &mut warnings).expect("config is valid");
        assert!(config.report().fail_on_diagnostics());
        assert!(warnings.unknown.is_empty());
    }

    #[test]
    fn overrides_and_unknown_keys() {
        let dir = Utf8TempDir::new().expect("created temp dir");
        let path = write_config(
            &dir,
            indoc! {r#"
                [report]
                event-policy = "until-first-error"
                fail-on-diagnostics = false
                colour = "blue"

                [junit]
                report-name = "nightly"

                [extra]
                key = 1
            "#},
        );

        let mut warnings = TestConfigWarnings::default();
        let config = TpsConfig::from_sources(dir.path(), Some(&path), &mut warnings)
            .expect("config is valid");

        assert_eq!(
            config.reader_options().event_policy(),
            EventPolicy::UntilFirstError
        );
        assert!(!config.report().fail_on_diagnostics());
        assert_eq!(config.junit().report_name(), "nightly");
        // Settings not in the file come from the default config.
        assert!(config.junit().store_failure_output());

        assert_eq!(warnings.unknown.len(), 1);
        let (config_file, unknown) = &warnings.unknown[0];
        assert_eq!(config_file, &path);
        assert_eq!(
            unknown.iter().map(String::as_str).collect::<Vec<_>>(),
            ["extra", "report.colour"]
        );
    }

    #[test]
    fn invalid_value() {
        let dir = Utf8TempDir::new().expect("created temp dir");
        let path = write_config(&dir, "[report]\nevent-policy = \"sometimes\"\n");

        let error = TpsConfig::from_sources(dir.path(), Some(&path), &mut DefaultConfigWarnings)
            .expect_err("invalid event policy");
        assert_eq!(error.config_file(), path.as_path());
        match error.kind() {
            ConfigParseErrorKind::DeserializeError(error) => {
                assert_eq!(error.path().to_string(), "report.event-policy");
            }
            other => panic!("unexpected error kind: {other:?}"),
        }
    }

    #[test]
    fn explicit_file_must_exist() {
        let dir = Utf8TempDir::new().expect("created temp dir");
        let path = dir.path().join("missing.toml");

        let error = TpsConfig::from_sources(dir.path(), Some(&path), &mut DefaultConfigWarnings)
            .expect_err("missing config file");
        assert!(
            matches!(error.kind(), ConfigParseErrorKind::BuildError(_)),
            "unexpected error kind: {:?}",
            error.kind()
        );
    }
}
