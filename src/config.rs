use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_TRANSPOSE_SEMITONES: i8 = 2;
pub const DEFAULT_SILENCE_THRESHOLD: Duration = Duration::from_millis(1000);
pub const DEFAULT_CLIENT_NAME: &str = "canon";
pub const DEFAULT_CONTINUATION_LENGTH: usize = 10;

/// What gets played back once a phrase ends.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum ResponseMode {
    /// The phrase itself, transposed.
    #[default]
    Echo,
    /// A new phrase generated from everything heard so far.
    Continue,
}

/// The knobs the engine reads at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub transpose_semitones: i8,
    pub silence_threshold_ms: u64,
    pub mode: ResponseMode,
    /// Most notes a generated continuation may have.
    pub max_continuation_length: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            transpose_semitones: DEFAULT_TRANSPOSE_SEMITONES,
            silence_threshold_ms: DEFAULT_SILENCE_THRESHOLD.as_millis() as u64,
            mode: ResponseMode::default(),
            max_continuation_length: DEFAULT_CONTINUATION_LENGTH,
        }
    }
}

impl Settings {
    pub fn silence_threshold(&self) -> Duration {
        Duration::from_millis(self.silence_threshold_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.silence_threshold_ms == 0 {
            return Err(ConfigError::Invalid(
                "silence_threshold_ms must be greater than zero".into(),
            ));
        }
        if self.max_continuation_length == 0 {
            return Err(ConfigError::Invalid(
                "max_continuation_length must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub settings: Settings,
    /// Port index or part of a port name. First input port when unset.
    pub input_port: Option<String>,
    /// Port index or part of a port name. First output port when unset.
    pub output_port: Option<String>,
    pub client_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            input_port: None,
            output_port: None,
            client_name: DEFAULT_CLIENT_NAME.to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let ron_string = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&ron_string).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        tracing::debug!(path = %path.display(), ?config, "config loaded");
        Ok(config)
    }

    pub fn parse(ron_string: &str) -> Result<Self, ConfigError> {
        let config: Config = ron::from_str(ron_string).map_err(|source| ConfigError::Parse {
            path: Default::default(),
            source,
        })?;
        config.settings.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let ron_string = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        fs::write(path, ron_string).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let config = Config::default();
        assert_eq!(config.settings.transpose_semitones, 2);
        assert_eq!(config.settings.silence_threshold(), Duration::from_secs(1));
        assert_eq!(config.settings.mode, ResponseMode::Echo);
        assert_eq!(config.settings.max_continuation_length, 10);
        assert_eq!(config.client_name, "canon");
        assert!(config.input_port.is_none());
    }

    #[test]
    fn parses_partial_file() {
        let config = Config::parse(
            r#"(
                settings: (transpose_semitones: -5),
                output_port: Some("IAC"),
            )"#,
        )
        .unwrap();
        assert_eq!(config.settings.transpose_semitones, -5);
        assert_eq!(config.settings.silence_threshold_ms, 1000);
        assert_eq!(config.output_port.as_deref(), Some("IAC"));
        assert_eq!(config.client_name, "canon");
    }

    #[test]
    fn rejects_zero_threshold() {
        let err = Config::parse("(settings: (silence_threshold_ms: 0))").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn parses_continue_mode() {
        let config =
            Config::parse("(settings: (mode: Continue, max_continuation_length: 4))").unwrap();
        assert_eq!(config.settings.mode, ResponseMode::Continue);
        assert_eq!(config.settings.max_continuation_length, 4);
        assert_eq!(config.settings.transpose_semitones, 2);

        let err = Config::parse("(settings: (max_continuation_length: 0))").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_garbage() {
        let err = Config::parse("settings = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn save_then_load() {
        let dir = std::env::temp_dir().join(format!("canon-config-{}", std::process::id()));
        let path = dir.join("canon.ron");
        let config = Config {
            settings: Settings {
                transpose_semitones: 7,
                silence_threshold_ms: 250,
                mode: ResponseMode::Continue,
                max_continuation_length: 16,
            },
            input_port: Some("1".into()),
            output_port: None,
            client_name: "test".into(),
        };

        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Config::load(Path::new("/definitely/not/here.ron")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.ron"));
    }
}
