//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::settings::GatewaySettings;
use crate::config::validation::{validate_settings, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parse error in {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("TOML parse error in {}: {source}", .path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate process settings from a TOML file.
pub fn load_settings(path: &Path) -> Result<GatewaySettings, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let settings: GatewaySettings = toml::from_str(&content).map_err(|source| ConfigError::Toml {
        path: path.to_path_buf(),
        source,
    })?;

    validate_settings(&settings).map_err(ConfigError::Validation)?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::testing::TempConfigDir;

    #[test]
    fn test_load_settings_file() {
        let dir = TempConfigDir::empty();
        let path = dir.write(
            "gateway.toml",
            r#"
config_dir = "/etc/gateway"
environment = "stage"

[listener]
bind_address = "127.0.0.1:9000"

[upstream]
timeout_secs = 10
"#,
        );

        let settings = load_settings(&path).unwrap();
        assert_eq!(settings.config_dir, PathBuf::from("/etc/gateway"));
        assert_eq!(settings.active_environment(), "stage");
        assert_eq!(settings.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(settings.upstream.timeout_secs, 10);
        assert_eq!(settings.upstream.connect_timeout_secs, 5);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let dir = TempConfigDir::empty();
        let path = dir.write("gateway.toml", "[upstream]\ntimeout_secs = 0\n");

        let err = load_settings(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
        assert!(err.to_string().contains("upstream.timeout_secs"));
    }

    #[test]
    fn test_missing_settings_file() {
        let err = load_settings(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
