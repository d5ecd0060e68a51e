//! Settings file loading.

use crate::config::Settings;
use crate::error::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the global settings path: ~/.config/ksym-locator/settings.json
pub fn get_global_settings_path() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or_else(|| {
        ConfigError::ValidationFailed("Cannot determine home directory".to_string())
    })?;

    Ok(home.join(".config/ksym-locator").join("settings.json"))
}

/// Load settings for a run.
///
/// An explicit path must exist. Without one, the global settings file is used
/// when present and built-in defaults otherwise.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings, ConfigError> {
    if let Some(path) = explicit {
        return load_settings_from_file(path);
    }

    let global = get_global_settings_path()?;
    if global.is_file() {
        log::debug!("[Config] Loading settings from {}", global.display());
        load_settings_from_file(&global)
    } else {
        Ok(Settings::default())
    }
}

/// Load settings from a JSON file.
pub fn load_settings_from_file(path: &Path) -> Result<Settings, ConfigError> {
    validate_config_path(path)?;

    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::FileNotFound(format!(
                "Configuration file not found at: {}",
                path.display()
            ))
        } else {
            ConfigError::IoError(e)
        }
    })?;

    let settings: Settings = serde_json::from_str(&content).map_err(ConfigError::InvalidJson)?;
    Ok(settings)
}

/// Validate config path (.json extension required).
pub fn validate_config_path(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationFailed(
            "Configuration path cannot be empty".to_string(),
        ));
    }

    match path.extension() {
        Some(ext) if ext == "json" => Ok(()),
        Some(ext) => Err(ConfigError::ValidationFailed(format!(
            "Configuration file must have .json extension, got .{}",
            ext.to_string_lossy()
        ))),
        None => Err(ConfigError::ValidationFailed(
            "Configuration file must have .json extension".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchBackendKind;

    #[test]
    fn test_load_written_settings() -> Result<(), Box<dyn std::error::Error>> {
        let tempdir = tempfile::TempDir::new()?;
        let path = tempdir.path().join("settings.json");

        let settings = Settings {
            search_backend: SearchBackendKind::Native,
            kernels_root: PathBuf::from("/data/kernels"),
            ..Settings::default()
        };
        fs::write(&path, serde_json::to_string_pretty(&settings)?)?;

        let loaded = load_settings_from_file(&path)?;
        assert_eq!(loaded, settings);
        Ok(())
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let tempdir = tempfile::TempDir::new().unwrap();
        let path = tempdir.path().join("absent.json");
        assert!(matches!(
            load_settings(Some(&path)),
            Err(ConfigError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_wrong_extension_rejected() {
        assert!(validate_config_path(Path::new("settings.toml")).is_err());
        assert!(validate_config_path(Path::new("settings")).is_err());
        assert!(validate_config_path(Path::new("settings.json")).is_ok());
    }

    #[test]
    fn test_invalid_json_reported() {
        let tempdir = tempfile::TempDir::new().unwrap();
        let path = tempdir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            load_settings_from_file(&path),
            Err(ConfigError::InvalidJson(_))
        ));
    }
}
