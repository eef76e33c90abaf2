use std::path::{Path, PathBuf};

use crate::{app_dirs, fs_ops};

use super::{AppConfig, ConfigError};

/// Default filename used to store the app configuration.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Resolve the configuration file path, ensuring the parent directory exists.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dir = app_dirs::app_root_dir().map_err(map_app_dir_error)?;
    Ok(dir.join(CONFIG_FILE_NAME))
}

/// Load configuration from disk, returning defaults if missing.
pub fn load_or_default() -> Result<AppConfig, ConfigError> {
    load_from(&config_path()?)
}

/// Load configuration from a specific path, returning defaults if missing.
pub fn load_from(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("No config at {}; using defaults", path.display());
        return Ok(AppConfig::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<AppConfig>(&text)
        .map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })
        .map(AppConfig::normalized)
}

/// Persist configuration to disk, overwriting any previous contents.
pub fn save(config: &AppConfig) -> Result<(), ConfigError> {
    save_to_path(config, &config_path()?)
}

/// Write the TOML settings file atomically to prevent partial writes on crash.
pub fn save_to_path(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let data = toml::to_string_pretty(config).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    fs_ops::atomic_write(path, data.as_bytes()).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn map_app_dir_error(error: app_dirs::AppDirError) -> ConfigError {
    match error {
        app_dirs::AppDirError::NoBaseDir => ConfigError::NoConfigDir,
        app_dirs::AppDirError::CreateDir { path, source } => ConfigError::CreateDir { path, source },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis_api::Difficulty;
    use tempfile::tempdir;

    fn with_config_home<T>(dir: &Path, f: impl FnOnce() -> T) -> T {
        let _guard = app_dirs::ConfigBaseGuard::set(dir.to_path_buf());
        f()
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.api.base_url, "http://localhost:5001/api");
        assert_eq!(config.polling.interval_ms, 1_000);
        assert_eq!(config.polling.timeout_secs, 120);
        assert!(config.display.cosmetic_pose_offsets);
    }

    #[test]
    fn saves_and_reloads_settings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cfg.toml");
        let mut config = AppConfig::default();
        config.analysis.difficulty = Difficulty::Advanced;
        config.analysis.fps = 15.0;
        config.api.base_url = "https://coach.example.com/api".to_string();
        save_to_path(&config, &path).unwrap();

        let loaded = load_from(&path).unwrap();
        assert_eq!(loaded, config);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("difficulty = \"advanced\""));
    }

    #[test]
    fn partial_files_fill_in_defaults_and_normalize() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cfg.toml");
        std::fs::write(
            &path,
            "[api]\nbase_url = \"http://10.0.0.2:5001/api/\"\n\n[analysis]\nfps = -4.0\n\n[polling]\ninterval_ms = 0\n",
        )
        .unwrap();
        let loaded = load_from(&path).unwrap();
        assert_eq!(loaded.api.base_url, "http://10.0.0.2:5001/api");
        assert_eq!(loaded.api.request_timeout_secs, 300);
        assert_eq!(loaded.analysis.fps, 10.0);
        assert_eq!(loaded.analysis.difficulty, Difficulty::Beginner);
        assert_eq!(loaded.polling.interval_ms, 1_000);
    }

    #[test]
    fn invalid_toml_is_reported_with_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cfg.toml");
        std::fs::write(&path, "[api\nbase_url = 3").unwrap();
        let err = load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseToml { .. }));
        assert!(err.to_string().contains("cfg.toml"));
    }

    #[test]
    fn save_uses_app_root() {
        let dir = tempdir().unwrap();
        with_config_home(dir.path(), || {
            save(&AppConfig::default()).unwrap();
            let expected = dir
                .path()
                .join(app_dirs::APP_DIR_NAME)
                .join(CONFIG_FILE_NAME);
            assert_eq!(config_path().unwrap(), expected);
            assert!(expected.is_file());
            assert_eq!(load_or_default().unwrap(), AppConfig::default());
        });
    }
}
