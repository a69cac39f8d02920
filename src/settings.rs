use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

use crate::error::LayerToolsError;

/// Name of the optional settings file kept next to a project.
pub const SETTINGS_FILE_NAME: &str = "layertools.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Directory, relative to the project, that shipping packages go into.
    pub shipping_dir: String,

    /// How long summary messages stay visible.
    pub message_duration_secs: u64,

    /// `none`, `error`, `warn`, `info`, `debug` or `trace`.
    pub file_log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            shipping_dir: "Versand".to_owned(),
            message_duration_secs: 10,
            file_log_level: "trace".to_owned(),
        }
    }
}

impl Settings {
    pub fn from_toml(contents: &str, path: &Path) -> Result<Self, LayerToolsError> {
        toml::from_str(contents).map_err(|source| LayerToolsError::SettingsParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, LayerToolsError> {
        let contents =
            fs_err::read_to_string(path).map_err(|source| LayerToolsError::SettingsRead {
                path: path.to_path_buf(),
                source,
            })?;

        Settings::from_toml(&contents, path)
    }

    /// Loads the settings file in `dir`, falling back to defaults when there
    /// is none.
    pub fn load_from_dir(dir: &Path) -> Result<Self, LayerToolsError> {
        let path = Self::path_in(dir);

        if path.is_file() {
            log::debug!("Reading settings from {}", path.display());
            Settings::load(&path)
        } else {
            Ok(Settings::default())
        }
    }

    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(SETTINGS_FILE_NAME)
    }

    pub fn message_duration(&self) -> Duration {
        Duration::from_secs(self.message_duration_secs)
    }

    /// Level for the log file; `None` turns file logging off. Unknown values
    /// fall back to trace.
    pub fn file_log_level(&self) -> Option<LevelFilter> {
        parse_level(&self.file_log_level)
    }
}

pub(crate) fn parse_level(level: &str) -> Option<LevelFilter> {
    match level.to_lowercase().as_str() {
        "none" | "off" => None,
        "error" => Some(LevelFilter::ERROR),
        "warn" => Some(LevelFilter::WARN),
        "info" => Some(LevelFilter::INFO),
        "debug" => Some(LevelFilter::DEBUG),
        _ => Some(LevelFilter::TRACE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert_eq!(settings.shipping_dir, "Versand");
        assert_eq!(settings.message_duration(), Duration::from_secs(10));
        assert_eq!(settings.file_log_level(), Some(LevelFilter::TRACE));
    }

    #[test]
    fn partial_file() {
        let settings =
            Settings::from_toml("shipping_dir = \"Delivery\"\n", Path::new("x.toml")).unwrap();
        assert_eq!(
            settings,
            Settings {
                shipping_dir: "Delivery".to_owned(),
                ..Settings::default()
            }
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            Settings::from_toml("shiping_dir = \"typo\"\n", Path::new("x.toml")),
            Err(LayerToolsError::SettingsParse { .. })
        ));
    }

    #[test]
    fn log_levels() {
        assert_eq!(parse_level("None"), None);
        assert_eq!(parse_level("off"), None);
        assert_eq!(parse_level("WARN"), Some(LevelFilter::WARN));
        assert_eq!(parse_level("banana"), Some(LevelFilter::TRACE));
    }

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            Settings::load_from_dir(dir.path()).unwrap(),
            Settings::default()
        );

        fs_err::write(
            Settings::path_in(dir.path()),
            "message_duration_secs = 3\nfile_log_level = \"none\"\n",
        )
        .unwrap();
        let settings = Settings::load_from_dir(dir.path()).unwrap();
        assert_eq!(settings.message_duration_secs, 3);
        assert_eq!(settings.file_log_level(), None);
    }
}
