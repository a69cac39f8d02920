use std::{io, path::PathBuf};

use thiserror::Error;

/// Whether an error was caused by something the user can fix (selection,
/// unsaved project) or by the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    User,
    Runtime,
}

/// Whole-batch failures. Per-layer problems are reported through outcome
/// values instead and never surface here.
#[derive(Debug, Error)]
pub enum LayerToolsError {
    #[error("Project is not saved. Please save the project first.")]
    ProjectNotSaved,

    #[error("No layers or groups selected.")]
    NothingSelected,

    #[error("No layer with id or name '{0}' exists in the project.")]
    UnknownLayer(String),

    #[error("No group named '{0}' exists in the layer tree.")]
    UnknownGroup(String),

    #[error("The layer tree node {0} no longer exists.")]
    LayerTreeUnavailable(usize),

    #[error("Could not create GeoPackage at {}", .path.display())]
    ContainerCreate {
        path: PathBuf,
        #[source]
        source: gpkg_store::Error,
    },

    #[error("Could not open GeoPackage at {}", .path.display())]
    ContainerOpen {
        path: PathBuf,
        #[source]
        source: gpkg_store::Error,
    },

    #[error("Could not read project file {}", .path.display())]
    ProjectRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Project file {} is malformed", .path.display())]
    ProjectParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not write project file {}", .path.display())]
    ProjectWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not read settings file {}", .path.display())]
    SettingsRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Settings file {} is malformed", .path.display())]
    SettingsParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl LayerToolsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LayerToolsError::ProjectNotSaved
            | LayerToolsError::NothingSelected
            | LayerToolsError::UnknownLayer(_)
            | LayerToolsError::UnknownGroup(_) => ErrorKind::User,
            _ => ErrorKind::Runtime,
        }
    }
}
