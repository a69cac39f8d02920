//! Classifies where a layer's data physically lives relative to its project.

use std::{
    collections::HashMap,
    ffi::OsStr,
    path::{Component, Path, PathBuf},
};

use gpkg_store::GPKG_EXTENSION;
use serde::Serialize;

use crate::{
    error::LayerToolsError,
    package::project_container_path,
    project::{Layer, LayerId, Project},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerLocation {
    /// Inside the GeoPackage paired with the project.
    PairedContainer,
    /// Inside some other GeoPackage below the project directory.
    ContainerInFolder,
    /// Inside the project directory, but not in a GeoPackage.
    FolderNoContainer,
    /// Outside the project directory.
    External,
    /// Served by a web service.
    Web,
    /// A vector layer without features.
    Empty,
    /// Scratch layers and anything without a usable path.
    Unknown,
}

impl LayerLocation {
    pub const ALL: [LayerLocation; 7] = [
        LayerLocation::PairedContainer,
        LayerLocation::ContainerInFolder,
        LayerLocation::FolderNoContainer,
        LayerLocation::External,
        LayerLocation::Web,
        LayerLocation::Empty,
        LayerLocation::Unknown,
    ];

    pub fn id(self) -> &'static str {
        match self {
            LayerLocation::PairedContainer => "gpkg_project",
            LayerLocation::ContainerInFolder => "gpkg_folder",
            LayerLocation::FolderNoContainer => "folder_no_gpkg",
            LayerLocation::External => "external",
            LayerLocation::Web => "cloud",
            LayerLocation::Empty => "empty",
            LayerLocation::Unknown => "unknown",
        }
    }

    /// Key under which presentation layers look up the user-facing text.
    pub fn message_key(self) -> &'static str {
        match self {
            LayerLocation::PairedContainer => "location.gpkg_project",
            LayerLocation::ContainerInFolder => "location.gpkg_folder",
            LayerLocation::FolderNoContainer => "location.folder_no_gpkg",
            LayerLocation::External => "location.external",
            LayerLocation::Web => "location.cloud",
            LayerLocation::Empty => "location.empty",
            LayerLocation::Unknown => "location.unknown",
        }
    }
}

/// Classifies layers of one project and remembers the answers.
///
/// The cache is keyed by layer id. It is never invalidated on its own; call
/// `clear_cache` when layer sources change and `set_project` when another
/// project is opened.
#[derive(Debug)]
pub struct LocationClassifier {
    project_dir: PathBuf,
    container_path: PathBuf,
    cache: HashMap<LayerId, LayerLocation>,
}

impl LocationClassifier {
    pub fn new(project_dir: impl Into<PathBuf>, container_path: impl Into<PathBuf>) -> Self {
        LocationClassifier {
            project_dir: project_dir.into(),
            container_path: container_path.into(),
            cache: HashMap::new(),
        }
    }

    /// Sets up a classifier for a saved project. The paired container does
    /// not have to exist.
    pub fn for_project(project: &Project) -> Result<Self, LayerToolsError> {
        let container_path = project_container_path(project)?;
        let project_dir = project
            .project_dir()
            .ok_or(LayerToolsError::ProjectNotSaved)?;

        Ok(LocationClassifier::new(project_dir, container_path))
    }

    pub fn classify(&mut self, layer: &Layer) -> LayerLocation {
        if let Some(location) = self.cache.get(&layer.id) {
            return *location;
        }

        let location = classify_layer(&self.project_dir, &self.container_path, layer);
        log::trace!("Layer '{}' is {:?}", layer.name(), location);
        self.cache.insert(layer.id.clone(), location);
        location
    }

    pub fn cached(&self, id: &LayerId) -> Option<LayerLocation> {
        self.cache.get(id).copied()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Points the classifier at another project. Clears the cache.
    pub fn set_project(
        &mut self,
        project_dir: impl Into<PathBuf>,
        container_path: impl Into<PathBuf>,
    ) {
        self.project_dir = project_dir.into();
        self.container_path = container_path.into();
        self.clear_cache();
    }
}

/// Uncached classification. The first matching rule wins:
/// empty, scratch, web, paired container, project directory, external.
pub fn classify_layer(project_dir: &Path, container_path: &Path, layer: &Layer) -> LayerLocation {
    if layer.is_empty_vector() {
        return LayerLocation::Empty;
    }

    if layer.is_memory() {
        return LayerLocation::Unknown;
    }

    let descriptor = layer.descriptor();
    if descriptor.is_remote() {
        return LayerLocation::Web;
    }

    let raw_path = descriptor.path();
    if raw_path.is_empty() {
        return LayerLocation::Unknown;
    }

    let project_dir = normalize(project_dir);
    let source_path = normalize(&project_dir.join(raw_path));

    if same_path(&source_path, &normalize(container_path)) {
        return LayerLocation::PairedContainer;
    }

    if is_within(&source_path, &project_dir) {
        let is_gpkg = source_path
            .extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| ext.eq_ignore_ascii_case(GPKG_EXTENSION));

        return if is_gpkg {
            LayerLocation::ContainerInFolder
        } else {
            LayerLocation::FolderNoContainer
        };
    }

    LayerLocation::External
}

/// Resolves symlinks for the part of `path` that exists and removes `.` and
/// `..` from the rest.
fn normalize(path: &Path) -> PathBuf {
    let lexical = lexical_normalize(path);

    let mut existing = lexical.as_path();
    let mut rest = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return rest.iter().rev().fold(canonical, |acc, part| acc.join(part));
        }

        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => return lexical,
        }
    }
}

fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }

    out
}

fn same_path(a: &Path, b: &Path) -> bool {
    a.components().count() == b.components().count()
        && a
            .components()
            .zip(b.components())
            .all(|(a, b)| component_eq(a.as_os_str(), b.as_os_str()))
}

fn is_within(path: &Path, dir: &Path) -> bool {
    let mut path = path.components();
    dir.components().all(|dir_part| {
        path.next()
            .is_some_and(|part| component_eq(part.as_os_str(), dir_part.as_os_str()))
    })
}

#[cfg(any(windows, target_os = "macos"))]
fn component_eq(a: &OsStr, b: &OsStr) -> bool {
    a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
}

#[cfg(not(any(windows, target_os = "macos")))]
fn component_eq(a: &OsStr, b: &OsStr) -> bool {
    a == b
}
