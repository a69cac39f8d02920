//! The project document: a layer registry, the layer tree shown in the
//! legend and a small project-scoped key-value store.
//!
//! Projects are stored as JSON files with the `.ltproj` extension. A project
//! that was never saved has no file name; operations that need one fail with
//! `LayerToolsError::ProjectNotSaved`.

mod layer;
mod tree;

use std::{
    collections::BTreeMap,
    io,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::LayerToolsError;

pub use self::layer::{
    validate_layer_name, Layer, LayerId, LayerKind, RenameError, StyleManager, MEMORY_PROVIDER,
};
pub use self::tree::{Descendants, LayerTree, NodeDef, NodeId, TreeNode};

/// File extension of project documents, without the leading dot.
pub const PROJECT_EXTENSION: &str = "ltproj";

/// Read and rename access to a layer registry.
pub trait LayerStore {
    fn layer(&self, id: &LayerId) -> Option<&Layer>;

    /// Renames a layer, or refuses with the reason.
    fn set_layer_name(&mut self, id: &LayerId, name: &str) -> Result<(), RenameError>;
}

/// Project-scoped string entries, grouped by scope.
pub trait PropertyStore {
    fn read_entry(&self, scope: &str, key: &str) -> Option<&str>;
    fn write_entry(&mut self, scope: &str, key: &str, value: String);

    /// Returns whether an entry was removed.
    fn remove_entry(&mut self, scope: &str, key: &str) -> bool;
}

/// Map extent in project coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewExtent {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default)]
    pub title: String,

    /// Authority id of the project CRS, e.g. `EPSG:25832`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<String>,

    /// Opaque coordinate transform context handed to container writers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform_context: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_extent: Option<ViewExtent>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub map_themes: IndexMap<String, serde_json::Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub layouts: Vec<serde_json::Value>,

    #[serde(default, with = "layer_list")]
    layers: IndexMap<LayerId, Layer>,

    #[serde(default)]
    tree: LayerTree,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    properties: BTreeMap<String, BTreeMap<String, String>>,

    /// Where this project was loaded from or last saved to.
    #[serde(skip)]
    file_name: Option<PathBuf>,
}

impl Project {
    pub fn new() -> Self {
        Project::default()
    }

    /// Loads a project document from disk.
    pub fn load(path: &Path) -> Result<Self, LayerToolsError> {
        let contents = fs_err::read_to_string(path).map_err(|source| {
            LayerToolsError::ProjectRead {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let mut project: Project =
            serde_json::from_str(&contents).map_err(|source| LayerToolsError::ProjectParse {
                path: path.to_path_buf(),
                source,
            })?;
        project.file_name = Some(path.to_path_buf());

        log::debug!(
            "Loaded project {} with {} layers",
            path.display(),
            project.layers.len()
        );

        Ok(project)
    }

    /// Writes the project back to the file it was loaded from.
    pub fn save(&self) -> Result<(), LayerToolsError> {
        let path = self.require_file_name()?;
        self.write_to(path)
    }

    /// Writes the project to `path` and makes that its file name.
    pub fn save_as(&mut self, path: &Path) -> Result<(), LayerToolsError> {
        self.write_to(path)?;
        self.file_name = Some(path.to_path_buf());
        Ok(())
    }

    fn write_to(&self, path: &Path) -> Result<(), LayerToolsError> {
        let write_error = |source| LayerToolsError::ProjectWrite {
            path: path.to_path_buf(),
            source,
        };

        let mut contents = serde_json::to_string_pretty(self)
            .map_err(|err| write_error(io::Error::other(err)))?;
        contents.push('\n');

        fs_err::write(path, contents).map_err(write_error)?;
        log::debug!("Wrote project {}", path.display());

        Ok(())
    }

    pub fn file_name(&self) -> Option<&Path> {
        self.file_name.as_deref()
    }

    pub fn set_file_name(&mut self, path: impl Into<PathBuf>) {
        self.file_name = Some(path.into());
    }

    pub fn require_file_name(&self) -> Result<&Path, LayerToolsError> {
        self.file_name().ok_or(LayerToolsError::ProjectNotSaved)
    }

    /// Directory holding the project file.
    pub fn project_dir(&self) -> Option<&Path> {
        self.file_name()?.parent()
    }

    pub fn layer(&self, id: &LayerId) -> Option<&Layer> {
        self.layers.get(id)
    }

    pub fn layer_mut(&mut self, id: &LayerId) -> Option<&mut Layer> {
        self.layers.get_mut(id)
    }

    /// All registered layers in registration order.
    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }

    /// First registered layer called `name`.
    pub fn layer_by_name(&self, name: &str) -> Option<&Layer> {
        self.layers.values().find(|layer| layer.name() == name)
    }

    /// Whether a layer with exactly this source and name is registered.
    pub fn has_layer_with(&self, source: &str, name: &str) -> bool {
        self.layers
            .values()
            .any(|layer| layer.source == source && layer.name() == name)
    }

    pub fn tree(&self) -> &LayerTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut LayerTree {
        &mut self.tree
    }

    /// Adds a layer to the registry without showing it in the legend.
    pub fn register_layer(&mut self, layer: Layer) -> LayerId {
        let id = layer.id.clone();
        self.layers.insert(id.clone(), layer);
        id
    }

    /// Adds a layer to the registry and appends it to the legend root.
    pub fn add_layer(&mut self, layer: Layer) -> LayerId {
        let id = self.register_layer(layer);
        let root = self.tree.root();
        self.tree.add_layer(root, id.clone());
        id
    }

    /// Adds a layer under the group `parent`.
    pub fn add_layer_to_group(&mut self, layer: Layer, parent: NodeId) -> LayerId {
        let id = self.register_layer(layer);
        self.tree.add_layer(parent, id.clone());
        id
    }

    /// Shows a registered layer as the first entry of the legend.
    pub fn insert_layer_at_top(&mut self, id: &LayerId) -> NodeId {
        let root = self.tree.root();
        self.tree.insert_layer(root, 0, id.clone())
    }

    /// Removes a layer from the registry and the legend.
    pub fn remove_layer(&mut self, id: &LayerId) -> Option<Layer> {
        self.tree.remove_layer(id);
        self.layers.shift_remove(id)
    }
}

impl LayerStore for Project {
    fn layer(&self, id: &LayerId) -> Option<&Layer> {
        Project::layer(self, id)
    }

    fn set_layer_name(&mut self, id: &LayerId, name: &str) -> Result<(), RenameError> {
        validate_layer_name(name)?;

        let layer = self
            .layers
            .get_mut(id)
            .ok_or_else(|| RenameError::MissingLayer(id.clone()))?;

        log::trace!("Renaming layer {} from '{}' to '{}'", id, layer.name(), name);
        layer.set_name(name);

        Ok(())
    }
}

impl PropertyStore for Project {
    fn read_entry(&self, scope: &str, key: &str) -> Option<&str> {
        self.properties
            .get(scope)
            .and_then(|entries| entries.get(key))
            .map(String::as_str)
    }

    fn write_entry(&mut self, scope: &str, key: &str, value: String) {
        self.properties
            .entry(scope.to_owned())
            .or_default()
            .insert(key.to_owned(), value);
    }

    fn remove_entry(&mut self, scope: &str, key: &str) -> bool {
        let Some(entries) = self.properties.get_mut(scope) else {
            return false;
        };

        let removed = entries.remove(key).is_some();
        if entries.is_empty() {
            self.properties.remove(scope);
        }

        removed
    }
}

/// Layers are keyed by id in memory but stored as a plain list.
mod layer_list {
    use indexmap::IndexMap;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{Layer, LayerId};

    pub fn serialize<S: Serializer>(
        layers: &IndexMap<LayerId, Layer>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(layers.values())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<IndexMap<LayerId, Layer>, D::Error> {
        let layers = Vec::<Layer>::deserialize(deserializer)?;
        Ok(layers
            .into_iter()
            .map(|layer| (layer.id.clone(), layer))
            .collect())
    }
}
