use std::fmt;

use gpkg_store::{GeometryClass, SourceDescriptor};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Provider key of layers that only live in memory.
pub const MEMORY_PROVIDER: &str = "memory";

/// Stable identifier of a layer inside a project's registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(String);

impl LayerId {
    pub fn new(id: impl Into<String>) -> Self {
        LayerId(id.into())
    }

    /// Generates a fresh id derived from a layer name, the way desktop GIS
    /// hosts do (`Roads_3f2a...`).
    pub fn generate(name: &str) -> Self {
        let stem: String = name
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();

        LayerId(format!("{}_{}", stem, Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayerId {
    fn from(value: &str) -> Self {
        LayerId::new(value)
    }
}

/// What kind of data a layer shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerKind {
    Vector {
        geometry: GeometryClass,
        #[serde(default)]
        feature_count: u64,
    },
    Raster,
    Other,
}

/// Named style definitions of a layer, one of which is current.
///
/// Definitions are opaque to this crate; they are copied around but never
/// interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleManager {
    #[serde(default)]
    current: String,

    #[serde(default)]
    styles: IndexMap<String, String>,
}

impl StyleManager {
    pub fn current_name(&self) -> &str {
        &self.current
    }

    /// Definition of the current style, if any.
    pub fn current_style(&self) -> Option<&str> {
        self.styles.get(&self.current).map(String::as_str)
    }

    pub fn style(&self, name: &str) -> Option<&str> {
        self.styles.get(name).map(String::as_str)
    }

    /// Adds a style, replacing any existing style of the same name.
    pub fn add_style(&mut self, name: &str, definition: &str) {
        self.styles.insert(name.to_owned(), definition.to_owned());
    }

    /// Makes `name` the current style. Returns false if no such style exists.
    pub fn set_current(&mut self, name: &str) -> bool {
        if self.styles.contains_key(name) {
            self.current = name.to_owned();
            true
        } else {
            false
        }
    }
}

/// Reasons the project refuses to rename a layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenameError {
    #[error("layer '{0}' does not exist")]
    MissingLayer(LayerId),

    #[error("layer names cannot be empty")]
    EmptyName,

    #[error("layer names cannot contain control characters")]
    ControlCharacter,
}

/// Checks a candidate layer name before it is applied.
pub fn validate_layer_name(name: &str) -> Result<(), RenameError> {
    if name.trim().is_empty() {
        return Err(RenameError::EmptyName);
    }

    if name.chars().any(char::is_control) {
        return Err(RenameError::ControlCharacter);
    }

    Ok(())
}

/// A map layer registered in a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub id: LayerId,

    name: String,

    /// Provider-specific source descriptor, `|`-delimited for file layers.
    pub source: String,

    /// Data provider key, e.g. `ogr`, `gdal` or `memory`.
    pub provider: String,

    pub kind: LayerKind,

    #[serde(default, skip_serializing_if = "is_default_styles")]
    pub styles: StyleManager,

    #[serde(skip)]
    repaint_requests: u32,
}

fn is_default_styles(styles: &StyleManager) -> bool {
    *styles == StyleManager::default()
}

impl Layer {
    pub fn new(
        id: LayerId,
        name: impl Into<String>,
        source: impl Into<String>,
        provider: impl Into<String>,
        kind: LayerKind,
    ) -> Self {
        Layer {
            id,
            name: name.into(),
            source: source.into(),
            provider: provider.into(),
            kind,
            styles: StyleManager::default(),
            repaint_requests: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Only the project may rename layers, so that names stay validated.
    pub(super) fn set_name(&mut self, name: &str) {
        self.name = name.to_owned();
    }

    pub fn descriptor(&self) -> SourceDescriptor<'_> {
        SourceDescriptor::parse(&self.source)
    }

    /// Whether the layer is backed by a web service.
    pub fn is_remote(&self) -> bool {
        self.descriptor().is_remote()
    }

    pub fn is_vector(&self) -> bool {
        matches!(self.kind, LayerKind::Vector { .. })
    }

    pub fn is_memory(&self) -> bool {
        self.provider == MEMORY_PROVIDER || self.source.starts_with(MEMORY_PROVIDER)
    }

    /// A vector layer without a single feature.
    pub fn is_empty_vector(&self) -> bool {
        matches!(
            self.kind,
            LayerKind::Vector {
                feature_count: 0,
                ..
            }
        )
    }

    pub fn geometry(&self) -> Option<GeometryClass> {
        match self.kind {
            LayerKind::Vector { geometry, .. } => Some(geometry),
            _ => None,
        }
    }

    /// A copy of this layer under a freshly generated id.
    pub fn duplicate(&self) -> Layer {
        Layer {
            id: LayerId::generate(&self.name),
            repaint_requests: 0,
            ..self.clone()
        }
    }

    pub fn trigger_repaint(&mut self) {
        self.repaint_requests += 1;
    }

    /// Number of repaints requested since the layer was loaded.
    pub fn repaint_requests(&self) -> u32 {
        self.repaint_requests
    }
}
