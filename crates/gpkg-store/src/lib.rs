/*!
Named-slot containers for map layer data.

A container is a single file holding many named tables ("slots"), the way a
GeoPackage holds feature and tile tables. This crate describes what a caller
needs to know about a container (does a slot exist, what geometry does it
hold, how many features) and how layer content gets written into it.

## Backends
* `GeoPackage`, a SQLite-backed GeoPackage using `rusqlite`
* `InMemoryContainer`, a simple in-memory container useful for testing
*/

mod in_memory;
mod source;
mod sqlite_backend;

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use in_memory::InMemoryContainer;
pub use source::SourceDescriptor;
pub use sqlite_backend::GeoPackage;

/// File extension of GeoPackage containers, without the leading dot.
pub const GPKG_EXTENSION: &str = "gpkg";

/// Coarse geometry class of a vector layer or feature slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryClass {
    Point,
    Line,
    Polygon,
    Unknown,
    /// Attribute-only tables.
    Null,
}

impl GeometryClass {
    /// Human readable label used when no short code exists.
    pub fn display_label(self) -> &'static str {
        match self {
            GeometryClass::Point => "Point",
            GeometryClass::Line => "Line",
            GeometryClass::Polygon => "Polygon",
            GeometryClass::Unknown => "Unknown geometry",
            GeometryClass::Null => "No geometry",
        }
    }

    /// Maps a GeoPackage `geometry_type_name` to its class.
    ///
    /// Multi and curve variants fold into their simple class; the generic
    /// `GEOMETRY` type and anything unrecognized is `Unknown`.
    pub fn from_geometry_type_name(name: &str) -> GeometryClass {
        match name.to_ascii_uppercase().as_str() {
            "POINT" | "MULTIPOINT" => GeometryClass::Point,
            "LINESTRING" | "MULTILINESTRING" | "CIRCULARSTRING" | "COMPOUNDCURVE" | "CURVE"
            | "MULTICURVE" => GeometryClass::Line,
            "POLYGON" | "MULTIPOLYGON" | "CURVEPOLYGON" | "SURFACE" | "MULTISURFACE" => {
                GeometryClass::Polygon
            }
            _ => GeometryClass::Unknown,
        }
    }
}

/// What a slot holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlotKind {
    Features {
        geometry: GeometryClass,
        feature_count: u64,
    },
    Tiles,
}

impl SlotKind {
    pub fn geometry(&self) -> Option<GeometryClass> {
        match self {
            SlotKind::Features { geometry, .. } => Some(*geometry),
            SlotKind::Tiles => None,
        }
    }
}

/// Description of one existing slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotInfo {
    pub name: String,
    pub kind: SlotKind,
}

/// How `write_slot` treats a slot that already exists under the target name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExistingSlotAction {
    /// Drop the existing slot and write a fresh one. Other slots are kept.
    #[default]
    CreateOrOverwriteLayer,
    /// Refuse to touch an existing slot.
    FailIfExists,
}

/// One layer's worth of content to be written into a container.
#[derive(Debug, Clone)]
pub struct WriteRequest<'a> {
    /// Name of the slot to create.
    pub slot_name: &'a str,
    /// Source descriptor of the layer being written.
    pub source: &'a str,
    /// What the caller believes the layer holds.
    pub content: SlotKind,
    pub action: ExistingSlotAction,
    /// Opaque coordinate transform context, passed through untouched.
    pub transform_context: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteErrorCode {
    SourceUnreadable,
    UnsupportedSource,
    SlotExists,
    CreateFailed,
    WriteFailed,
}

/// Per-slot writer failure. Writers return this instead of a whole-container
/// error so that callers can keep going with the next layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct WriteError {
    pub code: WriteErrorCode,
    pub message: String,
}

impl WriteError {
    pub fn new(code: WriteErrorCode, message: impl Into<String>) -> Self {
        WriteError {
            code,
            message: message.into(),
        }
    }
}

/// Failures affecting a whole container rather than a single write.
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not open container {path}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("{path} is not a GeoPackage")]
    NotAGeoPackage { path: String },

    #[error("slot '{0}' does not exist")]
    MissingSlot(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A file holding named slots of layer data.
pub trait Container {
    /// Location of the container on disk.
    fn path(&self) -> &Path;

    /// Looks up a slot by name. A missing slot is `Ok(None)`, never an error.
    fn slot(&self, name: &str) -> Result<Option<SlotInfo>, Error>;

    /// Names of all slots, sorted.
    fn slot_names(&self) -> Result<Vec<String>, Error>;

    /// Writes layer content into the slot named by the request.
    fn write_slot(&mut self, request: &WriteRequest<'_>) -> Result<SlotInfo, WriteError>;

    /// Deletes every attribute column of a feature slot, keeping the primary
    /// key and geometry. Returns how many columns were removed.
    fn clear_attributes(&mut self, name: &str) -> Result<usize, Error>;
}

/// Builds the descriptor addressing a vector slot, `<path>|layername=<slot>`.
pub fn vector_uri(container: &Path, slot: &str) -> String {
    format!("{}|layername={}", container.display(), slot)
}

/// Builds the descriptor addressing a raster slot, `GPKG:<path>:<slot>`.
pub fn raster_uri(container: &Path, slot: &str) -> String {
    format!("GPKG:{}:{}", container.display(), slot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn geometry_type_names() {
        assert_eq!(
            GeometryClass::from_geometry_type_name("MultiPolygon"),
            GeometryClass::Polygon
        );
        assert_eq!(
            GeometryClass::from_geometry_type_name("POINT"),
            GeometryClass::Point
        );
        assert_eq!(
            GeometryClass::from_geometry_type_name("MULTILINESTRING"),
            GeometryClass::Line
        );
        assert_eq!(
            GeometryClass::from_geometry_type_name("GEOMETRY"),
            GeometryClass::Unknown
        );
    }

    #[test]
    fn uris() {
        let path = PathBuf::from("/data/project.gpkg");
        assert_eq!(
            vector_uri(&path, "Roads"),
            "/data/project.gpkg|layername=Roads"
        );
        assert_eq!(raster_uri(&path, "Ortho"), "GPKG:/data/project.gpkg:Ortho");
    }
}
