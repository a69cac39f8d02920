pub mod cli;
pub mod error;
pub mod location;
pub mod logging;
pub mod naming;
pub mod package;
pub mod project;
pub mod rename;
pub mod selection;
pub mod settings;
pub mod shipping;
pub mod summary;

pub use error::{ErrorKind, LayerToolsError};
pub use location::{LayerLocation, LocationClassifier};
pub use project::{Layer, LayerId, LayerTree, Project};
pub use selection::Selection;
pub use settings::Settings;
