//! Moving layer data into the GeoPackage that belongs to a project.
//!
//! Every saved project `city.ltproj` has a paired container `city.gpkg` next
//! to it. Layers are written into it in a first phase and re-added to a
//! project from it in a second phase, see `transfer`.

mod reconcile;
mod transfer;

use std::path::PathBuf;

use gpkg_store::{GeoPackage, GPKG_EXTENSION};

use crate::{error::LayerToolsError, project::Project};

pub use self::reconcile::{resolve_slot, SlotDecision};
pub use self::transfer::{
    add_from_container, add_to_container, copy_style, is_autocad_import, move_to_container,
    MoveOutcome, ReloadOutcome, TransferFailure, TransferResult, COPIED_STYLE_NAME,
};

/// Path of the container paired with a project. Does not touch the disk.
pub fn project_container_path(project: &Project) -> Result<PathBuf, LayerToolsError> {
    let file_name = project.require_file_name()?;
    Ok(file_name.with_extension(GPKG_EXTENSION))
}

/// Opens the project's paired container, creating it if needed.
pub fn project_container(project: &Project) -> Result<GeoPackage, LayerToolsError> {
    let path = project_container_path(project)?;
    open_or_create(path)
}

pub(crate) fn open_or_create(path: PathBuf) -> Result<GeoPackage, LayerToolsError> {
    if path.exists() {
        return GeoPackage::open(&path)
            .map_err(|source| LayerToolsError::ContainerOpen { path, source });
    }

    log::info!("Creating GeoPackage {}", path.display());
    GeoPackage::create(&path).map_err(|source| LayerToolsError::ContainerCreate { path, source })
}
