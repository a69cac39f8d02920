//! Shipping packages: a dated GeoPackage plus a trimmed project document
//! holding only the selected layers, ready to hand to a client.
//!
//! For a project `work/city.ltproj` shipped on 2024-05-17 this produces
//! `work/Versand/city_2024_05_17.gpkg` and
//! `work/Versand/city_2024_05_17.ltproj`.

use std::path::{Path, PathBuf};

use time::Date;

use crate::{
    error::LayerToolsError,
    package::{add_from_container, add_to_container, open_or_create, ReloadOutcome, TransferResult},
    project::{Layer, LayerId, Project, PROJECT_EXTENSION},
    settings::Settings,
};

#[derive(Debug)]
pub struct ShippingReport {
    pub container_path: PathBuf,

    /// `None` when no layer could be written and no project was created.
    pub project_path: Option<PathBuf>,
    pub transfer: TransferResult,
    pub reload: Option<ReloadOutcome>,
}

/// `<project stem>_<YYYY_MM_DD>`.
pub fn shipping_base_name(project_file: &Path, date: Date) -> String {
    let stem = project_file
        .file_stem()
        .map(|stem| stem.to_string_lossy())
        .unwrap_or_default();

    format!(
        "{}_{:04}_{:02}_{:02}",
        stem,
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Today in local time, or in UTC if the local offset cannot be determined.
pub fn today() -> Date {
    time::OffsetDateTime::now_local()
        .unwrap_or_else(|_| time::OffsetDateTime::now_utc())
        .date()
}

/// Builds a shipping package for the selected layers.
///
/// The GeoPackage is written first. If not a single layer made it in, no
/// project document is created.
pub fn prepare_shipping(
    project: &Project,
    selected: &[LayerId],
    settings: &Settings,
    date: Date,
) -> Result<ShippingReport, LayerToolsError> {
    let project_file = project.require_file_name()?;
    let project_dir = project
        .project_dir()
        .ok_or(LayerToolsError::ProjectNotSaved)?;

    let shipping_dir = project_dir.join(&settings.shipping_dir);
    fs_err::create_dir_all(&shipping_dir).map_err(|source| LayerToolsError::ProjectWrite {
        path: shipping_dir.clone(),
        source,
    })?;

    let base_name = shipping_base_name(project_file, date);
    let container_path = shipping_dir.join(format!("{base_name}.gpkg"));
    let mut container = open_or_create(container_path.clone())?;

    let layers: Vec<Layer> = selected
        .iter()
        .filter_map(|id| project.layer(id).cloned())
        .collect();

    let transfer = add_to_container(&layers, &mut container, project.transform_context.as_deref());

    if transfer.successes.is_empty() {
        log::warn!("No layer could be written, not creating a shipping project");
        return Ok(ShippingReport {
            container_path,
            project_path: None,
            transfer,
            reload: None,
        });
    }

    let project_path = shipping_dir.join(format!("{base_name}.{PROJECT_EXTENSION}"));
    let mut shipped = Project::new();
    copy_project_properties(project, &mut shipped);

    // Layers are inserted at the top one after another, so going through
    // them backwards keeps the original order.
    let reversed: Vec<Layer> = layers.into_iter().rev().collect();
    let reload = add_from_container(&reversed, &container, &transfer.name_mapping, &mut shipped);

    shipped.save_as(&project_path)?;
    log::info!("Wrote shipping project {}", project_path.display());

    Ok(ShippingReport {
        container_path,
        project_path: Some(project_path),
        transfer,
        reload: Some(reload),
    })
}

fn copy_project_properties(source: &Project, target: &mut Project) {
    target.crs = source.crs.clone();
    target.title = source.title.clone();
    target.transform_context = source.transform_context.clone();
    target.view_extent = source.view_extent;
    target.map_themes = source.map_themes.clone();
    target.layouts = source.layouts.clone();
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Month;

    #[test]
    fn base_name_is_dated() {
        let date = Date::from_calendar_date(2024, Month::May, 7).unwrap();
        assert_eq!(
            shipping_base_name(Path::new("/work/city.ltproj"), date),
            "city_2024_05_07"
        );
    }

    #[test]
    fn unsaved_project_cannot_ship() {
        let date = Date::from_calendar_date(2024, Month::May, 7).unwrap();
        assert!(matches!(
            prepare_shipping(&Project::new(), &[], &Settings::default(), date),
            Err(LayerToolsError::ProjectNotSaved)
        ));
    }

    #[test]
    fn nothing_written_means_no_project() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = Project::new();
        project.set_file_name(dir.path().join("city.ltproj"));
        let id = project.add_layer(Layer::new(
            "x".into(),
            "Mesh",
            "/d/mesh.obj",
            "mesh",
            crate::project::LayerKind::Other,
        ));

        let date = Date::from_calendar_date(2024, Month::May, 7).unwrap();
        let report = prepare_shipping(&project, &[id], &Settings::default(), date).unwrap();

        assert_eq!(report.transfer.failures.len(), 1);
        assert_eq!(report.project_path, None);
        assert!(report.reload.is_none());
        assert_eq!(
            report.container_path,
            dir.path().join("Versand").join("city_2024_05_07.gpkg")
        );
        assert!(!dir.path().join("Versand").join("city_2024_05_07.ltproj").exists());
    }
}
