//! The two phases of getting layers into a container and back into a
//! project.
//!
//! The write phase copies each layer's data into a slot and reports which
//! slot every layer ended up in. The reload phase adds one new layer per slot
//! to a target project, styled like the layer it came from. Moving runs both
//! phases against the same project; shipping runs them against a fresh one.
//!
//! One layer failing never stops the others.

use gpkg_store::{
    raster_uri, vector_uri, Container, ExistingSlotAction, SlotKind, WriteRequest,
};
use indexmap::IndexMap;

use crate::project::{Layer, LayerId, LayerKind, Project};

use super::reconcile::resolve_slot;

/// Style name under which a reloaded layer receives its original's style.
pub const COPIED_STYLE_NAME: &str = "layertools copy";

const VECTOR_PROVIDER: &str = "ogr";
const RASTER_PROVIDER: &str = "gdal";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferFailure {
    pub layer_name: String,
    pub message: String,
}

/// Outcome of the write phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferResult {
    /// Names of the layers that were written or needed no write.
    pub successes: Vec<String>,
    pub failures: Vec<TransferFailure>,

    /// Slot each successfully handled layer lives in.
    pub name_mapping: IndexMap<LayerId, String>,
}

/// Outcome of the reload phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReloadOutcome {
    /// Names of the layers added to the target project.
    pub added: Vec<String>,

    /// Slots that did not exist in the container.
    pub not_found: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveOutcome {
    pub transfer: TransferResult,
    pub reload: ReloadOutcome,
}

/// Layers exported from DWG files carry a pile of CAD attributes nobody
/// wants in the container. They are recognized by the subset filter the
/// importer puts on them.
pub fn is_autocad_import(source: &str) -> bool {
    source.contains("subset=") && source.contains("space") && source.contains("block")
}

/// Write phase: copies every layer into `container`.
///
/// Web layers are not written but still count as handled, keeping their
/// name.
pub fn add_to_container<C: Container + ?Sized>(
    layers: &[Layer],
    container: &mut C,
    transform_context: Option<&str>,
) -> TransferResult {
    let mut result = TransferResult::default();

    for layer in layers {
        if layer.is_remote() {
            log::debug!("'{}' is a web layer, nothing to write", layer.name());
            result.successes.push(layer.name().to_owned());
            result
                .name_mapping
                .insert(layer.id.clone(), layer.name().to_owned());
            continue;
        }

        let content = match layer.kind {
            LayerKind::Vector {
                geometry,
                feature_count,
            } => SlotKind::Features {
                geometry,
                feature_count,
            },
            LayerKind::Raster => SlotKind::Tiles,
            LayerKind::Other => {
                log::warn!("'{}' cannot be stored in a GeoPackage", layer.name());
                result.failures.push(TransferFailure {
                    layer_name: layer.name().to_owned(),
                    message: "layer type cannot be stored in a GeoPackage".to_owned(),
                });
                continue;
            }
        };

        let slot_name = resolve_slot(container, layer).into_name();
        let request = WriteRequest {
            slot_name: &slot_name,
            source: &layer.source,
            content,
            action: ExistingSlotAction::CreateOrOverwriteLayer,
            transform_context,
        };

        match container.write_slot(&request) {
            Ok(_) => {
                log::info!("Wrote '{}' to slot '{}'", layer.name(), slot_name);

                if layer.is_vector() && is_autocad_import(&layer.source) {
                    match container.clear_attributes(&slot_name) {
                        Ok(removed) => {
                            log::debug!("Removed {} CAD attributes from '{}'", removed, slot_name)
                        }
                        Err(err) => {
                            log::warn!("Could not clear attributes of '{}': {}", slot_name, err)
                        }
                    }
                }

                result.successes.push(layer.name().to_owned());
                result.name_mapping.insert(layer.id.clone(), slot_name);
            }
            Err(err) => {
                log::warn!("Could not write '{}': {}", layer.name(), err);
                result.failures.push(TransferFailure {
                    layer_name: layer.name().to_owned(),
                    message: err.message,
                });
            }
        }
    }

    result
}

/// Reload phase: adds one layer per slot to `target`.
///
/// `name_mapping` comes from the write phase; layers missing from it are
/// looked up under their current name. New layers are registered without a
/// legend entry and then placed at the top of the legend.
pub fn add_from_container<C: Container + ?Sized>(
    layers: &[Layer],
    container: &C,
    name_mapping: &IndexMap<LayerId, String>,
    target: &mut Project,
) -> ReloadOutcome {
    let mut outcome = ReloadOutcome::default();

    for original in layers {
        if original.is_remote() {
            if target.has_layer_with(&original.source, original.name()) {
                log::debug!("'{}' is already in the project", original.name());
                continue;
            }

            let id = target.register_layer(original.duplicate());
            target.insert_layer_at_top(&id);
            outcome.added.push(original.name().to_owned());
            continue;
        }

        let slot_name = name_mapping
            .get(&original.id)
            .cloned()
            .unwrap_or_else(|| original.name().to_owned());

        let slot = match container.slot(&slot_name) {
            Ok(slot) => slot,
            Err(err) => {
                log::warn!("Could not look up slot '{}': {}", slot_name, err);
                None
            }
        };

        let path = container.path();
        let addressed = slot.and_then(|slot| match (original.kind, slot.kind) {
            (
                LayerKind::Vector { .. },
                SlotKind::Features {
                    geometry,
                    feature_count,
                },
            ) => Some((
                vector_uri(path, &slot_name),
                VECTOR_PROVIDER,
                LayerKind::Vector {
                    geometry,
                    feature_count,
                },
            )),
            (LayerKind::Raster, SlotKind::Tiles) => Some((
                raster_uri(path, &slot_name),
                RASTER_PROVIDER,
                LayerKind::Raster,
            )),
            _ => None,
        });

        let Some((source, provider, kind)) = addressed else {
            log::warn!("Could not find slot '{}' in {}", slot_name, path.display());
            outcome.not_found.push(slot_name);
            continue;
        };

        let mut layer = Layer::new(
            LayerId::generate(&slot_name),
            slot_name.as_str(),
            source,
            provider,
            kind,
        );
        copy_style(original, &mut layer);

        let id = target.register_layer(layer);
        target.insert_layer_at_top(&id);
        outcome.added.push(slot_name);
    }

    outcome
}

/// Gives `target` the current style of `source` and requests a repaint.
/// Does nothing if `source` has no current style.
pub fn copy_style(source: &Layer, target: &mut Layer) {
    let Some(definition) = source.styles.current_style() else {
        return;
    };

    target.styles.add_style(COPIED_STYLE_NAME, definition);
    target.styles.set_current(COPIED_STYLE_NAME);
    target.trigger_repaint();
}

/// Writes the layers into the container and adds the written slots back to
/// the same project. The original layers stay where they are.
pub fn move_to_container<C: Container + ?Sized>(
    project: &mut Project,
    selected: &[LayerId],
    container: &mut C,
) -> MoveOutcome {
    let layers: Vec<Layer> = selected
        .iter()
        .filter_map(|id| project.layer(id).cloned())
        .collect();

    let transform_context = project.transform_context.clone();
    let transfer = add_to_container(&layers, container, transform_context.as_deref());
    let reload = add_from_container(&layers, container, &transfer.name_mapping, project);

    MoveOutcome { transfer, reload }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpkg_store::{GeometryClass, InMemoryContainer};
    use pretty_assertions::assert_eq;

    fn vector(id: &str, name: &str, geometry: GeometryClass) -> Layer {
        let mut layer = Layer::new(
            id.into(),
            name,
            format!("/data/{id}.gpkg|layername={id}"),
            "ogr",
            LayerKind::Vector {
                geometry,
                feature_count: 7,
            },
        );
        layer.styles.add_style("default", &format!("<style of {name}/>"));
        layer.styles.set_current("default");
        layer
    }

    fn web() -> Layer {
        Layer::new(
            "osm".into(),
            "OSM",
            "type=xyz&url=https://tile.example/{z}/{x}/{y}.png",
            "wms",
            LayerKind::Raster,
        )
    }

    #[test]
    fn autocad_signature() {
        assert!(is_autocad_import(
            "/d/plan.dwg|layername=entities|subset=\"space\"=0 AND \"block\"=0"
        ));
        assert!(!is_autocad_import("/d/plan.dwg|layername=entities|subset=\"space\"=0"));
        assert!(!is_autocad_import("/d/roads.shp"));
    }

    #[test]
    fn write_phase_maps_slots() {
        let mut container = InMemoryContainer::new("/p.gpkg");
        container.insert_slot(
            "Roads",
            SlotKind::Features {
                geometry: GeometryClass::Line,
                feature_count: 1,
            },
        );

        let layers = [
            vector("a", "Roads", GeometryClass::Polygon),
            vector("b", "Trees", GeometryClass::Point),
            web(),
        ];
        let result = add_to_container(&layers, &mut container, None);

        assert_eq!(result.successes, vec!["Roads", "Trees", "OSM"]);
        assert!(result.failures.is_empty());
        assert_eq!(
            result.name_mapping.values().collect::<Vec<_>>(),
            vec!["Roads - pg", "Trees", "OSM"]
        );
        assert_eq!(container.write_count(), 2);
        assert_eq!(
            container.slot_names().unwrap(),
            vec!["Roads", "Roads - pg", "Trees"]
        );
    }

    #[test]
    fn write_failures_are_isolated() {
        let mut container = InMemoryContainer::new("/p.gpkg");
        container.reject_writes_to("Roads", "disk full");

        let layers = [
            vector("a", "Roads", GeometryClass::Line),
            Layer::new("x".into(), "Mesh", "/d/mesh.obj", "mesh", LayerKind::Other),
            vector("b", "Trees", GeometryClass::Point),
        ];
        let result = add_to_container(&layers, &mut container, None);

        assert_eq!(result.successes, vec!["Trees"]);
        assert_eq!(
            result.failures,
            vec![
                TransferFailure {
                    layer_name: "Roads".to_owned(),
                    message: "disk full".to_owned(),
                },
                TransferFailure {
                    layer_name: "Mesh".to_owned(),
                    message: "layer type cannot be stored in a GeoPackage".to_owned(),
                },
            ]
        );
        assert!(!result.name_mapping.contains_key(&LayerId::from("a")));
    }

    #[test]
    fn autocad_layers_lose_their_attributes() {
        let source = "/d/plan.gpkg|layername=entities|subset=\"space\"=0 AND \"block\"=0";
        let mut container = InMemoryContainer::new("/p.gpkg");
        container.register_source_fields(source, &["Layer", "SubClasses", "Linetype"]);
        container.register_source_fields("/d/keep.gpkg|layername=keep", &["Name"]);

        let mut cad = vector("cad", "Walls", GeometryClass::Line);
        cad.source = source.to_owned();
        let mut keep = vector("keep", "Keep", GeometryClass::Point);
        keep.source = "/d/keep.gpkg|layername=keep".to_owned();

        let result = add_to_container(&[cad, keep], &mut container, None);
        assert_eq!(result.successes.len(), 2);
        assert_eq!(container.fields("Walls").unwrap().len(), 0);
        assert_eq!(container.fields("Keep").unwrap(), ["Name".to_owned()]);
    }

    #[test]
    fn reload_adds_styled_layers_at_the_top() {
        let mut container = InMemoryContainer::new("/p.gpkg");
        let layers = [
            vector("a", "Roads", GeometryClass::Line),
            vector("b", "Trees", GeometryClass::Point),
        ];
        let result = add_to_container(&layers, &mut container, None);

        let mut target = Project::new();
        let outcome = add_from_container(&layers, &container, &result.name_mapping, &mut target);
        assert_eq!(outcome.added, vec!["Roads", "Trees"]);
        assert!(outcome.not_found.is_empty());

        let root = target.tree().root();
        let top = target.tree().children(root)[0];
        let top_id = match target.tree().get(top) {
            Some(crate::project::TreeNode::Layer(id)) => id.clone(),
            other => panic!("unexpected node {other:?}"),
        };
        let trees = target.layer(&top_id).unwrap();
        assert_eq!(trees.name(), "Trees");
        assert_eq!(trees.source, "/p.gpkg|layername=Trees");
        assert_eq!(trees.provider, "ogr");
        assert_eq!(trees.styles.current_name(), COPIED_STYLE_NAME);
        assert_eq!(trees.styles.current_style(), Some("<style of Trees/>"));
        assert_eq!(trees.repaint_requests(), 1);
    }

    #[test]
    fn reload_reports_missing_slots() {
        let mut container = InMemoryContainer::new("/p.gpkg");
        container.insert_slot("Ortho", SlotKind::Tiles);

        let raster = Layer::new("r".into(), "Ortho", "/d/o.tif", "gdal", LayerKind::Raster);
        let layers = [vector("a", "Gone", GeometryClass::Line), raster];

        let mut target = Project::new();
        let outcome = add_from_container(&layers, &container, &IndexMap::new(), &mut target);
        assert_eq!(outcome.added, vec!["Ortho"]);
        assert_eq!(outcome.not_found, vec!["Gone"]);

        let ortho = target.layer_by_name("Ortho").unwrap();
        assert_eq!(ortho.source, "GPKG:/p.gpkg:Ortho");
        assert_eq!(ortho.repaint_requests(), 0);
    }

    #[test]
    fn web_layers_are_cloned_once() {
        let container = InMemoryContainer::new("/p.gpkg");
        let mut target = Project::new();

        let first = add_from_container(&[web()], &container, &IndexMap::new(), &mut target);
        assert_eq!(first.added, vec!["OSM"]);
        let clone = target.layer_by_name("OSM").unwrap();
        assert_ne!(clone.id, LayerId::from("osm"));

        let second = add_from_container(&[web()], &container, &IndexMap::new(), &mut target);
        assert!(second.added.is_empty());
        assert_eq!(target.layers().count(), 1);
    }

    #[test]
    fn move_keeps_originals() {
        let mut project = Project::new();
        project.add_layer(vector("a", "Roads", GeometryClass::Line));
        let mut container = InMemoryContainer::new("/p.gpkg");

        let outcome = move_to_container(&mut project, &["a".into()], &mut container);
        assert_eq!(outcome.transfer.successes, vec!["Roads"]);
        assert_eq!(outcome.reload.added, vec!["Roads"]);
        assert_eq!(project.layers().count(), 2);
        assert!(project.layer(&"a".into()).is_some());
    }
}
