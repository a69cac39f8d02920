use gpkg_store::Container;

use crate::{
    naming::{strip_geometry_suffix, with_geometry_suffix},
    project::Layer,
};

/// Which slot a layer is written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotDecision {
    /// The slot named like the layer; an existing slot there is overwritten.
    Reuse(String),

    /// A slot of that name holds another geometry, so the name got a
    /// geometry suffix instead.
    Disambiguated(String),
}

impl SlotDecision {
    pub fn name(&self) -> &str {
        match self {
            SlotDecision::Reuse(name) | SlotDecision::Disambiguated(name) => name,
        }
    }

    pub fn into_name(self) -> String {
        match self {
            SlotDecision::Reuse(name) | SlotDecision::Disambiguated(name) => name,
        }
    }
}

/// Picks the slot name for `layer` so that a vector layer never replaces a
/// slot of a different geometry class.
pub fn resolve_slot<C: Container + ?Sized>(container: &C, layer: &Layer) -> SlotDecision {
    let name = layer.name();

    let Some(geometry) = layer.geometry() else {
        return SlotDecision::Reuse(name.to_owned());
    };

    let existing = match container.slot(name) {
        Ok(existing) => existing,
        Err(err) => {
            log::debug!("Could not look up slot '{}': {}", name, err);
            None
        }
    };

    match existing.and_then(|slot| slot.kind.geometry()) {
        Some(existing_geometry) if existing_geometry != geometry => {
            let base = strip_geometry_suffix(name);
            let disambiguated = with_geometry_suffix(base, geometry);
            log::debug!(
                "Slot '{}' holds {} features, writing '{}' instead",
                name,
                existing_geometry.display_label(),
                disambiguated
            );
            SlotDecision::Disambiguated(disambiguated)
        }
        _ => SlotDecision::Reuse(name.to_owned()),
    }
}
