use indexmap::IndexSet;

use crate::{
    error::LayerToolsError,
    naming::EMPTY_LAYER_NAME,
    project::{LayerId, Project},
};

/// What the user picked in the legend: layers by id or name and groups by
/// name. Groups stand for every layer below them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub layers: Vec<String>,
    pub groups: Vec<String>,

    /// Select every layer shown in the legend.
    pub all: bool,

    /// Leave out layers that are called `empty layer`.
    pub exclude_empty_named: bool,
}

impl Selection {
    pub fn new(layers: Vec<String>, groups: Vec<String>) -> Self {
        Selection {
            layers,
            groups,
            ..Default::default()
        }
    }

    pub fn everything() -> Self {
        Selection {
            all: true,
            ..Default::default()
        }
    }

    pub fn excluding_empty_named(mut self) -> Self {
        self.exclude_empty_named = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        !self.all && self.layers.is_empty() && self.groups.is_empty()
    }

    /// Expands the selection to a de-duplicated list of layer ids. Explicit
    /// layers come first, then the contents of each group in tree order,
    /// then everything else in the legend when `all` is set.
    pub fn resolve(&self, project: &Project) -> Result<Vec<LayerId>, LayerToolsError> {
        if self.is_empty() {
            return Err(LayerToolsError::NothingSelected);
        }

        let mut resolved = IndexSet::new();

        for reference in &self.layers {
            let id = LayerId::new(reference.as_str());
            if project.layer(&id).is_some() {
                resolved.insert(id);
            } else if let Some(layer) = project.layer_by_name(reference) {
                resolved.insert(layer.id.clone());
            } else {
                return Err(LayerToolsError::UnknownLayer(reference.clone()));
            }
        }

        let tree = project.tree();
        for name in &self.groups {
            let group = tree
                .find_group(name)
                .ok_or_else(|| LayerToolsError::UnknownGroup(name.clone()))?;
            let layers = tree
                .layers_under(group)
                .ok_or(LayerToolsError::LayerTreeUnavailable(group.index()))?;
            resolved.extend(layers);
        }

        if self.all {
            let root = tree.root();
            resolved.extend(tree.layers_under(root).unwrap_or_default());
        }

        if self.exclude_empty_named {
            resolved.retain(|id| {
                project
                    .layer(id)
                    .is_none_or(|layer| layer.name() != EMPTY_LAYER_NAME)
            });
        }

        if resolved.is_empty() {
            return Err(LayerToolsError::NothingSelected);
        }

        log::debug!("Selection resolved to {} layers", resolved.len());

        Ok(resolved.into_iter().collect())
    }
}
