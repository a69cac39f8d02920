//! Renaming layers after the group they sit in.
//!
//! Planning and executing are separate steps. `plan_renames` only reads the
//! project and decides on new names; `execute_plan` applies them one by one
//! and remembers what it did so that `undo_last_rename` can put the old names
//! back.
//!
//! Naming rules:
//! - A vector layer without features is called `empty layer`, wherever it is.
//! - Any other layer inside a group takes the cleaned-up group name.
//! - Layers at the top level of the tree are left alone.
//! - When several layers would get the same name, vector layers get a
//!   geometry suffix (`Roads - l`, `Roads - pg`). Two layers with the same
//!   geometry still end up with the same name.

mod executor;
mod history;

use indexmap::IndexMap;

use crate::{
    naming::{sanitize, with_geometry_suffix, EMPTY_LAYER_NAME},
    project::{Layer, LayerId, Project, TreeNode},
};

pub use self::executor::{
    execute_plan, undo_last_rename, RenameFailure, RenameOutcome, UndoOutcome,
    LAYER_NOT_FOUND, RENAMED_SINCE,
};
pub use self::history::{RenameHistory, RenameRecord, HISTORY_KEY, HISTORY_SCOPE};

/// One rename the executor should perform. `old_name` and `new_name` always
/// differ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamePlanEntry {
    pub layer_id: LayerId,
    pub old_name: String,
    pub new_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenamePlan {
    pub entries: Vec<RenamePlanEntry>,

    /// Names of layers that are not inside any group.
    pub skipped: Vec<String>,

    /// Selected layers that are missing from the registry or the tree.
    pub not_found: Vec<String>,
}

impl RenamePlan {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decides new names for the selected layers.
pub fn plan_renames(selected: &[LayerId], project: &Project) -> RenamePlan {
    let mut plan = RenamePlan::default();
    let mut collision_groups: IndexMap<String, Vec<&Layer>> = IndexMap::new();

    for id in selected {
        let Some(layer) = project.layer(id) else {
            log::debug!("Layer {} is not registered in the project", id);
            plan.not_found.push(id.to_string());
            continue;
        };

        let base = if layer.is_empty_vector() {
            EMPTY_LAYER_NAME.to_owned()
        } else {
            match group_base_name(layer, project) {
                GroupLookup::Group(base) => base,
                GroupLookup::TopLevel => {
                    plan.skipped.push(layer.name().to_owned());
                    continue;
                }
                GroupLookup::NotInTree => {
                    plan.not_found.push(layer.name().to_owned());
                    continue;
                }
            }
        };

        collision_groups.entry(base).or_default().push(layer);
    }

    for (base, layers) in collision_groups {
        let needs_suffix = layers.len() > 1 && base != EMPTY_LAYER_NAME;

        for layer in layers {
            let new_name = match layer.geometry() {
                Some(geometry) if needs_suffix => with_geometry_suffix(&base, geometry),
                _ => base.clone(),
            };

            if new_name != layer.name() {
                plan.entries.push(RenamePlanEntry {
                    layer_id: layer.id.clone(),
                    old_name: layer.name().to_owned(),
                    new_name,
                });
            }
        }
    }

    log::debug!(
        "Planned {} renames ({} skipped, {} not found)",
        plan.entries.len(),
        plan.skipped.len(),
        plan.not_found.len()
    );

    plan
}

enum GroupLookup {
    Group(String),
    TopLevel,
    NotInTree,
}

fn group_base_name(layer: &Layer, project: &Project) -> GroupLookup {
    let tree = project.tree();

    let Some(node) = tree.find_layer(&layer.id) else {
        return GroupLookup::NotInTree;
    };

    match tree.parent(node).and_then(|parent| tree.get(parent)) {
        Some(TreeNode::Group(name)) => GroupLookup::Group(sanitize(name)),
        _ => GroupLookup::TopLevel,
    }
}
