use crate::project::{LayerStore, PropertyStore};

use super::{
    history::{RenameHistory, RenameRecord},
    RenamePlan,
};

/// Undo failure for a layer that has been removed since the rename.
pub const LAYER_NOT_FOUND: &str = "original layer not found";

/// Undo failure for a layer whose name changed again after the rename.
pub const RENAMED_SINCE: &str = "layer was renamed again since";

/// A rename the project refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameFailure {
    pub old_name: String,
    pub new_name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameOutcome {
    pub successes: Vec<RenameRecord>,
    pub failures: Vec<RenameFailure>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UndoOutcome {
    pub successes: usize,

    /// `old_name` is the name the undo tried to replace, `new_name` the name
    /// it tried to restore.
    pub failures: Vec<RenameFailure>,

    /// There was no stored history to undo.
    pub nothing_to_undo: bool,
}

/// Applies every entry of a plan. A refused rename is recorded and the next
/// entry is tried. If at least one rename went through, the batch replaces
/// the stored rename history.
pub fn execute_plan<S>(plan: &RenamePlan, store: &mut S) -> RenameOutcome
where
    S: LayerStore + PropertyStore,
{
    let mut outcome = RenameOutcome::default();

    for entry in &plan.entries {
        match store.set_layer_name(&entry.layer_id, &entry.new_name) {
            Ok(()) => {
                log::info!("Renamed '{}' to '{}'", entry.old_name, entry.new_name);
                outcome.successes.push(RenameRecord {
                    layer_id: entry.layer_id.clone(),
                    old_name: entry.old_name.clone(),
                    new_name: entry.new_name.clone(),
                });
            }
            Err(err) => {
                log::warn!(
                    "Could not rename '{}' to '{}': {}",
                    entry.old_name,
                    entry.new_name,
                    err
                );
                outcome.failures.push(RenameFailure {
                    old_name: entry.old_name.clone(),
                    new_name: entry.new_name.clone(),
                    error: err.to_string(),
                });
            }
        }
    }

    if !outcome.successes.is_empty() {
        RenameHistory::store(store, &outcome.successes);
    }

    outcome
}

/// Reverts the most recent rename batch.
///
/// Layers that were removed or renamed again in the meantime are left alone
/// and reported as failures. The history is cleared once at least one name
/// was restored; if nothing could be restored it is kept for another try.
pub fn undo_last_rename<S>(store: &mut S) -> UndoOutcome
where
    S: LayerStore + PropertyStore,
{
    let records = RenameHistory::load(store);

    if records.is_empty() {
        return UndoOutcome {
            nothing_to_undo: true,
            ..Default::default()
        };
    }

    let mut outcome = UndoOutcome::default();

    for record in &records {
        let failure = |error: &str| RenameFailure {
            old_name: record.new_name.clone(),
            new_name: record.old_name.clone(),
            error: error.to_owned(),
        };

        let current_name = match store.layer(&record.layer_id) {
            Some(layer) => layer.name().to_owned(),
            None => {
                log::warn!("Cannot undo rename of '{}': {}", record.new_name, LAYER_NOT_FOUND);
                outcome.failures.push(failure(LAYER_NOT_FOUND));
                continue;
            }
        };

        if current_name != record.new_name {
            log::warn!(
                "Cannot undo rename of '{}': {} (now '{}')",
                record.new_name,
                RENAMED_SINCE,
                current_name
            );
            outcome.failures.push(failure(RENAMED_SINCE));
            continue;
        }

        match store.set_layer_name(&record.layer_id, &record.old_name) {
            Ok(()) => {
                log::info!("Restored '{}' to '{}'", record.new_name, record.old_name);
                outcome.successes += 1;
            }
            Err(err) => {
                log::warn!("Could not restore '{}': {}", record.old_name, err);
                outcome.failures.push(failure(&err.to_string()));
            }
        }
    }

    if outcome.successes > 0 {
        RenameHistory::clear(store);
    }

    outcome
}
