use serde::{Deserialize, Serialize};

use crate::project::{LayerId, PropertyStore};

/// Property scope holding the rename history.
pub const HISTORY_SCOPE: &str = "layertools";

/// Property key holding the rename history.
pub const HISTORY_KEY: &str = "rename_history";

/// One applied rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameRecord {
    pub layer_id: LayerId,
    pub old_name: String,
    pub new_name: String,
}

/// The renames of the most recent successful batch. Only one generation is
/// kept; every new batch replaces the previous one.
pub struct RenameHistory;

impl RenameHistory {
    /// Reads the stored history. A missing or unreadable entry counts as no
    /// history.
    pub fn load(store: &impl PropertyStore) -> Vec<RenameRecord> {
        let Some(raw) = store.read_entry(HISTORY_SCOPE, HISTORY_KEY) else {
            return Vec::new();
        };

        match serde_json::from_str(raw) {
            Ok(records) => records,
            Err(err) => {
                log::warn!("Ignoring unreadable rename history: {}", err);
                Vec::new()
            }
        }
    }

    pub fn store(store: &mut impl PropertyStore, records: &[RenameRecord]) {
        match serde_json::to_string(records) {
            Ok(raw) => store.write_entry(HISTORY_SCOPE, HISTORY_KEY, raw),
            Err(err) => log::warn!("Could not record rename history: {}", err),
        }
    }

    pub fn clear(store: &mut impl PropertyStore) {
        store.remove_entry(HISTORY_SCOPE, HISTORY_KEY);
    }
}
