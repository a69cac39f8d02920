//! Condensing an operation's outcome into one user message.
//!
//! Each command ends with a single message: how many layers were handled,
//! skipped, failed or missing. Every individual skipped, failed and missing
//! layer is also written to the log so the details are never lost.

use std::time::Duration;

use crate::{
    package::{MoveOutcome, ReloadOutcome, TransferResult},
    rename::{RenameOutcome, RenamePlan, UndoOutcome},
};

pub const SUMMARY_TITLE: &str = "Summary";

const NOTHING_DONE: &str =
    "No layers processed or all selected layers already have the desired state.";

const NOTHING_TO_UNDO: &str = "Nothing to undo.";

/// Severity of a message, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Critical,
}

/// What an operation did, in the two grammatical forms messages need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Rename,
    UndoRename,
    AddToContainer,
    AddFromContainer,
    Move,
    Ship,
}

impl Action {
    /// Past tense, starting a sentence: "Renamed 2 layers."
    pub fn past(self) -> &'static str {
        match self {
            Action::Rename => "Renamed",
            Action::UndoRename => "Restored",
            Action::AddToContainer => "Copied",
            Action::AddFromContainer => "Added",
            Action::Move => "Moved",
            Action::Ship => "Shipped",
        }
    }

    /// Infinitive: "Could not rename 1 layer."
    pub fn verb(self) -> &'static str {
        match self {
            Action::Rename => "rename",
            Action::UndoRename => "restore",
            Action::AddToContainer => "copy",
            Action::AddFromContainer => "add",
            Action::Move => "move",
            Action::Ship => "ship",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub title: String,
    pub message: String,
    pub level: MessageLevel,
}

/// Where summaries are shown to the user.
pub trait MessageSink {
    fn push(&mut self, summary: &Summary, duration: Duration);
}

impl<S: MessageSink + ?Sized> MessageSink for &mut S {
    fn push(&mut self, summary: &Summary, duration: Duration) {
        (**self).push(summary, duration)
    }
}

/// Collected outcome of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub action: Action,
    pub successes: usize,
    pub skipped: Vec<String>,

    /// Layer name and error message.
    pub failures: Vec<(String, String)>,
    pub not_found: Vec<String>,
}

impl Report {
    pub fn new(action: Action) -> Self {
        Report {
            action,
            successes: 0,
            skipped: Vec::new(),
            failures: Vec::new(),
            not_found: Vec::new(),
        }
    }

    pub fn from_rename(plan: &RenamePlan, outcome: &RenameOutcome) -> Self {
        Report {
            action: Action::Rename,
            successes: outcome.successes.len(),
            skipped: plan.skipped.clone(),
            failures: outcome
                .failures
                .iter()
                .map(|failure| {
                    (
                        failure.old_name.clone(),
                        format!("'{}': {}", failure.new_name, failure.error),
                    )
                })
                .collect(),
            not_found: plan.not_found.clone(),
        }
    }

    pub fn from_undo(outcome: &UndoOutcome) -> Self {
        Report {
            action: Action::UndoRename,
            successes: outcome.successes,
            failures: outcome
                .failures
                .iter()
                .map(|failure| (failure.old_name.clone(), failure.error.clone()))
                .collect(),
            ..Report::new(Action::UndoRename)
        }
    }

    pub fn from_transfer(action: Action, result: &TransferResult) -> Self {
        Report {
            action,
            successes: result.successes.len(),
            failures: result
                .failures
                .iter()
                .map(|failure| (failure.layer_name.clone(), failure.message.clone()))
                .collect(),
            ..Report::new(action)
        }
    }

    pub fn from_reload(result: &ReloadOutcome) -> Self {
        Report {
            successes: result.added.len(),
            not_found: result.not_found.clone(),
            ..Report::new(Action::AddFromContainer)
        }
    }

    /// Moves are counted by what made it back into the project; write
    /// failures still show up as failures.
    pub fn from_move(outcome: &MoveOutcome) -> Self {
        Report {
            successes: outcome.reload.added.len(),
            not_found: outcome.reload.not_found.clone(),
            ..Report::from_transfer(Action::Move, &outcome.transfer)
        }
    }

    /// Builds the user message and logs every individual problem.
    pub fn summarize(&self) -> Summary {
        for name in &self.skipped {
            log::info!("Skipped layer '{}'", name);
        }
        for (name, error) in &self.failures {
            log::error!("Could not {} '{}': {}", self.action.verb(), name, error);
        }
        for name in &self.not_found {
            log::warn!("Could not find layer '{}'", name);
        }

        compose(
            self.action,
            self.successes,
            self.skipped.len(),
            self.failures.len(),
            self.not_found.len(),
        )
    }
}

/// Composes the summary message from counts alone.
pub fn compose(
    action: Action,
    successes: usize,
    skipped: usize,
    failures: usize,
    not_found: usize,
) -> Summary {
    let mut parts = Vec::new();
    let mut level = MessageLevel::Info;

    if successes > 0 {
        parts.push(format!("{} {}.", action.past(), layers(successes)));
        level = MessageLevel::Success;
    }
    if skipped > 0 {
        parts.push(format!("Skipped {}.", layers(skipped)));
        level = level.max(MessageLevel::Warning);
    }
    if failures > 0 {
        parts.push(format!("Could not {} {}.", action.verb(), layers(failures)));
        level = level.max(MessageLevel::Warning);
    }
    if not_found > 0 {
        parts.push(format!("Could not find {}.", layers(not_found)));
        level = MessageLevel::Critical;
    }

    let message = if parts.is_empty() {
        NOTHING_DONE.to_owned()
    } else {
        parts.join(" ")
    };

    Summary {
        title: SUMMARY_TITLE.to_owned(),
        message,
        level,
    }
}

/// Summary for an undo request without any stored history.
pub fn nothing_to_undo() -> Summary {
    Summary {
        title: SUMMARY_TITLE.to_owned(),
        message: NOTHING_TO_UNDO.to_owned(),
        level: MessageLevel::Info,
    }
}

fn layers(count: usize) -> String {
    if count == 1 {
        "1 layer".to_owned()
    } else {
        format!("{count} layers")
    }
}
