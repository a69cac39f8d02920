use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use crate::{
    package::{move_to_container, project_container},
    rename::{execute_plan, plan_renames, undo_last_rename},
    summary::{nothing_to_undo, MessageSink, Report},
};

use super::{load_project, load_settings, GlobalOptions, SelectionArgs, TerminalSink};

/// Renames the selected layers after the group they are in, with a geometry
/// suffix where names would collide.
#[derive(Debug, Parser)]
pub struct RenameCommand {
    /// Path to the project file.
    pub project: PathBuf,

    #[clap(flatten)]
    pub selection: SelectionArgs,

    /// Only print the planned renames.
    #[clap(long)]
    pub dry_run: bool,

    /// After renaming, move the selected layers into the project's
    /// GeoPackage under their new names.
    #[clap(long("move"))]
    pub move_to_gpkg: bool,
}

impl RenameCommand {
    pub fn run(self, global: GlobalOptions) -> anyhow::Result<()> {
        let mut project = load_project(&self.project)?;
        let settings = load_settings(&project)?;

        let selected = self.selection.to_selection().resolve(&project)?;
        let plan = plan_renames(&selected, &project);

        if self.dry_run {
            for entry in &plan.entries {
                println!("{} -> {}", entry.old_name, entry.new_name);
            }
            eprintln!(
                "Would rename {} layers. Aborting before saving due to `--dry-run`",
                plan.entries.len()
            );
            return Ok(());
        }

        let outcome = execute_plan(&plan, &mut project);
        let mut summaries = vec![Report::from_rename(&plan, &outcome).summarize()];
        let mut changed = !outcome.successes.is_empty();

        if self.move_to_gpkg {
            let ids = self
                .selection
                .to_selection()
                .excluding_empty_named()
                .resolve(&project)?;
            let mut container = project_container(&project)?;
            let moved = move_to_container(&mut project, &ids, &mut container);

            changed |= !moved.reload.added.is_empty();
            summaries.push(Report::from_move(&moved).summarize());
        }

        if changed {
            project.save().context("Could not save the renamed layers")?;
        }

        let mut sink = TerminalSink::new(global.color.into());
        for summary in &summaries {
            sink.push(summary, settings.message_duration());
        }

        Ok(())
    }
}

/// Restores the names changed by the last rename.
#[derive(Debug, Parser)]
pub struct UndoRenameCommand {
    /// Path to the project file.
    pub project: PathBuf,
}

impl UndoRenameCommand {
    pub fn run(self, global: GlobalOptions) -> anyhow::Result<()> {
        let mut project = load_project(&self.project)?;
        let settings = load_settings(&project)?;

        let outcome = undo_last_rename(&mut project);
        let summary = if outcome.nothing_to_undo {
            nothing_to_undo()
        } else {
            if outcome.successes > 0 {
                project.save().context("Could not save the restored names")?;
            }
            Report::from_undo(&outcome).summarize()
        };

        TerminalSink::new(global.color.into()).push(&summary, settings.message_duration());

        Ok(())
    }
}
