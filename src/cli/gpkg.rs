use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use crate::{
    package::{add_from_container, add_to_container, move_to_container, project_container},
    project::{Layer, Project},
    summary::{Action, MessageSink, Report},
};

use super::{load_project, load_settings, GlobalOptions, SelectionArgs, TerminalSink};

fn selected_layers(project: &Project, selection: &SelectionArgs) -> anyhow::Result<Vec<Layer>> {
    let ids = selection
        .to_selection()
        .excluding_empty_named()
        .resolve(project)?;

    Ok(ids
        .iter()
        .filter_map(|id| project.layer(id).cloned())
        .collect())
}

/// Writes the selected layers into the project's GeoPackage without
/// changing the project.
#[derive(Debug, Parser)]
pub struct AddToGpkgCommand {
    /// Path to the project file.
    pub project: PathBuf,

    #[clap(flatten)]
    pub selection: SelectionArgs,
}

impl AddToGpkgCommand {
    pub fn run(self, global: GlobalOptions) -> anyhow::Result<()> {
        let project = load_project(&self.project)?;
        let settings = load_settings(&project)?;

        let layers = selected_layers(&project, &self.selection)?;
        let mut container = project_container(&project)?;
        let result = add_to_container(&layers, &mut container, project.transform_context.as_deref());

        let summary = Report::from_transfer(Action::AddToContainer, &result).summarize();
        TerminalSink::new(global.color.into()).push(&summary, settings.message_duration());

        Ok(())
    }
}

/// Adds the project GeoPackage's copies of the selected layers to the
/// project, styled like the originals.
#[derive(Debug, Parser)]
pub struct AddFromGpkgCommand {
    /// Path to the project file.
    pub project: PathBuf,

    #[clap(flatten)]
    pub selection: SelectionArgs,
}

impl AddFromGpkgCommand {
    pub fn run(self, global: GlobalOptions) -> anyhow::Result<()> {
        let mut project = load_project(&self.project)?;
        let settings = load_settings(&project)?;

        let layers = selected_layers(&project, &self.selection)?;
        let container = project_container(&project)?;
        let outcome = add_from_container(&layers, &container, &Default::default(), &mut project);

        if !outcome.added.is_empty() {
            project.save().context("Could not save the added layers")?;
        }

        let summary = Report::from_reload(&outcome).summarize();
        TerminalSink::new(global.color.into()).push(&summary, settings.message_duration());

        Ok(())
    }
}

/// Writes the selected layers into the project's GeoPackage and adds the
/// written copies to the project.
#[derive(Debug, Parser)]
pub struct MoveToGpkgCommand {
    /// Path to the project file.
    pub project: PathBuf,

    #[clap(flatten)]
    pub selection: SelectionArgs,
}

impl MoveToGpkgCommand {
    pub fn run(self, global: GlobalOptions) -> anyhow::Result<()> {
        let mut project = load_project(&self.project)?;
        let settings = load_settings(&project)?;

        let ids: Vec<_> = selected_layers(&project, &self.selection)?
            .into_iter()
            .map(|layer| layer.id)
            .collect();
        let mut container = project_container(&project)?;
        let outcome = move_to_container(&mut project, &ids, &mut container);

        if !outcome.reload.added.is_empty() {
            project.save().context("Could not save the moved layers")?;
        }

        let summary = Report::from_move(&outcome).summarize();
        TerminalSink::new(global.color.into()).push(&summary, settings.message_duration());

        Ok(())
    }
}
