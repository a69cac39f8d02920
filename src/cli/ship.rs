use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use time::{macros::format_description, Date};

use crate::{
    shipping::{prepare_shipping, today},
    summary::{Action, MessageSink, Report},
};

use super::{load_project, load_settings, GlobalOptions, SelectionArgs, TerminalSink};

/// Builds a dated shipping package from the selected layers.
#[derive(Debug, Parser)]
pub struct ShipCommand {
    /// Path to the project file.
    pub project: PathBuf,

    #[clap(flatten)]
    pub selection: SelectionArgs,

    /// Date stamped into the package names, as YYYY-MM-DD. Defaults to today.
    #[clap(long)]
    pub date: Option<String>,
}

impl ShipCommand {
    pub fn run(self, global: GlobalOptions) -> anyhow::Result<()> {
        let project = load_project(&self.project)?;
        let settings = load_settings(&project)?;

        let date = match &self.date {
            Some(date) => parse_date(date)?,
            None => today(),
        };

        let selected = self
            .selection
            .to_selection()
            .excluding_empty_named()
            .resolve(&project)?;
        let report = prepare_shipping(&project, &selected, &settings, date)
            .context("Could not prepare the shipping package")?;

        match &report.project_path {
            Some(path) => eprintln!("Wrote {}", path.display()),
            None => eprintln!("No shipping project written"),
        }

        let mut outcome = Report::from_transfer(Action::Ship, &report.transfer);
        if let Some(reload) = &report.reload {
            outcome.not_found = reload.not_found.clone();
        }

        TerminalSink::new(global.color.into())
            .push(&outcome.summarize(), settings.message_duration());

        Ok(())
    }
}

fn parse_date(source: &str) -> anyhow::Result<Date> {
    let format = format_description!("[year]-[month]-[day]");
    match Date::parse(source, format) {
        Ok(date) => Ok(date),
        Err(err) => bail!("Invalid date '{source}', expected YYYY-MM-DD: {err}"),
    }
}
