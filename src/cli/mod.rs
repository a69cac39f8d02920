//! Defines the layertools CLI through clap types.

mod gpkg;
mod locate;
mod message;
mod rename;
mod ship;

use std::{
    borrow::Cow,
    env,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Context;
use clap::Parser;
use thiserror::Error;

use crate::{project::Project, selection::Selection, settings::Settings};

pub use self::gpkg::{AddFromGpkgCommand, AddToGpkgCommand, MoveToGpkgCommand};
pub use self::locate::{location_tooltip, LocateCommand};
pub use self::message::TerminalSink;
pub use self::rename::{RenameCommand, UndoRenameCommand};
pub use self::ship::ShipCommand;

/// Command line options that layertools accepts, defined using the clap crate.
#[derive(Debug, Parser)]
#[clap(name = "layertools", version, about)]
pub struct Options {
    #[clap(flatten)]
    pub global: GlobalOptions,

    /// Subcommand to run in this invocation.
    #[clap(subcommand)]
    pub subcommand: Subcommand,
}

impl Options {
    pub fn run(self) -> anyhow::Result<()> {
        match self.subcommand {
            Subcommand::Rename(subcommand) => subcommand.run(self.global),
            Subcommand::UndoRename(subcommand) => subcommand.run(self.global),
            Subcommand::AddToGpkg(subcommand) => subcommand.run(self.global),
            Subcommand::AddFromGpkg(subcommand) => subcommand.run(self.global),
            Subcommand::MoveToGpkg(subcommand) => subcommand.run(self.global),
            Subcommand::Ship(subcommand) => subcommand.run(self.global),
            Subcommand::Locate(subcommand) => subcommand.run(self.global),
        }
    }
}

#[derive(Debug, Clone, Copy, Parser)]
pub struct GlobalOptions {
    /// Sets verbosity level. Can be specified multiple times.
    #[clap(long("verbose"), short, global(true), action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Set color behavior. Valid values are auto, always, and never.
    #[clap(long("color"), global(true), default_value("auto"))]
    pub color: ColorChoice,
}

#[derive(Debug, Clone, Copy)]
pub enum ColorChoice {
    Auto,
    Always,
    Never,
}

impl FromStr for ColorChoice {
    type Err = ColorChoiceParseError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        match source {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            _ => Err(ColorChoiceParseError {
                attempted: source.to_owned(),
            }),
        }
    }
}

impl From<ColorChoice> for termcolor::ColorChoice {
    fn from(value: ColorChoice) -> Self {
        match value {
            ColorChoice::Auto => termcolor::ColorChoice::Auto,
            ColorChoice::Always => termcolor::ColorChoice::Always,
            ColorChoice::Never => termcolor::ColorChoice::Never,
        }
    }
}

#[derive(Debug, Error)]
#[error("Invalid color choice '{attempted}'. Valid values are: auto, always, never")]
pub struct ColorChoiceParseError {
    attempted: String,
}

#[derive(Debug, Parser)]
pub enum Subcommand {
    Rename(RenameCommand),
    UndoRename(UndoRenameCommand),
    AddToGpkg(AddToGpkgCommand),
    AddFromGpkg(AddFromGpkgCommand),
    MoveToGpkg(MoveToGpkgCommand),
    Ship(ShipCommand),
    Locate(LocateCommand),
}

impl Subcommand {
    pub fn project_path(&self) -> &Path {
        match self {
            Subcommand::Rename(cmd) => &cmd.project,
            Subcommand::UndoRename(cmd) => &cmd.project,
            Subcommand::AddToGpkg(cmd) => &cmd.project,
            Subcommand::AddFromGpkg(cmd) => &cmd.project,
            Subcommand::MoveToGpkg(cmd) => &cmd.project,
            Subcommand::Ship(cmd) => &cmd.project,
            Subcommand::Locate(cmd) => &cmd.project,
        }
    }

    pub fn command_name(&self) -> &'static str {
        match self {
            Subcommand::Rename(_) => "rename",
            Subcommand::UndoRename(_) => "undo-rename",
            Subcommand::AddToGpkg(_) => "add-to-gpkg",
            Subcommand::AddFromGpkg(_) => "add-from-gpkg",
            Subcommand::MoveToGpkg(_) => "move-to-gpkg",
            Subcommand::Ship(_) => "ship",
            Subcommand::Locate(_) => "locate",
        }
    }
}

/// Which layers a command works on.
#[derive(Debug, Clone, Default, Parser)]
pub struct SelectionArgs {
    /// Layer to work on, by id or name. Can be specified multiple times.
    #[clap(long("layer"), short('l'))]
    pub layers: Vec<String>,

    /// Group whose layers to work on, including nested groups. Can be
    /// specified multiple times.
    #[clap(long("group"), short('g'))]
    pub groups: Vec<String>,

    /// Work on every layer in the legend.
    #[clap(long)]
    pub all: bool,
}

impl SelectionArgs {
    pub fn to_selection(&self) -> Selection {
        Selection {
            layers: self.layers.clone(),
            groups: self.groups.clone(),
            all: self.all,
            exclude_empty_named: false,
        }
    }
}

pub fn resolve_path(path: &Path) -> Cow<'_, Path> {
    if path.is_absolute() {
        Cow::Borrowed(path)
    } else {
        match env::current_dir() {
            Ok(dir) => Cow::Owned(dir.join(path)),
            Err(_) => Cow::Borrowed(path),
        }
    }
}

/// Resolves a project path (which may point to a file) to its parent directory.
pub fn resolve_project_dir(project_path: &Path) -> PathBuf {
    let resolved = resolve_path(project_path);
    let resolved = resolved.as_ref();

    if resolved.is_dir() {
        resolved.to_path_buf()
    } else {
        resolved
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| resolved.to_path_buf())
    }
}

fn load_project(path: &Path) -> anyhow::Result<Project> {
    let path = resolve_path(path);
    Project::load(&path).with_context(|| format!("Could not open project {}", path.display()))
}

fn load_settings(project: &Project) -> anyhow::Result<Settings> {
    match project.project_dir() {
        Some(dir) => Ok(Settings::load_from_dir(dir)?),
        None => Ok(Settings::default()),
    }
}
