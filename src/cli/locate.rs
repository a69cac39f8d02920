use std::{io::Write, path::PathBuf};

use clap::Parser;
use serde::Serialize;
use termcolor::{BufferWriter, Color, ColorSpec, WriteColor};

use crate::{
    location::{LayerLocation, LocationClassifier},
    project::LayerId,
    selection::Selection,
};

use super::{load_project, GlobalOptions, SelectionArgs};

/// Heading and explanation shown for a location.
pub fn location_tooltip(location: LayerLocation) -> (&'static str, &'static str) {
    match location {
        LayerLocation::PairedContainer => (
            "Layer in Project-GeoPackage",
            "This layer is stored in the Project-GeoPackage (a GeoPackage with the same name as the project file).",
        ),
        LayerLocation::ContainerInFolder => (
            "Layer in GeoPackage in Project Folder",
            "This layer is stored in a GeoPackage in the project folder, but not in the Project-GeoPackage. Consider saving to the Project-GeoPackage.",
        ),
        LayerLocation::FolderNoContainer => (
            "Layer in Project Folder but not GeoPackage",
            "This layer is stored in the project folder, but not in a GeoPackage. Consider saving to the Project-GeoPackage.",
        ),
        LayerLocation::External => (
            "Caution",
            "This layer is stored outside the project folder. Please move to the project folder.",
        ),
        LayerLocation::Web => (
            "Cloud Layer",
            "This layer is from a cloud-based service or database.",
        ),
        LayerLocation::Empty => ("Empty Layer", "This Layer does not contain any objects."),
        LayerLocation::Unknown => (
            "Data Source Unknown",
            "The data source of this Layer could not be determined.",
        ),
    }
}

/// Shows where the data of each layer lives relative to the project.
#[derive(Debug, Parser)]
pub struct LocateCommand {
    /// Path to the project file.
    pub project: PathBuf,

    /// Layers to classify. Without any, every layer in the legend is shown.
    #[clap(flatten)]
    pub selection: SelectionArgs,

    /// Print the result as JSON.
    #[clap(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LocatedLayer<'a> {
    id: &'a LayerId,
    name: &'a str,
    #[serde(skip)]
    location: LayerLocation,
    location_id: &'static str,
    message_key: &'static str,
}

impl LocateCommand {
    pub fn run(self, global: GlobalOptions) -> anyhow::Result<()> {
        let project = load_project(&self.project)?;

        let mut selection = self.selection.to_selection();
        if selection.is_empty() {
            selection = Selection::everything();
        }
        let ids = selection.resolve(&project)?;

        let mut classifier = LocationClassifier::for_project(&project)?;
        let located: Vec<LocatedLayer> = ids
            .iter()
            .filter_map(|id| project.layer(id))
            .map(|layer| {
                let location = classifier.classify(layer);
                LocatedLayer {
                    id: &layer.id,
                    name: layer.name(),
                    location,
                    location_id: location.id(),
                    message_key: location.message_key(),
                }
            })
            .collect();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&located)?);
            return Ok(());
        }

        let writer = BufferWriter::stdout(global.color.into());
        let mut buffer = writer.buffer();
        for layer in &located {
            let (heading, text) = location_tooltip(layer.location);
            buffer.set_color(ColorSpec::new().set_fg(Some(location_color(layer.location))))?;
            write!(&mut buffer, "{:<16}", layer.location.id())?;
            buffer.reset()?;
            writeln!(&mut buffer, " {}", layer.name)?;
            log::debug!("{}: {}: {}", layer.name, heading, text);
        }
        writer.print(&buffer)?;

        Ok(())
    }
}

fn location_color(location: LayerLocation) -> Color {
    match location {
        LayerLocation::PairedContainer => Color::Green,
        LayerLocation::ContainerInFolder | LayerLocation::FolderNoContainer => Color::Yellow,
        LayerLocation::External => Color::Red,
        LayerLocation::Web => Color::Cyan,
        LayerLocation::Empty | LayerLocation::Unknown => Color::White,
    }
}
