use gpkg_store::GeometryClass;
use liblayertools::project::{Layer, LayerId, LayerKind};
use pretty_assertions::assert_eq;
use serde_json::Value;

use crate::fixture::ProjectFixture;

fn locations(stdout: &str) -> Vec<(String, String)> {
    let value: Value = serde_json::from_str(stdout).unwrap();
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| {
            (
                entry["name"].as_str().unwrap().to_owned(),
                entry["locationId"].as_str().unwrap().to_owned(),
            )
        })
        .collect()
}

#[test]
fn classifies_every_layer_by_default() {
    let fixture = ProjectFixture::new();

    let mut project = fixture.load();
    project.add_layer(Layer::new(
        LayerId::new("parcels"),
        "parcels",
        "/somewhere/else/parcels.shp",
        "ogr",
        LayerKind::Vector {
            geometry: GeometryClass::Polygon,
            feature_count: 10,
        },
    ));
    project.add_layer(Layer::new(
        LayerId::new("sketch"),
        "sketch",
        "memory?geometry=Point",
        "memory",
        LayerKind::Vector {
            geometry: GeometryClass::Point,
            feature_count: 2,
        },
    ));
    project.add_layer(Layer::new(
        LayerId::new("nothing"),
        "nothing",
        fixture.path().join("data/source.gpkg|layername=none").display().to_string(),
        "ogr",
        LayerKind::Vector {
            geometry: GeometryClass::Line,
            feature_count: 0,
        },
    ));
    project.add_layer(Layer::new(
        LayerId::new("notes"),
        "notes",
        "data/notes.csv",
        "delimitedtext",
        LayerKind::Other,
    ));
    project.save().unwrap();

    let (stdout, _) = fixture.run_ok(&["locate", "--json"]);

    let expected = [
        ("main roads", "gpkg_folder"),
        ("road areas", "gpkg_folder"),
        ("trees", "gpkg_folder"),
        ("OSM", "cloud"),
        ("parcels", "external"),
        ("sketch", "unknown"),
        ("nothing", "empty"),
        ("notes", "folder_no_gpkg"),
    ];
    assert_eq!(
        locations(&stdout),
        expected
            .iter()
            .map(|(name, id)| (name.to_string(), id.to_string()))
            .collect::<Vec<_>>()
    );
}

#[test]
fn moved_layers_are_in_the_project_gpkg() {
    let fixture = ProjectFixture::new();
    fixture.run_ok(&["move-to-gpkg", "--layer", "trees"]);

    let (stdout, _) = fixture.run_ok(&["locate", "--json"]);
    let found = locations(&stdout);

    assert_eq!(found[0], ("trees".to_owned(), "gpkg_project".to_owned()));
    assert!(found.contains(&("trees".to_owned(), "gpkg_folder".to_owned())));
}

#[test]
fn text_output() {
    let fixture = ProjectFixture::new();

    let (stdout, _) = fixture.run_ok(&["locate", "--layer", "OSM", "--layer", "trees"]);
    insta::assert_snapshot!(stdout.trim_end(), @r"
    cloud            OSM
    gpkg_folder      trees
    ");
}
