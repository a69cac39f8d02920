use gpkg_store::{Container, GeoPackage, GeometryClass, SlotKind};
use liblayertools::{
    package::COPIED_STYLE_NAME,
    project::{LayerId, LayerStore},
};
use pretty_assertions::assert_eq;

use crate::fixture::{top_level_names, ProjectFixture};

fn project_gpkg(fixture: &ProjectFixture) -> GeoPackage {
    GeoPackage::open(fixture.path().join("city.gpkg")).unwrap()
}

#[test]
fn add_to_gpkg_keeps_the_project() {
    let fixture = ProjectFixture::new();
    let before = fs_err::read_to_string(&fixture.project_path).unwrap();

    let (_, stderr) = fixture.run_ok(&["add-to-gpkg", "--layer", "trees"]);
    assert!(stderr.contains("Copied 1 layer."));

    let gpkg = project_gpkg(&fixture);
    assert_eq!(gpkg.slot_names().unwrap(), vec!["trees"]);
    assert_eq!(
        gpkg.slot("trees").unwrap().unwrap().kind,
        SlotKind::Features {
            geometry: GeometryClass::Point,
            feature_count: 5,
        }
    );
    assert_eq!(fs_err::read_to_string(&fixture.project_path).unwrap(), before);
}

#[test]
fn different_geometry_gets_its_own_slot() {
    let fixture = ProjectFixture::new();
    fixture.run_ok(&["add-to-gpkg", "--layer", "trees"]);

    let mut project = fixture.load();
    project
        .set_layer_name(&LayerId::new("road_areas"), "trees")
        .unwrap();
    project.save().unwrap();

    fixture.run_ok(&["add-to-gpkg", "--layer", "road_areas"]);

    let gpkg = project_gpkg(&fixture);
    assert_eq!(gpkg.slot_names().unwrap(), vec!["trees", "trees - pg"]);
    assert_eq!(
        gpkg.slot("trees").unwrap().unwrap().kind.geometry(),
        Some(GeometryClass::Point)
    );
}

#[test]
fn add_from_gpkg_reports_missing_slots() {
    let fixture = ProjectFixture::new();
    fixture.run_ok(&["add-to-gpkg", "--layer", "trees"]);

    let (_, stderr) = fixture.run_ok(&["add-from-gpkg", "-l", "trees", "-l", "road areas"]);
    assert!(stderr.contains("Added 1 layer. Could not find 1 layer."));

    let project = fixture.load();
    assert_eq!(project.layers().count(), 5);
    assert_eq!(top_level_names(&project)[0], "trees");
}

#[test]
fn move_adds_styled_copies_on_top() {
    let fixture = ProjectFixture::new();

    let (_, stderr) = fixture.run_ok(&["move-to-gpkg", "--group", "Roads"]);
    assert!(stderr.contains("Moved 2 layers."));

    let project = fixture.load();
    assert_eq!(project.layers().count(), 6);
    assert_eq!(
        top_level_names(&project),
        vec!["road areas", "main roads", "[Roads]", "[Trees]", "OSM"]
    );

    let container = fixture.path().join("city.gpkg");
    let copy = project
        .layers()
        .find(|layer| layer.name() == "main roads" && layer.id != LayerId::new("main_roads"))
        .unwrap();
    assert_eq!(
        copy.source,
        format!("{}|layername=main roads", container.display())
    );
    assert_eq!(copy.styles.current_name(), COPIED_STYLE_NAME);
    assert_eq!(
        copy.styles.current_style(),
        Some("<renderer for=\"main_roads\"/>")
    );

    assert_eq!(
        project_gpkg(&fixture).slot_names().unwrap(),
        vec!["main roads", "road areas"]
    );
}

#[test]
fn web_layers_are_not_written() {
    let fixture = ProjectFixture::new();

    let (_, stderr) = fixture.run_ok(&["add-to-gpkg", "--layer", "OSM"]);
    assert!(stderr.contains("Copied 1 layer."));
    assert!(project_gpkg(&fixture).slot_names().unwrap().is_empty());
}

#[test]
fn writing_the_same_layer_again_overwrites_its_slot() {
    let fixture = ProjectFixture::new();
    fixture.run_ok(&["add-to-gpkg", "--layer", "trees"]);

    let (_, stderr) = fixture.run_ok(&["add-to-gpkg", "--layer", "trees"]);
    assert!(stderr.contains("Copied 1 layer."));
    assert!(!stderr.contains("Could not"));

    let gpkg = project_gpkg(&fixture);
    assert_eq!(gpkg.slot_names().unwrap(), vec!["trees"]);
    assert_eq!(
        gpkg.slot("trees").unwrap().unwrap().kind,
        SlotKind::Features {
            geometry: GeometryClass::Point,
            feature_count: 5,
        }
    );
}
