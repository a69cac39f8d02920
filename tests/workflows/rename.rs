use gpkg_store::{Container, GeoPackage};
use liblayertools::{
    project::{LayerId, PropertyStore},
    rename::{HISTORY_KEY, HISTORY_SCOPE},
};
use pretty_assertions::assert_eq;

use crate::fixture::{top_level_names, ProjectFixture};

fn name_of(fixture: &ProjectFixture, id: &str) -> String {
    fixture
        .load()
        .layer(&LayerId::new(id))
        .map(|layer| layer.name().to_owned())
        .unwrap_or_default()
}

#[test]
fn dry_run_leaves_the_project_alone() {
    let fixture = ProjectFixture::new();
    let before = fs_err::read_to_string(&fixture.project_path).unwrap();

    let (stdout, _) = fixture.run_ok(&["rename", "--all", "--dry-run"]);

    insta::assert_snapshot!(stdout.trim_end(), @r"
    main roads -> Roads - l
    road areas -> Roads - pg
    trees -> Trees
    ");
    assert_eq!(fs_err::read_to_string(&fixture.project_path).unwrap(), before);
}

#[test]
fn rename_then_undo() {
    let fixture = ProjectFixture::new();

    let (_, stderr) = fixture.run_ok(&["rename", "--all"]);
    assert!(stderr.contains("Renamed 3 layers. Skipped 1 layer."));

    assert_eq!(name_of(&fixture, "main_roads"), "Roads - l");
    assert_eq!(name_of(&fixture, "road_areas"), "Roads - pg");
    assert_eq!(name_of(&fixture, "trees"), "Trees");
    assert_eq!(name_of(&fixture, "osm"), "OSM");
    assert!(fixture
        .load()
        .read_entry(HISTORY_SCOPE, HISTORY_KEY)
        .is_some());

    let (_, stderr) = fixture.run_ok(&["undo-rename"]);
    assert!(stderr.contains("Restored 3 layers."));

    assert_eq!(name_of(&fixture, "main_roads"), "main roads");
    assert_eq!(name_of(&fixture, "road_areas"), "road areas");
    assert_eq!(name_of(&fixture, "trees"), "trees");
    assert!(fixture
        .load()
        .read_entry(HISTORY_SCOPE, HISTORY_KEY)
        .is_none());

    let (_, stderr) = fixture.run_ok(&["undo-rename"]);
    assert!(stderr.contains("Nothing to undo."));
}

#[test]
fn renaming_a_single_group() {
    let fixture = ProjectFixture::new();

    fixture.run_ok(&["rename", "--group", "Trees"]);

    assert_eq!(name_of(&fixture, "trees"), "Trees");
    assert_eq!(name_of(&fixture, "main_roads"), "main roads");
}

#[test]
fn second_run_changes_nothing() {
    let fixture = ProjectFixture::new();
    fixture.run_ok(&["rename", "--all"]);

    let (stdout, _) = fixture.run_ok(&["rename", "--all", "--dry-run"]);
    assert_eq!(stdout, "");

    let (_, stderr) = fixture.run_ok(&["rename", "--all"]);
    assert!(stderr.contains("Skipped 1 layer."));
    assert!(!stderr.contains("Renamed"));
}

#[test]
fn unknown_group_fails() {
    let fixture = ProjectFixture::new();

    let output = fixture.run(&["rename", "--group", "Buildings"]);
    assert!(!output.status.success());
    assert_eq!(name_of(&fixture, "trees"), "trees");
}

#[test]
fn empty_selection_fails() {
    let fixture = ProjectFixture::new();

    let output = fixture.run(&["rename"]);
    assert!(!output.status.success());
}

#[test]
fn rename_and_move_stores_the_new_names() {
    let fixture = ProjectFixture::new();

    let (_, stderr) = fixture.run_ok(&["rename", "--group", "Roads", "--move"]);
    assert!(stderr.contains("Renamed 2 layers."));
    assert!(stderr.contains("Moved 2 layers."));

    let gpkg = GeoPackage::open(fixture.path().join("city.gpkg")).unwrap();
    assert_eq!(gpkg.slot_names().unwrap(), vec!["Roads - l", "Roads - pg"]);

    let project = fixture.load();
    assert_eq!(project.layers().count(), 6);
    assert_eq!(
        top_level_names(&project),
        vec!["Roads - pg", "Roads - l", "[Roads]", "[Trees]", "OSM"]
    );
    assert_eq!(name_of(&fixture, "main_roads"), "Roads - l");
}
