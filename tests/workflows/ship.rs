use gpkg_store::{Container, GeoPackage};
use liblayertools::project::Project;
use pretty_assertions::assert_eq;

use crate::fixture::{top_level_names, ProjectFixture};

#[test]
fn ships_a_dated_package() {
    let fixture = ProjectFixture::new();
    let before = fs_err::read_to_string(&fixture.project_path).unwrap();

    let (_, stderr) = fixture.run_ok(&["ship", "--all", "--date", "2024-05-17"]);
    assert!(stderr.contains("Shipped 4 layers."));

    let shipping_dir = fixture.path().join("Versand");
    let gpkg = GeoPackage::open(shipping_dir.join("city_2024_05_17.gpkg")).unwrap();
    assert_eq!(
        gpkg.slot_names().unwrap(),
        vec!["main roads", "road areas", "trees"]
    );

    let shipped = Project::load(&shipping_dir.join("city_2024_05_17.ltproj")).unwrap();
    assert_eq!(shipped.crs.as_deref(), Some("EPSG:25832"));
    assert_eq!(
        top_level_names(&shipped),
        vec!["main roads", "road areas", "trees", "OSM"]
    );
    for layer in shipped.layers().filter(|layer| layer.name() != "OSM") {
        assert!(layer.source.contains("city_2024_05_17.gpkg|layername="));
    }

    assert_eq!(fs_err::read_to_string(&fixture.project_path).unwrap(), before);
}

#[test]
fn shipping_directory_from_settings() {
    let fixture = ProjectFixture::new();
    fs_err::write(
        fixture.path().join("layertools.toml"),
        "shipping_dir = \"Delivery\"\n",
    )
    .unwrap();

    fixture.run_ok(&["ship", "--group", "Trees", "--date", "2024-01-02"]);

    let delivery = fixture.path().join("Delivery");
    assert!(delivery.join("city_2024_01_02.gpkg").is_file());
    let shipped = Project::load(&delivery.join("city_2024_01_02.ltproj")).unwrap();
    assert_eq!(top_level_names(&shipped), vec!["trees"]);
    assert!(!fixture.path().join("Versand").exists());
}

#[test]
fn invalid_date_is_rejected() {
    let fixture = ProjectFixture::new();

    let output = fixture.run(&["ship", "--all", "--date", "17.05.2024"]);
    assert!(!output.status.success());
    assert!(!fixture.path().join("Versand").exists());
}

#[test]
fn shipping_twice_on_one_day_replaces_the_package() {
    let fixture = ProjectFixture::new();
    fixture.run_ok(&["ship", "--group", "Roads", "--date", "2024-05-17"]);

    let (_, stderr) = fixture.run_ok(&["ship", "--group", "Roads", "--date", "2024-05-17"]);
    assert!(stderr.contains("Shipped 2 layers."));
    assert!(!stderr.contains("Could not"));

    let gpkg = GeoPackage::open(
        fixture
            .path()
            .join("Versand")
            .join("city_2024_05_17.gpkg"),
    )
    .unwrap();
    assert_eq!(gpkg.slot_names().unwrap(), vec!["main roads", "road areas"]);
}
