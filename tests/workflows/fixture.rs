use std::{
    path::{Path, PathBuf},
    process::{Command, Output},
};

use gpkg_store::{GeoPackage, GeometryClass};
use liblayertools::project::{Layer, LayerId, LayerKind, Project};
use tempfile::TempDir;

pub const LAYERTOOLS_PATH: &str = env!("CARGO_BIN_EXE_layertools");

/// A saved project in a temporary directory, with its source data in
/// `data/source.gpkg`.
pub struct ProjectFixture {
    pub dir: TempDir,
    pub project_path: PathBuf,
}

impl ProjectFixture {
    /// Legend:
    ///
    /// ```text
    /// Roads (group)
    ///   main roads   line, from source.gpkg
    ///   road areas   polygon, from source.gpkg
    /// Trees (group)
    ///   trees        point, from source.gpkg
    /// OSM            web tiles
    /// ```
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("couldn't create temporary directory");
        let data_dir = dir.path().join("data");
        fs_err::create_dir_all(&data_dir).unwrap();

        let source = data_dir.join("source.gpkg");
        drop(GeoPackage::create(&source).unwrap());
        seed_table(&source, "main_roads", "LINESTRING", 3);
        seed_table(&source, "road_areas", "POLYGON", 2);
        seed_table(&source, "trees", "POINT", 5);

        let mut project = Project::new();
        project.crs = Some("EPSG:25832".to_owned());
        let root = project.tree().root();

        let roads = project.tree_mut().add_group(root, "Roads");
        project.add_layer_to_group(
            styled(vector(&source, "main_roads", "main roads", GeometryClass::Line, 3)),
            roads,
        );
        project.add_layer_to_group(
            vector(&source, "road_areas", "road areas", GeometryClass::Polygon, 2),
            roads,
        );

        let trees = project.tree_mut().add_group(root, "Trees");
        project.add_layer_to_group(
            styled(vector(&source, "trees", "trees", GeometryClass::Point, 5)),
            trees,
        );

        project.add_layer(Layer::new(
            LayerId::new("osm"),
            "OSM",
            "type=xyz&url=https://tile.openstreetmap.org/{z}/{x}/{y}.png",
            "wms",
            LayerKind::Raster,
        ));

        let project_path = dir.path().join("city.ltproj");
        project.save_as(&project_path).unwrap();

        ProjectFixture { dir, project_path }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn load(&self) -> Project {
        Project::load(&self.project_path).unwrap()
    }

    pub fn run(&self, args: &[&str]) -> Output {
        let output = Command::new(LAYERTOOLS_PATH)
            .args(args)
            .arg(&self.project_path)
            .args(["--color", "never"])
            .env("RUST_LOG", "error")
            .env("LAYERTOOLS_NO_FILE_LOG", "1")
            .current_dir(self.path())
            .output()
            .expect("couldn't start layertools");

        print!("{}", String::from_utf8_lossy(&output.stdout));
        eprint!("{}", String::from_utf8_lossy(&output.stderr));

        output
    }

    /// Runs a command that must succeed and returns its stdout and stderr.
    pub fn run_ok(&self, args: &[&str]) -> (String, String) {
        let output = self.run(args);
        assert!(output.status.success(), "layertools did not exit successfully");
        (
            String::from_utf8_lossy(&output.stdout).into_owned(),
            String::from_utf8_lossy(&output.stderr).into_owned(),
        )
    }
}

fn vector(
    source: &Path,
    table: &str,
    name: &str,
    geometry: GeometryClass,
    feature_count: u64,
) -> Layer {
    Layer::new(
        LayerId::new(table),
        name,
        format!("{}|layername={}", source.display(), table),
        "ogr",
        LayerKind::Vector {
            geometry,
            feature_count,
        },
    )
}

fn styled(mut layer: Layer) -> Layer {
    let style = format!("<renderer for=\"{}\"/>", layer.id);
    layer.styles.add_style("default", &style);
    layer.styles.set_current("default");
    layer
}

fn seed_table(path: &Path, table: &str, geometry_type: &str, rows: usize) {
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.execute_batch(&format!(
        r#"
        CREATE TABLE "{table}" (
            fid INTEGER PRIMARY KEY AUTOINCREMENT,
            geom {geometry_type},
            name TEXT
        );
        INSERT INTO gpkg_contents (table_name, data_type, identifier, srs_id)
            VALUES ('{table}', 'features', '{table}', 4326);
        INSERT INTO gpkg_geometry_columns
            VALUES ('{table}', 'geom', '{geometry_type}', 4326, 0, 0);
        "#
    ))
    .unwrap();

    for i in 0..rows {
        conn.execute(
            &format!(r#"INSERT INTO "{table}" (name) VALUES (?1)"#),
            [format!("{table} {i}")],
        )
        .unwrap();
    }
}

/// Names of the legend entries directly below the root, top first.
pub fn top_level_names(project: &Project) -> Vec<String> {
    let tree = project.tree();
    tree.children(tree.root())
        .iter()
        .filter_map(|&node| match tree.get(node) {
            Some(liblayertools::project::TreeNode::Layer(id)) => {
                project.layer(id).map(|layer| layer.name().to_owned())
            }
            Some(liblayertools::project::TreeNode::Group(name)) => Some(format!("[{name}]")),
            _ => None,
        })
        .collect()
}
