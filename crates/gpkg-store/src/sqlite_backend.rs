use std::fmt::Display;
use std::path::{Path, PathBuf};

use fs_err as fs;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use crate::{
    Container, Error, ExistingSlotAction, GeometryClass, SlotInfo, SlotKind, SourceDescriptor,
    WriteError, WriteErrorCode, WriteRequest, GPKG_EXTENSION,
};

/// `PRAGMA application_id` of GeoPackage files ("GPKG").
const GPKG_APPLICATION_ID: i32 = 0x4750_4B47;

/// `PRAGMA user_version` for GeoPackage 1.3.
const GPKG_USER_VERSION: i32 = 10_300;

/// Alias under which foreign GeoPackages are attached while copying.
const SOURCE_SCHEMA: &str = "src";

/// Metadata tables that carry one row per slot, keyed by `table_name`.
/// Rows referencing `gpkg_contents` through foreign keys come first, so
/// deleting in this order never trips a constraint.
const PER_SLOT_TABLES: [&str; 6] = [
    "gpkg_geometry_columns",
    "gpkg_tile_matrix",
    "gpkg_tile_matrix_set",
    "gpkg_extensions",
    "gpkg_data_columns",
    "gpkg_contents",
];

const CORE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS gpkg_spatial_ref_sys (
    srs_name TEXT NOT NULL,
    srs_id INTEGER NOT NULL PRIMARY KEY,
    organization TEXT NOT NULL,
    organization_coordsys_id INTEGER NOT NULL,
    definition TEXT NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS gpkg_contents (
    table_name TEXT NOT NULL PRIMARY KEY,
    data_type TEXT NOT NULL,
    identifier TEXT UNIQUE,
    description TEXT DEFAULT '',
    last_change DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
    min_x DOUBLE,
    min_y DOUBLE,
    max_x DOUBLE,
    max_y DOUBLE,
    srs_id INTEGER,
    CONSTRAINT fk_gc_r_srs_id FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
);

CREATE TABLE IF NOT EXISTS gpkg_geometry_columns (
    table_name TEXT NOT NULL,
    column_name TEXT NOT NULL,
    geometry_type_name TEXT NOT NULL,
    srs_id INTEGER NOT NULL,
    z TINYINT NOT NULL,
    m TINYINT NOT NULL,
    CONSTRAINT pk_geom_cols PRIMARY KEY (table_name, column_name),
    CONSTRAINT fk_gc_tn FOREIGN KEY (table_name) REFERENCES gpkg_contents(table_name),
    CONSTRAINT fk_gc_srs FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys (srs_id)
);

CREATE TABLE IF NOT EXISTS gpkg_tile_matrix_set (
    table_name TEXT NOT NULL PRIMARY KEY,
    srs_id INTEGER NOT NULL,
    min_x DOUBLE NOT NULL,
    min_y DOUBLE NOT NULL,
    max_x DOUBLE NOT NULL,
    max_y DOUBLE NOT NULL,
    CONSTRAINT fk_gtms_table_name FOREIGN KEY (table_name) REFERENCES gpkg_contents(table_name),
    CONSTRAINT fk_gtms_srs FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys (srs_id)
);

CREATE TABLE IF NOT EXISTS gpkg_tile_matrix (
    table_name TEXT NOT NULL,
    zoom_level INTEGER NOT NULL,
    matrix_width INTEGER NOT NULL,
    matrix_height INTEGER NOT NULL,
    tile_width INTEGER NOT NULL,
    tile_height INTEGER NOT NULL,
    pixel_x_size DOUBLE NOT NULL,
    pixel_y_size DOUBLE NOT NULL,
    CONSTRAINT pk_ttm PRIMARY KEY (table_name, zoom_level),
    CONSTRAINT fk_tmm_table_name FOREIGN KEY (table_name) REFERENCES gpkg_contents(table_name)
);

INSERT OR IGNORE INTO gpkg_spatial_ref_sys VALUES
    ('Undefined cartesian SRS', -1, 'NONE', -1, 'undefined',
     'undefined cartesian coordinate reference system'),
    ('Undefined geographic SRS', 0, 'NONE', 0, 'undefined',
     'undefined geographic coordinate reference system'),
    ('WGS 84 geodetic', 4326, 'EPSG', 4326,
     'GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433],AUTHORITY["EPSG","4326"]]',
     'longitude/latitude coordinates in decimal degrees on the WGS 84 spheroid');
"#;

/// A GeoPackage file accessed through SQLite.
///
/// The connection is held for the lifetime of the value; drop it to release
/// the file.
pub struct GeoPackage {
    path: PathBuf,
    conn: Connection,
}

impl GeoPackage {
    /// Creates an empty GeoPackage at `path`, or opens it if it already exists.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        if path.exists() {
            return Self::open(path);
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path).map_err(|source| Error::Open {
            path: path.display().to_string(),
            source,
        })?;
        conn.pragma_update(None, "application_id", GPKG_APPLICATION_ID)?;
        conn.pragma_update(None, "user_version", GPKG_USER_VERSION)?;
        conn.execute_batch(CORE_SCHEMA)?;

        log::debug!("Created GeoPackage at {}", path.display());

        Ok(GeoPackage {
            path: path.to_path_buf(),
            conn,
        })
    }

    /// Opens an existing GeoPackage. Fails if the file is missing or is not
    /// a GeoPackage.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE).map_err(
            |source| Error::Open {
                path: path.display().to_string(),
                source,
            },
        )?;

        let application_id: Result<i32, _> =
            conn.pragma_query_value(None, "application_id", |row| row.get(0));
        let looks_like_gpkg = match application_id {
            Ok(GPKG_APPLICATION_ID) => true,
            Ok(_) => table_exists(&conn, "main", "gpkg_contents").unwrap_or(false),
            Err(_) => false,
        };

        if !looks_like_gpkg {
            return Err(Error::NotAGeoPackage {
                path: path.display().to_string(),
            });
        }

        Ok(GeoPackage {
            path: path.to_path_buf(),
            conn,
        })
    }

    fn is_same_file(&self, other: &Path) -> bool {
        match (fs::canonicalize(&self.path), fs::canonicalize(other)) {
            (Ok(a), Ok(b)) => a == b,
            _ => self.path == other,
        }
    }

    fn copy_slot(
        &mut self,
        schema: &str,
        source: &SourceDescriptor<'_>,
        request: &WriteRequest<'_>,
    ) -> Result<SlotInfo, WriteError> {
        let source_table = match source.layer_name() {
            Some(name) => name.to_owned(),
            None => single_table(&self.conn, schema)?,
        };

        if schema == "main" && source_table == request.slot_name {
            log::debug!(
                "'{}' already lives in {}, nothing to copy",
                source_table,
                self.path.display()
            );
            return self
                .slot(request.slot_name)
                .map_err(write_failed)?
                .ok_or_else(|| missing_source(&source_table, source.path()));
        }

        let data_type: Option<String> = self
            .conn
            .query_row(
                &format!("SELECT data_type FROM {schema}.gpkg_contents WHERE table_name = ?1"),
                [&source_table],
                |row| row.get(0),
            )
            .optional()
            .map_err(unreadable)?;
        let data_type = data_type.ok_or_else(|| missing_source(&source_table, source.path()))?;

        let existing = self.slot(request.slot_name).map_err(write_failed)?;
        if existing.is_some() && request.action == ExistingSlotAction::FailIfExists {
            return Err(WriteError::new(
                WriteErrorCode::SlotExists,
                format!("Layer '{}' already exists in the GeoPackage", request.slot_name),
            ));
        }

        let tx = self.conn.transaction().map_err(write_failed)?;
        tx.execute_batch(CORE_SCHEMA).map_err(write_failed)?;

        if existing.is_some() {
            drop_slot(&tx, request.slot_name).map_err(write_failed)?;
        }

        copy_spatial_ref_sys(&tx, schema, &source_table).map_err(write_failed)?;
        create_table_like(&tx, schema, &source_table, request.slot_name)
            .map_err(|err| WriteError::new(WriteErrorCode::CreateFailed, err.to_string()))?;

        tx.execute(
            &format!(
                "INSERT INTO main.{} SELECT * FROM {schema}.{}",
                quote_ident(request.slot_name),
                quote_ident(&source_table)
            ),
            [],
        )
        .map_err(write_failed)?;

        tx.execute(
            &format!(
                "INSERT INTO main.gpkg_contents \
                 (table_name, data_type, identifier, description, min_x, min_y, max_x, max_y, srs_id) \
                 SELECT ?2, data_type, ?2, description, min_x, min_y, max_x, max_y, srs_id \
                 FROM {schema}.gpkg_contents WHERE table_name = ?1"
            ),
            params![source_table, request.slot_name],
        )
        .map_err(write_failed)?;

        if table_exists(&tx, schema, "gpkg_geometry_columns").map_err(write_failed)? {
            tx.execute(
                &format!(
                    "INSERT INTO main.gpkg_geometry_columns \
                     (table_name, column_name, geometry_type_name, srs_id, z, m) \
                     SELECT ?2, column_name, geometry_type_name, srs_id, z, m \
                     FROM {schema}.gpkg_geometry_columns WHERE table_name = ?1"
                ),
                params![source_table, request.slot_name],
            )
            .map_err(write_failed)?;
        }

        if data_type == "tiles" {
            copy_tile_matrices(&tx, schema, &source_table, request.slot_name)
                .map_err(write_failed)?;
        }

        tx.commit().map_err(write_failed)?;

        self.slot(request.slot_name)
            .map_err(write_failed)?
            .ok_or_else(|| {
                WriteError::new(
                    WriteErrorCode::WriteFailed,
                    format!("Layer '{}' was not registered after writing", request.slot_name),
                )
            })
    }
}

impl Container for GeoPackage {
    fn path(&self) -> &Path {
        &self.path
    }

    fn slot(&self, name: &str) -> Result<Option<SlotInfo>, Error> {
        let row = self
            .conn
            .query_row(
                "SELECT c.data_type, g.geometry_type_name \
                 FROM gpkg_contents c \
                 LEFT JOIN gpkg_geometry_columns g ON g.table_name = c.table_name \
                 WHERE c.table_name = ?1",
                [name],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?)),
            )
            .optional()?;

        let Some((data_type, geometry_type)) = row else {
            return Ok(None);
        };

        let kind = match data_type.as_str() {
            "tiles" | "2d-gridded-coverage" => SlotKind::Tiles,
            _ => {
                let feature_count: i64 = self.conn.query_row(
                    &format!("SELECT COUNT(*) FROM main.{}", quote_ident(name)),
                    [],
                    |row| row.get(0),
                )?;
                SlotKind::Features {
                    geometry: geometry_type
                        .as_deref()
                        .map(GeometryClass::from_geometry_type_name)
                        .unwrap_or(GeometryClass::Null),
                    feature_count: feature_count.max(0) as u64,
                }
            }
        };

        Ok(Some(SlotInfo {
            name: name.to_owned(),
            kind,
        }))
    }

    fn slot_names(&self) -> Result<Vec<String>, Error> {
        let mut stmt = self
            .conn
            .prepare("SELECT table_name FROM gpkg_contents ORDER BY table_name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    fn write_slot(&mut self, request: &WriteRequest<'_>) -> Result<SlotInfo, WriteError> {
        if let Some(context) = request.transform_context {
            log::trace!("Transform context for '{}': {}", request.slot_name, context);
        }

        let source = SourceDescriptor::parse(request.source);
        let source_path = Path::new(source.path());

        let is_gpkg = source_path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(GPKG_EXTENSION));
        if !is_gpkg {
            return Err(WriteError::new(
                WriteErrorCode::UnsupportedSource,
                format!(
                    "Cannot read '{}': only GeoPackage sources can be copied",
                    source.path()
                ),
            ));
        }

        if !source_path.is_file() {
            return Err(WriteError::new(
                WriteErrorCode::SourceUnreadable,
                format!("Source file '{}' does not exist", source_path.display()),
            ));
        }

        if self.is_same_file(source_path) {
            return self.copy_slot("main", &source, request);
        }

        self.conn
            .execute(
                &format!("ATTACH DATABASE ?1 AS {SOURCE_SCHEMA}"),
                [source_path.to_string_lossy()],
            )
            .map_err(unreadable)?;

        let result = self.copy_slot(SOURCE_SCHEMA, &source, request);

        if let Err(err) = self
            .conn
            .execute(&format!("DETACH DATABASE {SOURCE_SCHEMA}"), [])
        {
            log::warn!("Could not detach {}: {}", source_path.display(), err);
        }

        result
    }

    fn clear_attributes(&mut self, name: &str) -> Result<usize, Error> {
        if self.slot(name)?.is_none() {
            return Err(Error::MissingSlot(name.to_owned()));
        }

        let geometry_column: Option<String> = self
            .conn
            .query_row(
                "SELECT column_name FROM gpkg_geometry_columns WHERE table_name = ?1",
                [name],
                |row| row.get(0),
            )
            .optional()?;

        let doomed: Vec<String> = table_columns(&self.conn, "main", name)?
            .into_iter()
            .filter(|column| column.pk == 0)
            .filter(|column| Some(&column.name) != geometry_column.as_ref())
            .map(|column| column.name)
            .collect();

        let tx = self.conn.transaction()?;
        for column in &doomed {
            tx.execute(
                &format!(
                    "ALTER TABLE main.{} DROP COLUMN {}",
                    quote_ident(name),
                    quote_ident(column)
                ),
                [],
            )?;
        }
        if table_exists(&tx, "main", "gpkg_data_columns")? {
            tx.execute(
                "DELETE FROM main.gpkg_data_columns WHERE table_name = ?1",
                [name],
            )?;
        }
        tx.commit()?;

        log::debug!("Removed {} attribute column(s) from '{}'", doomed.len(), name);
        Ok(doomed.len())
    }
}

struct Column {
    name: String,
    decl_type: String,
    not_null: bool,
    default: Option<String>,
    pk: i64,
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn write_failed(err: impl Display) -> WriteError {
    WriteError::new(WriteErrorCode::WriteFailed, err.to_string())
}

fn unreadable(err: impl Display) -> WriteError {
    WriteError::new(WriteErrorCode::SourceUnreadable, err.to_string())
}

fn missing_source(table: &str, path: &str) -> WriteError {
    WriteError::new(
        WriteErrorCode::SourceUnreadable,
        format!("Layer '{table}' was not found in '{path}'"),
    )
}

fn table_exists(conn: &Connection, schema: &str, table: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        &format!(
            "SELECT 1 FROM {schema}.sqlite_master WHERE type IN ('table', 'view') AND name = ?1"
        ),
        [table],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
}

fn table_columns(conn: &Connection, schema: &str, table: &str) -> rusqlite::Result<Vec<Column>> {
    let mut stmt = conn.prepare(&format!("PRAGMA {schema}.table_info({})", quote_ident(table)))?;
    let columns = stmt
        .query_map([], |row| {
            Ok(Column {
                name: row.get(1)?,
                decl_type: row.get(2)?,
                not_null: row.get::<_, i64>(3)? != 0,
                default: row.get(4)?,
                pk: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

/// Picks the only table of a source without an explicit `layername`.
fn single_table(conn: &Connection, schema: &str) -> Result<String, WriteError> {
    let mut stmt = conn
        .prepare(&format!("SELECT table_name FROM {schema}.gpkg_contents"))
        .map_err(unreadable)?;
    let tables = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
        .map_err(unreadable)?;

    match tables.as_slice() {
        [only] => Ok(only.clone()),
        _ => Err(WriteError::new(
            WriteErrorCode::SourceUnreadable,
            format!(
                "Source holds {} layers; its descriptor must name one with 'layername='",
                tables.len()
            ),
        )),
    }
}

fn create_table_like(
    conn: &Connection,
    schema: &str,
    source: &str,
    target: &str,
) -> rusqlite::Result<()> {
    let columns = table_columns(conn, schema, source)?;
    let mut pk_columns: Vec<&Column> = columns.iter().filter(|c| c.pk > 0).collect();
    pk_columns.sort_by_key(|c| c.pk);

    let mut definitions = Vec::with_capacity(columns.len() + 1);
    for column in &columns {
        let mut definition = format!("{} {}", quote_ident(&column.name), column.decl_type);
        if pk_columns.len() == 1 && column.pk > 0 {
            definition.push_str(" PRIMARY KEY");
            if column.decl_type.eq_ignore_ascii_case("INTEGER") {
                definition.push_str(" AUTOINCREMENT");
            }
        } else if column.not_null {
            definition.push_str(" NOT NULL");
        }
        if let Some(default) = &column.default {
            definition.push_str(" DEFAULT ");
            definition.push_str(default);
        }
        definitions.push(definition);
    }

    if pk_columns.len() > 1 {
        let keys: Vec<String> = pk_columns.iter().map(|c| quote_ident(&c.name)).collect();
        definitions.push(format!("PRIMARY KEY ({})", keys.join(", ")));
    }

    conn.execute(
        &format!(
            "CREATE TABLE main.{} ({})",
            quote_ident(target),
            definitions.join(", ")
        ),
        [],
    )?;
    Ok(())
}

fn copy_spatial_ref_sys(conn: &Connection, schema: &str, table: &str) -> rusqlite::Result<()> {
    if schema == "main" {
        return Ok(());
    }

    let mut referenced =
        format!("SELECT srs_id FROM {schema}.gpkg_contents WHERE table_name = ?1");
    for meta in ["gpkg_geometry_columns", "gpkg_tile_matrix_set"] {
        if table_exists(conn, schema, meta)? {
            referenced.push_str(&format!(
                " UNION SELECT srs_id FROM {schema}.{meta} WHERE table_name = ?1"
            ));
        }
    }

    conn.execute(
        &format!(
            "INSERT OR IGNORE INTO main.gpkg_spatial_ref_sys \
             (srs_name, srs_id, organization, organization_coordsys_id, definition, description) \
             SELECT srs_name, srs_id, organization, organization_coordsys_id, definition, description \
             FROM {schema}.gpkg_spatial_ref_sys WHERE srs_id IN ({referenced})"
        ),
        [table],
    )?;
    Ok(())
}

fn copy_tile_matrices(
    conn: &Connection,
    schema: &str,
    source: &str,
    target: &str,
) -> rusqlite::Result<()> {
    if table_exists(conn, schema, "gpkg_tile_matrix_set")? {
        conn.execute(
            &format!(
                "INSERT INTO main.gpkg_tile_matrix_set \
                 (table_name, srs_id, min_x, min_y, max_x, max_y) \
                 SELECT ?2, srs_id, min_x, min_y, max_x, max_y \
                 FROM {schema}.gpkg_tile_matrix_set WHERE table_name = ?1"
            ),
            params![source, target],
        )?;
    }

    if table_exists(conn, schema, "gpkg_tile_matrix")? {
        conn.execute(
            &format!(
                "INSERT INTO main.gpkg_tile_matrix \
                 (table_name, zoom_level, matrix_width, matrix_height, tile_width, tile_height, \
                  pixel_x_size, pixel_y_size) \
                 SELECT ?2, zoom_level, matrix_width, matrix_height, tile_width, tile_height, \
                        pixel_x_size, pixel_y_size \
                 FROM {schema}.gpkg_tile_matrix WHERE table_name = ?1"
            ),
            params![source, target],
        )?;
    }

    Ok(())
}

/// Removes a slot's table, its spatial index and every metadata row naming it.
fn drop_slot(conn: &Connection, name: &str) -> rusqlite::Result<()> {
    if table_exists(conn, "main", "gpkg_geometry_columns")? {
        let mut stmt = conn
            .prepare("SELECT column_name FROM main.gpkg_geometry_columns WHERE table_name = ?1")?;
        let geometry_columns = stmt
            .query_map([name], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        for column in geometry_columns {
            conn.execute(
                &format!(
                    "DROP TABLE IF EXISTS main.{}",
                    quote_ident(&format!("rtree_{name}_{column}"))
                ),
                [],
            )?;
        }
    }

    conn.execute(
        &format!("DROP TABLE IF EXISTS main.{}", quote_ident(name)),
        [],
    )?;

    for meta in PER_SLOT_TABLES {
        if table_exists(conn, "main", meta)? {
            conn.execute(
                &format!("DELETE FROM main.{meta} WHERE table_name = ?1"),
                [name],
            )?;
        }
    }

    Ok(())
}
