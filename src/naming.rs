//! Layer name cleanup and the geometry suffix vocabulary.
//!
//! Layer names that came through a DWG import are often mojibake: UTF-8 bytes
//! that were decoded as Windows-1252 somewhere along the way (`GrÃ¼n` instead
//! of `Grün`). `sanitize` undoes that when it can and then replaces the
//! characters that file systems and GeoPackage table names choke on.
//!
//! Suffixes:
//! - A geometry suffix is `" - {code}"` appended to a base name, e.g.
//!   `Roads - pg`.
//! - Line, point and polygon layers use the short codes `l`, `pt` and `pg`.
//!   Every other geometry class uses its display label.

use encoding_rs::WINDOWS_1252;
use gpkg_store::GeometryClass;

/// Base name given to vector layers without any features.
pub const EMPTY_LAYER_NAME: &str = "empty layer";

const FORBIDDEN_CHARS: [char; 10] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*', ','];

const SUFFIX_SEPARATOR: &str = " - ";

/// Suffix codes recognized when stripping, beyond the ones `geometry_code`
/// produces.
const EXTRA_SUFFIX_CODES: &[&str] = &["MultiPolygon"];

/// Cleans up a raw layer or group name. Never fails.
pub fn sanitize(raw: &str) -> String {
    let repaired = repair_mojibake(raw);
    let name = repaired.as_deref().unwrap_or(raw);

    let mut out = String::with_capacity(name.len());
    let mut in_run = false;

    for c in name.chars() {
        if FORBIDDEN_CHARS.contains(&c) {
            if !in_run {
                out.push('_');
                in_run = true;
            }
        } else {
            out.push(c);
            in_run = false;
        }
    }

    out
}

/// Code points that strict Windows-1252 leaves undefined. The WHATWG
/// encoder passes them through as bytes, so they are refused up front.
const CP1252_UNDEFINED: [char; 5] = ['\u{81}', '\u{8d}', '\u{8f}', '\u{90}', '\u{9d}'];

/// Re-encodes `name` as Windows-1252 and decodes the bytes as UTF-8.
///
/// Returns `None` when either step fails, in which case the name was most
/// likely fine to begin with.
fn repair_mojibake(name: &str) -> Option<String> {
    let bytes = encode_cp1252(name)?;
    String::from_utf8(bytes).ok()
}

fn encode_cp1252(text: &str) -> Option<Vec<u8>> {
    if text.chars().any(|c| CP1252_UNDEFINED.contains(&c)) {
        return None;
    }

    let (bytes, _, had_errors) = WINDOWS_1252.encode(text);
    if had_errors {
        None
    } else {
        Some(bytes.into_owned())
    }
}

/// Short code or display label used in the suffix for a geometry class.
pub fn geometry_code(geometry: GeometryClass) -> &'static str {
    match geometry {
        GeometryClass::Line => "l",
        GeometryClass::Point => "pt",
        GeometryClass::Polygon => "pg",
        other => other.display_label(),
    }
}

/// Builds the `" - {code}"` suffix for a geometry class.
pub fn geometry_suffix(geometry: GeometryClass) -> String {
    format!("{SUFFIX_SEPARATOR}{}", geometry_code(geometry))
}

/// Appends the geometry suffix to a base name.
pub fn with_geometry_suffix(base: &str, geometry: GeometryClass) -> String {
    format!("{base}{}", geometry_suffix(geometry))
}

/// Splits a trailing geometry suffix off a name.
///
/// Given `"Roads - pg"`, returns `Some(("Roads", "pg"))`.
/// Given `"Roads - Unknown geometry"`, returns `Some(("Roads", "Unknown geometry"))`.
/// Given `"Roads - Main"`, returns `None`.
pub fn parse_geometry_suffix(name: &str) -> Option<(&str, &str)> {
    let split = name.rfind(SUFFIX_SEPARATOR)?;
    let (base, code) = (&name[..split], &name[split + SUFFIX_SEPARATOR.len()..]);

    if base.is_empty() || !is_known_suffix_code(code) {
        return None;
    }

    Some((base, code))
}

/// Removes one trailing geometry suffix, if there is one.
pub fn strip_geometry_suffix(name: &str) -> &str {
    parse_geometry_suffix(name).map_or(name, |(base, _)| base)
}

fn is_known_suffix_code(code: &str) -> bool {
    const CLASSES: [GeometryClass; 5] = [
        GeometryClass::Point,
        GeometryClass::Line,
        GeometryClass::Polygon,
        GeometryClass::Unknown,
        GeometryClass::Null,
    ];

    CLASSES
        .iter()
        .any(|&class| code == geometry_code(class) || code == class.display_label())
        || EXTRA_SUFFIX_CODES.contains(&code)
}
