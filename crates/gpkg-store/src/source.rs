//! Parsing of layer source descriptors.
//!
//! Two shapes are understood:
//! - `<path>|key=value|key=value`, used by vector layers
//! - `GPKG:<path>:<table>`, used by GeoPackage rasters

const RASTER_PREFIX: &str = "GPKG:";

/// A borrowed view of a layer's source descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor<'a> {
    raw: &'a str,
    path: &'a str,
    params: Vec<(&'a str, &'a str)>,
}

impl<'a> SourceDescriptor<'a> {
    pub fn parse(raw: &'a str) -> SourceDescriptor<'a> {
        if let Some(rest) = raw.strip_prefix(RASTER_PREFIX) {
            // The path itself may contain ':' (drive letters), so the table
            // name is whatever follows the last one.
            if let Some(split) = rest.rfind(':') {
                let (path, table) = (&rest[..split], &rest[split + 1..]);
                if !path.is_empty() && !table.is_empty() {
                    return SourceDescriptor {
                        raw,
                        path,
                        params: vec![("layername", table)],
                    };
                }
            }
        }

        let mut parts = raw.split('|');
        let path = parts.next().unwrap_or_default().trim();
        let params = parts
            .filter_map(|part| part.split_once('='))
            .map(|(key, value)| (key.trim(), value))
            .collect();

        SourceDescriptor { raw, path, params }
    }

    pub fn raw(&self) -> &'a str {
        self.raw
    }

    /// The leading path or connection component.
    pub fn path(&self) -> &'a str {
        self.path
    }

    pub fn param(&self, key: &str) -> Option<&'a str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| *v)
    }

    pub fn layer_name(&self) -> Option<&'a str> {
        self.param("layername")
    }

    /// Whether the descriptor points at a web service instead of a file.
    pub fn is_remote(&self) -> bool {
        self.raw.contains("url=")
    }
}
