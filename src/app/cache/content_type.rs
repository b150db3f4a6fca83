//! Content type inference from file extensions
//!
//! The cache only writes a content-type sidecar when the type the server
//! reported differs from what the cached file name implies. Inference is a
//! pure lookup in a static table.

use std::path::Path;

/// Known extensions (lowercase, without the dot) and their MIME types
static EXTENSION_TYPES: &[(&str, &str)] = &[
    ("bil", "application/bil"),
    ("bmp", "image/bmp"),
    ("csv", "text/csv"),
    ("dds", "image/dds"),
    ("geojson", "application/geo+json"),
    ("gif", "image/gif"),
    ("gml", "application/gml+xml"),
    ("gz", "application/gzip"),
    ("htm", "text/html"),
    ("html", "text/html"),
    ("ico", "image/x-icon"),
    ("jpe", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("js", "text/javascript"),
    ("json", "application/json"),
    ("kml", "application/vnd.google-earth.kml+xml"),
    ("kmz", "application/vnd.google-earth.kmz"),
    ("nc", "application/x-netcdf"),
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("svg", "image/svg+xml"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("txt", "text/plain"),
    ("webp", "image/webp"),
    ("xml", "application/xml"),
    ("zip", "application/zip"),
];

/// Infer a MIME type from a file name's extension
///
/// Returns `None` for names without an extension or with an unknown one.
pub fn infer_from_name(name: &str) -> Option<&'static str> {
    let dot = name.rfind('.')?;
    let extension = &name[dot + 1..];
    if extension.is_empty() {
        return None;
    }

    EXTENSION_TYPES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(extension))
        .map(|(_, mime)| *mime)
}

/// Infer a MIME type from the final component of a path
pub fn infer_from_path(path: &Path) -> Option<&'static str> {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(infer_from_name)
}

/// Whether a supplied content type is already implied by the inferred one
///
/// MIME types compare case-insensitively; surrounding whitespace is ignored.
pub fn matches_inferred(supplied: Option<&str>, inferred: Option<&str>) -> bool {
    match (supplied, inferred) {
        (None, None) => true,
        (Some(supplied), Some(inferred)) => supplied.trim().eq_ignore_ascii_case(inferred),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_infer_common_types() {
        assert_eq!(infer_from_name("0.png"), Some("image/png"));
        assert_eq!(infer_from_name("12.JPG"), Some("image/jpeg"));
        assert_eq!(infer_from_name("3.xml"), Some("application/xml"));
    }

    #[test]
    fn test_infer_without_extension() {
        assert_eq!(infer_from_name("0"), None);
        assert_eq!(infer_from_name("0."), None);
        assert_eq!(infer_from_name("0.unknownext"), None);
    }

    #[test]
    fn test_infer_from_path_uses_last_component() {
        let path = PathBuf::from("/cache/tiles.example.org/009/916/2322/4.tif");
        assert_eq!(infer_from_path(&path), Some("image/tiff"));

        let path = PathBuf::from("/cache/dir.png/7");
        assert_eq!(infer_from_path(&path), None);
    }

    #[test]
    fn test_matches_inferred() {
        assert!(matches_inferred(None, None));
        assert!(matches_inferred(Some("image/png"), Some("image/png")));
        assert!(matches_inferred(Some("IMAGE/PNG "), Some("image/png")));
        assert!(!matches_inferred(Some("image/png"), None));
        assert!(!matches_inferred(None, Some("image/png")));
        assert!(!matches_inferred(
            Some("application/vnd.ogc.wms_xml"),
            Some("application/xml")
        ));
    }
}
