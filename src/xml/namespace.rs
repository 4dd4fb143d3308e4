//! XML namespaces used in OOXML
//!
//! The [`Namespaces`] registry maps the short prefixes Word writes to their
//! namespace URIs. It is built once and shared read-only by the element
//! factory, the manifest parsers and the tree serializer.

use std::sync::OnceLock;

/// WordprocessingML main namespace
pub const W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
/// Relationships namespace
pub const R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
/// Drawing namespace
pub const WP: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
/// DrawingML main namespace
pub const A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
/// Pictures namespace
pub const PIC: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
/// Content Types namespace
pub const CT: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
/// Package Relationships namespace
pub const PR: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
/// Core Properties namespace
pub const CP: &str = "http://schemas.openxmlformats.org/package/2006/metadata/core-properties";
/// Dublin Core namespace
pub const DC: &str = "http://purl.org/dc/elements/1.1/";
/// Dublin Core Terms namespace
pub const DCTERMS: &str = "http://purl.org/dc/terms/";
/// Dublin Core Types namespace
pub const DCMITYPE: &str = "http://purl.org/dc/dcmitype/";
/// XML Schema instance namespace
pub const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
/// Extended (app) properties namespace
pub const EP: &str = "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties";
/// Variant types used by extended properties
pub const VT: &str = "http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes";
/// The implicit `xml:` namespace
pub const XML: &str = "http://www.w3.org/XML/1998/namespace";

const STANDARD: &[(&str, &str)] = &[
    // Text content
    ("mv", "urn:schemas-microsoft-com:mac:vml"),
    ("mo", "http://schemas.microsoft.com/office/mac/office/2008/main"),
    ("ve", "http://schemas.openxmlformats.org/markup-compatibility/2006"),
    ("o", "urn:schemas-microsoft-com:office:office"),
    ("r", R),
    ("m", "http://schemas.openxmlformats.org/officeDocument/2006/math"),
    ("v", "urn:schemas-microsoft-com:vml"),
    ("w", W),
    ("w10", "urn:schemas-microsoft-com:office:word"),
    ("wne", "http://schemas.microsoft.com/office/word/2006/wordml"),
    // Drawing
    ("wp", WP),
    ("a", A),
    ("pic", PIC),
    // Properties (core and extended)
    ("cp", CP),
    ("dc", DC),
    ("dcterms", DCTERMS),
    ("dcmitype", DCMITYPE),
    ("xsi", XSI),
    ("ep", EP),
    ("vt", VT),
    // Package manifests
    ("ct", CT),
    ("pr", PR),
];

/// Read-only prefix → namespace URI table
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Namespaces {
    entries: Vec<(String, String)>,
}

impl Namespaces {
    /// The process-wide standard registry
    pub fn standard() -> &'static Namespaces {
        static STANDARD_REGISTRY: OnceLock<Namespaces> = OnceLock::new();
        STANDARD_REGISTRY.get_or_init(|| Namespaces::from_pairs(STANDARD.iter().copied()))
    }

    /// Build a registry from (prefix, uri) pairs. Later duplicates of a
    /// prefix are ignored.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut entries: Vec<(String, String)> = Vec::new();
        for (prefix, uri) in pairs {
            if entries.iter().all(|(p, _)| p != prefix) {
                entries.push((prefix.to_string(), uri.to_string()));
            }
        }
        Self { entries }
    }

    /// Namespace URI registered for a prefix
    pub fn uri(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML);
        }
        self.entries
            .iter()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    /// Preferred prefix for a namespace URI
    pub fn prefix(&self, uri: &str) -> Option<&str> {
        if uri == XML {
            return Some("xml");
        }
        self.entries
            .iter()
            .find(|(_, u)| u == uri)
            .map(|(p, _)| p.as_str())
    }

    /// Iterate over (prefix, uri) pairs in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }
}

impl Default for Namespaces {
    fn default() -> Self {
        Self::standard().clone()
    }
}

/// Prefixes declared on the root of a freshly created document.xml
pub const DOCUMENT_PREFIXES: &[&str] = &["w", "r", "wp", "a", "pic"];
