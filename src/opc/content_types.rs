//! Content Types handling for OPC packages
//!
//! Parses and generates `[Content_Types].xml`. Override entries are the
//! mutable part of the registry; Default entries always come from the
//! built-in [`DEFAULT_EXTENSIONS`] table. Loaded Defaults for other
//! extensions are remembered so parts relying on them can be given an
//! Override.

use crate::error::{Error, Result};
use crate::opc::relationships::into_malformed;
use crate::opc::PartUri;
use crate::xml::{self, ElementFactory, Namespaces};
use quick_xml::events::Event;
use quick_xml::Reader;

/// Content types definition for an OPC package
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContentTypes {
    /// Override mappings (part URI -> content type) in insertion order
    overrides: Vec<(PartUri, String)>,
    /// Loaded Default entries for extensions missing from
    /// [`DEFAULT_EXTENSIONS`]; never serialized as Defaults
    extra_defaults: Vec<(String, String)>,
}

impl ContentTypes {
    /// Create a registry without overrides
    pub fn new() -> Self {
        Self::default()
    }

    /// The overrides of a blank document
    pub fn defaults() -> Self {
        let mut ct = Self::new();
        for (path, content_type) in DEFAULT_OVERRIDES {
            ct.overrides
                .push((PartUri::from_static(path), content_type.to_string()));
        }
        ct
    }

    /// Parse a content types manifest. Override entries are kept; Default
    /// entries only for extensions the built-in table lacks, see
    /// [`loaded_default`](Self::loaded_default).
    pub fn from_xml(xml: &str) -> Result<Self> {
        Self::parse(xml).map_err(|e| into_malformed(CONTENT_TYPES_PART, e))
    }

    fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut ct = Self::new();
        let mut seen_root = false;

        loop {
            match reader.read_event()? {
                Event::Empty(e) | Event::Start(e) => {
                    let name = e.name();
                    let local = name.local_name();
                    if !seen_root {
                        if local.as_ref() != b"Types" {
                            return Err(Error::InvalidDocument(format!(
                                "unexpected root element '{}'",
                                String::from_utf8_lossy(name.as_ref())
                            )));
                        }
                        seen_root = true;
                    } else if local.as_ref() == b"Override" {
                        let part_name = xml::require_attr(&e, "PartName")?;
                        let content_type = xml::require_attr(&e, "ContentType")?;
                        ct.set_override(PartUri::new(&part_name)?, content_type);
                    } else if local.as_ref() == b"Default" {
                        let extension = xml::require_attr(&e, "Extension")?.to_lowercase();
                        let content_type = xml::require_attr(&e, "ContentType")?;
                        if default_for_extension(&extension).is_none()
                            && ct.loaded_default(&extension).is_none()
                        {
                            ct.extra_defaults.push((extension, content_type));
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !seen_root {
            return Err(Error::InvalidDocument("no root element".into()));
        }
        Ok(ct)
    }

    /// Serialize: one Override per mapping entry, then one Default per
    /// built-in extension
    pub fn to_xml(&self, namespaces: &Namespaces) -> Result<String> {
        let factory = ElementFactory::new(namespaces);
        let mut types = factory.element("ct:Types")?;
        if let Some(uri) = types.name.namespace.clone() {
            types.declare_namespace(None, &uri);
        }

        for (uri, content_type) in &self.overrides {
            types.push_child(factory.element_with_attrs(
                "ct:Override",
                &[("PartName", uri.as_str()), ("ContentType", content_type)],
            )?);
        }
        for (extension, content_type) in DEFAULT_EXTENSIONS {
            types.push_child(factory.element_with_attrs(
                "ct:Default",
                &[("Extension", extension), ("ContentType", content_type)],
            )?);
        }

        types.to_xml_string(namespaces, true)
    }

    /// Add or replace the override for a part
    pub fn set_override(&mut self, uri: PartUri, content_type: impl Into<String>) {
        let content_type = content_type.into();
        match self.overrides.iter_mut().find(|(u, _)| *u == uri) {
            Some(entry) => entry.1 = content_type,
            None => self.overrides.push((uri, content_type)),
        }
    }

    /// Add an override unless the part already has one
    pub fn ensure_override(&mut self, uri: PartUri, content_type: &str) {
        if !self.has_override(&uri) {
            self.overrides.push((uri, content_type.to_string()));
        }
    }

    /// Whether the part has an explicit override
    pub fn has_override(&self, uri: &PartUri) -> bool {
        self.overrides.iter().any(|(u, _)| u == uri)
    }

    /// Remove an override
    pub fn remove_override(&mut self, uri: &PartUri) -> Option<String> {
        let index = self.overrides.iter().position(|(u, _)| u == uri)?;
        Some(self.overrides.remove(index).1)
    }

    /// Get the content type for a part. Overrides win over extension
    /// defaults.
    pub fn get(&self, uri: &PartUri) -> Option<&str> {
        if let Some((_, ct)) = self.overrides.iter().find(|(u, _)| u == uri) {
            return Some(ct);
        }
        let extension = uri.extension()?;
        default_for_extension(&extension)
    }

    /// Content type a loaded manifest gave to an extension the built-in
    /// table does not know
    pub fn loaded_default(&self, extension: &str) -> Option<&str> {
        let extension = extension.to_lowercase();
        self.extra_defaults
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, ct)| ct.as_str())
    }

    /// Give `uri` an Override from a loaded Default when neither an
    /// Override nor a built-in Default covers it. Returns whether the part
    /// is covered afterwards.
    pub fn cover_from_loaded_defaults(&mut self, uri: &PartUri) -> bool {
        if self.get(uri).is_some() {
            return true;
        }
        let Some(content_type) = uri
            .extension()
            .and_then(|ext| self.loaded_default(&ext).map(str::to_string))
        else {
            return false;
        };
        self.overrides.push((uri.clone(), content_type));
        true
    }

    /// Iterate over overrides in order
    pub fn overrides(&self) -> impl Iterator<Item = (&PartUri, &str)> {
        self.overrides.iter().map(|(u, ct)| (u, ct.as_str()))
    }

    /// Drop overrides whose part is not in `keep`
    pub fn retain_parts<F>(&mut self, mut keep: F)
    where
        F: FnMut(&PartUri) -> bool,
    {
        self.overrides.retain(|(uri, _)| keep(uri));
    }
}

/// Built-in Default content type for an extension
pub fn default_for_extension(extension: &str) -> Option<&'static str> {
    let extension = extension.to_lowercase();
    DEFAULT_EXTENSIONS
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, ct)| *ct)
}

/// Name of the manifest entry
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

// Well-known content types
pub const RELATIONSHIPS: &str = "application/vnd.openxmlformats-package.relationships+xml";
pub const XML: &str = "application/xml";
pub const MAIN_DOCUMENT: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
pub const CORE_PROPERTIES: &str = "application/vnd.openxmlformats-package.core-properties+xml";
pub const EXTENDED_PROPERTIES: &str =
    "application/vnd.openxmlformats-officedocument.extended-properties+xml";
pub const WEB_SETTINGS: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.webSettings+xml";

/// Extension defaults written into every manifest
pub const DEFAULT_EXTENSIONS: &[(&str, &str)] = &[
    ("rels", RELATIONSHIPS),
    ("xml", XML),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("gif", "image/gif"),
    ("png", "image/png"),
    ("wmf", "image/x-wmf"),
    ("emf", "image/x-emf"),
    ("bmp", "image/bmp"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
];

const DEFAULT_OVERRIDES: &[(&str, &str)] = &[
    (
        "/word/theme/theme1.xml",
        "application/vnd.openxmlformats-officedocument.theme+xml",
    ),
    (
        "/word/fontTable.xml",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.fontTable+xml",
    ),
    ("/docProps/core.xml", CORE_PROPERTIES),
    ("/docProps/app.xml", EXTENDED_PROPERTIES),
    ("/word/document.xml", MAIN_DOCUMENT),
    (
        "/word/settings.xml",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.settings+xml",
    ),
    (
        "/word/numbering.xml",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml",
    ),
    (
        "/word/styles.xml",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml",
    ),
    ("/word/webSettings.xml", WEB_SETTINGS),
];

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="odttf" ContentType="application/vnd.openxmlformats-officedocument.obfuscatedFont"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
  <Override PartName="/customXml/itemProps1.xml" ContentType="application/vnd.openxmlformats-officedocument.customXmlProperties+xml"/>
</Types>"#;

    #[test]
    fn test_parse_keeps_only_overrides() {
        let ct = ContentTypes::from_xml(SAMPLE).unwrap();
        let paths: Vec<_> = ct.overrides().map(|(u, _)| u.as_str()).collect();
        assert_eq!(paths, ["/word/document.xml", "/customXml/itemProps1.xml"]);

        let font = PartUri::new("/word/fonts/font1.odttf").unwrap();
        assert_eq!(ct.get(&font), None);
    }

    #[test]
    fn test_defaults_has_nine_overrides() {
        let ct = ContentTypes::defaults();
        assert_eq!(ct.overrides().count(), 9);
        assert_eq!(ct.get(&PartUri::new("/word/document.xml").unwrap()), Some(MAIN_DOCUMENT));
    }

    #[test]
    fn test_serialize_overrides_then_defaults() {
        let ns = Namespaces::standard();
        let xml = ContentTypes::defaults().to_xml(ns).unwrap();

        let last_override = xml.rfind("<Override").unwrap();
        let first_default = xml.find("<Default").unwrap();
        assert!(last_override < first_default);
        assert_eq!(xml.matches("<Default ").count(), DEFAULT_EXTENSIONS.len());
        assert!(xml.contains(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#));
    }

    #[test]
    fn test_roundtrip() {
        let ns = Namespaces::standard();
        let mut ct = ContentTypes::defaults();
        ct.set_override(PartUri::new("/word/header1.xml").unwrap(), "application/x-header");

        let reparsed = ContentTypes::from_xml(&ct.to_xml(ns).unwrap()).unwrap();
        assert_eq!(reparsed, ct);
    }

    #[test]
    fn test_get_by_extension_and_override_precedence() {
        let mut ct = ContentTypes::new();
        let image = PartUri::new("/word/media/image1.PNG").unwrap();
        assert_eq!(ct.get(&image), Some("image/png"));

        ct.set_override(image.clone(), "image/x-custom");
        assert_eq!(ct.get(&image), Some("image/x-custom"));
        assert_eq!(ct.remove_override(&image).as_deref(), Some("image/x-custom"));
    }

    #[test]
    fn test_retain_parts() {
        let mut ct = ContentTypes::defaults();
        ct.retain_parts(|uri| uri.as_str().starts_with("/word/"));
        assert!(ct.overrides().all(|(u, _)| !u.as_str().starts_with("/docProps/")));
        assert_eq!(ct.overrides().count(), 7);
    }

    #[test]
    fn test_unknown_defaults_become_overrides() {
        let mut ct = ContentTypes::from_xml(SAMPLE).unwrap();
        assert_eq!(
            ct.loaded_default("ODTTF"),
            Some("application/vnd.openxmlformats-officedocument.obfuscatedFont")
        );
        assert_eq!(ct.loaded_default("rels"), None);

        let font = PartUri::new("/word/fonts/font1.odttf").unwrap();
        assert!(ct.cover_from_loaded_defaults(&font));
        assert_eq!(
            ct.get(&font),
            Some("application/vnd.openxmlformats-officedocument.obfuscatedFont")
        );

        let unknown = PartUri::new("/word/blob.bin").unwrap();
        assert!(!ct.cover_from_loaded_defaults(&unknown));
        let image = PartUri::new("/word/media/a.png").unwrap();
        assert!(ct.cover_from_loaded_defaults(&image));
        assert!(!ct.has_override(&image));

        let xml = ct.to_xml(Namespaces::standard()).unwrap();
        assert!(!xml.contains(r#"Extension="odttf""#));
        assert!(xml.contains(r#"PartName="/word/fonts/font1.odttf""#));
    }

    #[test]
    fn test_malformed() {
        let bad = r#"<Types><Override ContentType="x"/></Types>"#;
        assert!(matches!(
            ContentTypes::from_xml(bad),
            Err(Error::MalformedManifest { part, .. }) if part == CONTENT_TYPES_PART
        ));
        assert!(matches!(
            ContentTypes::from_xml("<Relationships/>"),
            Err(Error::MalformedManifest { .. })
        ));
    }
}
