//! Relationships handling for OPC packages
//!
//! Parses and generates `.rels` files

use crate::error::{Error, Result};
use crate::opc::PartUri;
use crate::xml::{self, ElementFactory, Namespaces};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::path::{Path, PathBuf};

/// Ordered relationship table of a part
#[derive(Clone, Debug)]
pub struct Relationships {
    /// Relationships in insertion order
    items: Vec<Relationship>,
    /// Numeric suffix of the next generated id
    next_id: u64,
    /// Media files to copy into the package on save
    pending_media: Vec<PendingMedia>,
}

impl Default for Relationships {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            next_id: 1,
            pending_media: Vec::new(),
        }
    }
}

/// A single relationship
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relationship {
    /// Relationship ID (e.g., "rId1")
    pub id: String,
    /// Relationship type URI
    pub rel_type: String,
    /// Target path (relative or absolute)
    pub target: String,
    /// Target mode
    pub target_mode: TargetMode,
}

/// Target mode for relationships
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TargetMode {
    /// Internal target (part within the package)
    #[default]
    Internal,
    /// External target (hyperlink, etc.)
    External,
}

/// A media file waiting to be copied into the package
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingMedia {
    /// File name inside the media directory
    pub name: String,
    /// Source file on disk
    pub source: PathBuf,
}

impl Relationships {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// The relationships of a blank document: numbering, styles, settings,
    /// webSettings, fontTable and theme as rId1..rId6
    pub fn defaults() -> Self {
        let mut rels = Self::new();
        rels.append(rel_types::NUMBERING, "numbering.xml");
        rels.append(rel_types::STYLES, "styles.xml");
        rels.append(rel_types::SETTINGS, "settings.xml");
        rels.append(rel_types::WEB_SETTINGS, "webSettings.xml");
        rels.append(rel_types::FONT_TABLE, "fontTable.xml");
        rels.append(rel_types::THEME, "theme/theme1.xml");
        rels
    }

    /// Parse a relationships manifest
    pub fn from_xml(xml: &str) -> Result<Self> {
        Self::parse(xml).map_err(|e| into_malformed("relationships", e))
    }

    /// Parse the manifest stored at `uri`, naming it in errors
    pub fn from_part(uri: &PartUri, xml: &str) -> Result<Self> {
        Self::parse(xml).map_err(|e| into_malformed(uri.as_str(), e))
    }

    fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut rels = Self::new();
        let mut seen_root = false;

        loop {
            match reader.read_event()? {
                Event::Empty(e) | Event::Start(e) => {
                    let name = e.name();
                    let local = name.local_name();
                    if !seen_root {
                        if local.as_ref() != b"Relationships" {
                            return Err(Error::InvalidDocument(format!(
                                "unexpected root element '{}'",
                                String::from_utf8_lossy(name.as_ref())
                            )));
                        }
                        seen_root = true;
                    } else if local.as_ref() == b"Relationship" {
                        let rel = Relationship {
                            id: xml::require_attr(&e, "Id")?,
                            rel_type: xml::require_attr(&e, "Type")?,
                            target: xml::require_attr(&e, "Target")?,
                            target_mode: match xml::get_attr(&e, "TargetMode")?.as_deref() {
                                Some("External") => TargetMode::External,
                                _ => TargetMode::Internal,
                            },
                        };
                        if rels.get(&rel.id).is_some() {
                            return Err(Error::InvalidRelationship(format!(
                                "duplicate id {}",
                                rel.id
                            )));
                        }
                        rels.items.push(rel);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !seen_root {
            return Err(Error::InvalidDocument("no root element".into()));
        }
        rels.update_next_id()?;
        Ok(rels)
    }

    /// Serialize to a manifest with XML declaration, in insertion order
    pub fn to_xml(&self, namespaces: &Namespaces) -> Result<String> {
        let factory = ElementFactory::new(namespaces);
        let mut root = factory.element("pr:Relationships")?;
        root.declare_namespace(None, namespaces_uri(namespaces, "pr")?);

        for rel in &self.items {
            let mut attrs = vec![
                ("Id", rel.id.as_str()),
                ("Type", rel.rel_type.as_str()),
                ("Target", rel.target.as_str()),
            ];
            if rel.target_mode == TargetMode::External {
                attrs.push(("TargetMode", "External"));
            }
            root.push_child(factory.element_with_attrs("pr:Relationship", &attrs)?);
        }

        root.to_xml_string(namespaces, true)
    }

    /// Get a relationship by ID
    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.items.iter().find(|r| r.id == id)
    }

    /// Get a relationship by type (returns first match)
    pub fn by_type(&self, rel_type: &str) -> Option<&Relationship> {
        self.items.iter().find(|r| r.rel_type == rel_type)
    }

    /// Append an internal relationship and return its new id
    pub fn append(&mut self, rel_type: &str, target: &str) -> String {
        self.push(rel_type, target, TargetMode::Internal)
    }

    /// Append an external relationship and return its new id
    pub fn append_external(&mut self, rel_type: &str, target: &str) -> String {
        self.push(rel_type, target, TargetMode::External)
    }

    fn push(&mut self, rel_type: &str, target: &str, target_mode: TargetMode) -> String {
        let id = format!("rId{}", self.next_id);
        self.next_id += 1;
        self.items.push(Relationship {
            id: id.clone(),
            rel_type: rel_type.to_string(),
            target: target.to_string(),
            target_mode,
        });
        id
    }

    /// Queue a media file to be copied into the package's media directory
    /// as `name` when the package is saved
    pub fn record_media_copy(&mut self, name: impl Into<String>, source: impl AsRef<Path>) {
        self.pending_media.push(PendingMedia {
            name: name.into(),
            source: source.as_ref().to_path_buf(),
        });
    }

    /// Media files queued by [`record_media_copy`](Self::record_media_copy)
    pub fn pending_media(&self) -> &[PendingMedia] {
        &self.pending_media
    }

    /// Iterate over all relationships in order
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.items.iter()
    }

    /// Number of relationships
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Next id continues after both the entry count and the highest
    /// numeric `rIdN`, so loaded tables with gaps never collide. Ids are
    /// kept within `u32`.
    fn update_next_id(&mut self) -> Result<()> {
        let max_id = self
            .items
            .iter()
            .filter_map(|r| r.id.strip_prefix("rId")?.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        if max_id >= u64::from(u32::MAX) {
            return Err(Error::InvalidRelationship(format!(
                "id rId{} leaves no room for new relationships",
                max_id
            )));
        }
        let count = self.items.len() as u64;
        self.next_id = max_id.max(count) + 1;
        Ok(())
    }
}

fn namespaces_uri<'a>(namespaces: &'a Namespaces, prefix: &str) -> Result<&'a str> {
    namespaces
        .uri(prefix)
        .ok_or_else(|| Error::UnknownNamespacePrefix(prefix.to_string()))
}

pub(crate) fn into_malformed(part: &str, err: Error) -> Error {
    match err {
        Error::MalformedManifest { .. } => err,
        other => Error::malformed(part, other),
    }
}

// Well-known relationship types
pub mod rel_types {
    pub const OFFICE_DOCUMENT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
    pub const STYLES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
    pub const SETTINGS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/settings";
    pub const WEB_SETTINGS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/webSettings";
    pub const NUMBERING: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering";
    pub const FONT_TABLE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/fontTable";
    pub const IMAGE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
    pub const HYPERLINK: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";
    pub const THEME: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";
    pub const CORE_PROPERTIES: &str =
        "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
    pub const EXTENDED_PROPERTIES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties";
}
