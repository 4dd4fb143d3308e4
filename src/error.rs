//! Error types for docx-splice

use std::path::PathBuf;
use thiserror::Error;

/// Main error type
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML encoding error: {0}")]
    XmlEncoding(#[from] quick_xml::encoding::EncodingError),

    #[error("XML attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("Template directory error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    #[error("Malformed manifest '{part}': {reason}")]
    MalformedManifest { part: String, reason: String },

    #[error("Page break style \"{0}\" not implemented. Valid styles: page, section")]
    UnknownPageBreakStyle(String),

    #[error("Table has {columns} columns but {widths} column widths were given")]
    AmbiguousColumnWidth { columns: usize, widths: usize },

    #[error("Cannot read media source {}: {reason}", .path.display())]
    MediaSourceUnreadable { path: PathBuf, reason: String },

    #[error("Missing required part: {0}")]
    MissingPart(String),

    #[error("Invalid part URI: {0}")]
    InvalidPartUri(String),

    #[error("Invalid relationship: {0}")]
    InvalidRelationship(String),

    #[error("Missing attribute '{attr}' on element '{element}'")]
    MissingAttribute { element: String, attr: String },

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Unknown namespace prefix: {0}")]
    UnknownNamespacePrefix(String),

    #[error("Window size must be at least 1, got {0}")]
    InvalidWindowSize(usize),
}

impl Error {
    pub(crate) fn malformed(part: &str, reason: impl std::fmt::Display) -> Self {
        Error::MalformedManifest {
            part: part.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
