//! Open Packaging Convention (OPC) implementation
//!
//! Manifests (relationships, content types), part paths and the read/write
//! sides of the ZIP container.

mod content_types;
mod part_uri;
mod relationships;
mod template;
mod writer;

pub use content_types::{
    default_for_extension, ContentTypes, CONTENT_TYPES_PART, CORE_PROPERTIES, DEFAULT_EXTENSIONS,
    EXTENDED_PROPERTIES, MAIN_DOCUMENT, RELATIONSHIPS, WEB_SETTINGS, XML,
};
pub use part_uri::{well_known, PartUri};
pub use relationships::{rel_types, PendingMedia, Relationship, Relationships, TargetMode};
pub use template::{TemplateArchive, TemplateDir, DIR_IGNORED_FILE_NAMES};
pub use writer::PackageWriter;
