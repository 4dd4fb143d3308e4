//! # docx-splice
//!
//! Build and mutate DOCX packages, optionally seeded from a template.
//!
//! ## Features
//!
//! - Start blank, from a `.docx` template or from an unpacked template directory
//! - Generate paragraphs, headings, page breaks, tables and inline pictures
//! - Regex replacement across text split over several runs
//! - Regenerated manifests that stay consistent with the written parts
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docx_splice::document::fragments::ParagraphBuilder;
//! use docx_splice::Document;
//! use regex::Regex;
//!
//! let mut doc = Document::open("template.docx")?;
//! let re = Regex::new(r"\{\{name\}\}")?;
//! doc.replace(&re, &"World".into());
//!
//! let p = ParagraphBuilder::new("Hello again").build(&doc.factory())?;
//! doc.add(p);
//! doc.save("output.docx")?;
//! ```

pub mod document;
pub mod error;
pub mod opc;
pub mod xml;

pub use document::{
    AppProperties, CoreProperties, Document, DocumentOptions, DocumentState, ReplacementPayload,
};
pub use error::{Error, Result};
pub use opc::PartUri;
