//! XML namespaces, the owned element tree and the element factory

mod factory;
pub mod namespace;
mod tree;

pub use factory::ElementFactory;
pub use namespace::Namespaces;
pub use tree::{Descendants, NamespaceDecl, XmlAttribute, XmlElement, XmlName};

use quick_xml::events::BytesStart;

use crate::error::{Error, Result};

/// Get an attribute value by local name, unescaped
pub fn get_attr(element: &BytesStart, name: &str) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == name.as_bytes() {
            let raw = String::from_utf8_lossy(&attr.value);
            let value = quick_xml::escape::unescape(&raw).map_err(quick_xml::Error::from)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Like [`get_attr`] but a missing attribute is an error
pub fn require_attr(element: &BytesStart, name: &str) -> Result<String> {
    get_attr(element, name)?.ok_or_else(|| Error::MissingAttribute {
        element: String::from_utf8_lossy(element.name().as_ref()).to_string(),
        attr: name.to_string(),
    })
}
