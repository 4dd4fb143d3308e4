//! Element factory: builds single namespace-qualified nodes from
//! `prefix:local` strings using a [`Namespaces`] registry.

use crate::error::{Error, Result};
use crate::xml::namespace::Namespaces;
use crate::xml::tree::{XmlElement, XmlName};

/// Constructs elements against a namespace registry
#[derive(Clone, Copy, Debug)]
pub struct ElementFactory<'ns> {
    namespaces: &'ns Namespaces,
}

impl<'ns> ElementFactory<'ns> {
    pub fn new(namespaces: &'ns Namespaces) -> Self {
        Self { namespaces }
    }

    /// Registry this factory resolves prefixes with
    pub fn namespaces(&self) -> &'ns Namespaces {
        self.namespaces
    }

    /// Resolve `prefix:local` (or a bare `local`, which is un-namespaced)
    pub fn name(&self, qname: &str) -> Result<XmlName> {
        match qname.split_once(':') {
            Some((prefix, local)) => {
                let uri = self
                    .namespaces
                    .uri(prefix)
                    .ok_or_else(|| Error::UnknownNamespacePrefix(prefix.to_string()))?;
                Ok(XmlName::new(Some(uri), local))
            }
            None => Ok(XmlName::new(None, qname)),
        }
    }

    /// Create an empty element
    pub fn element(&self, tag: &str) -> Result<XmlElement> {
        Ok(XmlElement::new(self.name(tag)?))
    }

    /// Create an element with text
    pub fn text_element(&self, tag: &str, text: impl Into<String>) -> Result<XmlElement> {
        Ok(self.element(tag)?.with_text(text))
    }

    /// Create an element with attributes.
    ///
    /// Prefixed attribute names (`r:embed`, `xsi:type`) use their own
    /// namespace. Bare names take the `w` namespace when the tag is a `w:`
    /// element and no namespace otherwise.
    pub fn element_with_attrs(&self, tag: &str, attrs: &[(&str, &str)]) -> Result<XmlElement> {
        let mut element = self.element(tag)?;
        let inherit = tag
            .split_once(':')
            .filter(|(prefix, _)| *prefix == "w")
            .and_then(|(prefix, _)| self.namespaces.uri(prefix));

        for (key, value) in attrs {
            let name = if key.contains(':') {
                self.name(key)?
            } else {
                XmlName::new(inherit, *key)
            };
            element.set_attr(name, *value);
        }
        Ok(element)
    }

    /// Create a `w:` element carrying only `w:val`
    pub fn val(&self, tag: &str, value: &str) -> Result<XmlElement> {
        self.element_with_attrs(tag, &[("val", value)])
    }

    /// Declare registry prefixes on an element so descendants reuse them
    pub fn declare(&self, element: &mut XmlElement, prefixes: &[&str]) -> Result<()> {
        for &prefix in prefixes {
            let uri = self
                .namespaces
                .uri(prefix)
                .ok_or_else(|| Error::UnknownNamespacePrefix(prefix.to_string()))?;
            element.declare_namespace(Some(prefix), uri);
        }
        Ok(())
    }
}
