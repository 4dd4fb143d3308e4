//! Owned XML element tree with a namespace-aware reader and writer

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::Write;

use crate::error::{Error, Result};
use crate::xml::namespace::{Namespaces, XML};

/// A namespace-qualified name
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct XmlName {
    /// Namespace URI, `None` for un-namespaced names
    pub namespace: Option<String>,
    /// Local part
    pub local: String,
}

impl XmlName {
    /// Create a name in the given namespace
    pub fn new(namespace: Option<&str>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            local: local.into(),
        }
    }

    /// Check namespace and local name
    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.local == local && self.namespace.as_deref() == Some(namespace)
    }
}

/// An attribute with its own (optional) namespace
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XmlAttribute {
    pub name: XmlName,
    pub value: String,
}

/// Namespace declaration made on an element: (prefix, uri). A `None`
/// prefix is the default namespace.
pub type NamespaceDecl = (Option<String>, String);

/// XML element exclusively owning its children
///
/// The tree models element-only and text-only content. Mixed content is
/// flattened: every text node directly inside an element is collected into
/// [`text`](Self::text), which is written before the children, so
/// `<a>x<b/>y</a>` reads back as text `"xy"` followed by `<b/>`. WordprocessingML
/// keeps text in `w:t` leaves, which have no element children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XmlElement {
    /// Qualified tag name
    pub name: XmlName,
    /// Attributes in document order
    pub attributes: Vec<XmlAttribute>,
    /// Direct text content, concatenated when interleaved with children
    pub text: Option<String>,
    /// Child elements
    pub children: Vec<XmlElement>,
    /// Namespace declarations carried by this element
    pub namespace_decls: Vec<NamespaceDecl>,
}

impl XmlElement {
    /// Create a new empty element
    pub fn new(name: XmlName) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
            namespace_decls: Vec::new(),
        }
    }

    /// Parse a complete XML document into its root element
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<Frame> = Vec::new();
        let mut scope: Vec<NamespaceDecl> = Vec::new();
        let mut root = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let (element, pushed) = open_element(&e, &mut scope)?;
                    stack.push(Frame { element, pushed });
                }
                Event::Empty(e) => {
                    let (element, pushed) = open_element(&e, &mut scope)?;
                    scope.truncate(scope.len() - pushed);
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let Some(Frame {
                        mut element,
                        pushed,
                    }) = stack.pop()
                    else {
                        return Err(Error::InvalidDocument("Unbalanced end tag".into()));
                    };
                    if !element.children.is_empty()
                        && element.text.as_deref().is_some_and(|t| t.trim().is_empty())
                    {
                        element.text = None;
                    }
                    scope.truncate(scope.len() - pushed);
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(t) => {
                    if let Some(frame) = stack.last_mut() {
                        let text = t.unescape()?;
                        frame
                            .element
                            .text
                            .get_or_insert_with(String::new)
                            .push_str(&text);
                    }
                }
                Event::CData(c) => {
                    if let Some(frame) = stack.last_mut() {
                        let raw = c.into_inner();
                        frame
                            .element
                            .text
                            .get_or_insert_with(String::new)
                            .push_str(&String::from_utf8_lossy(&raw));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(Error::InvalidDocument("Unexpected EOF".into()));
        }
        root.ok_or_else(|| Error::InvalidDocument("No root element".into()))
    }

    /// Serialize to a string, optionally with an XML declaration
    pub fn to_xml_string(&self, namespaces: &Namespaces, declaration: bool) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        if declaration {
            writer.write_event(Event::Decl(BytesDecl::new(
                "1.0",
                Some("UTF-8"),
                Some("yes"),
            )))?;
        }
        self.write_to(&mut writer, namespaces)?;
        String::from_utf8(writer.into_inner()).map_err(|e| Error::InvalidDocument(e.to_string()))
    }

    /// Write element to XML writer
    pub fn write_to<W: Write>(&self, writer: &mut Writer<W>, namespaces: &Namespaces) -> Result<()> {
        let mut scope = Vec::new();
        self.write_scoped(writer, namespaces, &mut scope)
    }

    fn write_scoped<W: Write>(
        &self,
        writer: &mut Writer<W>,
        namespaces: &Namespaces,
        scope: &mut Vec<NamespaceDecl>,
    ) -> Result<()> {
        let mark = scope.len();
        let mut decls: Vec<NamespaceDecl> = Vec::new();

        for (prefix, uri) in &self.namespace_decls {
            if lookup_binding(scope, prefix.as_deref()) != Some(uri.as_str()) {
                decls.push((prefix.clone(), uri.clone()));
                scope.push((prefix.clone(), uri.clone()));
            }
        }

        let tag = qualify(&self.name, false, namespaces, scope, &mut decls)?;
        let mut attrs = Vec::with_capacity(self.attributes.len());
        for attr in &self.attributes {
            let key = qualify(&attr.name, true, namespaces, scope, &mut decls)?;
            attrs.push((key, attr.value.as_str()));
        }

        let mut start = BytesStart::new(tag.as_str());
        for (prefix, uri) in &decls {
            match prefix {
                Some(p) => start.push_attribute((format!("xmlns:{}", p).as_str(), uri.as_str())),
                None => start.push_attribute(("xmlns", uri.as_str())),
            }
        }
        for (key, value) in &attrs {
            start.push_attribute((key.as_str(), *value));
        }

        if self.text.is_none() && self.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
        } else {
            writer.write_event(Event::Start(start))?;
            if let Some(text) = &self.text {
                writer.write_event(Event::Text(BytesText::new(text)))?;
            }
            for child in &self.children {
                child.write_scoped(writer, namespaces, scope)?;
            }
            writer.write_event(Event::End(BytesEnd::new(tag.as_str())))?;
        }

        scope.truncate(mark);
        Ok(())
    }

    /// Check the tag's namespace and local name
    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.name.is(namespace, local)
    }

    /// Direct text, empty when absent
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Replace the direct text
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    /// Get an attribute value
    pub fn attr(&self, namespace: Option<&str>, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.local == local && a.name.namespace.as_deref() == namespace)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, replacing an existing one with the same name
    pub fn set_attr(&mut self, name: XmlName, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.attributes.push(XmlAttribute { name, value }),
        }
    }

    /// Declare a namespace on this element
    pub fn declare_namespace(&mut self, prefix: Option<&str>, uri: &str) {
        let prefix = prefix.map(str::to_string);
        self.namespace_decls.retain(|(p, _)| *p != prefix);
        self.namespace_decls.push((prefix, uri.to_string()));
    }

    /// Builder-style text setter
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.set_text(text);
        self
    }

    /// Builder-style child append
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    /// Append a child element
    pub fn push_child(&mut self, child: XmlElement) {
        self.children.push(child);
    }

    /// First direct child with the given name
    pub fn child(&self, namespace: &str, local: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.is(namespace, local))
    }

    /// First direct child with the given name, mutably
    pub fn child_mut(&mut self, namespace: &str, local: &str) -> Option<&mut XmlElement> {
        self.children.iter_mut().find(|c| c.is(namespace, local))
    }

    /// Remove and return the child at `index`
    pub fn detach_child(&mut self, index: usize) -> Option<XmlElement> {
        (index < self.children.len()).then(|| self.children.remove(index))
    }

    /// Detach the child at `index` and attach `replacements` in its place
    pub fn replace_child_with(
        &mut self,
        index: usize,
        replacements: impl IntoIterator<Item = XmlElement>,
    ) -> Option<XmlElement> {
        if index >= self.children.len() {
            return None;
        }
        self.children
            .splice(index..=index, replacements)
            .next()
    }

    /// Iterate over this element and all descendants in document order
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Child-index paths (relative to `self`) of every element matching
    /// `pred`, in document order
    pub fn find_paths<F>(&self, pred: F) -> Vec<Vec<usize>>
    where
        F: Fn(&XmlElement) -> bool,
    {
        let mut paths = Vec::new();
        let mut current = Vec::new();
        collect_paths(self, &pred, &mut current, &mut paths);
        paths
    }

    /// Element at a child-index path
    pub fn get(&self, path: &[usize]) -> Option<&XmlElement> {
        path.iter()
            .try_fold(self, |node, &index| node.children.get(index))
    }

    /// Element at a child-index path, mutably
    pub fn get_mut(&mut self, path: &[usize]) -> Option<&mut XmlElement> {
        path.iter()
            .try_fold(self, |node, &index| node.children.get_mut(index))
    }
}

/// Pre-order iterator over an element tree
pub struct Descendants<'a> {
    stack: Vec<&'a XmlElement>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a XmlElement;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

struct Frame {
    element: XmlElement,
    /// Number of namespace bindings this element pushed on the scope
    pushed: usize,
}

fn collect_paths<F>(
    node: &XmlElement,
    pred: &F,
    current: &mut Vec<usize>,
    out: &mut Vec<Vec<usize>>,
) where
    F: Fn(&XmlElement) -> bool,
{
    if pred(node) {
        out.push(current.clone());
    }
    for (index, child) in node.children.iter().enumerate() {
        current.push(index);
        collect_paths(child, pred, current, out);
        current.pop();
    }
}

fn attach(stack: &mut [Frame], root: &mut Option<XmlElement>, element: XmlElement) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.element.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(Error::InvalidDocument("Multiple root elements".into())),
    }
    Ok(())
}

/// Build an element from a start tag, pushing its namespace declarations
/// onto `scope`. Returns the element and the number of bindings pushed.
fn open_element(start: &BytesStart, scope: &mut Vec<NamespaceDecl>) -> Result<(XmlElement, usize)> {
    let mut decls = Vec::new();
    let mut raw_attrs = Vec::new();

    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let raw = String::from_utf8_lossy(&attr.value).to_string();
        let value = quick_xml::escape::unescape(&raw)
            .map_err(quick_xml::Error::from)?
            .into_owned();

        if key == "xmlns" {
            decls.push((None, value));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            decls.push((Some(prefix.to_string()), value));
        } else {
            raw_attrs.push((key, value));
        }
    }

    let pushed = decls.len();
    scope.extend(decls.iter().cloned());

    let tag = String::from_utf8_lossy(start.name().as_ref()).to_string();
    let mut element = XmlElement::new(resolve(&tag, false, scope)?);
    element.namespace_decls = decls;
    for (key, value) in raw_attrs {
        element.attributes.push(XmlAttribute {
            name: resolve(&key, true, scope)?,
            value,
        });
    }

    Ok((element, pushed))
}

fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, qname),
    }
}

/// Resolve a raw `prefix:local` name against the bindings in scope
fn resolve(qname: &str, is_attribute: bool, scope: &[NamespaceDecl]) -> Result<XmlName> {
    let (prefix, local) = split_qname(qname);
    let namespace = match prefix {
        Some("xml") => Some(XML.to_string()),
        Some(p) => Some(
            lookup_binding(scope, Some(p))
                .ok_or_else(|| Error::UnknownNamespacePrefix(p.to_string()))?
                .to_string(),
        ),
        // Unprefixed attributes never take the default namespace
        None if is_attribute => None,
        None => lookup_binding(scope, None)
            .filter(|uri| !uri.is_empty())
            .map(str::to_string),
    };
    Ok(XmlName {
        namespace,
        local: local.to_string(),
    })
}

fn lookup_binding<'s>(scope: &'s [NamespaceDecl], prefix: Option<&str>) -> Option<&'s str> {
    scope
        .iter()
        .rev()
        .find(|(p, _)| p.as_deref() == prefix)
        .map(|(_, uri)| uri.as_str())
}

/// Prefix currently bound to `uri` and not shadowed by a later binding
fn lookup_prefix(scope: &[NamespaceDecl], uri: &str, allow_default: bool) -> Option<Option<String>> {
    scope.iter().enumerate().rev().find_map(|(i, (prefix, bound))| {
        let usable = bound == uri
            && (allow_default || prefix.is_some())
            && !scope[i + 1..].iter().any(|(later, _)| later == prefix);
        usable.then(|| prefix.clone())
    })
}

/// Choose the serialized `prefix:local` for a name, declaring a binding when
/// none is in scope
fn qualify(
    name: &XmlName,
    is_attribute: bool,
    namespaces: &Namespaces,
    scope: &mut Vec<NamespaceDecl>,
    decls: &mut Vec<NamespaceDecl>,
) -> Result<String> {
    let Some(uri) = name.namespace.as_deref() else {
        if !is_attribute && lookup_binding(scope, None).is_some_and(|d| !d.is_empty()) {
            decls.push((None, String::new()));
            scope.push((None, String::new()));
        }
        return Ok(name.local.clone());
    };

    if uri == XML {
        return Ok(format!("xml:{}", name.local));
    }

    let prefix = match lookup_prefix(scope, uri, !is_attribute) {
        Some(prefix) => prefix,
        None => {
            let declared_here = |p: &str| decls.iter().any(|(d, _)| d.as_deref() == Some(p));
            let prefix = match namespaces.prefix(uri) {
                Some(p) if !declared_here(p) => p.to_string(),
                _ => {
                    let mut n = 0;
                    loop {
                        let candidate = format!("ns{}", n);
                        if lookup_binding(scope, Some(&candidate)).is_none() {
                            break candidate;
                        }
                        n += 1;
                    }
                }
            };
            decls.push((Some(prefix.clone()), uri.to_string()));
            scope.push((Some(prefix.clone()), uri.to_string()));
            Some(prefix)
        }
    };

    Ok(match prefix {
        Some(p) => format!("{}:{}", p, name.local),
        None => name.local.clone(),
    })
}
