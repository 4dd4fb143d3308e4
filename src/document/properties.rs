//! Package property parts: core (`docProps/core.xml`), extended
//! (`docProps/app.xml`) and web settings (`word/webSettings.xml`)

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::xml::namespace::{EP, VT};
use crate::xml::{ElementFactory, Namespaces, XmlElement};

const W3CDTF: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Dublin Core metadata of a package
#[derive(Clone, Debug, PartialEq)]
pub struct CoreProperties {
    pub title: String,
    pub subject: String,
    pub creator: String,
    pub keywords: Vec<String>,
    /// Defaults to the creator
    pub last_modified_by: String,
    pub revision: u32,
    pub category: Option<String>,
    pub description: Option<String>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl CoreProperties {
    /// Properties stamped with the current time
    pub fn new(title: impl Into<String>, creator: impl Into<String>) -> Self {
        let creator = creator.into();
        let now = Utc::now();
        Self {
            title: title.into(),
            subject: String::new(),
            last_modified_by: creator.clone(),
            creator,
            keywords: Vec::new(),
            revision: 1,
            category: None,
            description: None,
            created: now,
            modified: now,
        }
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn last_modified_by(mut self, name: impl Into<String>) -> Self {
        self.last_modified_by = name.into();
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Build the `cp:coreProperties` element
    pub fn to_element(&self, factory: &ElementFactory<'_>) -> Result<XmlElement> {
        let mut root = factory.element("cp:coreProperties")?;
        factory.declare(&mut root, &["cp", "dc", "dcterms", "dcmitype", "xsi"])?;

        root.push_child(factory.text_element("dc:title", &self.title)?);
        root.push_child(factory.text_element("dc:subject", &self.subject)?);
        root.push_child(factory.text_element("dc:creator", &self.creator)?);
        root.push_child(factory.text_element("cp:keywords", self.keywords.join(","))?);
        root.push_child(factory.text_element("cp:lastModifiedBy", &self.last_modified_by)?);
        root.push_child(factory.text_element("cp:revision", self.revision.to_string())?);
        if let Some(category) = &self.category {
            root.push_child(factory.text_element("cp:category", category)?);
        }
        if let Some(description) = &self.description {
            root.push_child(factory.text_element("dc:description", description)?);
        }
        for (tag, time) in [("dcterms:created", self.created), ("dcterms:modified", self.modified)] {
            let stamp = factory
                .element_with_attrs(tag, &[("xsi:type", "dcterms:W3CDTF")])?
                .with_text(time.format(W3CDTF).to_string());
            root.push_child(stamp);
        }
        Ok(root)
    }

    pub fn to_xml(&self, namespaces: &Namespaces) -> Result<String> {
        self.to_element(&ElementFactory::new(namespaces))?
            .to_xml_string(namespaces, true)
    }
}

/// Extended properties describing the producing application
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppProperties {
    pub application: String,
    pub version: String,
}

impl Default for AppProperties {
    fn default() -> Self {
        Self {
            application: "Microsoft Word 12.0.0".into(),
            version: "12.000".into(),
        }
    }
}

impl AppProperties {
    pub fn new(application: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            version: version.into(),
        }
    }

    /// Property name/value pairs in output order
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("Template", "Normal.dotm"),
            ("TotalTime", "6"),
            ("Pages", "1"),
            ("Words", "83"),
            ("Characters", "475"),
            ("Application", &self.application),
            ("DocSecurity", "0"),
            ("Lines", "12"),
            ("Paragraphs", "8"),
            ("ScaleCrop", "false"),
            ("LinksUpToDate", "false"),
            ("CharactersWithSpaces", "583"),
            ("SharedDoc", "false"),
            ("HyperlinksChanged", "false"),
            ("AppVersion", &self.version),
        ]
    }

    /// Build the `Properties` element (extended-properties default namespace)
    pub fn to_element(&self, factory: &ElementFactory<'_>) -> Result<XmlElement> {
        let mut root = factory.element("ep:Properties")?;
        root.declare_namespace(None, EP);
        root.declare_namespace(Some("vt"), VT);
        for (name, value) in self.entries() {
            root.push_child(factory.text_element(&format!("ep:{name}"), value)?);
        }
        Ok(root)
    }

    pub fn to_xml(&self, namespaces: &Namespaces) -> Result<String> {
        self.to_element(&ElementFactory::new(namespaces))?
            .to_xml_string(namespaces, true)
    }
}

/// The `w:webSettings` element written for generated packages
pub fn web_settings(factory: &ElementFactory<'_>) -> Result<XmlElement> {
    let mut root = factory.element("w:webSettings")?;
    factory.declare(&mut root, &["w"])?;
    root.push_child(factory.element("w:allowPNG")?);
    root.push_child(factory.element("w:doNotSaveAsSingleFile")?);
    Ok(root)
}

pub fn web_settings_xml(namespaces: &Namespaces) -> Result<String> {
    web_settings(&ElementFactory::new(namespaces))?.to_xml_string(namespaces, true)
}
