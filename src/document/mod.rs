//! Document model - the body tree plus the manifests it is packaged with

pub mod fragments;
pub mod matcher;
pub mod properties;

pub use matcher::ReplacementPayload;
pub use properties::{AppProperties, CoreProperties};

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Cursor, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use zip::CompressionMethod;

use crate::error::{Error, Result};
use crate::opc::{
    self, rel_types, well_known, ContentTypes, PackageWriter, PartUri, Relationships,
    TargetMode, TemplateArchive, TemplateDir,
};
use crate::xml::namespace::{DOCUMENT_PREFIXES, W};
use crate::xml::{ElementFactory, Namespaces, XmlElement, XmlName};

/// Window used by [`Document::replace`]
pub const DEFAULT_WINDOW: usize = 3;

/// Whether a document is backed by a template archive
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentState {
    /// Created from scratch (possibly with a template directory)
    Fresh,
    /// Loaded from a template archive
    Templated,
}

/// Options for creating a [`Document`]
#[derive(Clone, Debug)]
pub struct DocumentOptions {
    template_file: Option<PathBuf>,
    template_dir: Option<PathBuf>,
    require_template: bool,
    namespaces: Option<Arc<Namespaces>>,
    compression: CompressionMethod,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            template_file: None,
            template_dir: None,
            require_template: false,
            namespaces: None,
            compression: CompressionMethod::Deflated,
        }
    }
}

impl DocumentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the body and manifests from an existing package
    pub fn template_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.template_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Copy the parts of an unpacked package directory on save
    pub fn template_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.template_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Fail with [`Error::TemplateNotFound`] instead of falling back to a
    /// blank document when a template path does not exist
    pub fn require_template(mut self, require: bool) -> Self {
        self.require_template = require;
        self
    }

    /// Prefix registry used for element construction and serialization
    pub fn namespaces(mut self, namespaces: Arc<Namespaces>) -> Self {
        self.namespaces = Some(namespaces);
        self
    }

    /// Compression of written entries (default Deflated)
    pub fn compression(mut self, compression: CompressionMethod) -> Self {
        self.compression = compression;
        self
    }

    /// Create the document
    pub fn open(self) -> Result<Document> {
        let namespaces = self
            .namespaces
            .clone()
            .unwrap_or_else(|| Arc::new(Namespaces::standard().clone()));

        if let Some(file) = &self.template_file {
            if file.is_file() {
                if let Some(dir) = &self.template_dir {
                    log::warn!(
                        "template file {} and directory {} given; ignoring the directory",
                        file.display(),
                        dir.display()
                    );
                }
                let archive = TemplateArchive::open(file)?;
                return Document::from_archive(archive, namespaces, self.compression);
            }
            self.missing(file)?;
        }

        if let Some(dir) = &self.template_dir {
            if dir.is_dir() {
                let seed = Seed::Directory(TemplateDir::new(dir));
                return Ok(Document::fresh(namespaces, seed, self.compression));
            }
            self.missing(dir)?;
        }

        Ok(Document::fresh(namespaces, Seed::Blank, self.compression))
    }

    fn missing(&self, path: &Path) -> Result<()> {
        if self.require_template {
            return Err(Error::TemplateNotFound(path.to_path_buf()));
        }
        log::warn!("template {} not found; starting blank", path.display());
        Ok(())
    }
}

/// What a document was seeded from
#[derive(Debug)]
enum Seed {
    Blank,
    Archive(TemplateArchive),
    Directory(TemplateDir),
}

/// A DOCX document being built or edited
#[derive(Debug)]
pub struct Document {
    namespaces: Arc<Namespaces>,
    /// `w:document` element
    root: XmlElement,
    /// Position of `w:body` among the root's children
    body_index: usize,
    document_uri: PartUri,
    relationships: Relationships,
    content_types: ContentTypes,
    core_properties: Option<CoreProperties>,
    /// Regenerated on save when set
    app_properties: Option<AppProperties>,
    seed: Seed,
    compression: CompressionMethod,
}

impl Document {
    /// Create a blank document
    pub fn new() -> Self {
        Self::fresh(
            Arc::new(Namespaces::standard().clone()),
            Seed::Blank,
            CompressionMethod::Deflated,
        )
    }

    /// Open a template package; a missing file is an error
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        DocumentOptions::new()
            .template_file(path)
            .require_template(true)
            .open()
    }

    /// Start from an unpacked package directory; a missing directory is an
    /// error
    pub fn from_template_dir<P: AsRef<Path>>(path: P) -> Result<Self> {
        DocumentOptions::new()
            .template_dir(path)
            .require_template(true)
            .open()
    }

    fn fresh(namespaces: Arc<Namespaces>, seed: Seed, compression: CompressionMethod) -> Self {
        let mut root = XmlElement::new(XmlName::new(Some(W), "document"));
        for &prefix in DOCUMENT_PREFIXES {
            if let Some(uri) = namespaces.uri(prefix) {
                root.declare_namespace(Some(prefix), uri);
            }
        }
        root.push_child(XmlElement::new(XmlName::new(Some(W), "body")));

        Self {
            namespaces,
            root,
            body_index: 0,
            document_uri: well_known::document(),
            relationships: Relationships::defaults(),
            content_types: ContentTypes::defaults(),
            core_properties: None,
            app_properties: Some(AppProperties::default()),
            seed,
            compression,
        }
    }

    fn from_archive(
        mut archive: TemplateArchive,
        namespaces: Arc<Namespaces>,
        compression: CompressionMethod,
    ) -> Result<Self> {
        let document_uri = archive.main_document_uri()?;
        let root = XmlElement::parse(&archive.read_string(document_uri.zip_name())?)?;
        let body_index = root
            .children
            .iter()
            .position(|c| c.is(W, "body"))
            .ok_or_else(|| Error::InvalidDocument("Missing w:body element".into()))?;

        let rels_uri = document_uri.relationships_uri();
        let relationships = match archive.read(rels_uri.zip_name())? {
            Some(data) => Relationships::from_part(&rels_uri, std::str::from_utf8(&data)?)?,
            None => {
                log::warn!("template has no {}; starting with no relationships", rels_uri);
                Relationships::new()
            }
        };
        let content_types =
            ContentTypes::from_xml(&archive.read_string(opc::CONTENT_TYPES_PART)?)?;

        log::debug!(
            "loaded {} from {} ({} relationships)",
            document_uri,
            archive.path().display(),
            relationships.len()
        );

        Ok(Self {
            namespaces,
            root,
            body_index,
            document_uri,
            relationships,
            content_types,
            core_properties: None,
            app_properties: None,
            seed: Seed::Archive(archive),
            compression,
        })
    }

    /// Whether the document is backed by a template archive
    pub fn state(&self) -> DocumentState {
        match self.seed {
            Seed::Archive(_) => DocumentState::Templated,
            Seed::Blank | Seed::Directory(_) => DocumentState::Fresh,
        }
    }

    /// Path of the main document part
    pub fn document_uri(&self) -> &PartUri {
        &self.document_uri
    }

    /// The `w:document` element
    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    /// The `w:body` element
    pub fn body(&self) -> &XmlElement {
        &self.root.children[self.body_index]
    }

    pub fn body_mut(&mut self) -> &mut XmlElement {
        &mut self.root.children[self.body_index]
    }

    /// Append a fragment to the body
    pub fn add(&mut self, element: XmlElement) {
        self.body_mut().push_child(element);
    }

    /// Append an element directly to `w:document`
    pub fn append_to_root(&mut self, element: XmlElement) {
        self.root.push_child(element);
    }

    /// Last text leaf whose own text matches
    pub fn search(&self, pattern: &Regex) -> Option<&XmlElement> {
        matcher::search(&self.root, pattern)
    }

    /// Replace matches confined to single text leaves
    pub fn replace_in_leaves(&mut self, pattern: &Regex, payload: &ReplacementPayload) -> usize {
        matcher::replace_in_leaves(&mut self.root, pattern, payload)
    }

    /// Replace matches spread over up to [`DEFAULT_WINDOW`] text leaves
    pub fn replace(&mut self, pattern: &Regex, payload: &ReplacementPayload) -> usize {
        // DEFAULT_WINDOW is non-zero
        matcher::replace(&mut self.root, pattern, payload, DEFAULT_WINDOW).unwrap_or_default()
    }

    /// Replace matches spread over up to `window` text leaves
    pub fn replace_with_window(
        &mut self,
        pattern: &Regex,
        payload: &ReplacementPayload,
        window: usize,
    ) -> Result<usize> {
        matcher::replace(&mut self.root, pattern, payload, window)
    }

    /// Compile `pattern` and replace across runs with the default window
    pub fn replace_pattern(
        &mut self,
        pattern: &str,
        payload: impl Into<ReplacementPayload>,
    ) -> Result<usize> {
        let pattern = Regex::new(pattern)?;
        Ok(self.replace(&pattern, &payload.into()))
    }

    /// Text of every non-empty paragraph
    pub fn paragraph_texts(&self) -> Vec<String> {
        matcher::paragraph_texts(&self.root)
    }

    /// Relationships of the main document part
    pub fn relationships(&self) -> &Relationships {
        &self.relationships
    }

    pub fn relationships_mut(&mut self) -> &mut Relationships {
        &mut self.relationships
    }

    pub fn content_types(&self) -> &ContentTypes {
        &self.content_types
    }

    pub fn content_types_mut(&mut self) -> &mut ContentTypes {
        &mut self.content_types
    }

    pub fn core_properties(&self) -> Option<&CoreProperties> {
        self.core_properties.as_ref()
    }

    /// Write `docProps/core.xml` on save
    pub fn set_core_properties(&mut self, properties: CoreProperties) {
        self.core_properties = Some(properties);
    }

    /// Extended properties; accessing them on a templated document makes
    /// the save regenerate `docProps/app.xml`
    pub fn app_properties_mut(&mut self) -> &mut AppProperties {
        self.app_properties.get_or_insert_with(AppProperties::default)
    }

    pub fn namespaces(&self) -> &Namespaces {
        &self.namespaces
    }

    /// Element factory over this document's namespace registry
    pub fn factory(&self) -> ElementFactory<'_> {
        ElementFactory::new(&self.namespaces)
    }

    /// Save the document to a file
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)?;
        let mut writer = self.write_to(BufWriter::new(file))?;
        writer.flush()?;
        log::debug!("saved {}", path.display());
        Ok(())
    }

    /// Save the document to bytes
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        Ok(self.write_to(Cursor::new(Vec::new()))?.into_inner())
    }

    /// Write the package and return the writer
    pub fn write_to<W: Write + Seek>(&mut self, writer: W) -> Result<W> {
        let plan = self.plan()?;
        let written: HashSet<&str> = plan.iter().map(|(name, _)| name.as_str()).collect();
        let content_types = self.output_content_types(&plan, &written)?;
        self.report_dangling(&written);

        let mut out = PackageWriter::new(writer, self.compression);
        for (name, source) in &plan {
            match source {
                Source::Bytes(data) => out.write_part(name, data)?,
                Source::ContentTypes => {
                    out.write_part(name, content_types.to_xml(&self.namespaces)?.as_bytes())?
                }
                Source::Archive => {
                    let Seed::Archive(archive) = &mut self.seed else {
                        return Err(Error::MissingPart(name.clone()));
                    };
                    let data = archive
                        .read(name)?
                        .ok_or_else(|| Error::MissingPart(name.clone()))?;
                    out.write_part(name, &data)?;
                }
                Source::File(path) => out.write_part(name, &fs::read(path)?)?,
                Source::Media(path) => {
                    let data = fs::read(path).map_err(|e| Error::MediaSourceUnreadable {
                        path: path.clone(),
                        reason: e.to_string(),
                    })?;
                    out.write_part(name, &data)?;
                }
            }
        }
        out.finish()
    }

    /// Every entry of the output package, in write order
    fn plan(&self) -> Result<Vec<(String, Source)>> {
        let media = self.media_entries()?;
        let is_media = |name: &str| media.iter().any(|(m, _)| m == name);
        let mut plan = Vec::new();

        match &self.seed {
            Seed::Blank => {
                plan.push((
                    well_known::PACKAGE_RELS.to_string(),
                    Source::xml(self.package_relationships().to_xml(&self.namespaces)?),
                ));
                plan.extend(self.app_part()?);
                plan.extend(self.core_part()?);
                plan.push(self.web_settings_part()?);
                plan.push(self.relationships_part()?);
                plan.push(content_types_entry());
            }
            Seed::Directory(dir) => {
                plan.extend(self.core_part()?);
                plan.extend(self.app_part()?);
                plan.push(content_types_entry());
                plan.push(self.web_settings_part()?);
                plan.push(self.relationships_part()?);

                let generated: HashSet<String> = plan.iter().map(|(n, _)| n.clone()).collect();
                for (path, name) in dir.copy_through_files(&self.document_uri.relationships_uri())? {
                    if is_media(&name) || generated.contains(&name) {
                        continue;
                    }
                    plan.push((name, Source::File(path)));
                }
            }
            Seed::Archive(archive) => {
                let mut regenerated = Vec::new();
                regenerated.extend(self.core_part()?);
                regenerated.extend(self.app_part()?);

                let rels_uri = self.document_uri.relationships_uri();
                let excluded = |name: &str| {
                    name == self.document_uri.zip_name()
                        || name == opc::CONTENT_TYPES_PART
                        || name == rels_uri.zip_name()
                        || is_media(name)
                        || regenerated.iter().any(|(r, _)| r == name)
                };
                for name in archive.entry_names() {
                    if !excluded(&name) {
                        plan.push((name, Source::Archive));
                    }
                }
                plan.push(self.relationships_part()?);
                plan.push(content_types_entry());
                plan.extend(regenerated);
            }
        }

        for (name, path) in media {
            plan.push((name, Source::Media(path)));
        }
        plan.push((
            self.document_uri.zip_name().to_string(),
            Source::xml(self.root.to_xml_string(&self.namespaces, true)?),
        ));
        Ok(plan)
    }

    /// Pending media as (entry name, source), first source wins per name
    fn media_entries(&self) -> Result<Vec<(String, PathBuf)>> {
        let mut entries: Vec<(String, PathBuf)> = Vec::new();
        for media in self.relationships.pending_media() {
            let uri = self.document_uri.resolve(&format!("media/{}", media.name))?;
            let name = uri.zip_name().to_string();
            match entries.iter().find(|(n, _)| *n == name) {
                Some((_, source)) if *source != media.source => log::warn!(
                    "{} queued from {} and {}; keeping the first",
                    name,
                    source.display(),
                    media.source.display()
                ),
                Some(_) => {}
                None => entries.push((name, media.source.clone())),
            }
        }
        Ok(entries)
    }

    fn package_relationships(&self) -> Relationships {
        let mut rels = Relationships::new();
        rels.append(rel_types::OFFICE_DOCUMENT, self.document_uri.zip_name());
        if self.core_properties.is_some() {
            rels.append(rel_types::CORE_PROPERTIES, well_known::core_props().zip_name());
        }
        if self.app_properties.is_some() {
            rels.append(rel_types::EXTENDED_PROPERTIES, well_known::app_props().zip_name());
        }
        rels
    }

    fn core_part(&self) -> Result<Option<(String, Source)>> {
        self.core_properties
            .as_ref()
            .map(|core| {
                Ok((
                    well_known::core_props().zip_name().to_string(),
                    Source::xml(core.to_xml(&self.namespaces)?),
                ))
            })
            .transpose()
    }

    fn app_part(&self) -> Result<Option<(String, Source)>> {
        self.app_properties
            .as_ref()
            .map(|app| {
                Ok((
                    well_known::app_props().zip_name().to_string(),
                    Source::xml(app.to_xml(&self.namespaces)?),
                ))
            })
            .transpose()
    }

    fn web_settings_part(&self) -> Result<(String, Source)> {
        Ok((
            self.web_settings_uri()?.zip_name().to_string(),
            Source::xml(properties::web_settings_xml(&self.namespaces)?),
        ))
    }

    fn relationships_part(&self) -> Result<(String, Source)> {
        Ok((
            self.document_uri.relationships_uri().zip_name().to_string(),
            Source::xml(self.relationships.to_xml(&self.namespaces)?),
        ))
    }

    fn web_settings_uri(&self) -> Result<PartUri> {
        self.document_uri.resolve("webSettings.xml")
    }

    /// Registry as written: regenerated parts are covered, only written
    /// parts keep their override, and parts typed by a template Default the
    /// built-in table lacks get an Override
    fn output_content_types(
        &self,
        plan: &[(String, Source)],
        written: &HashSet<&str>,
    ) -> Result<ContentTypes> {
        let mut content_types = self.content_types.clone();
        content_types.ensure_override(self.document_uri.clone(), opc::MAIN_DOCUMENT);
        if self.core_properties.is_some() {
            content_types.ensure_override(well_known::core_props(), opc::CORE_PROPERTIES);
        }
        if self.app_properties.is_some() {
            content_types.ensure_override(well_known::app_props(), opc::EXTENDED_PROPERTIES);
        }
        if !matches!(self.seed, Seed::Archive(_)) {
            content_types.ensure_override(self.web_settings_uri()?, opc::WEB_SETTINGS);
        }
        content_types.retain_parts(|uri| written.contains(uri.zip_name()));

        for (name, _) in plan {
            if name == opc::CONTENT_TYPES_PART {
                continue;
            }
            let uri = PartUri::from_zip_name(name)?;
            if !content_types.cover_from_loaded_defaults(&uri) {
                log::warn!("no content type covers {}", uri);
            }
        }
        Ok(content_types)
    }

    fn report_dangling(&self, written: &HashSet<&str>) {
        for rel in self.relationships.iter() {
            if rel.target_mode == TargetMode::External {
                continue;
            }
            match self.document_uri.resolve(&rel.target) {
                Ok(uri) if written.contains(uri.zip_name()) => {}
                Ok(uri) => log::warn!("{} targets {}, which is not in the package", rel.id, uri),
                Err(e) => log::warn!("{} has an unusable target: {}", rel.id, e),
            }
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Where the bytes of one output entry come from
enum Source {
    Bytes(Vec<u8>),
    /// The output content types manifest
    ContentTypes,
    /// Same-named entry of the template archive
    Archive,
    /// Template directory file
    File(PathBuf),
    /// Queued media file
    Media(PathBuf),
}

impl Source {
    fn xml(xml: String) -> Self {
        Source::Bytes(xml.into_bytes())
    }
}

fn content_types_entry() -> (String, Source) {
    (opc::CONTENT_TYPES_PART.to_string(), Source::ContentTypes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::fragments::ParagraphBuilder;
    use std::io::Read;
    use zip::ZipArchive;

    fn entries(bytes: Vec<u8>) -> Vec<String> {
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        archive.file_names().map(str::to_string).collect()
    }

    fn read_entry(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut content = String::new();
        archive
            .by_name(name)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        content
    }

    #[test]
    fn test_new_document_shell() {
        let doc = Document::new();
        assert_eq!(doc.state(), DocumentState::Fresh);
        assert!(doc.root().is(W, "document"));
        assert!(doc.body().is(W, "body"));
        assert!(doc.body().children.is_empty());
        assert_eq!(doc.relationships().len(), 6);
        assert_eq!(doc.content_types().overrides().count(), 9);
        assert!(doc.core_properties().is_none());
    }

    #[test]
    fn test_fresh_save_layout() {
        let mut doc = Document::new();
        let p = ParagraphBuilder::new("Hello").build(&doc.factory()).unwrap();
        doc.add(p);

        let bytes = doc.to_bytes().unwrap();
        let names = entries(bytes.clone());

        assert_eq!(
            names,
            [
                "_rels/.rels",
                "docProps/app.xml",
                "word/webSettings.xml",
                "word/_rels/document.xml.rels",
                "[Content_Types].xml",
                "word/document.xml",
            ]
        );

        let ct = ContentTypes::from_xml(&read_entry(&bytes, "[Content_Types].xml")).unwrap();
        let overrides: Vec<_> = ct.overrides().map(|(u, _)| u.as_str().to_string()).collect();
        assert_eq!(
            overrides,
            ["/docProps/app.xml", "/word/document.xml", "/word/webSettings.xml"]
        );

        let rels = Relationships::from_xml(&read_entry(&bytes, "_rels/.rels")).unwrap();
        assert_eq!(
            rels.by_type(rel_types::OFFICE_DOCUMENT).unwrap().target,
            "word/document.xml"
        );
        assert!(rels.by_type(rel_types::CORE_PROPERTIES).is_none());
    }

    #[test]
    fn test_core_properties_are_written_when_set() {
        let mut doc = Document::new();
        doc.set_core_properties(CoreProperties::new("Title", "Author"));

        let bytes = doc.to_bytes().unwrap();

        assert!(entries(bytes.clone()).contains(&"docProps/core.xml".to_string()));
        let ct = ContentTypes::from_xml(&read_entry(&bytes, "[Content_Types].xml")).unwrap();
        assert_eq!(
            ct.get(&well_known::core_props()),
            Some(opc::CORE_PROPERTIES)
        );
        let rels = Relationships::from_xml(&read_entry(&bytes, "_rels/.rels")).unwrap();
        assert!(rels.by_type(rel_types::CORE_PROPERTIES).is_some());
    }

    #[test]
    fn test_missing_template_falls_back() {
        let doc = DocumentOptions::new()
            .template_file("/definitely/not/here.docx")
            .open()
            .unwrap();
        assert_eq!(doc.state(), DocumentState::Fresh);
    }

    #[test]
    fn test_missing_template_required() {
        let result = DocumentOptions::new()
            .template_file("/definitely/not/here.docx")
            .require_template(true)
            .open();
        assert!(matches!(result, Err(Error::TemplateNotFound(_))));

        assert!(matches!(
            Document::from_template_dir("/definitely/not/here"),
            Err(Error::TemplateNotFound(_))
        ));
    }

    #[test]
    fn test_replace_uses_default_window() {
        let mut doc = Document::new();
        let f = doc.factory();
        let mut p = f.element("w:p").unwrap();
        for piece in ["{{a", "b", "c}}"] {
            p.push_child(
                f.element("w:r")
                    .unwrap()
                    .with_child(f.text_element("w:t", piece).unwrap()),
            );
        }
        doc.add(p);

        let re = Regex::new(r"\{\{abc\}\}").unwrap();
        assert_eq!(doc.replace(&re, &"xyz".into()), 1);
        assert_eq!(doc.paragraph_texts(), ["xyz"]);
        assert!(matches!(
            doc.replace_with_window(&re, &"x".into(), 0),
            Err(Error::InvalidWindowSize(0))
        ));
    }

    #[test]
    fn test_replace_pattern_rejects_bad_regex() {
        let mut doc = Document::new();
        assert!(matches!(doc.replace_pattern("(", "x"), Err(Error::Regex(_))));
        assert_eq!(doc.replace_pattern("nothing", "x").unwrap(), 0);
    }

    #[test]
    fn test_app_properties_mut() {
        let mut doc = Document::new();
        doc.app_properties_mut().application = "docx-splice".into();
        let bytes = doc.to_bytes().unwrap();
        assert!(read_entry(&bytes, "docProps/app.xml")
            .contains("<Application>docx-splice</Application>"));
    }
}
