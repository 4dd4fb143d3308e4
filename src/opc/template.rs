//! Read side of a template package: a ZIP archive or an unpacked directory

use crate::error::{Error, Result};
use crate::opc::part_uri::well_known;
use crate::opc::relationships::rel_types;
use crate::opc::{PartUri, Relationships};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::read::ZipArchive;

/// An existing package opened for reading and copy-through
pub struct TemplateArchive {
    path: PathBuf,
    archive: ZipArchive<BufReader<File>>,
}

impl TemplateArchive {
    /// Open a template package from a file path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let archive = ZipArchive::new(BufReader::new(file))?;
        log::debug!("opened template {} ({} entries)", path.display(), archive.len());
        Ok(Self { path, archive })
    }

    /// Path the archive was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names of all file entries (directories excluded), in archive order
    pub fn entry_names(&self) -> Vec<String> {
        self.archive
            .file_names()
            .filter(|name| !name.ends_with('/'))
            .map(str::to_string)
            .collect()
    }

    /// Read an entry; `None` when the archive has no such entry
    pub fn read(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        let mut file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(Some(data))
    }

    /// Read a required entry as UTF-8 text
    pub fn read_string(&mut self, name: &str) -> Result<String> {
        let data = self
            .read(name)?
            .ok_or_else(|| Error::MissingPart(name.to_string()))?;
        Ok(std::str::from_utf8(&data)?.to_string())
    }

    /// Locate the main document part through the package relationships,
    /// falling back to `/word/document.xml`
    pub fn main_document_uri(&mut self) -> Result<PartUri> {
        let Some(data) = self.read(well_known::PACKAGE_RELS)? else {
            return Ok(well_known::document());
        };
        let xml = std::str::from_utf8(&data)?;
        let rels = Relationships::from_part(&PartUri::new(well_known::PACKAGE_RELS)?, xml)?;
        match rels.by_type(rel_types::OFFICE_DOCUMENT) {
            Some(rel) => PartUri::new(&rel.target),
            None => Ok(well_known::document()),
        }
    }
}

impl fmt::Debug for TemplateArchive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateArchive")
            .field("path", &self.path)
            .field("entries", &self.archive.len())
            .finish()
    }
}

/// An unpacked template package on disk
#[derive(Clone, Debug)]
pub struct TemplateDir {
    root: PathBuf,
}

/// File names never copied from a template directory because they are
/// regenerated on save
pub const DIR_IGNORED_FILE_NAMES: &[&str] = &[
    "Thumbs.db",
    ".DS_STORE",
    "document.xml",
    "core.xml",
    "app.xml",
    "[Content_Types].xml",
    "webSettings.xml",
];

impl TemplateDir {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every regular file below the root as (source path, entry name),
    /// sorted by entry name. Entry names use '/' separators.
    pub fn files(&self) -> Result<Vec<(PathBuf, String)>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(true) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let relative = path.strip_prefix(&self.root).map_err(|_| {
                Error::InvalidPartUri(format!("{} is outside the template", path.display()))
            })?;
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.push((path.to_path_buf(), name));
        }
        files.sort_by(|a, b| a.1.cmp(&b.1));
        Ok(files)
    }

    /// Files that are copied through on save: everything except the
    /// ignore list and the regenerated document relationships manifest
    pub fn copy_through_files(&self, document_rels: &PartUri) -> Result<Vec<(PathBuf, String)>> {
        Ok(self
            .files()?
            .into_iter()
            .filter(|(path, name)| {
                let file_name = path
                    .file_name()
                    .map(|f| f.to_string_lossy())
                    .unwrap_or_default();
                !DIR_IGNORED_FILE_NAMES.contains(&&*file_name)
                    && name != document_rels.zip_name()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_dir_copy_through_honours_ignore_list() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("word/_rels")).unwrap();
        fs::create_dir_all(root.join("_rels")).unwrap();
        fs::write(root.join("word/styles.xml"), "<styles/>").unwrap();
        fs::write(root.join("word/document.xml"), "<doc/>").unwrap();
        fs::write(root.join("word/webSettings.xml"), "<ws/>").unwrap();
        fs::write(root.join("word/_rels/document.xml.rels"), "<r/>").unwrap();
        fs::write(root.join("_rels/.rels"), "<r/>").unwrap();
        fs::write(root.join("Thumbs.db"), "x").unwrap();

        let template = TemplateDir::new(root);
        let names: Vec<_> = template
            .copy_through_files(&well_known::document().relationships_uri())
            .unwrap()
            .into_iter()
            .map(|(_, name)| name)
            .collect();

        assert_eq!(names, ["_rels/.rels", "word/styles.xml"]);
    }
}
