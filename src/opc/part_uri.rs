//! Part URI handling for OPC packages

use crate::error::{Error, Result};
use std::fmt;

/// Absolute path of a part inside a package, e.g. `/word/document.xml`
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartUri {
    path: String,
}

impl PartUri {
    /// Create a new PartUri, normalizing to a single leading '/' and no
    /// trailing '/'
    pub fn new(path: &str) -> Result<Self> {
        let trimmed = path.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(Error::InvalidPartUri(format!("empty path '{}'", path)));
        }

        let normalized = if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{}", trimmed)
        };

        if normalized.contains("//") || normalized.contains('\\') {
            return Err(Error::InvalidPartUri(format!(
                "invalid path '{}': contains empty segment or backslash",
                path
            )));
        }

        Ok(Self { path: normalized })
    }

    /// Create from a ZIP entry name such as `word/media/image1.png`
    pub fn from_zip_name(name: &str) -> Result<Self> {
        Self::new(name)
    }

    pub(crate) fn from_static(path: &'static str) -> Self {
        Self {
            path: path.to_string(),
        }
    }

    /// Get the path as a string slice
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// Name of the entry inside the ZIP archive (no leading '/')
    pub fn zip_name(&self) -> &str {
        &self.path[1..]
    }

    /// Get the file name portion
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or_default()
    }

    /// Get the file extension, lowercased
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name();
        name.rfind('.')
            .map(|dot| &name[dot + 1..])
            .filter(|ext| !ext.is_empty())
            .map(str::to_lowercase)
    }

    /// Get the parent directory path (`/word` for `/word/document.xml`,
    /// empty for top-level parts)
    pub fn directory(&self) -> &str {
        match self.path.rfind('/') {
            Some(pos) => &self.path[..pos],
            None => "",
        }
    }

    /// Get the relationships URI for this part.
    ///
    /// For `/word/document.xml`, returns `/word/_rels/document.xml.rels`
    pub fn relationships_uri(&self) -> PartUri {
        PartUri {
            path: format!("{}/_rels/{}.rels", self.directory(), self.file_name()),
        }
    }

    /// Resolve a relationship target against this part's directory.
    ///
    /// For `/word/document.xml` and `../media/image1.png`, returns
    /// `/media/image1.png`
    pub fn resolve(&self, relative: &str) -> Result<PartUri> {
        if relative.starts_with('/') {
            return PartUri::new(relative);
        }

        let mut segments: Vec<&str> = self
            .directory()
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        for segment in relative.split('/') {
            match segment {
                "" | "." => continue,
                ".." => {
                    segments.pop();
                }
                s => segments.push(s),
            }
        }

        PartUri::new(&segments.join("/"))
    }
}

impl fmt::Display for PartUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl std::str::FromStr for PartUri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PartUri::new(s)
    }
}

/// Well-known part URIs of a word-processing package
pub mod well_known {
    use super::PartUri;

    pub const CONTENT_TYPES: &str = "[Content_Types].xml";
    pub const PACKAGE_RELS: &str = "_rels/.rels";

    pub fn document() -> PartUri {
        PartUri::from_static("/word/document.xml")
    }

    pub fn core_props() -> PartUri {
        PartUri::from_static("/docProps/core.xml")
    }

    pub fn app_props() -> PartUri {
        PartUri::from_static("/docProps/app.xml")
    }
}
