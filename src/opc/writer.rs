//! Write side of a package: a ZIP writer that remembers every entry

use crate::error::{Error, Result};
use std::collections::HashSet;
use std::io::{Seek, Write};
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

/// Writes package entries, refusing duplicates
pub struct PackageWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    options: SimpleFileOptions,
    written: HashSet<String>,
}

impl<W: Write + Seek> PackageWriter<W> {
    pub fn new(writer: W, compression: CompressionMethod) -> Self {
        Self {
            zip: ZipWriter::new(writer),
            options: SimpleFileOptions::default().compression_method(compression),
            written: HashSet::new(),
        }
    }

    /// Write one entry
    pub fn write_part(&mut self, name: &str, data: &[u8]) -> Result<()> {
        if !self.written.insert(name.to_string()) {
            return Err(Error::InvalidDocument(format!(
                "package entry '{}' written twice",
                name
            )));
        }
        log::debug!("writing {} ({} bytes)", name, data.len());
        self.zip.start_file(name, self.options)?;
        self.zip.write_all(data)?;
        Ok(())
    }

    /// Finish the archive and return the underlying writer
    pub fn finish(self) -> Result<W> {
        Ok(self.zip.finish()?)
    }
}
