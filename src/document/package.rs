/*!
 * ZIP-based document store for Office Open XML packages.
 *
 * An `OfficePackage` is the handle for one open-mutate-save sequence on an
 * `.xlsx` or `.docx` file. Parts are read lazily, replacements are buffered
 * in memory, and `save` rewrites the package through a temporary file in the
 * same directory. Parts that were not replaced are raw-copied, so their
 * compressed bytes stay identical to the source. The underlying file handle
 * is released when the package is saved or dropped, on every exit path.
 */

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use log::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::errors::DocumentError;

/// Open handle on an OOXML package
pub struct OfficePackage {
    path: PathBuf,
    archive: ZipArchive<BufReader<File>>,
    replaced: BTreeMap<String, Vec<u8>>,
}

impl OfficePackage {
    /// Open a package for reading and editing
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| DocumentError::unreadable(&path, e))?;
        let archive = ZipArchive::new(BufReader::new(file))
            .map_err(|e| DocumentError::unreadable(&path, format!("not a valid package: {}", e)))?;

        Ok(Self {
            path,
            archive,
            replaced: BTreeMap::new(),
        })
    }

    /// Path of the package on disk
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a part exists, including parts added by `replace_part`
    pub fn has_part(&self, name: &str) -> bool {
        self.replaced.contains_key(name) || self.archive.file_names().any(|n| n == name)
    }

    /// Read a part, seeing pending replacements
    pub fn read_part(&mut self, name: &str) -> Result<Vec<u8>, DocumentError> {
        if let Some(bytes) = self.replaced.get(name) {
            return Ok(bytes.clone());
        }

        let mut entry = self
            .archive
            .by_name(name)
            .map_err(|e| DocumentError::unreadable(&self.path, format!("missing part {}: {}", name, e)))?;
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| DocumentError::unreadable(&self.path, format!("cannot read part {}: {}", name, e)))?;
        Ok(bytes)
    }

    /// Read a part as UTF-8 text
    pub fn read_part_string(&mut self, name: &str) -> Result<String, DocumentError> {
        let bytes = self.read_part(name)?;
        String::from_utf8(bytes)
            .map_err(|e| DocumentError::unreadable(&self.path, format!("part {} is not UTF-8: {}", name, e)))
    }

    /// Read a part if it exists
    pub fn read_optional_part_string(&mut self, name: &str) -> Result<Option<String>, DocumentError> {
        if self.has_part(name) {
            self.read_part_string(name).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Stage new content for a part, written on `save`
    pub fn replace_part(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.replaced.insert(name.into(), bytes);
    }

    /// Write staged replacements back to the package path and release the handle
    pub fn save(self) -> Result<(), DocumentError> {
        let Self {
            path,
            mut archive,
            mut replaced,
        } = self;

        if replaced.is_empty() {
            return Ok(());
        }

        let fail = |reason: String| DocumentError::write_failure(&path, reason);
        let directory = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let mut temp = tempfile::Builder::new()
            .prefix(".docxlate-")
            .suffix(".tmp")
            .tempfile_in(directory)
            .map_err(|e| fail(format!("cannot create temporary file: {}", e)))?;

        {
            let mut writer = ZipWriter::new(temp.as_file_mut());

            for index in 0..archive.len() {
                let entry = archive
                    .by_index(index)
                    .map_err(|e| fail(format!("cannot read entry {}: {}", index, e)))?;
                let name = entry.name().to_string();

                match replaced.remove(&name) {
                    Some(bytes) => {
                        let method = match entry.compression() {
                            CompressionMethod::Stored => CompressionMethod::Stored,
                            _ => CompressionMethod::Deflated,
                        };
                        drop(entry);
                        debug!("Rewriting part {} ({} bytes)", name, bytes.len());
                        write_entry(&mut writer, &name, &bytes, method).map_err(fail)?;
                    }
                    None => writer
                        .raw_copy_file(entry)
                        .map_err(|e| fail(format!("cannot copy part {}: {}", name, e)))?,
                }
            }

            for (name, bytes) in &replaced {
                debug!("Adding part {} ({} bytes)", name, bytes.len());
                write_entry(&mut writer, name, bytes, CompressionMethod::Deflated).map_err(fail)?;
            }

            writer
                .finish()
                .map_err(|e| fail(format!("cannot finish package: {}", e)))?;
        }

        drop(archive);
        temp.persist(&path)
            .map_err(|e| fail(format!("cannot replace package: {}", e.error)))?;
        Ok(())
    }
}

fn write_entry<W: Write + std::io::Seek>(
    writer: &mut ZipWriter<W>,
    name: &str,
    bytes: &[u8],
    method: CompressionMethod,
) -> Result<(), String> {
    let options = SimpleFileOptions::default().compression_method(method);
    writer
        .start_file(name.to_string(), options)
        .map_err(|e| format!("cannot start part {}: {}", name, e))?;
    writer
        .write_all(bytes)
        .map_err(|e| format!("cannot write part {}: {}", name, e))
}

/// Resolve a relationship target against the folder of the part that owns it
///
/// `resolve_target("xl/worksheets", "../drawings/drawing1.xml")` gives
/// `xl/drawings/drawing1.xml`; absolute targets start at the package root.
pub fn resolve_target(base_dir: &str, target: &str) -> String {
    let mut segments: Vec<&str> = if target.starts_with('/') {
        Vec::new()
    } else {
        base_dir.split('/').filter(|s| !s.is_empty()).collect()
    };

    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    segments.join("/")
}

/// Relationship file that belongs to a part, e.g. `xl/_rels/workbook.xml.rels`
pub fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Folder of a part, used as the base for its relationship targets
pub fn part_dir(part: &str) -> &str {
    part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}
