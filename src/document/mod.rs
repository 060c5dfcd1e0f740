/*!
 * Document adapters.
 *
 * Each supported format has an adapter with the same two operations:
 *
 * - `extract`: read the source and return its text units (and, for
 *   workbooks, the staged images) in traversal order
 * - `reinsert`: duplicate the source at the output path and write every
 *   translation back to the position named by its locator
 *
 * Adapters never modify the source file.
 *
 * - `model`: locators, text units, images and the translation map
 * - `format`: extension to adapter mapping
 * - `package`: ZIP part store for OOXML formats
 * - `xlsx`, `docx`, `pdf`, `rows`: the adapters themselves
 */

use std::path::Path;

pub mod docx;
pub mod format;
pub mod model;
pub mod package;
pub mod pdf;
pub mod rows;
pub mod xlsx;
mod xml;

pub use self::format::DocumentKind;
pub use self::model::{cell_reference, Extraction, ImageArtifact, Locator, TextUnit, Translations};
pub use self::package::OfficePackage;

use crate::errors::DocumentError;

/// Extract text units from `path` with the adapter for `kind`
///
/// Images are only staged for workbooks, under `staging_dir`.
pub fn extract(kind: DocumentKind, path: &Path, staging_dir: &Path) -> Result<Extraction, DocumentError> {
    if !path.is_file() {
        return Err(DocumentError::unreadable(path, "file not found"));
    }

    match kind {
        DocumentKind::Workbook => xlsx::extract(path, staging_dir),
        DocumentKind::FlowText => docx::extract(path),
        DocumentKind::Paged => pdf::extract(path),
        DocumentKind::Rows => rows::extract(path),
    }
}

/// Write `translations` (and re-attach `images`) into a new document at `output`
pub fn reinsert(
    kind: DocumentKind,
    source: &Path,
    output: &Path,
    translations: &Translations,
    images: &[ImageArtifact],
) -> Result<(), DocumentError> {
    match kind {
        DocumentKind::Workbook => xlsx::reinsert(source, output, translations, images),
        DocumentKind::FlowText => docx::reinsert(source, output, translations),
        DocumentKind::Paged => pdf::reinsert(output, translations),
        DocumentKind::Rows => rows::reinsert(source, output, translations),
    }
}
