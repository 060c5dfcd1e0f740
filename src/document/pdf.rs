/*!
 * Paged-document adapter (`.pdf`).
 *
 * PDF text is read page by page with lopdf. Positional write-back into a
 * PDF is not possible without re-laying out the page, so the translated
 * pages are dumped as plain text, one page per line block, in page order.
 */

use std::path::Path;

use log::{info, warn};
use lopdf::Document;

use super::model::{Extraction, Locator, TextUnit, Translations};
use crate::errors::DocumentError;
use crate::file_utils::FileManager;

/// Extract one text unit per page that carries text
pub fn extract(path: &Path) -> Result<Extraction, DocumentError> {
    let document = Document::load(path).map_err(|e| DocumentError::unreadable(path, e))?;

    let mut units = Vec::new();
    for (page_number, _) in document.get_pages() {
        let text = match document.extract_text(&[page_number]) {
            Ok(text) => text,
            Err(e) => {
                warn!("Skipping page {} of {:?}: {}", page_number, path, e);
                continue;
            }
        };

        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        units.push(TextUnit::new(
            text,
            Locator::Page {
                index: page_number as usize - 1,
            },
        ));
    }

    info!("Extracted {} pages from {:?}", units.len(), path);
    Ok(Extraction {
        units,
        images: Vec::new(),
    })
}

/// Write the translated pages to `output` as plain text
pub fn reinsert(output: &Path, translations: &Translations) -> Result<(), DocumentError> {
    let mut pages: Vec<(usize, &str)> = Vec::with_capacity(translations.len());
    for (locator, text) in translations.iter() {
        match locator {
            Locator::Page { index } => pages.push((*index, text)),
            other => return Err(DocumentError::UnresolvedLocator { locator: other.clone() }),
        }
    }
    pages.sort_by_key(|(index, _)| *index);

    let body = pages.iter().map(|(_, text)| *text).collect::<Vec<_>>().join("\n");
    FileManager::write_to_file(output, &body).map_err(|e| DocumentError::write_failure(output, e))
}
