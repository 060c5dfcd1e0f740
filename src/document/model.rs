/*!
 * Locator model shared by every document adapter.
 *
 * A `TextUnit` is one translatable segment together with the `Locator` that
 * names where it was found. Extraction emits units in document traversal
 * order (sheet order then row-major for workbooks, paragraph or page order
 * for flow documents, column-major for CSV fields); that order is also the
 * order in which batches are sent and answered.
 */

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::errors::TranslationError;

/// Position of a text unit or image inside a document
///
/// The derived ordering matches the traversal order within one variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Locator {
    /// Workbook cell, 0-based row and column
    Cell {
        sheet_index: usize,
        sheet: String,
        row: u32,
        column: u32,
    },
    /// Paragraph of a flow-text document, counting empty paragraphs too
    Paragraph { index: usize },
    /// Page of a paged document, 0-based
    Page { index: usize },
    /// CSV field below the header row; column comes first for column-major order
    Field { column: usize, row: usize },
}

impl Locator {
    /// Create a workbook cell locator
    pub fn cell(sheet_index: usize, sheet: impl Into<String>, row: u32, column: u32) -> Self {
        Self::Cell {
            sheet_index,
            sheet: sheet.into(),
            row,
            column,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cell { sheet, row, column, .. } => {
                write!(f, "{}!{}", sheet, cell_reference(*row, *column))
            }
            Self::Paragraph { index } => write!(f, "paragraph {}", index + 1),
            Self::Page { index } => write!(f, "page {}", index + 1),
            Self::Field { column, row } => write!(f, "row {}, column {}", row + 1, column + 1),
        }
    }
}

/// Render a 0-based (row, column) pair as an A1 reference
pub fn cell_reference(row: u32, column: u32) -> String {
    let mut letters = Vec::new();
    let mut n = column + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    format!("{}{}", String::from_utf8_lossy(&letters), row + 1)
}

/// One translatable text segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextUnit {
    /// Source text, never empty or whitespace-only
    pub text: String,

    /// Where the text came from
    pub locator: Locator,
}

impl TextUnit {
    pub fn new(text: impl Into<String>, locator: Locator) -> Self {
        Self {
            text: text.into(),
            locator,
        }
    }
}

/// An embedded image staged on disk during extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageArtifact {
    /// Anchor cell of the picture
    pub locator: Locator,

    /// Package part holding the image bytes, e.g. `xl/media/image1.png`
    pub part_name: String,

    /// Staged copy of the image bytes
    pub staged_path: PathBuf,
}

/// Everything an adapter pulled out of a source document
#[derive(Debug, Default, Clone)]
pub struct Extraction {
    /// Text units in traversal order
    pub units: Vec<TextUnit>,

    /// Side artifacts, only populated for workbooks
    pub images: Vec<ImageArtifact>,
}

/// Translated text keyed by the locator it must be written back to
#[derive(Debug, Default, Clone)]
pub struct Translations {
    entries: Vec<(Locator, String)>,
    index: HashMap<Locator, usize>,
}

impl Translations {
    /// Pair each unit with the translated string at the same position
    pub fn align(units: &[TextUnit], translated: Vec<String>) -> Result<Self, TranslationError> {
        if units.len() != translated.len() {
            return Err(TranslationError::SegmentCountMismatch {
                expected: units.len(),
                received: translated.len(),
            });
        }

        let mut translations = Self::default();
        for (unit, text) in units.iter().zip(translated) {
            translations.insert(unit.locator.clone(), text);
        }
        Ok(translations)
    }

    /// Add or replace the text for a locator
    pub fn insert(&mut self, locator: Locator, text: String) {
        match self.index.get(&locator) {
            Some(&pos) => self.entries[pos].1 = text,
            None => {
                self.index.insert(locator.clone(), self.entries.len());
                self.entries.push((locator, text));
            }
        }
    }

    pub fn get(&self, locator: &Locator) -> Option<&str> {
        self.index.get(locator).map(|&pos| self.entries[pos].1.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in extraction order
    pub fn iter(&self) -> impl Iterator<Item = (&Locator, &str)> {
        self.entries.iter().map(|(locator, text)| (locator, text.as_str()))
    }

    /// Translated texts in extraction order
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, text)| text.as_str())
    }
}
