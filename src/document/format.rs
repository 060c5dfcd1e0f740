use std::path::Path;

use crate::errors::DocumentError;

/// Document families handled by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// `.xlsx` workbook: text cells plus embedded pictures
    Workbook,
    /// `.docx` word-processing document: one unit per paragraph
    FlowText,
    /// `.pdf`: one unit per page
    Paged,
    /// `.csv`: one unit per field, column-major
    Rows,
}

impl DocumentKind {
    /// Extensions accepted by `from_path`, lowercase and without the dot
    pub const SUPPORTED_EXTENSIONS: [&'static str; 4] = ["xlsx", "docx", "pdf", "csv"];

    /// Pick the adapter for a path from its extension
    pub fn from_path(path: &Path) -> Result<Self, DocumentError> {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "xlsx" => Ok(Self::Workbook),
            "docx" => Ok(Self::FlowText),
            "pdf" => Ok(Self::Paged),
            "csv" => Ok(Self::Rows),
            _ => Err(DocumentError::UnsupportedFormat {
                extension: if extension.is_empty() {
                    String::new()
                } else {
                    format!(".{}", extension)
                },
            }),
        }
    }

    /// Whether the path carries one of the supported extensions
    pub fn is_supported(path: &Path) -> bool {
        Self::from_path(path).is_ok()
    }

    /// Extension of the translated output, without the dot
    ///
    /// Paged documents are written back as a plain-text dump, so a
    /// translated `report.pdf` becomes `report-translated.txt`.
    pub fn output_extension(self, input: &Path) -> String {
        match self {
            Self::Paged => "txt".to_string(),
            _ => input
                .extension()
                .map(|ext| ext.to_string_lossy().to_string())
                .unwrap_or_default(),
        }
    }

    /// Whether the adapter stages embedded images
    pub fn carries_images(self) -> bool {
        matches!(self, Self::Workbook)
    }
}
