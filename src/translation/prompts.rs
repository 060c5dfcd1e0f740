/*!
 * Prompts for batch translation.
 *
 * The system prompt lives in a text file next to the configuration so it can
 * be tuned without rebuilding. When the file is missing it is created from
 * the built-in template once; an existing file is never rewritten.
 */

use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use crate::errors::AppError;
use crate::file_utils::FileManager;
use crate::language_utils::{get_language_name, language_codes_match};

/// System prompt template for segment-preserving translation
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The template string with a `{delimiter}` placeholder
    template: String,
}

impl PromptTemplate {
    /// Built-in system prompt
    pub const SEGMENT_TRANSLATOR: &'static str = r#"You are a professional translator. Follow these rules strictly:
1. Output ONLY the translation, nothing else
2. Never repeat the source text in your answer
3. Add no explanations, notes or commentary
4. Leave IDs, model numbers and special characters unchanged
5. Use standard terminology for technical terms
6. Keep the original formatting, including spaces and line breaks
7. Use correct grammar and punctuation
8. Only proper names, IDs and technical codes may stay untranslated
9. Translate every segment separated by "{delimiter}" and keep the segments separated by the same delimiter, in the same order"#;

    /// Create a new prompt template
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Create the built-in template
    pub fn segment_translator() -> Self {
        Self::new(Self::SEGMENT_TRANSLATOR)
    }

    /// Render the template for a delimiter
    pub fn render(&self, delimiter: &str) -> String {
        self.template.replace("{delimiter}", delimiter)
    }
}

/// Read the system prompt file, writing the built-in prompt first if it is missing
///
/// Returns the prompt text and whether the file was created by this call.
pub fn ensure_system_prompt(path: &Path, delimiter: &str) -> Result<(String, bool)> {
    if path.is_file() {
        let prompt = fs::read_to_string(path)
            .with_context(|| format!("Failed to read system prompt file: {}", path.display()))?;
        return Ok((prompt, false));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        FileManager::ensure_dir(parent)?;
    }

    let prompt = PromptTemplate::segment_translator().render(delimiter);
    FileManager::write_to_file(path, &prompt)?;
    info!("Default prompt file created at: {}", path.display());
    Ok((prompt, true))
}

/// Build the user prompt for one batch
pub fn build_user_prompt(direction: &TranslationDirection, delimiter: &str, texts: &[&str]) -> String {
    format!(
        "Translate the following text from {}, keeping segments separated by '{}':\n\n{}",
        direction,
        delimiter,
        texts.join(delimiter)
    )
}

/// The single fixed language pair of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePair {
    pub source: String,
    pub target: String,
}

/// Direction of one run, as language codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationDirection {
    pub from: String,
    pub to: String,
}

impl LanguagePair {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// Pick the direction for a requested target language
    ///
    /// Translating into the configured target goes source to target; asking
    /// for the configured source goes the other way. Other codes are rejected.
    pub fn direction_for(&self, target_lang: &str) -> Result<TranslationDirection, AppError> {
        if language_codes_match(target_lang, &self.target) {
            Ok(TranslationDirection {
                from: self.source.clone(),
                to: self.target.clone(),
            })
        } else if language_codes_match(target_lang, &self.source) {
            Ok(TranslationDirection {
                from: self.target.clone(),
                to: self.source.clone(),
            })
        } else {
            Err(AppError::Config(format!(
                "Target language '{}' is not part of the configured pair {}/{}",
                target_lang, self.source, self.target
            )))
        }
    }
}

fn display_name(code: &str) -> String {
    get_language_name(code).unwrap_or_else(|_| code.to_string())
}

impl fmt::Display for TranslationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", display_name(&self.from), display_name(&self.to))
    }
}
