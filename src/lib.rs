/*!
 * # docxlate - office document translation with AI
 *
 * A Rust library that translates the text of office documents between two
 * languages while keeping their structure, formatting and images.
 *
 * ## Features
 *
 * - Extract every translatable text unit with a stable locator:
 *   - `.xlsx` text cells (formulas, numbers and dates are left alone) and embedded pictures
 *   - `.docx` paragraphs
 *   - `.pdf` pages
 *   - `.csv` fields below the header
 * - Translate in batches through any OpenAI-compatible chat-completions API
 *   (Gemini, OpenAI, LM Studio)
 * - Always get one translation per unit: short answers are padded with the
 *   source text, long answers truncated, failed calls fall back to the source
 * - Write translations back by locator into a copy of the source document
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `document`: locator model and format adapters (extract / reinsert)
 * - `translation`: batch translation and prompts
 * - `providers`: translation backends
 * - `app_controller`: the extract, translate, reinsert pipeline
 * - `app_config`: configuration management
 * - `file_utils`: file system operations
 * - `language_utils`: ISO language code utilities
 * - `errors`: custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![cfg_attr(test, allow(non_snake_case))]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod document;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{Controller, FileOutcome};
pub use document::{DocumentKind, Locator, TextUnit, Translations};
pub use errors::{AppError, DocumentError, ProviderError, TranslationError};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use translation::{BatchReport, BatchSettings, BatchTranslator};
