/*!
 * Translation of extracted text units.
 *
 * - `batch`: partitioning, provider calls and segment reconciliation
 * - `prompts`: system prompt bootstrap, user prompt and language direction
 */

// Re-export main types for easier usage
pub use self::batch::{BatchReport, BatchSettings, BatchTranslator};
pub use self::prompts::{ensure_system_prompt, LanguagePair, PromptTemplate, TranslationDirection};

// Submodules
pub mod batch;
pub mod prompts;
