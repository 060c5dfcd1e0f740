use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::document::{self, DocumentKind, Translations};
use crate::errors::AppError;
use crate::file_utils::FileManager;
use crate::providers::openai::OpenAI;
use crate::providers::Provider;
use crate::translation::{ensure_system_prompt, BatchTranslator};

// @module: Application controller for document translation

/// Result of one document in folder mode
#[derive(Debug)]
pub struct FileOutcome {
    /// Source document
    pub input: PathBuf,
    /// Output path, or the reason the document failed
    pub result: Result<PathBuf, String>,
}

/// Main application controller for document translation
///
/// Runs extract, translate and reinsert for one document at a time.
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Backend shared by every batch of every run
    provider: Arc<dyn Provider>,
    // @field: Draw progress bars on the terminal
    show_progress: bool,
}

impl Controller {
    // @method: Create a controller that talks to the configured provider
    pub fn with_config(config: Config) -> Result<Self, AppError> {
        config.validate().map_err(|e| AppError::Config(e.to_string()))?;

        let translation = &config.translation;
        let provider = OpenAI::new(
            translation.get_api_key(),
            translation.get_endpoint(),
            translation.get_model(),
            translation.get_timeout_secs(),
        )
        .with_temperature(translation.common.temperature)
        .with_max_tokens(translation.common.max_tokens);

        info!(
            "Using {} ({}) at {}",
            translation.provider.display_name(),
            provider.model(),
            translation.get_endpoint()
        );
        Ok(Self::with_provider(config, Arc::new(provider)))
    }

    // @method: Create a controller around an existing provider
    pub fn with_provider(config: Config, provider: Arc<dyn Provider>) -> Self {
        Self {
            config,
            provider,
            show_progress: false,
        }
    }

    /// Enable or disable terminal progress bars
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Check that the provider answers
    pub async fn test_connection(&self) -> Result<(), AppError> {
        self.provider.test_connection().await.map_err(AppError::from)
    }

    /// Translate one document, returning the output path or `None` on failure
    ///
    /// Failures are logged here; use `try_translate_document` to inspect them.
    pub async fn translate_document(&self, input_path: &Path, target_lang: &str) -> Option<PathBuf> {
        match self.try_translate_document(input_path, target_lang).await {
            Ok(output) => Some(output),
            Err(e) => {
                error!("Translation of {:?} failed: {}", input_path, e);
                None
            }
        }
    }

    /// Translate one document: extract, translate in batches, write the translated copy
    pub async fn try_translate_document(&self, input_path: &Path, target_lang: &str) -> Result<PathBuf, AppError> {
        let multi_progress = MultiProgress::new();
        self.translate_with_progress(input_path, target_lang, &multi_progress).await
    }

    async fn translate_with_progress(
        &self,
        input_path: &Path,
        target_lang: &str,
        multi_progress: &MultiProgress,
    ) -> Result<PathBuf, AppError> {
        let start_time = Instant::now();

        let kind = DocumentKind::from_path(input_path)?;
        let direction = self.config.language_pair().direction_for(target_lang)?;
        let paths = &self.config.paths;
        let delimiter = &self.config.translation.common.delimiter;

        let (system_prompt, _) = ensure_system_prompt(&paths.system_prompt_path, delimiter)
            .map_err(|e| AppError::File(e.to_string()))?;

        let extraction = document::extract(kind, input_path, &paths.images_dir())?;
        info!(
            "Translating {} text units of {:?} ({})",
            extraction.units.len(),
            input_path,
            direction
        );

        let translator = BatchTranslator::new(Arc::clone(&self.provider), system_prompt, self.config.batch_settings());
        let total_batches = extraction.units.len().div_ceil(translator.settings().batch_size.max(1));
        let progress_bar = self.batch_progress_bar(multi_progress, total_batches as u64);

        let (texts, report) = translator
            .translate_with_progress(&extraction.units, &direction, |done, _| {
                progress_bar.set_position(done as u64)
            })
            .await;
        progress_bar.finish_and_clear();
        if report.is_clean() {
            info!("Batch translation: {}", report.summary());
        } else {
            warn!("Batch translation: {}", report.summary());
        }

        let translations = Translations::align(&extraction.units, texts)?;

        FileManager::ensure_dir(&paths.output_dir).map_err(|e| AppError::File(e.to_string()))?;
        let output_path =
            FileManager::generate_output_path(input_path, &paths.output_dir, &kind.output_extension(input_path));
        document::reinsert(kind, input_path, &output_path, &translations, &extraction.images)?;

        info!(
            "Saved {:?} in {}",
            output_path,
            Self::format_duration(start_time.elapsed())
        );
        Ok(output_path)
    }

    fn batch_progress_bar(&self, multi_progress: &MultiProgress, total: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let progress_bar = multi_progress.add(ProgressBar::new(total));
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} batches ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));
        progress_bar
    }

    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }

    /// Translate every supported document under a directory, one after another
    ///
    /// A failing document is recorded in its outcome and does not stop the others.
    pub async fn run_folder(&self, input_dir: &Path, target_lang: &str) -> Result<Vec<FileOutcome>, AppError> {
        let start_time = Instant::now();

        if !FileManager::dir_exists(input_dir) {
            return Err(AppError::File(format!("Input directory does not exist: {:?}", input_dir)));
        }

        let documents = FileManager::find_supported_files(input_dir).map_err(|e| AppError::File(e.to_string()))?;
        if documents.is_empty() {
            return Err(AppError::File(format!(
                "No supported documents ({}) found in directory: {:?}",
                DocumentKind::SUPPORTED_EXTENSIONS.join(", "),
                input_dir
            )));
        }

        let multi_progress = MultiProgress::new();
        let folder_pb = if self.show_progress {
            let pb = multi_progress.add(ProgressBar::new(documents.len() as u64));
            let template_result = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            pb.set_style(template_result.progress_chars("█▓▒░"));
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut outcomes = Vec::with_capacity(documents.len());
        for document in documents {
            let file_name = document
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            folder_pb.set_message(format!("Processing: {}", file_name));

            let result = match self.translate_with_progress(&document, target_lang, &multi_progress).await {
                Ok(output) => Ok(output),
                Err(e) => {
                    error!("Error processing file {}: {}", file_name, e);
                    Err(e.to_string())
                }
            };
            outcomes.push(FileOutcome { input: document, result });
            folder_pb.inc(1);
        }
        folder_pb.finish_and_clear();

        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        info!(
            "Folder processing complete: {} translated, {} failed - Duration: {}",
            outcomes.len() - failed,
            failed,
            Self::format_duration(start_time.elapsed())
        );
        Ok(outcomes)
    }
}
