/*!
 * Batch translation processing.
 *
 * Text units are sent in consecutive batches; each batch is one provider
 * call carrying the batch texts joined with a delimiter. Whatever the
 * provider answers, every batch yields exactly as many strings as it sent:
 *
 * - a short answer is padded with the untranslated originals
 * - a long answer is truncated
 * - a failed or empty call returns the originals unchanged
 *
 * Batches are processed strictly one after another, with a fixed pause after
 * every successful call that is followed by another batch.
 */

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::document::TextUnit;
use crate::errors::{ProviderError, TranslationError};
use crate::providers::Provider;

use super::prompts::{build_user_prompt, TranslationDirection};

/// Default maximum number of texts per call
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default pause between two calls
pub const DEFAULT_INTER_BATCH_DELAY: Duration = Duration::from_millis(2000);

/// Default segment separator
pub const DEFAULT_DELIMITER: &str = "|||";

/// Batching parameters, fixed for a run
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSettings {
    /// Maximum number of texts per call, at least 1
    pub batch_size: usize,

    /// Pause after a successful call when more batches follow
    pub inter_batch_delay: Duration,

    /// Separator joining texts in the prompt and splitting the answer
    pub delimiter: String,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            inter_batch_delay: DEFAULT_INTER_BATCH_DELAY,
            delimiter: DEFAULT_DELIMITER.to_string(),
        }
    }
}

/// What happened during one `translate` run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Number of text units sent
    pub units: usize,
    /// Number of batches (calls attempted)
    pub batches: usize,
    /// Batches whose call failed and fell back to the originals
    pub fallback_batches: usize,
    /// Batches whose answer had a different segment count
    pub mismatched_batches: usize,
    /// Segments filled with untranslated originals
    pub padded_segments: usize,
    /// Surplus segments dropped
    pub truncated_segments: usize,
    /// Wall time spent, delays included
    pub elapsed_ms: u128,
}

impl BatchReport {
    /// Whether every batch came back complete
    pub fn is_clean(&self) -> bool {
        self.fallback_batches == 0 && self.mismatched_batches == 0
    }

    /// One-line summary for the end-of-run log
    pub fn summary(&self) -> String {
        format!(
            "{} units in {} batches: {} fell back to source, {} mismatched ({} padded, {} truncated), {:.1}s",
            self.units,
            self.batches,
            self.fallback_batches,
            self.mismatched_batches,
            self.padded_segments,
            self.truncated_segments,
            self.elapsed_ms as f64 / 1000.0
        )
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Outcome of fitting an answer to its batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    /// Exactly one string per sent text
    pub texts: Vec<String>,
    /// Originals used to fill missing segments
    pub padded: usize,
    /// Extra segments dropped
    pub truncated: usize,
}

impl Reconciled {
    /// The anomaly to report, if any
    pub fn mismatch(&self, expected: usize) -> Option<TranslationError> {
        (self.padded > 0 || self.truncated > 0).then(|| TranslationError::SegmentCountMismatch {
            expected,
            received: expected + self.truncated - self.padded,
        })
    }
}

/// Split an answer on the delimiter, trimming each segment
pub fn split_segments(response: &str, delimiter: &str) -> Vec<String> {
    response
        .split(delimiter)
        .map(|segment| segment.trim().to_string())
        .collect()
}

/// Fit `segments` to `originals`: pad with originals or truncate
pub fn reconcile(originals: &[&str], mut segments: Vec<String>) -> Reconciled {
    let expected = originals.len();
    let received = segments.len();

    if received > expected {
        segments.truncate(expected);
        return Reconciled {
            texts: segments,
            padded: 0,
            truncated: received - expected,
        };
    }

    segments.extend(originals[received..].iter().map(|text| text.to_string()));
    Reconciled {
        texts: segments,
        padded: expected - received,
        truncated: 0,
    }
}

/// Batch translator for text units
#[derive(Debug, Clone)]
pub struct BatchTranslator {
    /// Backend used for every call
    provider: Arc<dyn Provider>,

    /// Contents of the system prompt file
    system_prompt: String,

    /// Batching parameters
    settings: BatchSettings,
}

impl BatchTranslator {
    /// Create a new batch translator
    pub fn new(provider: Arc<dyn Provider>, system_prompt: impl Into<String>, settings: BatchSettings) -> Self {
        Self {
            provider,
            system_prompt: system_prompt.into(),
            settings,
        }
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    /// Translate `units`, returning one string per unit in the same order
    pub async fn translate(&self, units: &[TextUnit], direction: &TranslationDirection) -> (Vec<String>, BatchReport) {
        self.translate_with_progress(units, direction, |_, _| {}).await
    }

    /// Like `translate`, calling `progress(done, total)` after every batch
    pub async fn translate_with_progress(
        &self,
        units: &[TextUnit],
        direction: &TranslationDirection,
        progress: impl Fn(usize, usize),
    ) -> (Vec<String>, BatchReport) {
        let start_time = Instant::now();
        let batch_size = self.settings.batch_size.max(1);
        let total_batches = units.len().div_ceil(batch_size);

        let mut report = BatchReport {
            units: units.len(),
            batches: total_batches,
            ..Default::default()
        };
        let mut translated = Vec::with_capacity(units.len());

        for (batch_index, batch) in units.chunks(batch_size).enumerate() {
            let texts: Vec<&str> = batch.iter().map(|unit| unit.text.as_str()).collect();
            debug!(
                "Translating batch {}/{} ({} texts)",
                batch_index + 1,
                total_batches,
                texts.len()
            );

            match self.call(&texts, direction).await {
                Ok(response) => {
                    let reconciled = reconcile(&texts, split_segments(&response, &self.settings.delimiter));
                    if let Some(mismatch) = reconciled.mismatch(texts.len()) {
                        warn!("Batch {}/{}: {}", batch_index + 1, total_batches, mismatch);
                        report.mismatched_batches += 1;
                        report.padded_segments += reconciled.padded;
                        report.truncated_segments += reconciled.truncated;
                    }
                    translated.extend(reconciled.texts);

                    let more_batches = batch_index + 1 < total_batches;
                    if more_batches && !self.settings.inter_batch_delay.is_zero() {
                        tokio::time::sleep(self.settings.inter_batch_delay).await;
                    }
                }
                Err(e) => {
                    warn!(
                        "Batch {}/{} kept untranslated: {}",
                        batch_index + 1,
                        total_batches,
                        e
                    );
                    report.fallback_batches += 1;
                    translated.extend(texts.iter().map(|text| text.to_string()));
                }
            }

            progress(batch_index + 1, total_batches);
        }

        report.elapsed_ms = start_time.elapsed().as_millis();
        (translated, report)
    }

    /// One provider call; empty answers count as failures
    async fn call(&self, texts: &[&str], direction: &TranslationDirection) -> Result<String, TranslationError> {
        let user_prompt = build_user_prompt(direction, &self.settings.delimiter, texts);
        let response = self.provider.complete(&self.system_prompt, &user_prompt).await?;

        if response.trim().is_empty() {
            return Err(ProviderError::EmptyResponse.into());
        }
        Ok(response)
    }
}
