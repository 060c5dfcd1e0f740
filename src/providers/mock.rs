/*!
 * Mock provider implementations for testing.
 *
 * The mock understands the batch prompt layout: everything after the first
 * blank line of the user prompt is the delimited batch text.
 * - `MockProvider::working()` - Answers every segment with `[TRANSLATED] <text>`
 * - `MockProvider::segment_count(n)` - Answers with exactly `n` segments
 * - `MockProvider::failing()` - Always fails with an error
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::providers::Provider;

/// Prefix the working mock puts in front of every segment
pub const TRANSLATED_PREFIX: &str = "[TRANSLATED] ";

/// One recorded call
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    pub system_prompt: String,
    pub user_prompt: String,
}

impl MockCall {
    /// Batch text carried by the user prompt
    pub fn batch_text(&self) -> &str {
        batch_text(&self.user_prompt)
    }
}

/// Behavior mode for the mock provider
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with one translated segment per sent segment
    Working,
    /// Succeeds with exactly this many segments, whatever was sent
    SegmentCount { count: usize },
    /// Returns this raw text verbatim
    Fixed(String),
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Returns an empty response
    Empty,
    /// Simulates slow response (for timeout testing)
    Slow { delay_ms: u64 },
}

/// Mock provider for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Segment separator used in prompts and replies
    delimiter: String,
    /// Request counter for intermittent failures
    request_count: Arc<AtomicUsize>,
    /// Every call received, shared between clones
    calls: Arc<Mutex<Vec<MockCall>>>,
}

fn batch_text(user_prompt: &str) -> &str {
    user_prompt
        .split_once("\n\n")
        .map(|(_, batch)| batch)
        .unwrap_or(user_prompt)
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            delimiter: "|||".to_string(),
            request_count: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a mock that always answers with `count` segments
    pub fn segment_count(count: usize) -> Self {
        Self::new(MockBehavior::SegmentCount { count })
    }

    /// Create a mock that returns a fixed raw reply
    pub fn fixed(reply: impl Into<String>) -> Self {
        Self::new(MockBehavior::Fixed(reply.into()))
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that returns empty responses
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Use another segment separator
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// Calls received so far
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    /// Number of calls received so far
    pub fn call_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    fn segments<'a>(&self, user_prompt: &'a str) -> Vec<&'a str> {
        batch_text(user_prompt)
            .split(self.delimiter.as_str())
            .map(str::trim)
            .collect()
    }

    fn translate_segments(&self, user_prompt: &str) -> String {
        self.segments(user_prompt)
            .iter()
            .map(|segment| format!("{}{}", TRANSLATED_PREFIX, segment))
            .collect::<Vec<_>>()
            .join(&self.delimiter)
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().push(MockCall {
            system_prompt: system_prompt.to_string(),
            user_prompt: user_prompt.to_string(),
        });

        match &self.behavior {
            MockBehavior::Working => Ok(self.translate_segments(user_prompt)),

            MockBehavior::SegmentCount { count } => {
                let sent = self.segments(user_prompt);
                let reply: Vec<String> = (0..*count)
                    .map(|i| match sent.get(i) {
                        Some(segment) => format!("{}{}", TRANSLATED_PREFIX, segment),
                        None => format!("[EXTRA] {}", i + 1),
                    })
                    .collect();
                Ok(reply.join(&self.delimiter))
            }

            MockBehavior::Fixed(reply) => Ok(reply.clone()),

            MockBehavior::Intermittent { fail_every } => {
                if *fail_every > 0 && count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(self.translate_segments(user_prompt))
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::Empty => Ok(String::new()),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(*delay_ms)).await;
                Ok(self.translate_segments(user_prompt))
            }
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::ConnectionError("Simulated provider failure".to_string())),
            _ => Ok(()),
        }
    }
}
