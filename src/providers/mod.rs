/*!
 * Translation backends.
 *
 * Every hosted backend the application talks to (Gemini, OpenAI, LM Studio)
 * speaks the OpenAI chat-completions protocol, so a single client covers
 * them all:
 * - `openai`: chat-completions client over HTTP
 * - `mock`: deterministic in-process backend used by the tests
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// Common trait for all translation backends
///
/// One call is one request/response exchange; implementations must not
/// retry on their own.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Send one system/user prompt pair and return the reply text
    ///
    /// # Arguments
    /// * `system_prompt` - Translation instructions
    /// * `user_prompt` - Direction plus the delimited batch text
    ///
    /// # Returns
    /// * `Result<String, ProviderError>` - The reply text or an error
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ProviderError>;

    /// Test the connection to the backend
    ///
    /// # Returns
    /// * `Result<(), ProviderError>` - Ok if the connection is successful, or an error
    async fn test_connection(&self) -> Result<(), ProviderError>;
}

pub mod mock;
pub mod openai;
