//! LlmProvider trait definition.
//!
//! The completion provider is an external black box: an ordered transcript
//! goes in, one reply (or an error) comes out. No streaming, no retry.

use parley_types::llm::{CompletionRequest, CompletionResponse, LlmError};

/// Trait for completion provider backends.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
/// Implementations live in parley-infra (e.g., `OpenAiCompatibleProvider`).
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "openai").
    fn name(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;
}
