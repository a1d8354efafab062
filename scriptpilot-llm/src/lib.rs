//! # scriptpilot-llm
//!
//! Chat completion providers used to ask a model for the next script.
//!
//! ## Core Concepts
//! - **ChatMessage / Role**: the role-tagged messages that make up a transcript
//! - **Provider**: Trait-based LLM communication (OpenAI-compatible, Anthropic)
//! - **Usage**: token accounting across round trips

pub mod error;
pub mod provider;

pub use error::{Error, ErrorKind, ErrorStatus, Result};
pub use provider::{
    AnthropicProvider, ChatMessage, CompletionRequest, CompletionResponse, FinishReason,
    LlmProvider, OpenAIProvider, ProviderConfig, ProviderError, ProviderType, Role, Usage,
    UsageTracker,
};
