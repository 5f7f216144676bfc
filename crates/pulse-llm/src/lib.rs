//! LLM provider abstraction layer for ptt-pulse
//!
//! This crate provides provider-agnostic abstractions for sending one prompt
//! to a hosted Large Language Model. It includes:
//!
//! - Completion request/response types
//! - Provider trait for LLM implementations
//! - Model preference resolution against a provider's model list
//! - [`Analyst`], which runs a prompt with a single rate-limit downgrade
//! - Concrete provider implementations (behind feature flags)

pub mod analyst;
pub mod completion;
pub mod discovery;
pub mod error;
pub mod provider;

// Re-export main types
pub use analyst::Analyst;
pub use completion::{CompletionRequest, CompletionResponse, TokenUsage};
pub use discovery::{DEFAULT_MODEL, ModelPreference};
pub use error::{LLMError, Result};
pub use provider::LLMProvider;

// Provider implementations (feature-gated)
#[cfg(feature = "gemini")]
pub mod providers;
