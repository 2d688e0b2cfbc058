//! Generation provider crate for Lexora.
//!
//! Provider-agnostic abstraction over language models with blocking and
//! streaming completion. Dropping an [`LlmStream`] releases the underlying
//! connection, which is how callers cancel a generation.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//!
//! # Example
//! ```no_run
//! use lexora_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new("http://localhost:11434", Duration::from_secs(60))?;
//! let request = LlmRequest::new("Hello, world!", "mistral");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
pub use factory::create_client;
pub use providers::OllamaClient;
pub use types::{LlmSettings, ProviderType};
