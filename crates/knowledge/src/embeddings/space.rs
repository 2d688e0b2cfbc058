//! Embedding space descriptor.
//!
//! Vectors from different providers, models or dimensions are not
//! comparable. The index records the space it was built in so a provider
//! switch is detected instead of silently mixing spaces.

use lexora_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingSpace {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
}

impl EmbeddingSpace {
    pub fn new(provider: impl Into<String>, model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            dimensions,
        }
    }

    /// Describe how `other` differs from this space, if it does.
    pub fn mismatch(&self, other: &Self) -> Option<String> {
        if self.provider != other.provider {
            return Some(format!(
                "Provider mismatch: expected '{}', got '{}'",
                self.provider, other.provider
            ));
        }
        if self.model != other.model {
            return Some(format!(
                "Model mismatch: expected '{}', got '{}'",
                self.model, other.model
            ));
        }
        if self.dimensions != other.dimensions {
            return Some(format!(
                "Dimension mismatch: expected {}, got {}",
                self.dimensions, other.dimensions
            ));
        }
        None
    }

    /// Validate that another space is consistent with this one.
    pub fn validate_consistency(&self, other: &Self) -> AppResult<()> {
        match self.mismatch(other) {
            Some(reason) => Err(AppError::Embedding(reason)),
            None => Ok(()),
        }
    }
}

impl std::fmt::Display for EmbeddingSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} ({} dims)", self.provider, self.model, self.dimensions)
    }
}
