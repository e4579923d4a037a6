//! Content pipeline
//!
//! Turns a theme catalog entry into a ready-to-publish [`Post`]:
//! pick an unpublished topic, look up a product image, ask the text API for
//! an article, then format the messaging summary.
//!
//! # Modules
//!
//! - [`themes`] - Theme catalog loading and topic selection
//! - [`images`] - Product image lookup by article number
//! - [`llm`] - Chat completions client and response parsing
//! - [`format`] - HTML and hashtag helpers for both platforms
//! - [`watermark`] - Watermark compositing for product images
//! - [`generator`] - The production [`ContentGenerator`]
//! - [`mock`] - Offline generator for tests

pub mod format;
pub mod generator;
pub mod images;
pub mod llm;
pub mod mock;
pub mod themes;
pub mod watermark;

pub use generator::ArticleGenerator;
pub use llm::TextClient;
pub use mock::MockGenerator;
pub use themes::{ThemeCatalog, Topic};

use async_trait::async_trait;

use crate::config::Config;
use crate::models::{Post, PublishedSet};

/// Errors raised while producing a post
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Theme catalog missing or unreadable
    #[error("Theme catalog error: {0}")]
    Catalog(String),

    /// Text API request failed
    #[error("Text API request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Text API returned a non-success status
    #[error("Text API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The generated text is not a usable article
    #[error("Malformed generated content: {0}")]
    MalformedContent(String),
}

impl GenerationError {
    /// Whether a later attempt could succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Api { .. } | Self::MalformedContent(_) => true,
            Self::Catalog(_) => false,
        }
    }
}

/// Produces posts for topics not yet published today
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Generate a post, or `None` when every topic was already published today
    async fn generate_post(&self, published_today: &PublishedSet)
        -> Result<Option<Post>, GenerationError>;

    /// Re-read file-backed state such as the theme catalog
    ///
    /// On error the previously loaded state stays in use.
    fn reload(&self, _config: &Config) -> Result<(), GenerationError> {
        Ok(())
    }
}
