//! Publish targets
//!
//! Network clients for the blog platform and the messaging channel, behind a
//! single [`Publish`] trait so the failure governor does not care which
//! service it is driving.

pub mod mock;
pub mod telegram;
pub mod wordpress;

pub use mock::MockPublisher;
pub use telegram::TelegramClient;
pub use wordpress::WordPressClient;

use async_trait::async_trait;

use crate::models::{Platform, Post};

/// Result type for platform operations
pub type PublishResult<T> = Result<T, PublishError>;

/// Errors that can occur while publishing
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// HTTP request failed (connection, timeout, body decoding)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("{platform} returned {status}: {body}")]
    Status {
        platform: Platform,
        status: u16,
        body: String,
    },

    /// The API answered but rejected the request
    #[error("API error: {0}")]
    Api(String),

    /// Attachment could not be read
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid client configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Service temporarily unavailable
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl PublishError {
    /// Whether a later attempt could succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Unavailable(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Api(_) | Self::Io(_) | Self::InvalidConfig(_) => false,
        }
    }
}

/// Something that can publish a post to a platform
#[async_trait]
pub trait Publish: Send + Sync {
    /// Publish `post` to `platform`; any error counts as one failed attempt
    async fn publish_to(&self, platform: Platform, post: &Post) -> PublishResult<()>;
}

/// Routes publish calls to the two platform clients
pub struct PlatformPublisher {
    wordpress: WordPressClient,
    telegram: TelegramClient,
}

impl PlatformPublisher {
    pub fn new(wordpress: WordPressClient, telegram: TelegramClient) -> Self {
        Self {
            wordpress,
            telegram,
        }
    }
}

#[async_trait]
impl Publish for PlatformPublisher {
    async fn publish_to(&self, platform: Platform, post: &Post) -> PublishResult<()> {
        match platform {
            Platform::WordPress => {
                let id = self.wordpress.publish(post).await?;
                tracing::info!(platform = %platform, post_id = id, "Post created");
            }
            Platform::Telegram => {
                let id = self.telegram.publish(post).await?;
                tracing::info!(platform = %platform, message_id = id, "Message sent");
            }
        }
        Ok(())
    }
}
