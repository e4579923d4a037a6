//! Telegram Bot API client
//!
//! Sends the post summary to a channel: as a photo caption when the post has
//! an image, otherwise (or when the photo upload fails) as a text message.
//! HTML entity errors are retried once as plain text.

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;

use super::{PublishError, PublishResult};
use crate::config::TelegramConfig;
use crate::content::format::{self, SummaryStyle};
use crate::models::Post;

/// Bot API response envelope
#[derive(Debug, Deserialize)]
struct TgResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    result: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    message_id: i64,
}

/// Whether an API error is about message markup
fn is_entity_error(err: &PublishError) -> bool {
    let text = err.to_string().to_lowercase();
    text.contains("can't parse entities") || text.contains("bad request")
}

/// Telegram client
pub struct TelegramClient {
    client: Client,
    config: TelegramConfig,
}

impl TelegramClient {
    /// Create a new client
    pub fn new(config: TelegramConfig) -> PublishResult<Self> {
        if config.token.is_empty() {
            return Err(PublishError::InvalidConfig(
                "Telegram token cannot be empty".to_string(),
            ));
        }
        if config.chat_id.is_empty() {
            return Err(PublishError::InvalidConfig(
                "Telegram chat_id cannot be empty".to_string(),
            ));
        }

        // per-request timeouts are set below; photo uploads get a longer one
        let client = Client::builder().build()?;

        Ok(Self { client, config })
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.config.api_url.trim_end_matches('/'),
            self.config.token
        )
    }

    /// Text sent for a post
    ///
    /// The generated summary when present, otherwise one built from the body.
    pub fn message_text(&self, post: &Post) -> String {
        let text = if post.summary.trim().is_empty() {
            let style = SummaryStyle::from_config(&self.config);
            let title = if post.summary_title.is_empty() {
                &post.title
            } else {
                &post.summary_title
            };
            let hashtags = format::hashtags(&post.brand, &post.title, &post.tags.join(", "));
            format::messaging_summary(
                &format::strip_tags(&post.body),
                Some(title),
                &hashtags,
                &style,
                post.image_path.is_some(),
            )
        } else {
            post.summary.clone()
        };
        format::fix_html_tags(&text)
    }

    /// Publish a post, returning the message id
    pub async fn publish(&self, post: &Post) -> PublishResult<i64> {
        let text = self.message_text(post);

        if let Some(path) = &post.image_path {
            match self.send_photo(path, &text).await {
                Ok(id) => return Ok(id),
                Err(e) => {
                    tracing::warn!(
                        image = %path.display(),
                        error = %e,
                        "Photo upload failed, sending as text message"
                    );
                }
            }
        }

        match self.send_message(&text, Some("HTML")).await {
            Ok(id) => Ok(id),
            Err(e) if is_entity_error(&e) => {
                tracing::warn!(error = %e, "Retrying without HTML formatting");
                self.send_message(&format::strip_tags(&text), None).await
            }
            Err(e) => Err(e),
        }
    }

    /// `sendMessage`
    pub async fn send_message(&self, text: &str, parse_mode: Option<&str>) -> PublishResult<i64> {
        let mut params = vec![
            ("chat_id", self.config.chat_id.as_str()),
            ("text", text),
        ];
        if let Some(mode) = parse_mode {
            params.push(("parse_mode", mode));
        }

        tracing::debug!(chars = text.chars().count(), "Sending Telegram message");

        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .form(&params)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// `sendPhoto` with an HTML caption
    pub async fn send_photo(&self, path: &Path, caption: &str) -> PublishResult<i64> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("photo")
            .to_string();

        tracing::debug!(
            file = %filename,
            chars = caption.chars().count(),
            "Sending Telegram photo"
        );

        let form = Form::new()
            .text("chat_id", self.config.chat_id.clone())
            .text("caption", caption.to_string())
            .text("parse_mode", "HTML")
            .part("photo", Part::bytes(bytes).file_name(filename));

        let response = self
            .client
            .post(self.method_url("sendPhoto"))
            .timeout(Duration::from_secs(self.config.image_timeout_secs))
            .multipart(form)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn parse_response(response: reqwest::Response) -> PublishResult<i64> {
        let status = response.status();
        let body = response.text().await?;

        let parsed: Option<TgResponse> = serde_json::from_str(&body).ok();
        match parsed {
            Some(TgResponse {
                ok: true,
                result: Some(message),
                ..
            }) if status.is_success() => Ok(message.message_id),
            Some(TgResponse {
                description: Some(description),
                ..
            }) => Err(PublishError::Api(format!("{}: {description}", status.as_u16()))),
            _ => Err(PublishError::Api(format!("{}: {body}", status.as_u16()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TelegramConfig {
        TelegramConfig {
            token: "123:abc".into(),
            chat_id: "@channel".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_requires_token_and_chat() {
        assert!(TelegramClient::new(TelegramConfig::default()).is_err());
        assert!(TelegramClient::new(config()).is_ok());
    }

    #[test]
    fn test_method_url() {
        let client = TelegramClient::new(config()).unwrap();
        assert_eq!(
            client.method_url("sendMessage"),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn test_entity_error_detection() {
        let err = PublishError::Api("400: Bad Request: can't parse entities".into());
        assert!(is_entity_error(&err));
        assert!(!is_entity_error(&PublishError::Api("403: Forbidden".into())));
    }

    #[test]
    fn test_message_text_prefers_generated_summary() {
        let client = TelegramClient::new(config()).unwrap();
        let post = Post {
            summary: "<b>Ready".into(),
            ..Default::default()
        };
        assert_eq!(client.message_text(&post), "<b>Ready</b>");
    }

    #[test]
    fn test_message_text_built_from_body() {
        let client = TelegramClient::new(config()).unwrap();
        let post = Post {
            brand: "Festo".into(),
            title: "Pneumatic valves".into(),
            body: "<h2>Intro</h2><p>Valves move air.</p>".into(),
            ..Default::default()
        };
        let text = client.message_text(&post);
        assert!(text.contains("<b>Pneumatic valves</b>"));
        assert!(text.contains("Valves move air."));
        assert!(text.contains("#Festo"));
        assert!(!text.contains("<p>"));
    }
}
