//! WordPress REST API client
//!
//! Publishes articles through `wp-json/wp/v2` with an application password.
//! A featured image upload failure does not fail the post; tags are resolved
//! by search, then created.

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{PublishError, PublishResult};
use crate::config::WordPressConfig;
use crate::content::format::strip_duplicate_title;
use crate::models::{Platform, Post};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Term returned by the tags endpoints
#[derive(Debug, Deserialize)]
struct WpTerm {
    id: u64,
    #[serde(default)]
    name: String,
}

/// Error body returned by the REST API
#[derive(Debug, Deserialize)]
struct WpError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    data: Option<WpErrorData>,
}

#[derive(Debug, Deserialize)]
struct WpErrorData {
    term_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct WpMedia {
    id: u64,
    #[serde(default)]
    source_url: String,
}

#[derive(Debug, Deserialize)]
struct WpPost {
    id: u64,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Serialize)]
struct NewPost<'a> {
    title: &'a str,
    content: &'a str,
    status: &'a str,
    categories: Vec<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    featured_media: Option<u64>,
}

#[derive(Debug, Serialize)]
struct NewTag<'a> {
    name: &'a str,
    slug: String,
}

/// Tags used when generation returned none
pub fn fallback_tags(brand: &str) -> Vec<String> {
    let mut tags = Vec::new();
    if !brand.is_empty() {
        tags.push(brand.to_string());
        tags.push(format!("{brand} automation"));
    }
    tags.extend(
        ["industrial equipment", "automation solutions", "industrial controls"]
            .iter()
            .map(|t| t.to_string()),
    );
    tags
}

fn tag_slug(name: &str) -> String {
    name.to_lowercase().replace([' ', '/'], "-")
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        "heic" | "heif" => "image/heic",
        _ => "application/octet-stream",
    }
}

/// WordPress client
pub struct WordPressClient {
    client: Client,
    config: WordPressConfig,
}

impl WordPressClient {
    /// Create a new client
    pub fn new(config: WordPressConfig) -> PublishResult<Self> {
        if config.url.is_empty() {
            return Err(PublishError::InvalidConfig(
                "WordPress URL cannot be empty".to_string(),
            ));
        }
        if !config.url.starts_with("http://") && !config.url.starts_with("https://") {
            return Err(PublishError::InvalidConfig(
                "WordPress URL must start with http:// or https://".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client, config })
    }

    fn api(&self, path: &str) -> String {
        format!(
            "{}/wp-json/wp/v2/{path}",
            self.config.url.trim_end_matches('/')
        )
    }

    async fn status_error(response: reqwest::Response) -> PublishError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        PublishError::Status {
            platform: Platform::WordPress,
            status,
            body,
        }
    }

    /// Publish a post, returning the new post id
    pub async fn publish(&self, post: &Post) -> PublishResult<u64> {
        let featured_media = match &post.image_path {
            Some(path) => match self.upload_media(path).await {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::warn!(
                        image = %path.display(),
                        error = %e,
                        "Media upload failed, publishing without image"
                    );
                    None
                }
            },
            None => None,
        };

        let tag_names = if post.tags.is_empty() {
            fallback_tags(&post.brand)
        } else {
            post.tags.clone()
        };
        let tags = self.resolve_tags(&tag_names).await;

        let content = strip_duplicate_title(&post.body, &post.title);
        if content != post.body {
            tracing::debug!("Removed duplicate title heading from body");
        }

        let created = self
            .create_post(&post.title, &content, tags, featured_media)
            .await?;

        tracing::debug!(
            post_id = created.id,
            status = %created.status,
            category = self.config.category_id,
            tags = tag_names.len(),
            featured_media = ?featured_media,
            "WordPress post created"
        );
        Ok(created.id)
    }

    /// Upload an image to the media library, returning its id
    pub async fn upload_media(&self, path: &Path) -> PublishResult<u64> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();

        tracing::debug!(
            file = %filename,
            size_kb = bytes.len() / 1024,
            "Uploading media"
        );

        let part = Part::bytes(bytes)
            .file_name(filename.clone())
            .mime_str(mime_for(path))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.api("media"))
            .basic_auth(&self.config.user, Some(&self.config.password))
            .header(
                reqwest::header::CONTENT_DISPOSITION,
                format!("attachment; filename={filename}"),
            )
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let media: WpMedia = response.json().await?;
        tracing::debug!(media_id = media.id, url = %media.source_url, "Media uploaded");
        Ok(media.id)
    }

    /// Resolve tag names to ids, creating missing tags
    ///
    /// Tags that cannot be resolved are skipped.
    pub async fn resolve_tags(&self, names: &[String]) -> Vec<u64> {
        let mut ids = Vec::new();
        for name in names {
            match self.resolve_tag(name).await {
                Ok(Some(id)) => ids.push(id),
                Ok(None) => tracing::warn!(tag = %name, "Tag exists but its id is unknown"),
                Err(e) => tracing::warn!(tag = %name, error = %e, "Failed to resolve tag"),
            }
        }
        ids
    }

    async fn resolve_tag(&self, name: &str) -> PublishResult<Option<u64>> {
        let response = self
            .client
            .get(self.api("tags"))
            .basic_auth(&self.config.user, Some(&self.config.password))
            .query(&[("search", name), ("per_page", "1")])
            .send()
            .await?;

        if response.status().is_success() {
            let found: Vec<WpTerm> = response.json().await?;
            if let Some(term) = found.first() {
                if term.name.eq_ignore_ascii_case(name) {
                    return Ok(Some(term.id));
                }
            }
        }

        let response = self
            .client
            .post(self.api("tags"))
            .basic_auth(&self.config.user, Some(&self.config.password))
            .json(&NewTag {
                name,
                slug: tag_slug(name),
            })
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let term: WpTerm = response.json().await?;
                Ok(Some(term.id))
            }
            StatusCode::BAD_REQUEST => {
                let body = response.text().await.unwrap_or_default();
                match serde_json::from_str::<WpError>(&body) {
                    Ok(err) if err.code == "term_exists" => {
                        Ok(err.data.and_then(|d| d.term_id))
                    }
                    _ => Err(PublishError::Status {
                        platform: Platform::WordPress,
                        status: 400,
                        body,
                    }),
                }
            }
            _ => Err(Self::status_error(response).await),
        }
    }

    async fn create_post(
        &self,
        title: &str,
        content: &str,
        tags: Vec<u64>,
        featured_media: Option<u64>,
    ) -> PublishResult<WpPost> {
        let body = NewPost {
            title,
            content,
            status: "publish",
            categories: vec![self.config.category_id],
            tags,
            featured_media,
        };

        let response = self
            .client
            .post(self.api("posts"))
            .basic_auth(&self.config.user, Some(&self.config.password))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        Ok(response.json().await?)
    }
}
