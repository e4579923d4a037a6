//! Article generator
//!
//! Production [`ContentGenerator`]: theme catalog, product images and the
//! text API put together.

use std::path::PathBuf;
use std::sync::RwLock;

use async_trait::async_trait;

use super::format::{self, SummaryStyle};
use super::images;
use super::llm::{self, GeneratedArticle, TextClient};
use super::themes::{ThemeCatalog, Topic};
use super::watermark::{self, WatermarkStyle};
use super::{ContentGenerator, GenerationError};
use crate::config::Config;
use crate::models::{Post, PublishedSet};

/// Generates posts through the text API
pub struct ArticleGenerator {
    catalog: RwLock<ThemeCatalog>,
    images_root: PathBuf,
    watermark: Option<PathBuf>,
    watermark_style: WatermarkStyle,
    client: TextClient,
    style: SummaryStyle,
}

impl ArticleGenerator {
    pub fn new(
        catalog: ThemeCatalog,
        images_root: PathBuf,
        client: TextClient,
        style: SummaryStyle,
    ) -> Self {
        Self {
            catalog: RwLock::new(catalog),
            images_root,
            watermark: None,
            watermark_style: WatermarkStyle::default(),
            client,
            style,
        }
    }

    /// Draw `path` on every product image that is found
    pub fn with_watermark(mut self, path: impl Into<PathBuf>) -> Self {
        self.watermark = Some(path.into());
        self
    }

    /// Build from configuration, loading the theme catalog
    pub fn from_config(config: &Config) -> Result<Self, GenerationError> {
        let catalog = ThemeCatalog::load(&config.paths.themes)?;
        let client = TextClient::new(config.generator.clone())?;
        let generator = Self::new(
            catalog,
            config.paths.images.clone(),
            client,
            SummaryStyle::from_config(&config.telegram),
        );
        Ok(match &config.paths.watermark {
            Some(path) => generator.with_watermark(path),
            None => generator,
        })
    }

    /// Number of topics in the current catalog
    pub fn topic_count(&self) -> usize {
        self.catalog.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn pick_topic(&self, published_today: &PublishedSet) -> Option<Topic> {
        let catalog = self.catalog.read().unwrap_or_else(|e| e.into_inner());
        let mut rng = rand::thread_rng();
        catalog.pick(published_today, &mut rng)
    }
}

/// Assemble the post from a topic and the generated article
///
/// The summary title falls back to the first bold span of the summary, then
/// to the article title.
pub fn assemble_post(
    topic: Topic,
    article: GeneratedArticle,
    image_path: Option<PathBuf>,
    style: &SummaryStyle,
) -> Post {
    let summary_title = if !article.summary_title.trim().is_empty() {
        article.summary_title.trim().to_string()
    } else {
        first_bold(&article.summary).unwrap_or_else(|| article.title.clone())
    };

    let hashtags = format::hashtags(&topic.brand, &topic.title, &article.tags.join(", "));
    let summary = format::messaging_summary(
        &article.summary,
        Some(&summary_title),
        &hashtags,
        style,
        image_path.is_some(),
    );

    Post {
        brand: topic.brand,
        topic: topic.title,
        title: article.title,
        body: article.body,
        tags: article.tags,
        summary_title,
        summary,
        image_path,
    }
}

fn first_bold(text: &str) -> Option<String> {
    let start = text.find("<b>")? + 3;
    let end = text[start..].find("</b>")? + start;
    let inner = text[start..end].trim();
    (!inner.is_empty()).then(|| inner.to_string())
}

#[async_trait]
impl ContentGenerator for ArticleGenerator {
    async fn generate_post(
        &self,
        published_today: &PublishedSet,
    ) -> Result<Option<Post>, GenerationError> {
        let Some(topic) = self.pick_topic(published_today) else {
            tracing::info!("Every topic has been published today");
            return Ok(None);
        };

        tracing::info!(brand = %topic.brand, topic = %topic.title, "Topic selected");

        let image_path = images::find_for_topic(&self.images_root, &topic).map(|path| {
            watermark::watermark_or_original(&path, self.watermark.as_deref(), &self.watermark_style)
        });
        let prompt = llm::build_article_prompt(&topic.title, &topic.subtopics);
        let reply = self.client.complete(&prompt).await?;
        let article = llm::parse_article(&reply)?;

        tracing::info!(
            title = %article.title,
            tags = article.tags.len(),
            image = image_path.is_some(),
            "Article generated"
        );

        Ok(Some(assemble_post(topic, article, image_path, &self.style)))
    }

    fn reload(&self, config: &Config) -> Result<(), GenerationError> {
        let catalog = ThemeCatalog::load(&config.paths.themes)?;
        *self.catalog.write().unwrap_or_else(|e| e.into_inner()) = catalog;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic() -> Topic {
        Topic {
            brand: "ABB".into(),
            title: "ACS880 drives".into(),
            subtopics: vec![],
        }
    }

    fn article(summary: &str, summary_title: &str) -> GeneratedArticle {
        GeneratedArticle {
            title: "The ACS880 Guide".into(),
            body: "<h2>Intro</h2>".into(),
            tags: vec!["ABB".into(), "drives".into()],
            summary: summary.into(),
            summary_title: summary_title.into(),
        }
    }

    #[test]
    fn test_assemble_uses_generated_summary_title() {
        let post = assemble_post(
            topic(),
            article("Save energy.", "Drive smarter"),
            None,
            &SummaryStyle::default(),
        );
        assert_eq!(post.topic, "ACS880 drives");
        assert_eq!(post.title, "The ACS880 Guide");
        assert_eq!(post.summary_title, "Drive smarter");
        assert!(post.summary.contains("<b>Drive smarter</b>"));
        assert!(post.summary.contains("#ABB #frequency_converters"));
    }

    #[test]
    fn test_assemble_summary_title_fallbacks() {
        let post = assemble_post(
            topic(),
            article("<b>Bold start</b> text", ""),
            None,
            &SummaryStyle::default(),
        );
        assert_eq!(post.summary_title, "Bold start");

        let post = assemble_post(topic(), article("plain", " "), None, &SummaryStyle::default());
        assert_eq!(post.summary_title, "The ACS880 Guide");
    }

    #[test]
    fn test_first_bold() {
        assert_eq!(first_bold("x <b> Hi </b>"), Some("Hi".to_string()));
        assert_eq!(first_bold("<b></b>"), None);
        assert_eq!(first_bold("none"), None);
    }
}
