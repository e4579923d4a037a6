//! Offline generator for testing
//!
//! Walks a theme catalog in order and builds posts without calling the text
//! API. Failures can be scripted. `reload` picks up the configured theme file
//! when it exists.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use super::format::SummaryStyle;
use super::generator::assemble_post;
use super::llm::GeneratedArticle;
use super::themes::ThemeCatalog;
use super::{ContentGenerator, GenerationError};
use crate::config::Config;
use crate::models::{Post, PublishedSet};

/// Deterministic [`ContentGenerator`]
#[derive(Debug, Default)]
pub struct MockGenerator {
    catalog: RwLock<ThemeCatalog>,
    failures: AtomicU32,
    calls: AtomicU32,
    reloads: AtomicU32,
}

impl MockGenerator {
    pub fn new(catalog: ThemeCatalog) -> Self {
        Self {
            catalog: RwLock::new(catalog),
            ..Default::default()
        }
    }

    /// Catalog with `count` topics for a single brand
    pub fn with_topics(brand: &str, count: usize) -> Self {
        let entries: Vec<String> = (1..=count)
            .map(|i| format!(r#"{{"title": "Topic {i}"}}"#))
            .collect();
        let text = format!(r#"{{"{brand}": [{}]}}"#, entries.join(","));
        Self::new(ThemeCatalog::parse(&text).unwrap_or_default())
    }

    /// Fail the next `times` calls
    pub fn fail_times(&self, times: u32) {
        self.failures.fetch_add(times, Ordering::SeqCst);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reloads(&self) -> u32 {
        self.reloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentGenerator for MockGenerator {
    async fn generate_post(
        &self,
        published_today: &PublishedSet,
    ) -> Result<Option<Post>, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let should_fail = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(GenerationError::MalformedContent("scripted failure".into()));
        }

        let topic = self
            .catalog
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .available(published_today)
            .into_iter()
            .next();
        let Some(topic) = topic else {
            return Ok(None);
        };

        let article = GeneratedArticle {
            title: format!("{} explained", topic.title),
            body: format!("<h2>{}</h2><p>Generated offline.</p>", topic.title),
            tags: vec![topic.brand.clone()],
            summary: format!("<b>{}</b>\\nGenerated offline.", topic.title),
            summary_title: String::new(),
        };
        Ok(Some(assemble_post(topic, article, None, &SummaryStyle::default())))
    }

    fn reload(&self, config: &Config) -> Result<(), GenerationError> {
        self.reloads.fetch_add(1, Ordering::SeqCst);
        if config.paths.themes.is_file() {
            let catalog = ThemeCatalog::load(&config.paths.themes)?;
            *self.catalog.write().unwrap_or_else(|e| e.into_inner()) = catalog;
        }
        Ok(())
    }
}
