//! Theme catalog
//!
//! JSON object mapping a brand to its topics:
//!
//! ```json
//! {
//!   "ABB": [
//!     { "title": "ACS880 drives", "subtopics": ["3AUA0000036521"] }
//!   ]
//! }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::GenerationError;
use crate::models::PublishedSet;

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeEntry {
    pub title: String,
    #[serde(default)]
    pub subtopics: Vec<String>,
}

/// A topic ready for generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub brand: String,
    pub title: String,
    pub subtopics: Vec<String>,
}

/// Brands and their topics
#[derive(Debug, Clone, Default)]
pub struct ThemeCatalog {
    brands: BTreeMap<String, Vec<ThemeEntry>>,
}

impl ThemeCatalog {
    /// Load the catalog from a file
    pub fn load(path: &Path) -> Result<Self, GenerationError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            GenerationError::Catalog(format!("failed to read {}: {e}", path.display()))
        })?;
        let catalog = Self::parse(&text)
            .map_err(|e| GenerationError::Catalog(format!("{}: {e}", path.display())))?;

        tracing::info!(
            path = %path.display(),
            brands = catalog.brands.len(),
            topics = catalog.len(),
            "Theme catalog loaded"
        );
        Ok(catalog)
    }

    /// Parse catalog text, tolerating missing outer braces
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let mut text = text.trim().to_string();
        if !text.starts_with('{') {
            text.insert(0, '{');
        }
        if !text.ends_with('}') {
            text.push('}');
        }

        let brands: BTreeMap<String, Vec<ThemeEntry>> = serde_json::from_str(&text)?;
        Ok(Self { brands })
    }

    pub fn from_brands(brands: BTreeMap<String, Vec<ThemeEntry>>) -> Self {
        Self { brands }
    }

    /// Total number of topics
    pub fn len(&self) -> usize {
        self.brands.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Topics whose (brand, title) was not published today, compared case-insensitively
    pub fn available(&self, published_today: &PublishedSet) -> Vec<Topic> {
        let published: HashSet<(String, String)> = published_today
            .iter()
            .map(|(brand, title)| (brand.to_lowercase(), title.to_lowercase()))
            .collect();

        self.brands
            .iter()
            .flat_map(|(brand, entries)| {
                entries.iter().map(move |entry| Topic {
                    brand: brand.clone(),
                    title: entry.title.clone(),
                    subtopics: entry.subtopics.clone(),
                })
            })
            .filter(|topic| {
                !published.contains(&(topic.brand.to_lowercase(), topic.title.to_lowercase()))
            })
            .collect()
    }

    /// Uniformly random available topic
    pub fn pick<R: Rng + ?Sized>(&self, published_today: &PublishedSet, rng: &mut R) -> Option<Topic> {
        self.available(published_today).choose(rng).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const CATALOG: &str = r#"
        "ABB": [
            {"title": "ACS880 drives", "subtopics": ["3AUA0000036521"]},
            {"title": "OT160G03K switch"}
        ],
        "Festo": [
            {"title": "Pneumatic valves"}
        ]
    "#;

    #[test]
    fn test_parse_repairs_missing_braces() {
        let catalog = ThemeCatalog::parse(CATALOG).unwrap();
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_available_is_case_insensitive() {
        let catalog = ThemeCatalog::parse(CATALOG).unwrap();
        let mut published = PublishedSet::new();
        published.insert(("abb".to_string(), "acs880 DRIVES".to_string()));

        let available = catalog.available(&published);
        assert_eq!(available.len(), 2);
        assert!(available.iter().all(|t| t.title != "ACS880 drives"));
    }

    #[test]
    fn test_pick_none_when_exhausted() {
        let catalog = ThemeCatalog::parse(r#"{"Festo": [{"title": "Pneumatic valves"}]}"#).unwrap();
        let mut published = PublishedSet::new();
        published.insert(("Festo".to_string(), "Pneumatic valves".to_string()));

        let mut rng = StdRng::seed_from_u64(7);
        assert!(catalog.pick(&published, &mut rng).is_none());
        assert!(catalog.pick(&PublishedSet::new(), &mut rng).is_some());
    }

    #[test]
    fn test_load_missing_file() {
        let err = ThemeCatalog::load(Path::new("/nonexistent/theme_host.json")).unwrap_err();
        assert!(matches!(err, GenerationError::Catalog(_)));
    }
}
