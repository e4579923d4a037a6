//! Product image lookup
//!
//! Images live in `<root>/<brand folder>/<ARTICLE>-itexport.<ext>`. Article
//! numbers are pulled out of the topic text with a set of part-number
//! patterns; longer candidates are tried first.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use super::themes::Topic;

const EXPORT_SUFFIX: &str = "-itexport";

const IMAGE_EXTENSIONS: [&str; 24] = [
    ".jpg", ".JPG", ".jpeg", ".JPEG", ".png", ".PNG", ".webp", ".WEBP", ".gif", ".GIF", ".bmp",
    ".BMP", ".tiff", ".TIFF", ".tif", ".TIF", ".svg", ".SVG", ".avif", ".AVIF", ".heic", ".HEIC",
    ".heif", ".HEIF",
];

/// Words that look like part numbers but are not
const COMMON_WORDS: [&str; 10] = [
    "EVERYTHING",
    "FEATURES",
    "BENEFITS",
    "THROUGH",
    "SWITCH",
    "ABOUT",
    "NEED",
    "KNOW",
    "ELECTRIC",
    "SCHNEIDER",
];

const MIN_ARTICLE_LEN: usize = 5;

static ARTICLE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"[0-9][A-Z]{2,}[0-9]{6,}[A-Z][0-9]{4}",
        r"[A-Z]{2}[0-9]{3}[A-Z][0-9]{2}[A-Z]",
        r"[0-9][A-Z]{3}[0-9]{8}[A-Z][0-9]{3,4}",
        r"[A-Z0-9]+-[A-Z0-9]+-[A-Z0-9]+",
        r"[A-Z]{2,4}[0-9]{4,8}[A-Z]{1,3}[0-9]{1,4}",
        r"[0-9]{4,}[A-Z]{2,}[0-9]{2,}",
        r"[A-Z]{3,}[0-9]{5,}",
        r"[A-Z]{2,4}[0-9]{2,4}[A-Z]{1,3}",
        r"[A-Z0-9]{5,}",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Folder name used for a brand on disk
pub fn brand_folder(brand: &str) -> &str {
    match brand {
        "Allen Bradley" => "Allen-Bradley",
        "Pepperl+Fuchs" => "PEPPERL+FUCHS",
        "Honeywell" => "honeywell",
        other => other,
    }
}

/// Candidate article numbers in `text`, longest first
pub fn extract_articles(text: &str) -> Vec<String> {
    let upper = text.to_uppercase();

    let found: BTreeSet<String> = ARTICLE_PATTERNS
        .iter()
        .flat_map(|pattern| pattern.find_iter(&upper).map(|m| m.as_str().to_string()))
        .filter(|a| a.len() >= MIN_ARTICLE_LEN && !COMMON_WORDS.contains(&a.as_str()))
        .collect();

    let mut articles: Vec<String> = found.into_iter().collect();
    // stable sort keeps ties in lexical order
    articles.sort_by(|a, b| b.len().cmp(&a.len()));
    articles
}

fn sorted_file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|e| e.file_name().into_string().ok())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}

/// First file whose stem contains `needle` and ends with the export suffix
fn partial_match<'a>(names: &'a [String], needle: &str, ext: &str) -> Option<&'a String> {
    let suffix = format!("{EXPORT_SUFFIX}{ext}");
    names.iter().find(|name| {
        name.strip_suffix(&suffix)
            .map(|stem| stem.contains(needle))
            .unwrap_or(false)
    })
}

/// Find an image for an article number mentioned in `text`
pub fn find_product_image(root: &Path, brand: &str, text: &str) -> Option<PathBuf> {
    let folder = root.join(brand_folder(brand));
    if !folder.is_dir() {
        tracing::debug!(folder = %folder.display(), "Brand image folder not found");
        return None;
    }

    let articles = extract_articles(text);
    if articles.is_empty() {
        return None;
    }
    tracing::debug!(brand = %brand, articles = ?articles, "Article candidates");

    let names = sorted_file_names(&folder);

    for article in &articles {
        for ext in IMAGE_EXTENSIONS {
            let exact = folder.join(format!("{article}{EXPORT_SUFFIX}{ext}"));
            if exact.is_file() {
                tracing::info!(image = %exact.display(), "Product image found");
                return Some(exact);
            }
        }

        for ext in IMAGE_EXTENSIONS {
            if let Some(name) = partial_match(&names, article, ext) {
                tracing::info!(image = %name, "Product image found (partial match)");
                return Some(folder.join(name));
            }
        }

        let undashed = article.replace('-', "");
        if undashed != *article {
            for ext in IMAGE_EXTENSIONS {
                if let Some(name) = partial_match(&names, &undashed, ext) {
                    tracing::info!(image = %name, "Product image found (without dashes)");
                    return Some(folder.join(name));
                }
            }
        }
    }

    tracing::debug!(brand = %brand, "No product image found");
    None
}

/// Search the topic title, then each subtopic
pub fn find_for_topic(root: &Path, topic: &Topic) -> Option<PathBuf> {
    std::iter::once(topic.title.as_str())
        .chain(topic.subtopics.iter().map(String::as_str))
        .find_map(|text| find_product_image(root, &topic.brand, text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"img").unwrap();
    }

    #[test]
    fn test_extract_articles_longest_first() {
        let articles = extract_articles("Everything about the 1SCA138208R1001 switch");
        assert_eq!(articles[0], "1SCA138208R1001");
        assert!(!articles.contains(&"EVERYTHING".to_string()));
        assert!(!articles.contains(&"SWITCH".to_string()));
        assert!(articles.iter().all(|a| a.len() >= 5));
    }

    #[test]
    fn test_extract_articles_dashed() {
        let articles = extract_articles("Festo vuvg-l14-m52 valve");
        assert_eq!(articles[0], "VUVG-L14-M52");
    }

    #[test]
    fn test_brand_folder_aliases() {
        assert_eq!(brand_folder("Allen Bradley"), "Allen-Bradley");
        assert_eq!(brand_folder("Honeywell"), "honeywell");
        assert_eq!(brand_folder("ABB"), "ABB");
    }

    #[test]
    fn test_exact_match() {
        let root = TempDir::new().unwrap();
        let folder = root.path().join("ABB");
        fs::create_dir(&folder).unwrap();
        touch(&folder, "OT160G03K-itexport.png");

        let found = find_product_image(root.path(), "ABB", "OT160G03K switch guide").unwrap();
        assert_eq!(found, folder.join("OT160G03K-itexport.png"));
    }

    #[test]
    fn test_partial_and_undashed_match() {
        let root = TempDir::new().unwrap();
        let folder = root.path().join("Festo");
        fs::create_dir(&folder).unwrap();
        touch(&folder, "8038VUVGL14M52-itexport.JPG");

        let found = find_product_image(root.path(), "Festo", "VUVG-L14-M52").unwrap();
        assert_eq!(found, folder.join("8038VUVGL14M52-itexport.JPG"));
    }

    #[test]
    fn test_missing_folder_or_image() {
        let root = TempDir::new().unwrap();
        assert!(find_product_image(root.path(), "ABB", "OT160G03K").is_none());

        fs::create_dir(root.path().join("ABB")).unwrap();
        assert!(find_product_image(root.path(), "ABB", "OT160G03K").is_none());
    }

    #[test]
    fn test_find_for_topic_uses_subtopics() {
        let root = TempDir::new().unwrap();
        let folder = root.path().join("ABB");
        fs::create_dir(&folder).unwrap();
        touch(&folder, "3AUA0000036521-itexport.webp");

        let topic = Topic {
            brand: "ABB".into(),
            title: "Drives overview".into(),
            subtopics: vec!["Model 3AUA0000036521 details".into()],
        };
        assert_eq!(
            find_for_topic(root.path(), &topic),
            Some(folder.join("3AUA0000036521-itexport.webp"))
        );
    }
}
