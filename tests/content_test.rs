//! Content pipeline tests against a mock text API

use std::path::Path;

use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use autoposter::config::{Config, GeneratorConfig};
use autoposter::content::format::SummaryStyle;
use autoposter::content::{
    ArticleGenerator, ContentGenerator, GenerationError, TextClient, ThemeCatalog,
};
use autoposter::models::PublishedSet;

const CATALOG: &str = r#"{
    "ABB": [
        {"title": "ACS880 drives", "subtopics": ["3AUA0000036521"]}
    ]
}"#;

const ARTICLE_REPLY: &str = r#"Here is the article:
```json
{
    "title": "ACS880 Drives: A Practical Guide",
    "body": "<h1>ACS880 Drives: A Practical Guide</h1><p>Industrial drives for every load.</p>",
    "tags": "ABB, drives, frequency converter",
    "telegram_summary": "<b>ACS880 drives</b>\n\nReliable speed control for pumps and fans.",
    "telegram_title": ""
}
```"#;

fn completion(content: &str) -> Value {
    json!({
        "choices": [
            {"message": {"role": "assistant", "content": content}}
        ]
    })
}

fn generator(server: &MockServer, images: &Path) -> ArticleGenerator {
    let client = TextClient::new(GeneratorConfig {
        url: format!("{}/v1", server.uri()),
        api_key: "sk-test".into(),
        model: "test-model".into(),
        timeout_secs: 5,
    })
    .unwrap();

    ArticleGenerator::new(
        ThemeCatalog::parse(CATALOG).unwrap(),
        images.to_path_buf(),
        client,
        SummaryStyle::default(),
    )
}

#[tokio::test]
async fn test_generates_post_with_image_and_summary() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let brand_dir = dir.path().join("ABB");
    std::fs::create_dir_all(&brand_dir).unwrap();
    std::fs::write(brand_dir.join("3AUA0000036521-itexport.jpg"), b"jpeg").unwrap();

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(ARTICLE_REPLY)))
        .expect(1)
        .mount(&server)
        .await;

    let post = generator(&server, dir.path())
        .generate_post(&PublishedSet::new())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(post.brand, "ABB");
    assert_eq!(post.topic, "ACS880 drives");
    assert_eq!(post.title, "ACS880 Drives: A Practical Guide");
    assert_eq!(post.tags, vec!["ABB", "drives", "frequency converter"]);
    assert_eq!(post.summary_title, "ACS880 drives");
    assert_eq!(
        post.image_path.as_deref(),
        Some(brand_dir.join("3AUA0000036521-itexport.jpg").as_path())
    );
    assert!(post.summary.contains("#ABB"));
    assert!(post.summary.chars().count() <= 1024);
}

#[tokio::test]
async fn test_no_topic_left_skips_api_call() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(ARTICLE_REPLY)))
        .expect(0)
        .mount(&server)
        .await;

    let mut published = PublishedSet::new();
    published.insert(("abb".to_string(), "acs880 DRIVES".to_string()));

    let post = generator(&server, dir.path())
        .generate_post(&published)
        .await
        .unwrap();
    assert!(post.is_none());
}

#[tokio::test]
async fn test_api_error_and_malformed_reply() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion("Sorry, I cannot help with that.")),
        )
        .mount(&server)
        .await;

    let generator = generator(&server, dir.path());

    let err = generator.generate_post(&PublishedSet::new()).await.unwrap_err();
    assert!(matches!(err, GenerationError::Api { status: 429, .. }));
    assert!(err.is_recoverable());

    let err = generator.generate_post(&PublishedSet::new()).await.unwrap_err();
    assert!(matches!(err, GenerationError::MalformedContent(_)));
}

#[tokio::test]
async fn test_watermarked_image_replaces_original() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let brand_dir = dir.path().join("ABB");
    std::fs::create_dir_all(&brand_dir).unwrap();
    let source = brand_dir.join("3AUA0000036521-itexport.png");
    image::RgbaImage::from_pixel(64, 32, image::Rgba([255, 255, 255, 255]))
        .save(&source)
        .unwrap();
    let mark = dir.path().join("watermark.png");
    image::RgbaImage::from_pixel(8, 8, image::Rgba([0, 0, 0, 255]))
        .save(&mark)
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(ARTICLE_REPLY)))
        .mount(&server)
        .await;

    let post = generator(&server, dir.path())
        .with_watermark(&mark)
        .generate_post(&PublishedSet::new())
        .await
        .unwrap()
        .unwrap();

    let watermarked = brand_dir.join("3AUA0000036521-itexport_wm.png");
    assert_eq!(post.image_path.as_deref(), Some(watermarked.as_path()));
    assert!(watermarked.is_file());
    assert!(source.is_file());
}

#[tokio::test]
async fn test_reload_picks_up_edited_catalog() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(ARTICLE_REPLY)))
        .mount(&server)
        .await;

    let mut config = Config::default();
    config.paths.themes = dir.path().join("theme_host.json");
    config.paths.images = dir.path().join("img");
    config.paths.watermark = None;
    config.generator = GeneratorConfig {
        url: format!("{}/v1", server.uri()),
        api_key: "sk-test".into(),
        model: "test-model".into(),
        timeout_secs: 5,
    };
    std::fs::write(&config.paths.themes, CATALOG).unwrap();

    let generator = ArticleGenerator::from_config(&config).unwrap();
    assert_eq!(generator.topic_count(), 1);

    std::fs::write(
        &config.paths.themes,
        r#"{"Festo": [{"title": "Valve terminals"}, {"title": "Cylinders"}]}"#,
    )
    .unwrap();
    generator.reload(&config).unwrap();
    assert_eq!(generator.topic_count(), 2);

    let mut published = PublishedSet::new();
    published.insert(("Festo".to_string(), "Cylinders".to_string()));
    let post = generator.generate_post(&published).await.unwrap().unwrap();
    assert_eq!(post.brand, "Festo");
    assert_eq!(post.topic, "Valve terminals");

    // a broken edit keeps the catalog already loaded
    std::fs::write(&config.paths.themes, "not a catalog").unwrap();
    let err = generator.reload(&config).unwrap_err();
    assert!(matches!(err, GenerationError::Catalog(_)));
    assert_eq!(generator.topic_count(), 2);
}

#[test]
fn test_missing_catalog_aborts_startup() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.paths.themes = dir.path().join("theme_host.json");

    let err = ArticleGenerator::from_config(&config).err().unwrap();
    assert!(matches!(err, GenerationError::Catalog(_)));
    assert!(!err.is_recoverable());
}
