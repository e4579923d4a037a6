//! Text generation client
//!
//! Talks to an OpenAI-compatible `chat/completions` endpoint and turns the
//! reply into a [`GeneratedArticle`].

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::GenerationError;
use crate::config::GeneratorConfig;

/// Chat completions request
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Chat completions response
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: String,
}

/// Tags arrive either as a comma separated string or as a list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TagList {
    Joined(String),
    List(Vec<String>),
}

impl Default for TagList {
    fn default() -> Self {
        Self::Joined(String::new())
    }
}

impl TagList {
    fn into_vec(self) -> Vec<String> {
        let items = match self {
            Self::Joined(joined) => joined.split(',').map(str::to_string).collect(),
            Self::List(list) => list,
        };
        items
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct RawArticle {
    title: String,
    body: String,
    #[serde(default)]
    tags: TagList,
    #[serde(default)]
    telegram_summary: String,
    #[serde(default)]
    telegram_title: String,
}

/// Article fields returned by generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArticle {
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub summary: String,
    pub summary_title: String,
}

impl From<RawArticle> for GeneratedArticle {
    fn from(raw: RawArticle) -> Self {
        Self {
            title: raw.title,
            body: raw.body,
            tags: raw.tags.into_vec(),
            summary: raw.telegram_summary,
            summary_title: raw.telegram_title,
        }
    }
}

/// JSON candidates in a reply, most specific first
///
/// A ```` ```json ```` fence, then any fence, then the span from the first
/// `{` to the last `}`.
pub fn json_candidates(text: &str) -> Vec<&str> {
    let mut candidates = Vec::new();

    if let Some(start) = text.find("```json") {
        let after = &text[start + 7..];
        if let Some(end) = after.find("```") {
            candidates.push(after[..end].trim());
        }
    } else if let Some(start) = text.find("```") {
        let after = &text[start + 3..];
        let content_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
        if let Some(end) = after[content_start..].find("```") {
            candidates.push(after[content_start..content_start + end].trim());
        }
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if end > start {
            candidates.push(&text[start..=end]);
        }
    }

    candidates
}

/// Parse a reply into an article
pub fn parse_article(text: &str) -> Result<GeneratedArticle, GenerationError> {
    let mut last_error = None;

    for candidate in json_candidates(text) {
        match serde_json::from_str::<RawArticle>(candidate) {
            Ok(raw) => return Ok(raw.into()),
            Err(e) => {
                tracing::debug!(error = %e, "Discarding JSON candidate");
                last_error = Some(e);
            }
        }
    }

    let preview: String = text.chars().take(200).collect();
    tracing::warn!(reply = %preview, "No usable JSON in generated reply");

    Err(GenerationError::MalformedContent(match last_error {
        Some(e) => format!("invalid article JSON: {e}"),
        None => "no JSON object in reply".to_string(),
    }))
}

/// Prompt for one article
pub fn build_article_prompt(topic: &str, subtopics: &[String]) -> String {
    let mut prompt = format!(
        r#"You are an expert SEO copywriter.
Write a complete, SEO-optimized article in English on the topic: "{topic}".

Requirements:
- A compelling, search-friendly title. It is the page title; do not repeat it as <h1> in the body.
- The body is HTML starting with <h2> subheadings, with lists where useful. No <h1> tags.
- Between 800 and 1200 words.
- 5-7 SEO tags mixing brand names with technical terms, as one comma separated string.
- A short Telegram summary with its own title, different from the article title:
  * title of at most 50 characters
  * only <b>, <i>, <u>, <s>, <a>, <code>, <pre> tags; no <ul>, <li>, <br>, <p>
  * line breaks written as "\n"
  * "•" bullets and an emoji in front of key points
  * at most 500 characters

Reply strictly with this JSON:
{{
  "title": "...",
  "body": "...",
  "tags": "tag1, tag2, tag3, tag4, tag5",
  "telegram_summary": "...",
  "telegram_title": "..."
}}
"#
    );

    if !subtopics.is_empty() {
        prompt.push_str("\nSubtopics to cover as sections in the article:\n");
        for subtopic in subtopics {
            prompt.push_str("- ");
            prompt.push_str(subtopic);
            prompt.push('\n');
        }
    }

    prompt
}

/// Chat completions client
pub struct TextClient {
    client: Client,
    config: GeneratorConfig,
}

impl TextClient {
    /// Create a new client
    pub fn new(config: GeneratorConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.url.trim_end_matches('/'))
    }

    /// Send a single user message and return the reply text
    pub async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        tracing::debug!(
            model = %self.config.model,
            prompt_chars = prompt.chars().count(),
            "Requesting completion"
        );

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api { status, body });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| GenerationError::MalformedContent("reply has no choices".to_string()))
    }
}
