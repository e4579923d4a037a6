//! HTML and hashtag helpers
//!
//! The messaging platform accepts a small HTML subset (`b`, `i`, `u`, `s`,
//! `a`, `code`, `pre`), so generated summaries are rewritten into it here.
//! Article bodies get their duplicated title heading stripped before they go
//! to the CMS.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::TelegramConfig;
use crate::models::truncate_chars;
use crate::utils::normalize_whitespace;

/// Caption limit for photo messages
pub const CAPTION_LIMIT: usize = 1024;

/// Limit for plain text messages
pub const MESSAGE_LIMIT: usize = 4096;

/// Heading markers; a summary containing any of them is left undecorated
const HEADING_EMOJI: [&str; 5] = ["🔹", "📌", "⚡️", "✅", "💡"];

/// Tags closed automatically when left open
const CLOSABLE_TAGS: [&str; 6] = ["b", "i", "u", "s", "code", "pre"];

static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static BOLD_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<b>(.*?)</b>").unwrap());
static LIST_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</?ul\s*>").unwrap());
static ITEM_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<li\s*>(.*?)</li\s*>").unwrap());
static HEADING_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h[1-6][^>]*>(.*?)</h[1-6]\s*>").unwrap());
static PARAGRAPH_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<p(?:\s[^>]*)?>(.*?)</p\s*>").unwrap());
static BREAK_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static BULLET_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"•[ \t]*").unwrap());
static BULLET_LINE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^\n])[ \t]*• ").unwrap());
static BOLD_END_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</b>[ \t]*\n*[ \t]*").unwrap());
static MULTI_NEWLINE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());
static HTML_TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(/?)([a-zA-Z][a-zA-Z0-9]*)(?:\s[^>]*)?>").unwrap());
static H1_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h1[^>]*>(.*?)</h1\s*>").unwrap());
static H2_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h2[^>]*>(.*?)</h2\s*>").unwrap());
static LEADING_BREAKS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(?:<br\s*/?>\s*)+").unwrap());
static EMPTY_PARAGRAPH_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(?:<p(?:\s[^>]*)?>\s*</p>\s*)+").unwrap());
static NON_WORD_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]").unwrap());
// ============================================================================
// Hashtags
// ============================================================================

const PRODUCT_TYPES: &[(&str, &[&str])] = &[
    (
        "frequency_converters",
        &["frequency converter", "drive", "vfd", "variable frequency", "acs", "frequency drive"],
    ),
    (
        "sensors",
        &["sensor", "proximity", "photoelectric", "ultrasonic", "laser", "detection"],
    ),
    (
        "safety_systems",
        &["safety", "emergency stop", "light curtain", "safety relay", "protective"],
    ),
    (
        "switches",
        &["switch", "selector", "button", "emergency", "limit switch"],
    ),
    (
        "controllers",
        &["controller", "plc", "programmable", "logic controller", "control system"],
    ),
    (
        "communication",
        &["ethernet", "profibus", "profinet", "modbus", "communication", "network"],
    ),
    (
        "instrumentation",
        &["transmitter", "measurement", "pressure", "temperature", "level", "flow"],
    ),
    (
        "robotics",
        &["robot", "robotic", "automation", "collaborative"],
    ),
    (
        "power_supplies",
        &["power supply", "ups", "uninterruptible", "power", "electrical"],
    ),
    (
        "valves",
        &["valve", "pneumatic", "hydraulic", "actuator"],
    ),
];

const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "process_automation",
        &["process", "manufacturing", "production", "chemical", "petrochemical", "sensor", "detection", "proximity"],
    ),
    (
        "factory_automation",
        &["factory", "assembly", "packaging", "conveyor", "plc", "programmable", "controller"],
    ),
    (
        "building_automation",
        &["building", "hvac", "facility", "energy management"],
    ),
    (
        "motion_control",
        &["motion", "servo", "stepper", "positioning", "movement"],
    ),
    (
        "safety_solutions",
        &["safety", "protection", "emergency", "hazard", "risk"],
    ),
    (
        "energy_efficiency",
        &["energy", "efficiency", "consumption", "saving", "green"],
    ),
    (
        "connectivity",
        &["communication", "network", "iot", "digital", "remote"],
    ),
    (
        "maintenance",
        &["maintenance", "diagnostic", "monitoring", "predictive", "condition"],
    ),
];

fn first_match(table: &[(&'static str, &[&str])], text: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(name, _)| *name)
}

/// Three hashtags: brand, product type and product category
///
/// `tags` is the comma separated tag string returned by generation.
pub fn hashtags(brand: &str, topic: &str, tags: &str) -> String {
    let mut result = Vec::with_capacity(3);

    if !brand.is_empty() {
        let brand = brand.replace(' ', "_").replace('&', "and").replace('+', "plus");
        result.push(format!("#{brand}"));
    }

    let search = format!("{topic} {tags}").to_lowercase();

    let product_type = first_match(PRODUCT_TYPES, &search).unwrap_or_else(|| {
        if ["automation", "industrial", "control"]
            .iter()
            .any(|w| search.contains(w))
        {
            "automation_equipment"
        } else {
            "industrial_equipment"
        }
    });
    result.push(format!("#{product_type}"));

    let category = first_match(CATEGORIES, &search).unwrap_or("industrial_solutions");
    result.push(format!("#{category}"));

    result.join(" ")
}

// ============================================================================
// Messaging summary
// ============================================================================

/// Fixed prefix and suffix around every summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryStyle {
    pub prefix: String,
    pub suffix: String,
}

impl SummaryStyle {
    pub fn from_config(config: &TelegramConfig) -> Self {
        Self {
            prefix: config.prefix.clone(),
            suffix: config.suffix.clone(),
        }
    }
}

impl Default for SummaryStyle {
    fn default() -> Self {
        Self::from_config(&TelegramConfig::default())
    }
}

/// Decode the entities generation tends to emit
pub fn unescape_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

/// Remove every tag
pub fn strip_tags(text: &str) -> String {
    TAG_REGEX.replace_all(text, "").into_owned()
}

/// Rewrite unsupported markup into the messaging HTML subset
fn to_message_markup(text: &str) -> String {
    let text = LIST_REGEX.replace_all(text, "");
    let text = ITEM_REGEX.replace_all(&text, "• $1\n");
    let text = HEADING_REGEX.replace_all(&text, "<b>$1</b>");
    let text = PARAGRAPH_REGEX.replace_all(&text, "$1\n");
    let text = BREAK_REGEX.replace_all(&text, "\n");
    let text = BULLET_REGEX.replace_all(&text, "• ");
    let text = MULTI_NEWLINE_REGEX.replace_all(&text, "\n\n");
    let text = BOLD_END_REGEX.replace_all(&text, "</b>\n\n");
    let text = BULLET_LINE_REGEX.replace_all(&text, "$1\n• ");
    MULTI_NEWLINE_REGEX.replace_all(&text, "\n\n").trim().to_string()
}

/// Build the message posted to the channel
///
/// Layout: prefix, optional bold title, the rewritten summary, the suffix and
/// the hashtags. When `with_image` is set the result must fit a photo caption.
/// The summary text is shortened to keep the whole message under the limit.
pub fn messaging_summary(
    summary: &str,
    title: Option<&str>,
    hashtags: &str,
    style: &SummaryStyle,
    with_image: bool,
) -> String {
    let raw = summary.trim().replace("\\n", "\n");
    let has_own_title = BOLD_REGEX.is_match(&raw);

    let mut text = to_message_markup(&unescape_entities(&raw));

    if !HEADING_EMOJI.iter().any(|e| text.contains(e)) {
        text = BOLD_REGEX.replace_all(&text, "🔹 <b>$1</b>").into_owned();
    }

    let header = match title {
        _ if has_own_title => style.prefix.clone(),
        Some(title) if !title.trim().is_empty() => {
            format!("{}<b>{}</b>\n\n", style.prefix, title.trim())
        }
        _ => format!("{}\n\n", style.prefix),
    };

    let mut footer = format!("\n\n{}", style.suffix);
    if !hashtags.is_empty() {
        footer.push_str("\n\n");
        footer.push_str(hashtags);
    }

    let limit = if with_image { CAPTION_LIMIT } else { MESSAGE_LIMIT };
    let budget = limit
        .saturating_sub(header.chars().count())
        .saturating_sub(footer.chars().count());

    if text.chars().count() > budget {
        tracing::debug!(
            chars = text.chars().count(),
            budget,
            "Shortening summary to fit message limit"
        );
        let shortened = truncate_chars(&text, budget.saturating_sub(1));
        // a cut inside a tag would leave a dangling `<`
        let shortened = match (shortened.rfind('<'), shortened.rfind('>')) {
            (Some(open), Some(close)) if open > close => &shortened[..open],
            (Some(open), None) => &shortened[..open],
            _ => shortened.as_str(),
        };
        text = fix_html_tags(&format!("{}…", shortened.trim_end()));
    }

    format!("{header}{text}{footer}")
}

/// Close tags left open, innermost first
///
/// Only `b`, `i`, `u`, `s`, `code` and `pre` are tracked. A closing tag
/// matching the innermost open one pops it; any other closing tag is ignored.
pub fn fix_html_tags(text: &str) -> String {
    let mut stack: Vec<String> = Vec::new();

    for caps in HTML_TAG_REGEX.captures_iter(text) {
        let closing = !caps[1].is_empty();
        let name = caps[2].to_lowercase();
        if !CLOSABLE_TAGS.contains(&name.as_str()) {
            continue;
        }
        if closing {
            if stack.last() == Some(&name) {
                stack.pop();
            }
        } else {
            stack.push(name);
        }
    }

    let mut fixed = text.to_string();
    for name in stack.iter().rev() {
        fixed.push_str(&format!("</{name}>"));
    }
    fixed
}

// ============================================================================
// Article body
// ============================================================================

/// Lowercased, punctuation-free title with repeated words collapsed
pub fn normalize_title(title: &str) -> String {
    let lowered = title.to_lowercase().replace(['«', '»'], "\"");
    let cleaned = NON_WORD_REGEX.replace_all(&lowered, "");
    let collapsed = normalize_whitespace(&cleaned);

    let mut words: Vec<&str> = Vec::new();
    for word in collapsed.split(' ') {
        if words.last() != Some(&word) {
            words.push(word);
        }
    }
    words.join(" ")
}

fn duplicates_title(heading: &str, title: &str) -> bool {
    let heading = normalize_title(&strip_tags(heading));
    if heading.is_empty() {
        return false;
    }
    heading == title || title.contains(&heading) || heading.contains(title)
}

/// Remove leading `h1`/`h2` headings that repeat the post title
///
/// Checked in order: every first `h1` that duplicates the title, then every
/// first `h2`. Leftover leading `<br>` and empty paragraphs are dropped too.
pub fn strip_duplicate_title(body: &str, title: &str) -> String {
    let title = normalize_title(title);
    if title.is_empty() {
        return body.to_string();
    }

    let mut content = body.to_string();
    for pattern in [&*H1_REGEX, &*H2_REGEX] {
        loop {
            let range = match pattern.captures(&content) {
                Some(caps) if duplicates_title(&caps[1], &title) => {
                    caps.get(0).map(|m| m.range())
                }
                _ => None,
            };
            match range {
                Some(range) => content.replace_range(range, ""),
                None => break,
            }
        }
    }

    let content = LEADING_BREAKS_REGEX.replace(&content, "");
    let content = EMPTY_PARAGRAPH_REGEX.replace(&content, "");
    content.trim_start().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style() -> SummaryStyle {
        SummaryStyle {
            prefix: "🌐 GVN ".into(),
            suffix: "• More at GVN.biz •".into(),
        }
    }

    #[test]
    fn test_hashtags_brand_type_category() {
        let tags = hashtags("Allen Bradley", "CompactLogix PLC guide", "plc, automation");
        assert_eq!(tags, "#Allen_Bradley #controllers #factory_automation");
    }

    #[test]
    fn test_hashtags_brand_normalization() {
        assert!(hashtags("Pepperl+Fuchs", "", "").starts_with("#PepperlplusFuchs "));
        assert!(hashtags("Allen Bradley", "", "").starts_with("#Allen_Bradley "));
        assert!(hashtags("B&R", "", "").starts_with("#BandR "));
    }

    #[test]
    fn test_hashtags_defaults() {
        assert_eq!(
            hashtags("", "Catalog overview", ""),
            "#industrial_equipment #industrial_solutions"
        );
        assert_eq!(
            hashtags("", "Industrial overview", ""),
            "#automation_equipment #industrial_solutions"
        );
    }

    #[test]
    fn test_summary_rewrites_unsupported_tags() {
        let text = messaging_summary(
            "<p>Intro</p><ul><li>One</li><li>Two</li></ul>",
            Some("Drives"),
            "#ABB",
            &style(),
            false,
        );
        assert!(text.starts_with("🌐 GVN <b>Drives</b>\n\n"));
        assert!(text.contains("• One"));
        assert!(text.contains("\n• Two"));
        assert!(!text.contains("<li>"));
        assert!(!text.contains("<p>"));
        assert!(text.ends_with("• More at GVN.biz •\n\n#ABB"));
    }

    #[test]
    fn test_summary_keeps_generated_title() {
        let text = messaging_summary(
            "<b>Fast drives</b>\\nCut energy use.",
            Some("Ignored"),
            "",
            &style(),
            false,
        );
        assert!(!text.contains("Ignored"));
        assert!(text.starts_with("🌐 GVN 🔹 <b>Fast drives</b>\n\nCut energy use."));
        assert!(text.ends_with("• More at GVN.biz •"));
    }

    #[test]
    fn test_summary_respects_existing_emoji() {
        let text = messaging_summary("📌 <b>Point</b> detail", None, "", &style(), false);
        assert!(!text.contains("🔹"));
        assert!(text.contains("📌 <b>Point</b>\n\ndetail"));
    }

    #[test]
    fn test_summary_unescapes_entities() {
        let text = messaging_summary("&lt;b&gt;Bold&lt;/b&gt; &amp; more", None, "", &style(), false);
        assert!(text.contains("<b>Bold</b>"));
        assert!(text.contains("& more"));
    }

    #[test]
    fn test_summary_fits_caption_limit() {
        let long = "word ".repeat(600);
        let text = messaging_summary(&long, Some("Title"), "#ABB #drives", &style(), true);
        assert!(text.chars().count() <= CAPTION_LIMIT);
        assert!(text.contains("…"));
        assert!(text.ends_with("#ABB #drives"));

        let text = messaging_summary(&long, Some("Title"), "", &style(), false);
        assert!(!text.contains("…"));
    }

    #[test]
    fn test_fix_html_tags() {
        assert_eq!(fix_html_tags("<b>Ready"), "<b>Ready</b>");
        assert_eq!(fix_html_tags("<b><i>x"), "<b><i>x</i></b>");
        assert_eq!(fix_html_tags("<b>ok</b>"), "<b>ok</b>");
        assert_eq!(fix_html_tags("<a href=\"u\">x</a>"), "<a href=\"u\">x</a>");
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("  «ACS880»  Drives: Guide!! "), "acs880 drives guide");
        assert_eq!(normalize_title("Drives drives guide"), "drives guide");
    }

    #[test]
    fn test_strip_duplicate_title() {
        let body = "<h1>ACS880 Drives Guide</h1><br><p></p><h2>Overview</h2><p>Text</p>";
        assert_eq!(
            strip_duplicate_title(body, "ACS880 Drives Guide"),
            "<h2>Overview</h2><p>Text</p>"
        );
    }

    #[test]
    fn test_strip_duplicate_title_keeps_other_headings() {
        let body = "<h2>Installation</h2><p>Text</p>";
        assert_eq!(strip_duplicate_title(body, "ACS880 Drives Guide"), body);
    }

    #[test]
    fn test_strip_duplicate_title_partial_match() {
        let body = "<h2>ACS880 Drives</h2><p>Text</p>";
        assert_eq!(
            strip_duplicate_title(body, "The Complete ACS880 Drives Guide"),
            "<p>Text</p>"
        );
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<h2>Intro</h2><p>Body</p>"), "IntroBody");
    }
}
