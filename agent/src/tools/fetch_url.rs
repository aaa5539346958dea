use crate::Result;
use schemars::JsonSchema;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const NAME: &str = "fetch_url";

/// Character budget for non-HTML bodies.
pub const RAW_CONTENT_LIMIT: usize = 10_000;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Element subtrees excluded from visible-text extraction.
const SKIPPED_TAGS: &[&str] = &["script", "style", "nav", "header", "footer", "noscript", "head"];

fn default_extract_text() -> bool {
    true
}

#[derive(Deserialize, JsonSchema, Debug)]
pub struct FetchUrlArgs {
    /// The URL to fetch
    pub url: String,
    /// Extract clean text from HTML (default true)
    #[serde(default = "default_extract_text")]
    pub extract_text: bool,
}

/// `word_count` is always computed over the full body text, even when
/// `content` was truncated to the character budget.
#[derive(Serialize, Debug)]
pub struct FetchUrlOutput {
    pub url: String,
    pub title: String,
    pub content: String,
    pub content_type: String,
    pub status_code: u16,
    pub word_count: usize,
}

pub async fn run(client: &reqwest::Client, args: FetchUrlArgs) -> Result<FetchUrlOutput> {
    let response = client
        .get(&args.url)
        .timeout(FETCH_TIMEOUT)
        .send()
        .await?
        .error_for_status()?;

    let status_code = response.status().as_u16();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_lowercase();

    let body = response.text().await?;

    if content_type.contains("text/html") && args.extract_text {
        let (title, content) = extract_html(&body);
        let word_count = content.split_whitespace().count();

        Ok(FetchUrlOutput {
            url: args.url,
            title,
            content,
            content_type,
            status_code,
            word_count,
        })
    } else {
        let (content, word_count) = raw_content(&body);

        Ok(FetchUrlOutput {
            url: args.url,
            title: String::new(),
            content,
            content_type,
            status_code,
            word_count,
        })
    }
}

/// Raw (non-HTML) bodies are truncated to the character budget, but the
/// word count always covers the full text.
fn raw_content(body: &str) -> (String, usize) {
    let word_count = body.split_whitespace().count();
    (truncate_chars(body, RAW_CONTENT_LIMIT), word_count)
}

/// Reduce an HTML document to its title and visible text, one line per text
/// node, with script/style/nav/header/footer subtrees stripped.
fn extract_html(html: &str) -> (String, String) {
    let document = Html::parse_document(html);

    let title = Selector::parse("title")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .map(|node| node.text().collect::<String>().trim().to_string())
        })
        .unwrap_or_default();

    let mut lines = Vec::new();
    collect_text(*document.root_element(), &mut lines);

    (title, lines.join("\n"))
}

fn collect_text(node: ego_tree::NodeRef<scraper::Node>, lines: &mut Vec<String>) {
    if let Some(element) = node.value().as_element() {
        if SKIPPED_TAGS.contains(&element.name()) {
            return;
        }
    }

    if let Some(text) = node.value().as_text() {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            lines.push(trimmed.to_string());
        }
    }

    for child in node.children() {
        collect_text(child, lines);
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        text.chars().take(limit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
    <html>
      <head><title> A Study of Things </title><style>.x{color:red}</style></head>
      <body>
        <nav>Home | About</nav>
        <script>var tracking = true;</script>
        <h1>A Study of Things</h1>
        <p>First paragraph of visible content.</p>
        <footer>copyright notice</footer>
      </body>
    </html>
    "#;

    #[test]
    fn test_extract_html_strips_hidden_blocks() {
        let (title, content) = extract_html(PAGE);
        assert_eq!(title, "A Study of Things");
        assert!(content.contains("First paragraph of visible content."));
        assert!(content.contains("A Study of Things"));
        assert!(!content.contains("tracking"));
        assert!(!content.contains("Home | About"));
        assert!(!content.contains("copyright notice"));
        assert!(!content.contains("color:red"));
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        // multi-byte characters count as one
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }

    #[test]
    fn test_raw_content_counts_words_beyond_the_cap() {
        let body = "word ".repeat(4_000);
        assert!(body.chars().count() > RAW_CONTENT_LIMIT);

        let (content, word_count) = raw_content(&body);
        assert_eq!(content.chars().count(), RAW_CONTENT_LIMIT);
        assert_eq!(word_count, 4_000);
        assert!(word_count > content.split_whitespace().count());
    }

    #[test]
    fn test_raw_content_short_body_untruncated() {
        let (content, word_count) = raw_content("plain text body");
        assert_eq!(content, "plain text body");
        assert_eq!(word_count, 3);
    }

    #[test]
    fn test_args_default_extract_text() {
        let args: FetchUrlArgs =
            serde_json::from_value(serde_json::json!({"url": "https://a"})).unwrap();
        assert!(args.extract_text);
    }
}
