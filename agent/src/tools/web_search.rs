use crate::Result;
use reqwest::Url;
use schemars::JsonSchema;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

pub const NAME: &str = "web_search";

const SEARCH_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

fn default_max_results() -> usize {
    10
}

#[derive(Deserialize, JsonSchema, Debug)]
pub struct WebSearchArgs {
    /// The search query
    pub query: String,
    /// Maximum number of results to return (default 10)
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub source: String,
}

#[derive(Serialize, Debug)]
pub struct WebSearchOutput {
    pub results: Vec<SearchHit>,
    pub query: String,
    pub count: usize,
}

pub async fn run(client: &reqwest::Client, args: WebSearchArgs) -> Result<WebSearchOutput> {
    let html = client
        .get(SEARCH_ENDPOINT)
        .query(&[("q", args.query.as_str())])
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let results = parse_results(&html, args.max_results);
    let count = results.len();

    Ok(WebSearchOutput {
        results,
        query: args.query,
        count,
    })
}

fn parse_results(html: &str, max_results: usize) -> Vec<SearchHit> {
    let document = Html::parse_document(html);

    let Ok(result_selector) = Selector::parse("div.result") else {
        return Vec::new();
    };
    let Ok(link_selector) = Selector::parse("a.result__a") else {
        return Vec::new();
    };
    let Ok(snippet_selector) = Selector::parse(".result__snippet") else {
        return Vec::new();
    };

    let mut hits = Vec::new();

    for result in document.select(&result_selector) {
        if hits.len() >= max_results {
            break;
        }

        let Some(link) = result.select(&link_selector).next() else {
            continue;
        };

        let title = collapse_whitespace(&link.text().collect::<String>());
        let url = link
            .value()
            .attr("href")
            .map(resolve_redirect)
            .unwrap_or_default();
        if url.is_empty() {
            continue;
        }

        let snippet = result
            .select(&snippet_selector)
            .next()
            .map(|node| collapse_whitespace(&node.text().collect::<String>()))
            .unwrap_or_default();

        let source = Url::parse(&url)
            .ok()
            .and_then(|parsed| parsed.host_str().map(str::to_string))
            .unwrap_or_default();

        hits.push(SearchHit {
            title,
            url,
            snippet,
            source,
        });
    }

    hits
}

/// DuckDuckGo wraps result links in a redirect carrying the target in the
/// `uddg` query parameter.
fn resolve_redirect(href: &str) -> String {
    let absolute = if let Some(rest) = href.strip_prefix("//") {
        format!("https://{rest}")
    } else if href.starts_with('/') {
        format!("https://duckduckgo.com{href}")
    } else {
        href.to_string()
    };

    let Ok(parsed) = Url::parse(&absolute) else {
        return href.to_string();
    };

    parsed
        .query_pairs()
        .find(|(key, _)| key == "uddg")
        .map(|(_, target)| target.into_owned())
        .unwrap_or(absolute)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
