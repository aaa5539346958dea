use crate::Result;
use schemars::{JsonSchema, schema_for};
use serde_json::Value;
use std::time::Duration;

mod fetch_url;
mod pdf;
mod web_search;

pub use fetch_url::{FetchUrlArgs, FetchUrlOutput, RAW_CONTENT_LIMIT};
pub use pdf::{ParsePdfArgs, ParsePdfOutput};
pub use web_search::{SearchHit, WebSearchArgs, WebSearchOutput};

const USER_AGENT: &str = "Mozilla/5.0 (compatible; ResearchKit/1.0)";

#[derive(Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub desc: String,
    pub params: Value,
}

impl ToolDefinition {
    pub fn new<P: JsonSchema>(name: &str, desc: &str) -> Result<Self> {
        let schema = schema_for!(P);
        let params = serde_json::to_value(&schema.schema)?;
        Ok(Self {
            name: name.to_string(),
            desc: desc.to_string(),
            params,
        })
    }
}

/// A model-issued request to invoke a named tool. `args` is always a JSON
/// object by the time it reaches the invocation layer.
#[derive(Clone, Debug)]
pub struct ToolCall {
    pub name: String,
    pub args: Value,
}

/// Outcome of one tool invocation. Failures are data, not control flow: a
/// failed tool never aborts the conversation loop.
#[derive(Debug)]
pub enum ToolResult {
    Success(Value),
    Error {
        message: String,
        tool: String,
        arguments: Value,
    },
}

impl ToolResult {
    fn error(message: String, call: &ToolCall) -> Self {
        ToolResult::Error {
            message,
            tool: call.name.clone(),
            arguments: call.args.clone(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolResult::Error { .. })
    }

    /// Canonical text form stored in tool-role messages.
    pub fn into_content(self) -> String {
        let value = match self {
            ToolResult::Success(value) => value,
            ToolResult::Error {
                message,
                tool,
                arguments,
            } => serde_json::json!({
                "error": message,
                "tool": tool,
                "arguments": arguments,
            }),
        };

        serde_json::to_string(&value).unwrap_or_else(|_| "{}".to_string())
    }
}

/// The closed set of research tools.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum ToolKind {
    WebSearch,
    FetchUrl,
    ParsePdf,
}

impl ToolKind {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            web_search::NAME => Some(ToolKind::WebSearch),
            fetch_url::NAME => Some(ToolKind::FetchUrl),
            pdf::NAME => Some(ToolKind::ParsePdf),
            _ => None,
        }
    }
}

/// Registry plus invoker for the research tools. Definitions are built once
/// at construction and never mutated.
pub struct ToolSet {
    client: reqwest::Client,
    definitions: Vec<ToolDefinition>,
}

impl ToolSet {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;

        let definitions = vec![
            ToolDefinition::new::<WebSearchArgs>(
                web_search::NAME,
                "Search the web for information on a topic using DuckDuckGo",
            )?,
            ToolDefinition::new::<FetchUrlArgs>(
                fetch_url::NAME,
                "Fetch and extract text content from a URL",
            )?,
            ToolDefinition::new::<ParsePdfArgs>(
                pdf::NAME,
                "Download and extract text from a PDF document",
            )?,
        ];

        Ok(Self {
            client,
            definitions,
        })
    }

    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Execute one tool call. Unknown names and tool failures are folded
    /// into an error `ToolResult`; nothing escapes this layer.
    pub async fn invoke(&self, call: &ToolCall) -> ToolResult {
        let Some(kind) = ToolKind::from_name(&call.name) else {
            return ToolResult::error(format!("tool '{}' not found", call.name), call);
        };

        let outcome = match kind {
            ToolKind::WebSearch => match serde_json::from_value(call.args.clone()) {
                Ok(args) => web_search::run(&self.client, args)
                    .await
                    .and_then(|output| Ok(serde_json::to_value(output)?)),
                Err(err) => Err(err.into()),
            },
            ToolKind::FetchUrl => match serde_json::from_value(call.args.clone()) {
                Ok(args) => fetch_url::run(&self.client, args)
                    .await
                    .and_then(|output| Ok(serde_json::to_value(output)?)),
                Err(err) => Err(err.into()),
            },
            ToolKind::ParsePdf => match serde_json::from_value(call.args.clone()) {
                Ok(args) => pdf::run(&self.client, args)
                    .await
                    .and_then(|output| Ok(serde_json::to_value(output)?)),
                Err(err) => Err(err.into()),
            },
        };

        match outcome {
            Ok(value) => ToolResult::Success(value),
            Err(err) => {
                tracing::warn!(tool = %call.name, "tool invocation failed: {err}");
                ToolResult::error(err.to_string(), call)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_unknown_tool_yields_error_result() {
        let tools = ToolSet::new().unwrap();
        let call = ToolCall {
            name: "memory_get_key".to_string(),
            args: json!({"key": "abc"}),
        };

        let result = tools.invoke(&call).await;
        assert!(result.is_error());

        let content = result.into_content();
        let value: Value = serde_json::from_str(&content).unwrap();
        assert!(value["error"].as_str().unwrap().contains("memory_get_key"));
        assert_eq!(value["tool"], "memory_get_key");
        assert_eq!(value["arguments"]["key"], "abc");
    }

    #[tokio::test]
    async fn test_missing_required_argument_yields_error_result() {
        let tools = ToolSet::new().unwrap();
        // A malformed wire payload degrades to an empty argument set, which
        // then fails typed decoding on the required `query` field.
        let call = ToolCall {
            name: "web_search".to_string(),
            args: json!({}),
        };

        let result = tools.invoke(&call).await;
        assert!(result.is_error());
    }

    #[test]
    fn test_definitions_advertise_all_tools() {
        let tools = ToolSet::new().unwrap();
        let names: Vec<&str> = tools
            .definitions()
            .iter()
            .map(|def| def.name.as_str())
            .collect();
        assert_eq!(names, vec!["web_search", "fetch_url", "parse_pdf"]);

        for def in tools.definitions() {
            assert_eq!(def.params["type"], "object");
        }
    }

    #[test]
    fn test_success_result_serializes_payload() {
        let result = ToolResult::Success(json!({"url": "https://a", "word_count": 3}));
        assert!(!result.is_error());

        let value: Value = serde_json::from_str(&result.into_content()).unwrap();
        assert_eq!(value["url"], "https://a");
        assert_eq!(value["word_count"], 3);
    }
}
