use crate::llm;
use crate::tools::{ToolCall, ToolDefinition};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Model families known to support tool calling.
const TOOL_COMPATIBLE_MODELS: &[&str] = &[
    "llama3.2",
    "llama3.1",
    "mistral-nemo",
    "qwen2.5",
    "command-r",
    "firefunction",
];

const CHAT_TIMEOUT: Duration = Duration::from_secs(120);
const TAGS_TIMEOUT: Duration = Duration::from_secs(10);
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize, Clone, Copy, Debug)]
pub struct SamplingOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub num_ctx: u32,
}

/// Client for Ollama's native `/api/chat` endpoint.
pub struct Ollama {
    base_url: String,
    model: String,
    options: SamplingOptions,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    stream: bool,
    options: SamplingOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
}

#[derive(Serialize, Deserialize, Default, Debug)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Serialize, Deserialize, Debug)]
struct WireToolCall {
    function: WireFunction,
}

#[derive(Serialize, Deserialize, Debug)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: WireMessage,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TaggedModel>,
}

#[derive(Deserialize)]
struct TaggedModel {
    name: String,
}

impl From<&llm::Message> for WireMessage {
    fn from(msg: &llm::Message) -> Self {
        match msg {
            llm::Message::System(content) => WireMessage {
                role: "system".to_string(),
                content: content.clone(),
                tool_calls: Vec::new(),
            },
            llm::Message::User(content) => WireMessage {
                role: "user".to_string(),
                content: content.clone(),
                tool_calls: Vec::new(),
            },
            llm::Message::Assistant(content, tool_calls) => WireMessage {
                role: "assistant".to_string(),
                content: content.clone(),
                tool_calls: tool_calls
                    .iter()
                    .map(|call| WireToolCall {
                        function: WireFunction {
                            name: call.name.clone(),
                            arguments: call.args.clone(),
                        },
                    })
                    .collect(),
            },
            llm::Message::Tool { result, .. } => WireMessage {
                role: "tool".to_string(),
                content: result.clone(),
                tool_calls: Vec::new(),
            },
        }
    }
}

fn tool_to_wire(tool: &ToolDefinition) -> Value {
    serde_json::json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.desc,
            "parameters": tool.params,
        }
    })
}

/// The wire form of tool-call arguments may be an already-structured object
/// or a JSON string; anything that does not decode to an object degrades to
/// an empty argument set rather than failing the turn.
fn normalize_args(arguments: Value) -> Value {
    match arguments {
        Value::Object(map) => Value::Object(map),
        Value::String(text) => match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => Value::Object(map),
            _ => Value::Object(Map::new()),
        },
        _ => Value::Object(Map::new()),
    }
}

impl Ollama {
    pub fn new(
        base_url: &str,
        model: String,
        options: SamplingOptions,
    ) -> Result<Arc<Self>> {
        let client = reqwest::Client::builder().timeout(CHAT_TIMEOUT).build()?;

        Ok(Arc::new(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            options,
            client,
        }))
    }

    pub fn supports_tools(model: &str) -> bool {
        let base = model.split(':').next().unwrap_or(model).to_lowercase();
        TOOL_COMPATIBLE_MODELS
            .iter()
            .any(|compatible| base.starts_with(compatible))
    }

    /// List models served by the backend, sorted by name.
    pub async fn list_models(base_url: &str, tool_compatible_only: bool) -> Result<Vec<String>> {
        let client = reqwest::Client::builder().timeout(TAGS_TIMEOUT).build()?;
        let response = client
            .get(format!("{}/api/tags", base_url.trim_end_matches('/')))
            .send()
            .await?
            .error_for_status()?;

        let tags: TagsResponse = response.json().await?;

        let mut models: Vec<String> = tags
            .models
            .into_iter()
            .map(|model| model.name)
            .filter(|name| !tool_compatible_only || Self::supports_tools(name))
            .collect();
        models.sort();

        Ok(models)
    }

    /// Quick reachability probe, returning a short human-readable message.
    pub async fn probe(base_url: &str) -> (bool, String) {
        let url = base_url.trim_end_matches('/');
        let client = match reqwest::Client::builder().timeout(PROBE_TIMEOUT).build() {
            Ok(client) => client,
            Err(err) => return (false, format!("Failed to build HTTP client: {err}")),
        };

        match client.get(format!("{url}/api/tags")).send().await {
            Ok(response) if response.status().is_success() => {
                (true, "Ollama is running".to_string())
            }
            Ok(response) => (
                false,
                format!("Ollama returned status code {}", response.status().as_u16()),
            ),
            Err(err) if err.is_timeout() => {
                (false, format!("Connection to Ollama at {url} timed out"))
            }
            Err(_) => (false, format!("Cannot connect to Ollama at {url}")),
        }
    }
}

#[async_trait]
impl llm::LLM for Ollama {
    async fn completion<'a>(
        &self,
        request: llm::CompletionRequest<'a>,
    ) -> Result<llm::CompletionResponse> {
        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(request.tools.iter().map(tool_to_wire).collect())
        };

        let body = ChatRequest {
            model: &self.model,
            messages: request.messages.iter().map(WireMessage::from).collect(),
            stream: false,
            options: self.options,
            tools,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let chat: ChatResponse = response.json().await?;

        if chat.message.role.is_empty() {
            return Err(Error::LLMResponseError(
                "response carried no message".to_string(),
            ));
        }

        let tool_calls = chat
            .message
            .tool_calls
            .into_iter()
            .map(|call| ToolCall {
                name: call.function.name,
                args: normalize_args(call.function.arguments),
            })
            .collect();

        Ok(llm::CompletionResponse {
            content: chat.message.content,
            tool_calls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_supports_tools() {
        assert!(Ollama::supports_tools("llama3.2:latest"));
        assert!(Ollama::supports_tools("llama3.1"));
        assert!(Ollama::supports_tools("Qwen2.5:7b"));
        assert!(Ollama::supports_tools("command-r:35b"));
        assert!(!Ollama::supports_tools("mistral:latest"));
        assert!(!Ollama::supports_tools("phi3"));
    }

    #[test]
    fn test_decode_structured_tool_call() {
        let raw = json!({
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [
                    {"function": {"name": "web_search", "arguments": {"query": "rust"}}}
                ]
            },
            "done": true
        });

        let chat: ChatResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(chat.message.tool_calls.len(), 1);

        let call = &chat.message.tool_calls[0];
        assert_eq!(call.function.name, "web_search");
        assert_eq!(call.function.arguments["query"], "rust");
    }

    #[test]
    fn test_normalize_args_string_form() {
        let args = normalize_args(json!("{\"url\": \"https://a\"}"));
        assert_eq!(args["url"], "https://a");
    }

    #[test]
    fn test_normalize_args_malformed_degrades_to_empty() {
        assert_eq!(normalize_args(json!("not json")), json!({}));
        assert_eq!(normalize_args(json!(42)), json!({}));
        assert_eq!(normalize_args(Value::Null), json!({}));
    }

    #[test]
    fn test_message_wire_roles() {
        let messages = [
            llm::Message::System("sys".to_string()),
            llm::Message::User("hi".to_string()),
            llm::Message::Assistant(
                "calling".to_string(),
                vec![ToolCall {
                    name: "fetch_url".to_string(),
                    args: json!({"url": "https://a"}),
                }],
            ),
            llm::Message::Tool {
                name: "fetch_url".to_string(),
                result: "{}".to_string(),
            },
        ];

        let wire: Vec<WireMessage> = messages.iter().map(WireMessage::from).collect();
        assert_eq!(wire[0].role, "system");
        assert_eq!(wire[1].role, "user");
        assert_eq!(wire[2].role, "assistant");
        assert_eq!(wire[2].tool_calls.len(), 1);
        assert_eq!(wire[3].role, "tool");
        assert_eq!(wire[3].content, "{}");
    }
}
