use crate::Result;
use crate::tools::{ToolCall, ToolDefinition};
use async_trait::async_trait;

mod ollama;
pub use ollama::{Ollama, SamplingOptions};

/// One turn of a conversation. The history is append-only: a `Tool` message
/// only ever follows an `Assistant` message that carried the matching call.
#[derive(Clone, Debug)]
pub enum Message {
    System(String),
    User(String),
    Assistant(String, Vec<ToolCall>),
    Tool { name: String, result: String },
}

pub struct CompletionRequest<'a> {
    pub messages: &'a [Message],
    pub tools: &'a [ToolDefinition],
}

pub struct CompletionResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

#[async_trait]
pub trait LLM {
    async fn completion<'a>(&self, request: CompletionRequest<'a>) -> Result<CompletionResponse>;
}
