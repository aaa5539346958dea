use crate::llm::{CompletionRequest, LLM, Message};
use crate::tools::{ToolSet, ToolDefinition};
use serde_json::Value;
use std::sync::Arc;

pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Outcome of one generation run. Hitting the iteration ceiling is a
/// distinct outcome from the model concluding with an empty message;
/// callers that only care about text collapse both via [`Reply::into_text`].
#[derive(Debug, PartialEq, Eq)]
pub enum Reply {
    Completed(String),
    IterationsExhausted,
}

impl Reply {
    pub fn into_text(self) -> String {
        match self {
            Reply::Completed(text) => text,
            Reply::IterationsExhausted => String::new(),
        }
    }
}

/// Presentation hook for loop events. The engine decides what happened;
/// the surface consuming these decides what to show.
pub trait Reporter {
    fn tool_call(&mut self, _name: &str, _args: &Value) {}
    fn tool_error(&mut self, _message: &str) {}
    fn backend_error(&mut self, _message: &str) {}
    fn iterations_exhausted(&mut self) {}
}

pub struct NullReporter;

impl Reporter for NullReporter {}

/// Drives a chat completion backend until it produces a plain-text answer,
/// executing requested tool calls along the way. Exclusively owns the
/// message history for the lifetime of one phase.
pub struct ConversationEngine {
    llm: Arc<dyn LLM + Send + Sync>,
    tools: ToolSet,
    reporter: Box<dyn Reporter + Send>,
    messages: Vec<Message>,
    max_iterations: usize,
}

impl ConversationEngine {
    pub fn new(
        llm: Arc<dyn LLM + Send + Sync>,
        tools: ToolSet,
        reporter: Box<dyn Reporter + Send>,
    ) -> Self {
        Self {
            llm,
            tools,
            reporter,
            messages: Vec::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn clear_history(&mut self) {
        self.messages.clear();
    }

    pub fn push_system(&mut self, content: String) {
        self.messages.push(Message::System(content));
    }

    pub fn push_user(&mut self, content: String) {
        self.messages.push(Message::User(content));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Run the tool execution loop until the model answers in plain text or
    /// the iteration ceiling is hit.
    ///
    /// Backend failures are reported and end the attempt with empty content;
    /// they never propagate to the caller. Tool failures are folded into the
    /// history as error payloads and the loop continues.
    pub async fn generate(&mut self, use_tools: bool) -> Reply {
        let tool_defs: Vec<ToolDefinition> = if use_tools {
            self.tools.definitions().to_vec()
        } else {
            Vec::new()
        };

        for _ in 0..self.max_iterations {
            let response = match self
                .llm
                .completion(CompletionRequest {
                    messages: &self.messages,
                    tools: &tool_defs,
                })
                .await
            {
                Ok(response) => response,
                Err(err) => {
                    self.reporter.backend_error(&err.to_string());
                    return Reply::Completed(String::new());
                }
            };

            if response.tool_calls.is_empty() {
                self.messages
                    .push(Message::Assistant(response.content.clone(), Vec::new()));
                return Reply::Completed(response.content);
            }

            let tool_calls = response.tool_calls;
            self.messages
                .push(Message::Assistant(response.content, tool_calls.clone()));

            for call in &tool_calls {
                self.reporter.tool_call(&call.name, &call.args);

                let result = self.tools.invoke(call).await;
                if let crate::tools::ToolResult::Error { message, .. } = &result {
                    self.reporter.tool_error(message);
                }

                self.messages.push(Message::Tool {
                    name: call.name.clone(),
                    result: result.into_content(),
                });
            }
        }

        self.reporter.iterations_exhausted();
        Reply::IterationsExhausted
    }
}
