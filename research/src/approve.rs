use crate::console::Interaction;
use agent::ConversationEngine;
use anyhow::{Context, Result};
use std::io::Write;

/// Interactive accept/edit/feedback/skip cycle over a piece of generated
/// content. Human-paced: no iteration cap, exits only on accept or skip.
///
/// `feedback` appends the comment to the owning conversation and re-runs
/// the chat loop with the phase's tool setting; `edit` opens the content in
/// `$EDITOR`. Returns the final content and whether it was approved.
pub async fn review<I: Interaction>(
    engine: &mut ConversationEngine,
    ui: &mut I,
    mut content: String,
    prompt: &str,
    allow_edit: bool,
    use_tools: bool,
) -> (String, bool) {
    loop {
        ui.show(&content);

        let input = match ui.prompt(prompt) {
            Ok(line) => line.to_lowercase(),
            Err(_) => {
                ui.warn("Input closed; skipping");
                return (content, false);
            }
        };

        match input.as_str() {
            "y" | "yes" => return (content, true),

            "e" | "edit" if allow_edit => match edit_in_editor(&content) {
                Ok(edited) => content = edited,
                Err(err) => ui.warn(&format!("Editor failed: {err}")),
            },

            "f" | "feedback" => {
                let feedback = match ui.prompt("Please provide feedback") {
                    Ok(line) => line,
                    Err(_) => continue,
                };

                if feedback.is_empty() {
                    ui.warn("No feedback provided");
                    continue;
                }

                engine.push_user(feedback);
                content = engine.generate(use_tools).await.into_text();
            }

            "s" | "skip" => return (content, false),

            _ => ui.warn("Invalid input. Use y/e/f/s"),
        }
    }
}

/// Hand the content to the user's editor via a temp file. The file is a
/// scoped resource: it is removed on every exit path, editor failure
/// included.
fn edit_in_editor(content: &str) -> Result<String> {
    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "nano".to_string());

    let mut file = tempfile::Builder::new()
        .suffix(".md")
        .tempfile()
        .context("failed to create temp file")?;
    file.write_all(content.as_bytes())?;
    file.flush()?;

    let status = std::process::Command::new(&editor)
        .arg(file.path())
        .status()
        .with_context(|| format!("failed to launch editor '{editor}'"))?;

    if !status.success() {
        anyhow::bail!("editor exited with {status}");
    }

    let edited = std::fs::read_to_string(file.path())?;
    Ok(edited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent::llm::{CompletionRequest, CompletionResponse, LLM};
    use agent::tools::ToolSet;
    use agent::{NullReporter, Result as AgentResult};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Arc;

    struct RevisingLLM;

    #[async_trait]
    impl LLM for RevisingLLM {
        async fn completion<'a>(
            &self,
            _: CompletionRequest<'a>,
        ) -> AgentResult<CompletionResponse> {
            Ok(CompletionResponse {
                content: "revised content".to_string(),
                tool_calls: vec![],
            })
        }
    }

    #[derive(Default)]
    struct ScriptedUi {
        inputs: VecDeque<String>,
        shown: Vec<String>,
        warnings: Vec<String>,
    }

    impl ScriptedUi {
        fn with_inputs(inputs: &[&str]) -> Self {
            Self {
                inputs: inputs.iter().map(|s| s.to_string()).collect(),
                ..Self::default()
            }
        }
    }

    impl Interaction for ScriptedUi {
        fn show(&mut self, content: &str) {
            self.shown.push(content.to_string());
        }

        fn notice(&mut self, _text: &str) {}

        fn warn(&mut self, text: &str) {
            self.warnings.push(text.to_string());
        }

        fn prompt(&mut self, _text: &str) -> std::io::Result<String> {
            self.inputs.pop_front().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "script exhausted")
            })
        }
    }

    fn engine() -> ConversationEngine {
        ConversationEngine::new(
            Arc::new(RevisingLLM),
            ToolSet::new().unwrap(),
            Box::new(NullReporter),
        )
    }

    #[tokio::test]
    async fn test_accept_returns_original_content_unchanged() {
        let mut engine = engine();
        let mut ui = ScriptedUi::with_inputs(&["y"]);

        let (content, approved) =
            review(&mut engine, &mut ui, "draft".to_string(), "Approve?", true, false).await;

        assert_eq!(content, "draft");
        assert!(approved);
        assert_eq!(ui.shown, vec!["draft"]);
        assert!(engine.messages().is_empty());
    }

    #[tokio::test]
    async fn test_skip_returns_current_content_unapproved() {
        let mut engine = engine();
        let mut ui = ScriptedUi::with_inputs(&["f", "tighten it up", "s"]);

        let (content, approved) =
            review(&mut engine, &mut ui, "draft".to_string(), "Approve?", true, false).await;

        assert_eq!(content, "revised content");
        assert!(!approved);
    }

    #[tokio::test]
    async fn test_feedback_appends_user_turn_and_regenerates() {
        let mut engine = engine();
        let mut ui = ScriptedUi::with_inputs(&["f", "add citations", "y"]);

        let (content, approved) =
            review(&mut engine, &mut ui, "draft".to_string(), "Approve?", true, false).await;

        assert_eq!(content, "revised content");
        assert!(approved);
        // feedback turn plus the regenerated assistant turn
        assert_eq!(engine.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_feedback_redisplays_without_change() {
        let mut engine = engine();
        let mut ui = ScriptedUi::with_inputs(&["f", "", "y"]);

        let (content, approved) =
            review(&mut engine, &mut ui, "draft".to_string(), "Approve?", true, false).await;

        assert_eq!(content, "draft");
        assert!(approved);
        assert!(engine.messages().is_empty());
        assert_eq!(ui.warnings, vec!["No feedback provided"]);
    }

    #[tokio::test]
    async fn test_invalid_input_reprompts() {
        let mut engine = engine();
        let mut ui = ScriptedUi::with_inputs(&["maybe", "y"]);

        let (_, approved) =
            review(&mut engine, &mut ui, "draft".to_string(), "Approve?", true, false).await;

        assert!(approved);
        assert_eq!(ui.warnings, vec!["Invalid input. Use y/e/f/s"]);
        assert_eq!(ui.shown.len(), 2);
    }

    #[tokio::test]
    async fn test_edit_disallowed_is_invalid_input() {
        let mut engine = engine();
        let mut ui = ScriptedUi::with_inputs(&["e", "s"]);

        let (content, approved) =
            review(&mut engine, &mut ui, "draft".to_string(), "Approve?", false, false).await;

        assert_eq!(content, "draft");
        assert!(!approved);
        assert_eq!(ui.warnings, vec!["Invalid input. Use y/e/f/s"]);
    }
}
