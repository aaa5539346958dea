use agent::Reporter;
use serde_json::Value;
use std::io::{BufRead, Write};

/// Human interaction surface: line-based prompts and content display.
/// Trait-shaped so the approval loop can be driven by a script in tests.
pub trait Interaction {
    fn show(&mut self, content: &str);
    fn notice(&mut self, text: &str);
    fn warn(&mut self, text: &str);
    fn prompt(&mut self, text: &str) -> std::io::Result<String>;
}

pub struct Console;

impl Interaction for Console {
    fn show(&mut self, content: &str) {
        let rule = "─".repeat(72);
        println!("\n{rule}\n{content}\n{rule}");
    }

    fn notice(&mut self, text: &str) {
        println!("{text}");
    }

    fn warn(&mut self, text: &str) {
        eprintln!("⚠ {text}");
    }

    fn prompt(&mut self, text: &str) -> std::io::Result<String> {
        print!("\n{text}: ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        let read = std::io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "stdin closed",
            ));
        }

        Ok(line.trim().to_string())
    }
}

/// Console presentation of chat-loop events, with tool-specific phrasing
/// for the known research tools.
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn tool_call(&mut self, name: &str, args: &Value) {
        let line = match name {
            "web_search" => format!(
                "🔍 Searching for: '{}'",
                args["query"].as_str().unwrap_or_default()
            ),
            "fetch_url" => format!("📄 Fetching: {}", args["url"].as_str().unwrap_or_default()),
            "parse_pdf" => format!(
                "📑 Parsing PDF: {}",
                args["url"].as_str().unwrap_or_default()
            ),
            other => format!("🔧 Executing: {other}"),
        };
        println!("{line}");
    }

    fn tool_error(&mut self, message: &str) {
        eprintln!("⚠ Tool execution error: {message}");
    }

    fn backend_error(&mut self, message: &str) {
        eprintln!("⚠ Error generating response: {message}");
    }

    fn iterations_exhausted(&mut self) {
        eprintln!("⚠ Warning: Max tool execution iterations reached");
    }
}
