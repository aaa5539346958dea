use crate::approve::review;
use crate::console::Interaction;
use crate::{git, prompts};
use crate::workspace::Workspace;
use agent::ConversationEngine;
use agent::llm::Message;
use anyhow::Result;
use std::collections::BTreeSet;
use std::path::Path;

/// Sequences the four research phases. Each phase seeds a fresh
/// conversation from the persisted artifacts it depends on, runs the chat
/// loop, and persists its output only after human approval.
pub struct Workflow<I: Interaction> {
    engine: ConversationEngine,
    ui: I,
    workspace: Workspace,
}

impl<I: Interaction> Workflow<I> {
    pub fn new(engine: ConversationEngine, ui: I, workspace: Workspace) -> Self {
        Self {
            engine,
            ui,
            workspace,
        }
    }

    /// Constitution → Plan → Execute → Synthesize. A failed constitution
    /// still proceeds to planning; a failed plan or execution aborts the
    /// rest of the run.
    pub async fn run(&mut self, topic: &str) -> Result<()> {
        self.constitution().await?;

        if !self.plan(topic).await? {
            self.ui.warn("Planning failed. Aborting workflow.");
            return Ok(());
        }

        if !self.execute().await? {
            self.ui.warn("Execution failed. Aborting workflow.");
            return Ok(());
        }

        self.synthesize().await?;
        Ok(())
    }

    async fn constitution(&mut self) -> Result<bool> {
        self.ui.notice("\n═══ PHASE 1: CONSTITUTION ═══\n");

        let path = self.workspace.constitution_path();
        let current = self.workspace.load_text(&path);
        if current.is_empty() {
            self.ui.notice("📝 Creating new constitution...");
        } else {
            self.ui.notice("📖 Loading existing constitution...");
        }

        self.engine.clear_history();
        self.engine
            .push_system(prompts::constitution_system(&current));
        self.engine.push_user(prompts::constitution_user());

        let draft = self.engine.generate(true).await.into_text();
        let (content, approved) = review(
            &mut self.engine,
            &mut self.ui,
            draft,
            "Approve constitution? [y]es / [e]dit / [f]eedback",
            true,
            true,
        )
        .await;

        if !approved {
            self.ui.warn("Constitution phase skipped");
            return Ok(false);
        }

        self.workspace.save_text(&path, &content)?;
        self.ui
            .notice(&format!("✓ Saved constitution to {}", path.display()));
        git::commit(
            self.workspace.project_dir(),
            &[&path],
            "docs: Update research constitution",
        );
        Ok(true)
    }

    async fn plan(&mut self, topic: &str) -> Result<bool> {
        self.ui.notice("\n═══ PHASE 2: PLANNING ═══\n");
        self.ui
            .notice(&format!("📋 Creating research plan for: {topic}\n"));

        let research_dir = self.workspace.create_research_dir(topic)?;
        self.ui.notice("✓ Created research project structure");

        let constitution = self.workspace.load_text(&self.workspace.constitution_path());
        let template = self
            .workspace
            .load_text(&self.workspace.template_path("plan-template.md"));

        self.engine.clear_history();
        self.engine
            .push_system(prompts::plan_system(&constitution, &template));
        self.engine.push_user(prompts::plan_user(topic));

        let draft = self.engine.generate(true).await.into_text();
        let (content, approved) = review(
            &mut self.engine,
            &mut self.ui,
            draft,
            "Approve plan? [y]es / [e]dit / [f]eedback",
            true,
            true,
        )
        .await;

        if !approved {
            self.ui.warn("Plan phase skipped");
            return Ok(false);
        }

        let plan_path = research_dir.join("plan.md");
        self.workspace.save_text(&plan_path, &content)?;
        self.ui
            .notice(&format!("✓ Saved plan to {}", plan_path.display()));
        git::commit(
            self.workspace.project_dir(),
            &[&research_dir],
            &format!("docs: Add research plan for {topic}"),
        );
        Ok(true)
    }

    async fn execute(&mut self) -> Result<bool> {
        self.ui.notice("\n═══ PHASE 3: EXECUTION ═══\n");

        let Some(research_dir) = self.workspace.current_research_dir() else {
            self.ui.warn("No active research project found");
            return Ok(false);
        };

        let plan_path = research_dir.join("plan.md");
        if !plan_path.exists() {
            self.ui.warn("No research plan found; run the plan phase first");
            return Ok(false);
        }

        let plan = self.workspace.load_text(&plan_path);
        let constitution = self.workspace.load_text(&self.workspace.constitution_path());

        self.engine.clear_history();
        self.engine
            .push_system(prompts::execute_system(&plan, &constitution));
        self.engine.push_user(prompts::execute_user());

        self.ui.notice("🔬 Conducting research...\n");
        let draft = self.engine.generate(true).await.into_text();
        let (content, approved) = review(
            &mut self.engine,
            &mut self.ui,
            draft,
            "Approve findings? [y]es / [e]dit / [f]eedback",
            true,
            true,
        )
        .await;

        if !approved {
            self.ui.warn("Execute phase skipped");
            return Ok(false);
        }

        let findings_path = research_dir.join("findings.md");
        self.workspace.save_text(&findings_path, &content)?;
        self.ui
            .notice(&format!("✓ Saved findings to {}", findings_path.display()));

        let urls = collect_source_urls(self.engine.messages());
        if !urls.is_empty() {
            let count = urls.len();
            self.workspace
                .append_text(&research_dir.join("sources.md"), &format_sources(&urls))?;
            self.ui
                .notice(&format!("✓ Updated {count} sources in sources.md"));
        }

        git::commit(
            self.workspace.project_dir(),
            &[&research_dir],
            "docs: Document research findings",
        );
        Ok(true)
    }

    async fn synthesize(&mut self) -> Result<bool> {
        self.ui.notice("\n═══ PHASE 4: SYNTHESIS ═══\n");

        let Some(research_dir) = self.workspace.current_research_dir() else {
            self.ui.warn("No active research project found");
            return Ok(false);
        };

        let plan = self.workspace.load_text(&research_dir.join("plan.md"));
        let findings = self.workspace.load_text(&research_dir.join("findings.md"));
        let sources = self.workspace.load_text(&research_dir.join("sources.md"));
        let constitution = self.workspace.load_text(&self.workspace.constitution_path());

        self.engine.clear_history();
        self.engine.push_system(prompts::synthesize_system(
            &plan,
            &findings,
            &sources,
            &constitution,
        ));
        self.engine.push_user(prompts::synthesize_user());

        self.ui.notice("📊 Synthesizing research...\n");
        let draft = self.engine.generate(false).await.into_text();
        let (content, approved) = review(
            &mut self.engine,
            &mut self.ui,
            draft,
            "Approve synthesis? [y]es / [e]dit / [f]eedback",
            true,
            false,
        )
        .await;

        if !approved {
            self.ui.warn("Synthesis phase skipped");
            return Ok(false);
        }

        let synthesis_path = research_dir.join("synthesis.md");
        self.workspace.save_text(&synthesis_path, &content)?;
        self.ui
            .notice(&format!("✓ Saved synthesis to {}", synthesis_path.display()));

        let report_name = report_filename(&research_dir, chrono::Local::now().date_naive());
        let report_path = self.workspace.project_dir().join(&report_name);
        std::fs::copy(&synthesis_path, &report_path)?;
        self.ui
            .notice(&format!("✓ Copied synthesis to {}", report_path.display()));

        git::commit(
            self.workspace.project_dir(),
            &[&research_dir, &report_path],
            "docs: Complete research synthesis",
        );

        self.ui.notice("\n✅ Research complete!");
        self.ui.notice(&format!("Final report: {report_name}\n"));
        Ok(true)
    }
}

/// Scan tool-result payloads for source URLs: a top-level `url` field or a
/// `results` list of objects carrying `url` fields. Malformed payloads are
/// skipped. The set form makes the written output sorted and deduplicated.
pub fn collect_source_urls(messages: &[Message]) -> BTreeSet<String> {
    let mut urls = BTreeSet::new();

    for message in messages {
        let Message::Tool { result, .. } = message else {
            continue;
        };
        let Ok(payload) = serde_json::from_str::<serde_json::Value>(result) else {
            continue;
        };

        if let Some(url) = payload.get("url").and_then(|value| value.as_str()) {
            urls.insert(url.to_string());
        }

        if let Some(results) = payload.get("results").and_then(|value| value.as_array()) {
            for entry in results {
                if let Some(url) = entry.get("url").and_then(|value| value.as_str()) {
                    urls.insert(url.to_string());
                }
            }
        }
    }

    urls
}

fn format_sources(urls: &BTreeSet<String>) -> String {
    let mut section = String::from("\n\n## Sources from Research\n\n");
    for url in urls {
        section.push_str(&format!("- {url}\n"));
    }
    section
}

/// `<topic-slug>-synthesis-<date>.md`, the slug taken from the research
/// directory name minus its sequence prefix.
fn report_filename(research_dir: &Path, date: chrono::NaiveDate) -> String {
    let slug = research_dir
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.split_once('-').map(|(_, rest)| rest))
        .unwrap_or("research");

    format!("{slug}-synthesis-{}.md", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool_message(payload: &str) -> Message {
        Message::Tool {
            name: "web_search".to_string(),
            result: payload.to_string(),
        }
    }

    #[test]
    fn test_collect_source_urls_deduplicates_and_skips_malformed() {
        let messages = vec![
            Message::User("go".to_string()),
            tool_message(&json!({"url": "https://a"}).to_string()),
            tool_message(
                &json!({"results": [{"url": "https://b"}, {"url": "https://a"}]}).to_string(),
            ),
            tool_message("not json at all"),
        ];

        let urls = collect_source_urls(&messages);
        let expected: BTreeSet<String> =
            ["https://a", "https://b"].iter().map(|s| s.to_string()).collect();
        assert_eq!(urls, expected);
    }

    #[test]
    fn test_collect_source_urls_ignores_non_tool_messages() {
        let messages = vec![Message::Assistant(
            json!({"url": "https://a"}).to_string(),
            vec![],
        )];
        assert!(collect_source_urls(&messages).is_empty());
    }

    #[test]
    fn test_format_sources_is_sorted() {
        let urls: BTreeSet<String> =
            ["https://z", "https://a"].iter().map(|s| s.to_string()).collect();
        let section = format_sources(&urls);
        assert!(section.starts_with("\n\n## Sources from Research\n\n"));
        assert!(section.find("https://a").unwrap() < section.find("https://z").unwrap());
    }

    #[test]
    fn test_report_filename_drops_sequence_prefix() {
        let date = chrono::NaiveDate::from_ymd_opt(2026, 8, 28).unwrap();
        assert_eq!(
            report_filename(Path::new("/p/.researchkit/research/003-quantum-computing"), date),
            "quantum-computing-synthesis-2026-08-28.md"
        );
    }
}
