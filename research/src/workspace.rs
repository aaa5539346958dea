use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const KIT_DIR: &str = ".researchkit";

const PLAN_TEMPLATE: &str = include_str!("../templates/plan-template.md");
const CONSTITUTION_TEMPLATE: &str = include_str!("../templates/constitution-template.md");

/// Persistence layer for phase artifacts: flat UTF-8 files under a
/// project-scoped `.researchkit/` directory.
pub struct Workspace {
    project_dir: PathBuf,
}

impl Workspace {
    pub fn new(project_dir: PathBuf) -> Self {
        Self { project_dir }
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn kit_dir(&self) -> PathBuf {
        self.project_dir.join(KIT_DIR)
    }

    pub fn constitution_path(&self) -> PathBuf {
        self.kit_dir().join("memory/constitution.md")
    }

    pub fn template_path(&self, name: &str) -> PathBuf {
        self.kit_dir().join("templates").join(name)
    }

    pub fn research_root(&self) -> PathBuf {
        self.kit_dir().join("research")
    }

    pub fn is_initialized(&self) -> bool {
        let kit = self.kit_dir();
        kit.join("memory").is_dir() && kit.join("templates").is_dir()
    }

    /// Create the directory layout and seed the default templates. Existing
    /// files are left alone.
    pub fn init(&self) -> Result<()> {
        let kit = self.kit_dir();
        for sub in ["memory", "research", "templates", "config"] {
            std::fs::create_dir_all(kit.join(sub))
                .with_context(|| format!("failed to create {}", kit.join(sub).display()))?;
        }

        let seeds = [
            (self.template_path("plan-template.md"), PLAN_TEMPLATE),
            (
                self.template_path("constitution-template.md"),
                CONSTITUTION_TEMPLATE,
            ),
        ];
        for (path, content) in seeds {
            if !path.exists() {
                std::fs::write(&path, content)
                    .with_context(|| format!("failed to seed {}", path.display()))?;
            }
        }

        Ok(())
    }

    /// Artifact text, or empty when the file does not exist.
    pub fn load_text(&self, path: &Path) -> String {
        std::fs::read_to_string(path).unwrap_or_default()
    }

    pub fn save_text(&self, path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn append_text(&self, path: &Path, content: &str) -> Result<()> {
        use std::io::Write;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }

    /// Create the container directory for a new research project,
    /// `NNN-topic-slug` with the next free sequence number.
    pub fn create_research_dir(&self, topic: &str) -> Result<PathBuf> {
        let root = self.research_root();
        std::fs::create_dir_all(&root)?;

        let next = std::fs::read_dir(&root)?
            .flatten()
            .filter_map(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .and_then(|name| name.split('-').next()?.parse::<u32>().ok())
            })
            .max()
            .unwrap_or(0)
            + 1;

        let dir = root.join(format!("{next:03}-{}", slugify(topic)));
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Most recently modified research directory, if any.
    pub fn current_research_dir(&self) -> Option<PathBuf> {
        let entries = std::fs::read_dir(self.research_root()).ok()?;

        entries
            .flatten()
            .filter(|entry| entry.path().is_dir())
            .max_by_key(|entry| {
                entry
                    .metadata()
                    .and_then(|meta| meta.modified())
                    .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
            })
            .map(|entry| entry.path())
    }
}

pub fn slugify(topic: &str) -> String {
    let slug: String = topic
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();

    let parts: Vec<&str> = slug.split('-').filter(|part| !part.is_empty()).collect();
    if parts.is_empty() {
        "research".to_string()
    } else {
        parts.join("-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Quantum Computing"), "quantum-computing");
        assert_eq!(slugify("  LLMs: why?  "), "llms-why");
        assert_eq!(slugify("???"), "research");
    }

    #[test]
    fn test_research_dirs_are_numbered() {
        let tmp = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(tmp.path().to_path_buf());
        workspace.init().unwrap();

        let first = workspace.create_research_dir("first topic").unwrap();
        let second = workspace.create_research_dir("second topic").unwrap();

        assert!(first.ends_with("001-first-topic"));
        assert!(second.ends_with("002-second-topic"));
        assert!(workspace.current_research_dir().is_some());
    }

    #[test]
    fn test_load_text_missing_file_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(tmp.path().to_path_buf());
        assert_eq!(workspace.load_text(&workspace.constitution_path()), "");
    }

    #[test]
    fn test_init_seeds_templates_once() {
        let tmp = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(tmp.path().to_path_buf());

        workspace.init().unwrap();
        assert!(workspace.is_initialized());

        let template = workspace.template_path("plan-template.md");
        workspace.save_text(&template, "customized").unwrap();
        workspace.init().unwrap();
        assert_eq!(workspace.load_text(&template), "customized");
    }
}
