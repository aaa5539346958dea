use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

fn default_version() -> String {
    "1.0".to_string()
}

fn default_url() -> String {
    DEFAULT_OLLAMA_URL.to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    0.9
}

fn default_num_ctx() -> u32 {
    4096
}

/// Backend connection and sampling parameters. Persisted as JSON under the
/// project's `.researchkit/config/` directory; validated before every save
/// and load, so an invalid config is never written and never used.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ResearchConfig {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_url")]
    pub ollama_url: String,
    #[serde(default)]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_num_ctx")]
    pub num_ctx: u32,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            ollama_url: default_url(),
            model: String::new(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            num_ctx: default_num_ctx(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }
}

impl ResearchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.model.is_empty() {
            bail!("Model name is required");
        }
        if self.ollama_url.is_empty() {
            bail!("Ollama URL is required");
        }
        if !self.ollama_url.starts_with("http://") && !self.ollama_url.starts_with("https://") {
            bail!("Ollama URL must start with http:// or https://");
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            bail!("Temperature must be between 0.0 and 2.0");
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            bail!("top_p must be between 0.0 and 1.0");
        }
        if self.num_ctx < 512 {
            bail!("num_ctx must be at least 512");
        }
        Ok(())
    }
}

pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(project_dir: &Path) -> Self {
        Self {
            path: project_dir.join(".researchkit/config/ollama.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> Result<ResearchConfig> {
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read config at {}", self.path.display()))?;

        let config: ResearchConfig =
            serde_json::from_str(&raw).context("failed to parse config file")?;
        config.validate().context("invalid config")?;

        Ok(config)
    }

    /// Validate, stamp `updated_at`, and write. An invalid config is
    /// rejected before anything touches the disk.
    pub fn save(&self, config: &mut ResearchConfig) -> Result<()> {
        config.validate().context("cannot save invalid config")?;
        config.updated_at = chrono::Local::now().to_rfc3339();

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut raw = serde_json::to_string_pretty(config)?;
        raw.push('\n');
        std::fs::write(&self.path, raw)
            .with_context(|| format!("failed to write config at {}", self.path.display()))?;

        Ok(())
    }
}
