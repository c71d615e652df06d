use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub host: String,
    pub port: u16,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 11434,
        }
    }
}

impl OllamaConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Primary reasoning model
    pub primary: String,
    /// Model tried when the primary exhausts its retries
    pub fallback: String,
    /// Embedding model for vector memory
    pub embedding: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            primary: "qwen2.5:7b-instruct".to_string(),
            fallback: "llama3.2:3b".to_string(),
            embedding: "nomic-embed-text".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Vector store endpoint; unreachable is fine, workers degrade to
    /// in-process memory
    pub qdrant_url: String,
    pub vector_top_k: usize,
    pub session_limit: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            qdrant_url: "http://localhost:6334".to_string(),
            vector_top_k: 3,
            session_limit: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Per-role wait during orchestration
    pub orchestrate_ms: u64,
    /// Wait for a peer reply during collaboration
    pub collab_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            orchestrate_ms: 90_000,
            collab_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub primary_attempts: u32,
    pub primary_base_delay_ms: u64,
    pub fallback_attempts: u32,
    pub fallback_base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            primary_attempts: 2,
            primary_base_delay_ms: 1000,
            fallback_attempts: 1,
            fallback_base_delay_ms: 2000,
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = Config::default();
            config.save()?;
            return Ok(config);
        }

        let contents = fs::read_to_string(&config_path)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        fs::write(&config_path, toml_string)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .context("Could not determine home directory")?;

        Ok(home.join(".boardroom").join("config.toml"))
    }
}
