//! Configuration types and loading.
//!
//! Three-tier precedence: explicit file path/`AGENTD_CONFIG` env var > YAML
//! config file > compiled-in defaults. Individual settings in the
//! environment table always win over whatever the file said.

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub service: ServiceConfig,
    pub sandbox: SandboxConfig,
    #[serde(rename = "loop")]
    pub agent_loop: LoopConfig,
}

impl Config {
    /// Load configuration with fallback chain, then apply environment overrides.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = if let Some(path) = config_path {
            Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()))?
        } else if let Ok(env_path) = env::var("AGENTD_CONFIG") {
            Self::load_from_file(&env_path).context(format!("Failed to load config from {}", env_path))?
        } else {
            let local_config = PathBuf::from("agentd.yml");
            if local_config.exists() {
                match Self::load_from_file(&local_config) {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                        Self::default()
                    }
                }
            } else if let Some(config_dir) = dirs::config_dir() {
                let user_config = config_dir.join("agentd").join("agentd.yml");
                if user_config.exists() {
                    match Self::load_from_file(&user_config) {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                            Self::default()
                        }
                    }
                } else {
                    tracing::info!("No config file found, using defaults");
                    Self::default()
                }
            } else {
                Self::default()
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// The environment variables named in the external-interfaces table always
    /// take final precedence over whatever the config file set.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("MAX_ITERATIONS") {
            if let Ok(n) = v.parse() {
                self.agent_loop.max_iterations = n;
            }
        }
        if let Ok(v) = env::var("SANDBOX_TIMEOUT") {
            if let Ok(n) = v.parse() {
                self.sandbox.exec_timeout_secs = n;
            }
        }
        if let Ok(v) = env::var("DEFAULT_MODEL") {
            self.llm.default_model = v;
        }
        if let Ok(v) = env::var("MODEL_COMPLEX") {
            self.llm.model_complex = v;
        }
        if let Ok(v) = env::var("MODEL_BALANCED") {
            self.llm.model_balanced = v;
        }
        if let Ok(v) = env::var("MODEL_FAST") {
            self.llm.model_fast = v;
        }
        if let Ok(v) = env::var("MODEL_CODING") {
            self.llm.model_coding = v;
        }
        if let Ok(v) = env::var("MODEL_LLAMA") {
            self.llm.model_llama = v;
        }
        if let Ok(v) = env::var("WRITGO_API_URL") {
            self.service.webhook_base_url = Some(v);
        }
        if let Ok(v) = env::var("WRITGO_WEBHOOK_SECRET") {
            self.service.webhook_secret = Some(v);
        }
        if let Ok(v) = env::var("AGENTD_BIND_ADDR") {
            self.service.bind_addr = v;
        }
        if let Ok(v) = env::var("AGENTD_WORKSPACE_ROOT") {
            self.service.workspace_root = PathBuf::from(v);
        }
        if let Ok(v) = env::var("AGENTD_TASK_GRACE_SECS") {
            if let Ok(n) = v.parse() {
                self.service.task_grace_secs = n;
            }
        }
    }

    /// Resolve the LLM configuration into something a client can be built
    /// from directly, failing fast if the shared gateway credential is absent.
    pub fn resolve_llm(&self) -> Result<ResolvedLlmConfig> {
        let api_key = env::var("AIML_API_KEY").context("AIML_API_KEY is not set; the LLM gateway credential is required at startup")?;

        Ok(ResolvedLlmConfig {
            api_key,
            base_url: self.llm.base_url.clone(),
            default_model: self.llm.default_model.clone(),
            max_tokens: self.llm.max_tokens,
            timeout_secs: self.llm.timeout_ms / 1000,
        })
    }
}

/// LLM gateway and router-tier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    #[serde(rename = "base-url")]
    pub base_url: String,

    #[serde(rename = "default-model")]
    pub default_model: String,

    #[serde(rename = "model-complex")]
    pub model_complex: String,

    #[serde(rename = "model-balanced")]
    pub model_balanced: String,

    #[serde(rename = "model-fast")]
    pub model_fast: String,

    #[serde(rename = "model-coding")]
    pub model_coding: String,

    #[serde(rename = "model-llama")]
    pub model_llama: String,

    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.aimlapi.com".to_string(),
            default_model: "gpt-4o".to_string(),
            model_complex: "gpt-4o".to_string(),
            model_balanced: "gpt-4o-mini".to_string(),
            model_fast: "gpt-4o-mini".to_string(),
            model_coding: "claude-3-5-sonnet".to_string(),
            model_llama: "meta-llama/Llama-3.3-70B-Instruct-Turbo".to_string(),
            max_tokens: 4096,
            timeout_ms: 120_000,
        }
    }
}

/// Fully-resolved gateway client configuration, with the credential present.
#[derive(Debug, Clone)]
pub struct ResolvedLlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub default_model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

/// HTTP surface, webhook, and task-registry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    #[serde(rename = "bind-addr")]
    pub bind_addr: String,

    #[serde(rename = "webhook-base-url")]
    pub webhook_base_url: Option<String>,

    #[serde(rename = "webhook-secret")]
    pub webhook_secret: Option<String>,

    #[serde(rename = "workspace-root")]
    pub workspace_root: PathBuf,

    #[serde(rename = "task-grace-secs")]
    pub task_grace_secs: u64,
}

impl ServiceConfig {
    pub fn task_grace(&self) -> Duration {
        Duration::from_secs(self.task_grace_secs)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            webhook_base_url: None,
            webhook_secret: None,
            workspace_root: PathBuf::from("/tmp"),
            task_grace_secs: 3600,
        }
    }
}

/// Sandbox resource caps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    #[serde(rename = "image")]
    pub image: String,

    #[serde(rename = "memory-limit-bytes")]
    pub memory_limit_bytes: i64,

    #[serde(rename = "cpu-limit")]
    pub cpu_limit: f64,

    #[serde(rename = "exec-timeout-secs")]
    pub exec_timeout_secs: u64,
}

impl SandboxConfig {
    pub fn exec_timeout(&self) -> Duration {
        Duration::from_secs(self.exec_timeout_secs)
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            image: "agentd-sandbox:latest".to_string(),
            memory_limit_bytes: 2 * 1024 * 1024 * 1024,
            cpu_limit: 2.0,
            exec_timeout_secs: 300,
        }
    }
}

/// Agent loop limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    #[serde(rename = "max-iterations")]
    pub max_iterations: u32,

    #[serde(rename = "recent-events-window")]
    pub recent_events_window: usize,

    #[serde(rename = "consecutive-error-cap")]
    pub consecutive_error_cap: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self { max_iterations: 50, recent_events_window: 20, consecutive_error_cap: 3 }
    }
}
