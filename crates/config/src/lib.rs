//! Configuration loading, validation, and management for Majordome.
//!
//! Loads configuration from `~/.majordome/config.toml` with environment
//! variable overrides. Validates all settings at startup.

pub use majordome_core::provider::CallingConvention;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.majordome/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Agent loop behaviour
    #[serde(default)]
    pub agent: AgentConfig,

    /// Ordered provider fallback chain (first entry is tried first)
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,

    /// Logging output
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Built-in tool settings
    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum provider round-trips per run (safety limit)
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Persona prompt placed at the top of every transcript
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Instruction appended for the forced-synthesis call after tool results
    #[serde(default = "default_synthesis_prompt")]
    pub synthesis_prompt: String,

    /// Sampling temperature sent to every backend
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per backend response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_max_iterations() -> u32 {
    10
}
fn default_system_prompt() -> String {
    "You are Majordome, a concise personal assistant. Always answer in the \
     language the user writes in. Keep answers short and direct. Use a tool \
     whenever the request needs live information or an action on the machine."
        .into()
}
fn default_synthesis_prompt() -> String {
    "Using the tool results above, answer the user's original request in plain \
     natural language. Do not call any tool and do not output JSON."
        .into()
}
fn default_temperature() -> f32 {
    0.1
}
fn default_max_tokens() -> u32 {
    4096
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            system_prompt: default_system_prompt(),
            synthesis_prompt: default_synthesis_prompt(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Which wire protocol a backend speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// `POST {base}/chat/completions` (OpenAI, Groq, OpenRouter, vLLM, ...)
    OpenaiCompat,
    /// `POST {base}/api/chat` (Ollama native API)
    Ollama,
}

/// One entry of the provider fallback chain.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Unique name of this entry (used for logs and `--provider`)
    pub name: String,

    pub kind: BackendKind,

    pub model: String,

    #[serde(default)]
    pub calling: CallingConvention,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Per-attempt timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    120
}

impl ProviderConfig {
    /// Base URL, falling back to the well-known endpoint for the kind.
    pub fn resolved_base_url(&self) -> String {
        if let Some(url) = &self.base_url {
            return url.trim_end_matches('/').to_string();
        }
        match self.kind {
            BackendKind::OpenaiCompat => default_openai_compat_url(&self.name),
            BackendKind::Ollama => "http://localhost:11434".into(),
        }
    }
}

/// `GROQ_API_KEY` is only handed to endpoints on this host.
const GROQ_HOST: &str = "api.groq.com";

/// Get the default base URL for well-known OpenAI-compatible providers.
fn default_openai_compat_url(provider_name: &str) -> String {
    match provider_name {
        "groq" => "https://api.groq.com/openai/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "cerebras" => "https://api.cerebras.ai/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => "http://localhost:8000/v1".into(),
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("model", &self.model)
            .field("calling", &self.calling)
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig {
            name: "groq".into(),
            kind: BackendKind::OpenaiCompat,
            model: "llama-3.3-70b-versatile".into(),
            calling: CallingConvention::Structured,
            base_url: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
        },
        ProviderConfig {
            name: "ollama-qwen".into(),
            kind: BackendKind::Ollama,
            model: "qwen3:8b".into(),
            calling: CallingConvention::Text,
            base_url: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
        },
        ProviderConfig {
            name: "ollama-llama".into(),
            kind: BackendKind::Ollama,
            model: "llama3.1:8b".into(),
            calling: CallingConvention::Text,
            base_url: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
        },
    ]
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of human-readable ones
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Kill `run_shell` commands after this many seconds
    #[serde(default = "default_shell_timeout")]
    pub shell_timeout_secs: u64,
}

fn default_shell_timeout() -> u64 {
    30
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            shell_timeout_secs: default_shell_timeout(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.majordome/config.toml).
    ///
    /// Also checks environment variables:
    /// - `MAJORDOME_API_KEY` for OpenAI-compatible entries without a key,
    ///   or `GROQ_API_KEY` when such an entry points at Groq
    /// - `MAJORDOME_OLLAMA_URL` for Ollama entries without a base URL
    /// - `MAJORDOME_MAX_ITERATIONS`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment-style overrides through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let api_key = lookup("MAJORDOME_API_KEY");
        let groq_key = lookup("GROQ_API_KEY");
        let ollama_url = lookup("MAJORDOME_OLLAMA_URL");

        for provider in &mut self.providers {
            match provider.kind {
                BackendKind::OpenaiCompat if provider.api_key.is_none() => {
                    provider.api_key = api_key.clone().or_else(|| {
                        provider
                            .resolved_base_url()
                            .contains(GROQ_HOST)
                            .then(|| groq_key.clone())
                            .flatten()
                    });
                }
                BackendKind::Ollama if provider.base_url.is_none() => {
                    provider.base_url = ollama_url.clone();
                }
                _ => {}
            }
        }

        if let Some(max) = lookup("MAJORDOME_MAX_ITERATIONS").and_then(|v| v.parse().ok()) {
            self.agent.max_iterations = max;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".majordome")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.providers.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one [[providers]] entry is required".into(),
            ));
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            if !seen.insert(provider.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate provider name '{}'",
                    provider.name
                )));
            }
            if provider.timeout_secs == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "provider '{}' has timeout_secs = 0",
                    provider.name
                )));
            }
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be > 0".into(),
            ));
        }

        if self.agent.temperature < 0.0 || self.agent.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "agent.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        Ok(())
    }

    /// Look up a chain entry by name.
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.name == name)
    }

    /// Generate a default config TOML string (for the `config` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            agent: AgentConfig::default(),
            providers: default_providers(),
            logging: LoggingConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.providers.len(), 3);
        assert_eq!(config.providers[0].name, "groq");
        assert_eq!(config.providers[0].calling, CallingConvention::Structured);
        assert_eq!(config.providers[1].calling, CallingConvention::Text);
        assert_eq!(config.agent.max_iterations, 10);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.providers.len(), config.providers.len());
        assert_eq!(parsed.providers[2].model, "llama3.1:8b");
    }

    #[test]
    fn provider_chain_parsing_preserves_order() {
        let toml_str = r#"
[agent]
max_iterations = 4

[[providers]]
name = "local"
kind = "ollama"
model = "qwen3:8b"
calling = "text"
timeout_secs = 30

[[providers]]
name = "openrouter"
kind = "openai_compat"
model = "meta-llama/llama-3.3-70b-instruct"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.agent.max_iterations, 4);
        assert_eq!(config.providers[0].name, "local");
        assert_eq!(config.providers[0].timeout_secs, 30);
        assert_eq!(config.providers[1].calling, CallingConvention::Structured);
        assert_eq!(config.providers[1].timeout_secs, 120);
        assert!(config.providers[1].resolved_base_url().contains("openrouter.ai"));
        assert_eq!(config.providers[0].resolved_base_url(), "http://localhost:11434");
    }

    #[test]
    fn empty_chain_rejected() {
        let config = AppConfig {
            providers: vec![],
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn duplicate_provider_names_rejected() {
        let mut config = AppConfig::default();
        config.providers[1].name = "groq".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn zero_iterations_rejected() {
        let mut config = AppConfig::default();
        config.agent.max_iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.agent.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn overrides_fill_missing_values_only() {
        let mut config = AppConfig::default();
        config.providers[2].base_url = Some("http://gpu-box:11434".into());

        let env: HashMap<&str, &str> = HashMap::from([
            ("GROQ_API_KEY", "gsk-test"),
            ("MAJORDOME_OLLAMA_URL", "http://127.0.0.1:11434"),
            ("MAJORDOME_MAX_ITERATIONS", "3"),
        ]);
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.providers[0].api_key.as_deref(), Some("gsk-test"));
        assert_eq!(config.providers[1].base_url.as_deref(), Some("http://127.0.0.1:11434"));
        assert_eq!(config.providers[2].base_url.as_deref(), Some("http://gpu-box:11434"));
        assert_eq!(config.agent.max_iterations, 3);
    }

    #[test]
    fn groq_key_only_reaches_groq_endpoints() {
        let mut config = AppConfig::default();
        let groq = config.providers[0].clone();
        config.providers.push(ProviderConfig {
            name: "openai".into(),
            ..groq.clone()
        });
        config.providers.push(ProviderConfig {
            name: "groq-mirror".into(),
            base_url: Some("https://api.groq.com/openai/v1/".into()),
            ..groq
        });

        let env: HashMap<&str, &str> = HashMap::from([("GROQ_API_KEY", "gsk-test")]);
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.providers[0].api_key.as_deref(), Some("gsk-test"));
        assert_eq!(config.providers[3].api_key, None);
        assert_eq!(config.providers[4].api_key.as_deref(), Some("gsk-test"));
    }

    #[test]
    fn generic_key_reaches_every_openai_compat_entry() {
        let mut config = AppConfig::default();
        let groq = config.providers[0].clone();
        config.providers.push(ProviderConfig {
            name: "openai".into(),
            ..groq
        });

        let env: HashMap<&str, &str> = HashMap::from([
            ("MAJORDOME_API_KEY", "sk-generic"),
            ("GROQ_API_KEY", "gsk-test"),
        ]);
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.providers[0].api_key.as_deref(), Some("sk-generic"));
        assert_eq!(config.providers[3].api_key.as_deref(), Some("sk-generic"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let mut config = AppConfig::default();
        config.providers[0].api_key = Some("gsk-secret".into());
        let debug = format!("{:?}", config);
        assert!(!debug.contains("gsk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().providers[0].name, "groq");
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[tools]\nshell_timeout_secs = 5\n\n[logging]\njson = true\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.tools.shell_timeout_secs, 5);
        assert!(config.logging.json);
        assert_eq!(config.providers.len(), 3);
    }

    #[test]
    fn invalid_file_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[[providers]]\nname = 3\n").unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("groq"));
        assert!(toml_str.contains("qwen3:8b"));
    }
}
