use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub extraction: ExtractionSection,
    #[serde(default)]
    pub prompts: PromptsSection,
    #[serde(default)]
    pub models: ModelsSection,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ExtractionSection {
    /// Named backend from `[models.backends.*]` used for extraction.
    #[serde(default)]
    pub backend: Option<String>,

    /// Estimated-token budget per chunk (default 100000).
    #[serde(default)]
    pub max_tokens_per_chunk: Option<usize>,

    /// Retries per chunk after the first attempt (default 2).
    #[serde(default)]
    pub max_retries: Option<u32>,

    /// Base backoff in milliseconds; retry N waits base * 2^N (default 1000).
    #[serde(default)]
    pub retry_base_ms: Option<u64>,

    /// Free-text dataset description forwarded to the prompt.
    #[serde(default)]
    pub dataset_info: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct PromptsSection {
    /// Path to an extraction prompt template overriding the built-in one.
    /// Relative paths resolve against the config file directory.
    #[serde(default)]
    pub extract: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ModelsSection {
    #[serde(default)]
    pub backends: HashMap<String, ModelBackend>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ModelBackend {
    /// "openai" (any OpenAI-compatible endpoint) or "anthropic".
    #[serde(default)]
    pub provider: Option<String>,

    /// Override for the API base URL (compatibility shims, self-hosted).
    #[serde(default)]
    pub api_base: Option<String>,

    pub model: String,

    /// Literal API key. Prefer `api_key_env`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Environment variable holding the API key.
    #[serde(default)]
    pub api_key_env: Option<String>,

    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_output_tokens: Option<usize>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provider {
    OpenAiCompat,
    Anthropic,
}

impl Provider {
    pub fn parse(s: Option<&str>) -> anyhow::Result<Self> {
        match s.unwrap_or("openai").trim().to_ascii_lowercase().as_str() {
            "openai" | "openai-compat" => Ok(Self::OpenAiCompat),
            "anthropic" => Ok(Self::Anthropic),
            other => Err(anyhow!("unknown provider: {other}")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedBackend {
    pub name: String,
    pub provider: Provider,
    pub api_base: Option<String>,
    pub model: String,
    pub api_key: String,
    pub temperature: f32,
    pub max_output_tokens: usize,
    pub timeout: Duration,
}

pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: AppConfig =
        toml::from_str(&text).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}

/// Searches `start` and its ancestors for `filename`.
pub fn find_default_config(start: &Path, filename: &str) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(d) = dir {
        let candidate = d.join(filename);
        if candidate.is_file() {
            return Some(candidate);
        }
        dir = d.parent();
    }
    None
}

/// Resolves a named backend from config, including its API key.
pub fn resolve_backend(
    cfg: &AppConfig,
    name: &str,
    model_override: Option<&str>,
) -> anyhow::Result<ResolvedBackend> {
    let backend = cfg
        .models
        .backends
        .get(name)
        .ok_or_else(|| anyhow!("backend not found in config: {name}"))?;

    let provider = Provider::parse(backend.provider.as_deref())?;
    let api_key = resolve_api_key(backend, provider)
        .with_context(|| format!("resolve api key for backend: {name}"))?;

    Ok(ResolvedBackend {
        name: name.to_string(),
        provider,
        api_base: backend.api_base.clone(),
        model: model_override
            .map(|s| s.to_string())
            .unwrap_or_else(|| backend.model.clone()),
        api_key,
        temperature: backend.temperature.unwrap_or(0.1),
        max_output_tokens: backend.max_output_tokens.unwrap_or(4096),
        timeout: Duration::from_secs(backend.timeout_secs.unwrap_or(60)),
    })
}

fn resolve_api_key(backend: &ModelBackend, provider: Provider) -> anyhow::Result<String> {
    if let Some(key) = backend.api_key.as_deref() {
        let key = key.trim();
        if !key.is_empty() {
            return Ok(key.to_string());
        }
    }
    let env_name = backend.api_key_env.clone().unwrap_or_else(|| {
        match provider {
            Provider::OpenAiCompat => "OPENAI_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
        }
        .to_string()
    });
    let key = std::env::var(&env_name)
        .with_context(|| format!("api key env var not set: {env_name}"))?;
    let key = key.trim().to_string();
    if key.is_empty() {
        return Err(anyhow!("api key env var is empty: {env_name}"));
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::{resolve_backend, AppConfig, Provider};

    #[test]
    fn parses_backend_sections() {
        let cfg: AppConfig = toml::from_str(
            r#"
[extraction]
backend = "gpt"
max_tokens_per_chunk = 50000

[models.backends.gpt]
provider = "openai"
model = "gpt-4o-mini"
api_key = "sk-test"
temperature = 0.2

[models.backends.claude]
provider = "anthropic"
model = "claude-sonnet"
api_key = "ak-test"
"#,
        )
        .expect("parse toml");

        assert_eq!(cfg.extraction.backend.as_deref(), Some("gpt"));
        assert_eq!(cfg.extraction.max_tokens_per_chunk, Some(50000));

        let gpt = resolve_backend(&cfg, "gpt", None).expect("resolve gpt");
        assert_eq!(gpt.provider, Provider::OpenAiCompat);
        assert_eq!(gpt.model, "gpt-4o-mini");
        assert_eq!(gpt.api_key, "sk-test");

        let claude = resolve_backend(&cfg, "claude", Some("claude-opus")).expect("resolve");
        assert_eq!(claude.provider, Provider::Anthropic);
        assert_eq!(claude.model, "claude-opus");
    }

    #[test]
    fn unknown_backend_is_an_error() {
        let cfg = AppConfig::default();
        assert!(resolve_backend(&cfg, "missing", None).is_err());
    }
}
