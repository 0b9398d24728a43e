use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context};

use crate::chunker::DEFAULT_MAX_TOKENS_PER_CHUNK;
use crate::config::{find_default_config, load_config, resolve_backend, AppConfig, ResolvedBackend};
use crate::extract::RetryPolicy;
use crate::pipeline::prompts::DEFAULT_EXTRACT_TEMPLATE;

pub const CONFIG_FILENAME: &str = "termex.toml";
pub const CONFIG_ENV: &str = "TERMEX_CONFIG";
pub const DEFAULT_PROMPT_FILE: &str = "prompts/extract_terms.txt";

/// Fully-resolved run configuration: config file merged with CLI overrides.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub config_path: PathBuf,
    pub backend: ResolvedBackend,
    pub source_lang: Option<String>,
    pub target_lang: Option<String>,
    pub dataset_info: String,
    pub max_tokens_per_chunk: usize,
    pub retry: RetryPolicy,
    pub prompt_template: String,
}

impl PipelineConfig {
    /// CLI values take precedence over the config file; the config file is
    /// found via `--config`, `TERMEX_CONFIG`, or an upward search for
    /// `termex.toml` from the input directory.
    #[allow(clippy::too_many_arguments)]
    pub fn from_args(
        input: &Path,
        config_path: Option<PathBuf>,
        backend: Option<String>,
        model: Option<String>,
        source_lang: Option<String>,
        target_lang: Option<String>,
        dataset_info: Option<String>,
        max_tokens_per_chunk: Option<usize>,
    ) -> anyhow::Result<Self> {
        let workdir = input
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        let workdir = workdir.canonicalize().unwrap_or(workdir);

        let cfg_file = config_path
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from))
            .or_else(|| find_default_config(&workdir, CONFIG_FILENAME))
            .ok_or_else(|| {
                anyhow!("no {CONFIG_FILENAME} found (run: termex --init-config)")
            })?;
        let file_cfg = load_config(&cfg_file)?;

        let backend_name = backend
            .or_else(|| file_cfg.extraction.backend.clone())
            .ok_or_else(|| anyhow!("no backend selected (--backend or [extraction].backend)"))?;
        let backend = resolve_backend(&file_cfg, &backend_name, model.as_deref())?;

        let max_tokens_per_chunk = max_tokens_per_chunk
            .or(file_cfg.extraction.max_tokens_per_chunk)
            .unwrap_or(DEFAULT_MAX_TOKENS_PER_CHUNK);
        if max_tokens_per_chunk == 0 {
            return Err(anyhow!("max_tokens_per_chunk must be positive"));
        }

        let retry = RetryPolicy {
            max_retries: file_cfg.extraction.max_retries.unwrap_or(2),
            base_delay: Duration::from_millis(
                file_cfg.extraction.retry_base_ms.unwrap_or(1000),
            ),
        };

        let prompt_template = load_prompt_template(&cfg_file, &file_cfg)?;

        Ok(Self {
            config_path: cfg_file,
            backend,
            source_lang,
            target_lang,
            dataset_info: dataset_info
                .or_else(|| file_cfg.extraction.dataset_info.clone())
                .unwrap_or_default(),
            max_tokens_per_chunk,
            retry,
            prompt_template,
        })
    }
}

fn load_prompt_template(config_path: &Path, cfg: &AppConfig) -> anyhow::Result<String> {
    let Some(rel) = cfg.prompts.extract.as_deref() else {
        return Ok(DEFAULT_EXTRACT_TEMPLATE.to_string());
    };
    let config_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let mut path = PathBuf::from(rel);
    if path.is_relative() {
        path = config_dir.join(path);
    }
    std::fs::read_to_string(&path)
        .with_context(|| format!("read prompt template: {}", path.display()))
}

const DEFAULT_CONFIG_TEXT: &str = r#"# termex configuration

[extraction]
backend = "openai"
max_tokens_per_chunk = 100000
max_retries = 2
retry_base_ms = 1000
# dataset_info = "IT marketing copy, en -> es"

[prompts]
# Uncomment to customize the extraction prompt.
# extract = "prompts/extract_terms.txt"

[models.backends.openai]
provider = "openai"
model = "gpt-4o-mini"
api_key_env = "OPENAI_API_KEY"
# api_base = "http://localhost:8080/v1"

[models.backends.claude]
provider = "anthropic"
model = "claude-3-5-haiku-latest"
api_key_env = "ANTHROPIC_API_KEY"
"#;

/// Writes `termex.toml` plus the default prompt template into `dir`.
pub fn init_default_config(dir: &Path, force: bool) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create config dir: {}", dir.display()))?;

    let cfg_path = dir.join(CONFIG_FILENAME);
    if cfg_path.exists() && !force {
        return Err(anyhow!(
            "config already exists: {} (use --force to overwrite)",
            cfg_path.display()
        ));
    }
    std::fs::write(&cfg_path, DEFAULT_CONFIG_TEXT)
        .with_context(|| format!("write config: {}", cfg_path.display()))?;

    let prompt_path = dir.join(DEFAULT_PROMPT_FILE);
    if force || !prompt_path.exists() {
        if let Some(parent) = prompt_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create prompts dir: {}", parent.display()))?;
        }
        std::fs::write(&prompt_path, DEFAULT_EXTRACT_TEMPLATE)
            .with_context(|| format!("write prompt: {}", prompt_path.display()))?;
    }

    Ok(cfg_path)
}
