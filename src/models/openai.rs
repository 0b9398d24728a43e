use anyhow::{bail, Context};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::config::ResolvedBackend;
use crate::ir::TermCandidate;

use super::{parse_term_candidates, ExtractionBackend};

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Chat-completions backend for OpenAI and OpenAI-compatible endpoints.
///
/// `api_base` is configurable so the same adapter drives self-hosted
/// compatibility shims (vLLM, llama.cpp server, Ollama).
pub struct OpenAiCompatBackend {
    name: String,
    api_base: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_output_tokens: usize,
    client: Client,
}

impl OpenAiCompatBackend {
    pub fn new(backend: &ResolvedBackend) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(backend.timeout)
            .build()
            .context("build openai http client")?;
        Ok(Self {
            name: backend.name.clone(),
            api_base: backend
                .api_base
                .clone()
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key: backend.api_key.clone(),
            model: backend.model.clone(),
            temperature: backend.temperature,
            max_output_tokens: backend.max_output_tokens,
            client,
        })
    }
}

impl ExtractionBackend for OpenAiCompatBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn extract_terms(&self, prompt: &str) -> anyhow::Result<Vec<TermCandidate>> {
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", self.api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth).context("invalid api key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_output_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You extract bilingual terminology pairs and reply with strict JSON only.",
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };
        let url = format!("{}/chat/completions", self.api_base);
        let resp = self
            .client
            .post(&url)
            .headers(headers)
            .json(&body)
            .send()
            .with_context(|| format!("call chat completions: {url}"))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            bail!("chat completions returned {status}: {text}");
        }
        let parsed: ChatResponse = resp.json().context("parse chat completions response")?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .context("chat completions response has no choices")?;
        parse_term_candidates(&content)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: usize,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}
