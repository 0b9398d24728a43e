use anyhow::{bail, Context};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::config::ResolvedBackend;
use crate::ir::TermCandidate;

use super::{parse_term_candidates, ExtractionBackend};

pub const DEFAULT_API_BASE: &str = "https://api.anthropic.com/v1";

/// Anthropic messages-API backend.
pub struct AnthropicBackend {
    name: String,
    api_base: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_output_tokens: usize,
    client: Client,
}

impl AnthropicBackend {
    pub fn new(backend: &ResolvedBackend) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(backend.timeout)
            .build()
            .context("build anthropic http client")?;
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

impl ExtractionBackend for AnthropicBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn extract_terms(&self, prompt: &str) -> anyhow::Result<Vec<TermCandidate>> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(self.api_key.trim()).context("invalid api key")?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static("2023-06-01"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_output_tokens,
            temperature: self.temperature,
            messages: vec![Message {
                role: "user",
                content: vec![ContentBlock {
                    kind: "text",
                    text: prompt,
                }],
            }],
        };
        let url = format!("{}/messages", self.api_base);
        let resp = self
            .client
            .post(&url)
            .headers(headers)
            .json(&body)
            .send()
            .with_context(|| format!("call messages api: {url}"))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            bail!("messages api returned {status}: {text}");
        }
        let parsed: MessagesResponse = resp.json().context("parse messages response")?;
        let answer = parsed
            .content
            .into_iter()
            .filter_map(|block| match block {
                ResponseBlock::Text { text } => Some(text),
                ResponseBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");
        if answer.is_empty() {
            bail!("messages response has no text content");
        }
        parse_term_candidates(&answer)
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: usize,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: Vec<ContentBlock<'a>>,
}

#[derive(Serialize)]
struct ContentBlock<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}
