use std::path::Path;

use anyhow::{anyhow, Context};
use serde::Serialize;

use crate::chunker::chunk_units;
use crate::config::{Provider, ResolvedBackend};
use crate::dedupe::aggregate;
use crate::extract::{process_chunk, ExtractEvent, RetryPolicy};
use crate::ir::{DatasetInfo, TermCandidate, TermPair, TranslationUnit};
use crate::models::{AnthropicBackend, ExtractionBackend, OpenAiCompatBackend};
use crate::pipeline::prompts::DEFAULT_EXTRACT_TEMPLATE;
use crate::progress::ConsoleProgress;
use crate::tmx::parse_tmx;

use super::PipelineConfig;

/// Tunables of one extraction run.
#[derive(Clone, Debug)]
pub struct ExtractionOptions {
    pub max_tokens_per_chunk: usize,
    pub retry: RetryPolicy,
    pub prompt_template: String,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            max_tokens_per_chunk: crate::chunker::DEFAULT_MAX_TOKENS_PER_CHUNK,
            retry: RetryPolicy::default(),
            prompt_template: DEFAULT_EXTRACT_TEMPLATE.to_string(),
        }
    }
}

/// Result of a run. `failed_chunks` is observability only: a run where every
/// chunk failed still returns `Ok` with an empty term list.
#[derive(Clone, Debug)]
pub struct ExtractionReport {
    pub pairs: Vec<TermPair>,
    pub chunk_count: usize,
    pub failed_chunks: usize,
}

/// Single entry point of the core: chunk, drive each chunk sequentially in
/// order, aggregate.
///
/// Hard errors are reserved for the input itself (no units, zero budget).
/// Per-chunk extraction failures are absorbed: the chunk contributes nothing
/// and the run continues. Progress events fire after every chunk, including
/// failed ones, and end at exactly 100.
pub fn run_extraction(
    backend: &dyn ExtractionBackend,
    units: &[TranslationUnit],
    dataset: &DatasetInfo,
    options: &ExtractionOptions,
    on_event: &mut dyn FnMut(ExtractEvent),
) -> anyhow::Result<ExtractionReport> {
    if units.is_empty() {
        return Err(anyhow!("document contains no translation units"));
    }
    let chunks = chunk_units(units, options.max_tokens_per_chunk)?;
    let chunk_count = chunks.len();
    let total_units = units.len();

    let mut candidates: Vec<TermCandidate> = Vec::new();
    let mut failed_chunks = 0usize;
    let mut processed_units = 0usize;

    for (index, chunk) in chunks.into_iter().enumerate() {
        let outcome = process_chunk(
            backend,
            chunk,
            index,
            chunk_count,
            dataset,
            &options.prompt_template,
            &options.retry,
            on_event,
        );
        if outcome.failed {
            failed_chunks += 1;
        } else {
            candidates.extend(outcome.candidates);
        }

        // Failed chunks still count: their units were processed.
        processed_units += chunk.len();
        let percent = (processed_units * 100 / total_units).min(100) as u8;
        on_event(ExtractEvent::Progress { percent });
    }

    Ok(ExtractionReport {
        pairs: aggregate(candidates),
        chunk_count,
        failed_chunks,
    })
}

pub fn build_backend(backend: &ResolvedBackend) -> anyhow::Result<Box<dyn ExtractionBackend>> {
    match backend.provider {
        Provider::OpenAiCompat => Ok(Box::new(OpenAiCompatBackend::new(backend)?)),
        Provider::Anthropic => Ok(Box::new(AnthropicBackend::new(backend)?)),
    }
}

/// CLI-facing wrapper: TMX in, JSON term list out, progress on stderr.
pub struct TermExtractionPipeline {
    cfg: PipelineConfig,
    progress: ConsoleProgress,
}

#[derive(Serialize)]
struct ReportFile<'a> {
    source_lang: &'a str,
    target_lang: &'a str,
    backend: &'a str,
    chunk_count: usize,
    failed_chunks: usize,
    terms: &'a [TermPair],
}

impl TermExtractionPipeline {
    #[must_use]
    pub fn new(cfg: PipelineConfig, progress: ConsoleProgress) -> Self {
        Self { cfg, progress }
    }

    pub fn extract_tmx(&self, input: &Path, output: &Path) -> anyhow::Result<ExtractionReport> {
        self.progress.info(format!("Read TMX: {}", input.display()));
        let doc = parse_tmx(input)?;
        if doc.units.is_empty() {
            return Err(anyhow!(
                "no translation units in input: {}",
                input.display()
            ));
        }

        let dataset = DatasetInfo {
            source_lang: self
                .cfg
                .source_lang
                .clone()
                .unwrap_or_else(|| doc.source_lang.clone()),
            target_lang: self
                .cfg
                .target_lang
                .clone()
                .unwrap_or_else(|| doc.target_lang.clone()),
            description: self.cfg.dataset_info.clone(),
        };
        self.progress.info(format!(
            "{} translation units, {} -> {}",
            doc.units.len(),
            dataset.source_lang,
            dataset.target_lang
        ));
        self.progress.info(format!(
            "Backend: {} ({})",
            self.cfg.backend.name, self.cfg.backend.model
        ));

        let backend = build_backend(&self.cfg.backend)?;
        let options = ExtractionOptions {
            max_tokens_per_chunk: self.cfg.max_tokens_per_chunk,
            retry: self.cfg.retry,
            prompt_template: self.cfg.prompt_template.clone(),
        };

        let progress = &self.progress;
        let report = run_extraction(
            backend.as_ref(),
            &doc.units,
            &dataset,
            &options,
            &mut |ev| progress.handle(&ev),
        )?;

        let file = ReportFile {
            source_lang: &dataset.source_lang,
            target_lang: &dataset.target_lang,
            backend: self.cfg.backend.name.as_str(),
            chunk_count: report.chunk_count,
            failed_chunks: report.failed_chunks,
            terms: &report.pairs,
        };
        let json = serde_json::to_string_pretty(&file).context("serialize term report")?;
        std::fs::write(output, json)
            .with_context(|| format!("write terms: {}", output.display()))?;

        self.progress.info(format!(
            "Extracted {} terms ({} of {} chunks failed): {}",
            report.pairs.len(),
            report.failed_chunks,
            report.chunk_count,
            output.display()
        ));
        Ok(report)
    }
}
