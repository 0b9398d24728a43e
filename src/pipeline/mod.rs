mod config;
pub mod prompts;
mod runner;

pub use config::{init_default_config, PipelineConfig, CONFIG_ENV, CONFIG_FILENAME};
pub use runner::{
    build_backend, run_extraction, ExtractionOptions, ExtractionReport, TermExtractionPipeline,
};
