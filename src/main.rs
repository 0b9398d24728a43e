use std::path::PathBuf;

use anyhow::Context;
use clap::{CommandFactory, Parser};

use termex::pipeline::{init_default_config, PipelineConfig, TermExtractionPipeline};
use termex::progress::ConsoleProgress;

#[derive(Parser, Debug)]
#[command(name = "termex")]
#[command(about = "Extract bilingual terminology from TMX files (LLM backends)", long_about = None)]
struct Args {
    /// Generate default config + prompt files, then exit
    #[arg(long)]
    init_config: bool,

    /// Directory to write config/prompt files (default: current directory)
    #[arg(long, value_name = "DIR")]
    init_config_dir: Option<PathBuf>,

    /// Overwrite existing config/prompt files when used with --init-config
    #[arg(long)]
    force: bool,

    /// Input .tmx file
    #[arg(value_name = "TMX")]
    input: Option<PathBuf>,

    /// Output terms JSON (default: <input_stem>_terms.json)
    #[arg(short, long, value_name = "JSON")]
    output: Option<PathBuf>,

    /// Config file path (default: search for termex.toml upwards)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Backend name from config (e.g. openai, claude)
    #[arg(long)]
    backend: Option<String>,

    /// Model identifier (overrides the backend's configured model)
    #[arg(long)]
    model: Option<String>,

    /// Force source language code (default: from the TMX header)
    #[arg(long)]
    source_lang: Option<String>,

    /// Force target language code (default: from the TMX body)
    #[arg(long)]
    target_lang: Option<String>,

    /// Free-text description of the dataset, passed to the prompt
    #[arg(long)]
    dataset_info: Option<String>,

    /// Estimated-token budget per chunk (default: 100000)
    #[arg(long)]
    max_tokens_per_chunk: Option<usize>,

    /// Suppress progress output on stderr
    #[arg(long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let progress = ConsoleProgress::new(!args.quiet);

    if args.init_config {
        let dir = args
            .init_config_dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        let cfg_path = init_default_config(&dir, args.force).context("init default config")?;
        eprintln!("Wrote config: {}", cfg_path.display());
        return Ok(());
    }

    let input = match args.input {
        Some(p) => p,
        None => {
            let mut cmd = Args::command();
            cmd.print_help().context("print help")?;
            eprintln!(
                "\n\nUSAGE:\n  termex <input.tmx>\n\nTIPS:\n  - Default config search: termex.toml (upwards), or set TERMEX_CONFIG.\n  - Run `termex --init-config` once to create termex.toml.\n"
            );
            return Ok(());
        }
    };
    let output = match args.output {
        Some(p) => p,
        None => {
            let stem = input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("output")
                .to_string();
            input.with_file_name(format!("{stem}_terms.json"))
        }
    };

    let cfg = PipelineConfig::from_args(
        &input,
        args.config,
        args.backend,
        args.model,
        args.source_lang,
        args.target_lang,
        args.dataset_info,
        args.max_tokens_per_chunk,
    )
    .context("build config")?;

    let pipeline = TermExtractionPipeline::new(cfg, progress);
    pipeline.extract_tmx(&input, &output)?;
    Ok(())
}
