//! CLI command definitions for sft-evolve.
//!
//! The `run` command loads a dataset slice, builds the model backend and the
//! pipeline configuration, and schedules every sample for editing.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde_json::json;
use tracing::info;

use crate::agents::AgentNames;
use crate::dataset::{Dataset, DatasetFormat};
use crate::judge::JudgeMode;
use crate::llm::OpenAiChatBackend;
use crate::pipeline::{PipelineConfig, Protocol, StopPolicy};
use crate::scheduler::{Scheduler, SchedulerConfig};

/// Default model sent with every chat request.
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Multi-agent editing of supervised fine-tuning datasets.
#[derive(Parser)]
#[command(name = "sft-evolve")]
#[command(about = "Evolve SFT datasets through multi-agent debate, editing, and judging")]
#[command(version)]
#[command(
    long_about = "sft-evolve rewrites instruction-tuning samples with a team of role-played LLM agents.\n\nTwo reviewers debate each response, an advisor distills their points into writing suggestions, an editor applies them, and a judge decides whether the edit is an improvement.\n\nExample usage:\n  sft-evolve run --dataset ./alpaca.json --edit-modes 4 --workers 10"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Edit a dataset slice with the configured protocol.
    Run(Box<RunArgs>),
}

/// Arguments for `sft-evolve run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Dataset file (JSON array or JSONL).
    #[arg(short, long)]
    pub dataset: PathBuf,

    /// Dataset shape.
    #[arg(long, value_enum, default_value = "alpaca")]
    pub format: DatasetFormat,

    /// Directory receiving one result file per sample.
    #[arg(short, long, default_value = "./res")]
    pub output: PathBuf,

    /// Directory for session transcript files.
    #[arg(long, default_value = "./mems")]
    pub mems: PathBuf,

    /// Keep per-session transcript files after each sample completes.
    #[arg(long)]
    pub save_mem: bool,

    /// First sample index to process (inclusive).
    #[arg(long, default_value = "0")]
    pub start_index: usize,

    /// Last sample index to process (exclusive); the whole dataset if unset.
    #[arg(long)]
    pub end_index: Option<usize>,

    /// Concurrent sample limit.
    #[arg(short, long, default_value = "10")]
    pub workers: usize,

    /// Edit mode digits: 0-3 select separate modes, 4 selects the iterative
    /// protocol (e.g. "03" or "4").
    #[arg(long, default_value = "03")]
    pub edit_modes: String,

    /// Judge verdict format for the iterative protocol.
    #[arg(long, value_enum, default_value = "compare")]
    pub judge_mode: JudgeMode,

    /// Upper bound on iterative optimization rounds.
    #[arg(long, default_value = "3")]
    pub max_evol_rounds: usize,

    /// Per-agent memory window in entries; 0 exposes the full memory.
    #[arg(long, default_value = "0")]
    pub agent_window: usize,

    /// Dialogue pairs of context when linearizing multi-turn history.
    #[arg(long, default_value = "2")]
    pub conv_window: usize,

    /// Stop multi-turn editing after this many turns; overrides the token
    /// budget when set.
    #[arg(long)]
    pub max_optimize_turns: Option<usize>,

    /// Stop multi-turn editing once the edited dialogue reaches this many
    /// tokens.
    #[arg(long, default_value = "2048")]
    pub max_optimize_tokens: usize,

    /// Base URL of the chat-completions API.
    #[arg(long, env = "SFT_EVOLVE_API_BASE")]
    pub api_base: String,

    /// API key (can also be set via SFT_EVOLVE_API_KEY).
    #[arg(long, env = "SFT_EVOLVE_API_KEY")]
    pub api_key: Option<String>,

    /// Model identifier sent with every request.
    #[arg(short, long, env = "SFT_EVOLVE_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Sampling temperature.
    #[arg(long, default_value = "1.0")]
    pub temperature: f64,

    /// Completion token limit per request.
    #[arg(long, default_value = "1000")]
    pub max_tokens: u32,

    /// Nucleus sampling parameter.
    #[arg(long, default_value = "1.0")]
    pub top_p: f64,

    /// Run name used for the output subdirectory; a timestamp if unset.
    #[arg(long)]
    pub run_name: Option<String>,
}

/// Parses CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Runs the parsed CLI command.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => run_edit(*args).await,
    }
}

async fn run_edit(args: RunArgs) -> anyhow::Result<()> {
    let dataset = Dataset::load(&args.dataset, args.format, args.start_index, args.end_index)?;

    let protocol = Protocol::parse(&args.edit_modes)?;
    let stop_policy = match args.max_optimize_turns {
        Some(turns) => StopPolicy::MaxTurns(turns),
        None => StopPolicy::TokenBudget(args.max_optimize_tokens),
    };
    let pipeline = PipelineConfig::default()
        .with_protocol(protocol)
        .with_judge_mode(args.judge_mode)
        .with_max_evol_rounds(args.max_evol_rounds)
        .with_agent_window_size(args.agent_window)
        .with_conv_window_size(args.conv_window)
        .with_stop_policy(stop_policy)
        .with_agent_names(AgentNames::default());

    let backend = OpenAiChatBackend::new(&args.api_base, args.api_key.clone(), &args.model)
        .with_temperature(args.temperature)
        .with_max_tokens(args.max_tokens)
        .with_top_p(args.top_p);

    let now = chrono::Local::now();
    let folder = args
        .run_name
        .clone()
        .unwrap_or_else(|| now.format("%Y%m%d").to_string());
    let run_prefix = format!("{}_", now.format("%Y%m%d%H%M"));
    let results_dir = args.output.join(&folder);
    let mems_dir = args.mems.join(&folder);

    let scheduler_config = SchedulerConfig {
        num_workers: args.workers,
        results_dir: results_dir.clone(),
        mems_dir: Some(mems_dir),
        keep_transcripts: args.save_mem,
        run_prefix: run_prefix.clone(),
    };

    tokio::fs::create_dir_all(&results_dir).await?;
    save_run_config(&args, &pipeline, &results_dir, &run_prefix).await?;

    info!(
        dataset = %args.dataset.display(),
        samples = dataset.len(),
        model = %args.model,
        edit_modes = %args.edit_modes,
        "Starting edit run"
    );

    let scheduler = Scheduler::new(Arc::new(backend), pipeline, scheduler_config);
    let stats = scheduler.run(dataset).await?;

    info!(
        total = stats.total,
        succeeded = stats.succeeded,
        failed = stats.failed,
        elapsed_secs = stats.elapsed.as_secs_f64(),
        results = %results_dir.display(),
        "Edit run complete"
    );
    Ok(())
}

/// Writes a snapshot of the run configuration next to the results.
async fn save_run_config(
    args: &RunArgs,
    pipeline: &PipelineConfig,
    results_dir: &std::path::Path,
    run_prefix: &str,
) -> anyhow::Result<()> {
    let snapshot = json!({
        "dataset": args.dataset.display().to_string(),
        "format": args.format,
        "start_index": args.start_index,
        "end_index": args.end_index,
        "workers": args.workers,
        "model": args.model,
        "temperature": args.temperature,
        "max_tokens": args.max_tokens,
        "top_p": args.top_p,
        "pipeline": pipeline,
    });
    let path = results_dir.join(format!("{run_prefix}config.json"));
    tokio::fs::write(&path, serde_json::to_vec_pretty(&snapshot)?).await?;
    Ok(())
}
