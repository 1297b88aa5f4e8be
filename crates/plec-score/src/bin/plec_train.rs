//! PLECscore training CLI.
//!
//! Generates PDBBind descriptors, trains one of the three regressor
//! variants, and optionally exports the portable parameter document.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use plec_score::{ModelVariant, PlecConfig, PlecScore, TrainOptions};

/// Train a PLEC binding-affinity scoring function
#[derive(Parser)]
#[command(name = "plec-train")]
#[command(about = "Train a PLEC binding-affinity scoring function", long_about = None)]
struct Cli {
    /// PDBBind dataset root directory (required when generating descriptors)
    #[arg(long)]
    pdbbind_dir: Option<PathBuf>,

    /// PDBBind versions to read when generating descriptors
    #[arg(long, value_delimiter = ',', default_value = "2016")]
    pdbbind_versions: Vec<u32>,

    /// Benchmark version the trained model is labeled with
    #[arg(long, default_value_t = 2016)]
    pdbbind_version: u32,

    /// Directory holding descriptor CSVs and artifacts
    #[arg(long, default_value = "plec_home")]
    home_dir: PathBuf,

    /// Model variant (linear, nn, rf)
    #[arg(long, default_value = "linear")]
    variant: ModelVariant,

    /// Protein environment depth
    #[arg(long, default_value_t = 5)]
    depth_protein: usize,

    /// Ligand environment depth
    #[arg(long, default_value_t = 1)]
    depth_ligand: usize,

    /// Fingerprint bit length
    #[arg(long, default_value_t = 65536)]
    size: u32,

    /// Parallelism hint; <= 0 uses all cores
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    n_jobs: i32,

    /// Protein reference structure to bind into the scorer
    #[arg(long)]
    protein: Option<PathBuf>,

    /// Regenerate the descriptor CSV before training
    #[arg(long)]
    gen_data: bool,

    /// Skip the pretrained-JSON fast path even when a document exists
    #[arg(long)]
    ignore_json: bool,

    /// Export the parameter document after training
    #[arg(long)]
    export_json: bool,

    /// Explicit artifact output path
    #[arg(long)]
    artifact: Option<PathBuf>,

    /// Run report JSON output path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    log::info!("PLECscore Training Tool v{}", plec_score::VERSION);
    log::info!("========================================");

    let config = PlecConfig {
        protein: cli.protein.clone(),
        n_jobs: cli.n_jobs,
        variant: cli.variant,
        depth_protein: cli.depth_protein,
        depth_ligand: cli.depth_ligand,
        size: cli.size,
    };

    let mut scorer = PlecScore::new(config).context("failed to construct scorer")?;
    log::info!("Scorer: {}", scorer.score_title());

    if cli.gen_data {
        let pdbbind_dir = cli
            .pdbbind_dir
            .as_deref()
            .context("--pdbbind-dir is required with --gen-data")?;
        let csv_path = scorer
            .gen_training_data(pdbbind_dir, &cli.pdbbind_versions, &cli.home_dir)
            .context("descriptor generation failed")?;
        log::info!("Descriptors written to {}", csv_path.display());
    }

    let artifact = scorer
        .train(&TrainOptions {
            home_dir: cli.home_dir.clone(),
            artifact_path: cli.artifact.clone(),
            pdbbind_version: cli.pdbbind_version,
            ignore_json: cli.ignore_json,
        })
        .context("training failed")?;

    match &artifact {
        Some(path) => log::info!("Artifact saved to {}", path.display()),
        None => log::info!("Restored pretrained weights; no artifact written"),
    }

    let json_path = if cli.export_json {
        let path = scorer
            .gen_json(&cli.home_dir, cli.pdbbind_version)
            .context("parameter export failed")?;
        log::info!("Parameter document saved to {}", path.display());
        Some(path)
    } else {
        None
    };

    if let Some(report_path) = &cli.report {
        let report = serde_json::json!({
            "completed": chrono::Utc::now(),
            "tool_version": plec_score::VERSION,
            "score_title": scorer.score_title(),
            "config": scorer.config,
            "pdbbind_version": cli.pdbbind_version,
            "artifact": artifact,
            "parameter_document": json_path,
        });
        std::fs::write(report_path, serde_json::to_string_pretty(&report)?)
            .context("failed to write run report")?;
        log::info!("Run report saved to {}", report_path.display());
    }

    log::info!("========================================");
    log::info!("Done");
    Ok(())
}
