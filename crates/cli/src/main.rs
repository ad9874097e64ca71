//! docbin-eval: evaluate one fold of the two-stage binarization pipeline

use anyhow::{Context as _, Result};
use clap::Parser;
use docbin_cli::EvalArgs;
use docbin_core::{Evaluator, InferenceContext};
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> ExitCode {
    let args = EvalArgs::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
        return ExitCode::FAILURE;
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &EvalArgs) -> Result<()> {
    let start = Instant::now();
    let config = args.resolve()?;
    info!(
        "Fold {}/{} with {} ({}) on {}",
        config.fold_num, config.fold_total, config.backbone, config.encoder_weights, config.device
    );

    let context = InferenceContext::load(&config).context("Failed to load models")?;
    let summary = Evaluator::new(&config, &context)
        .run()
        .context("Evaluation aborted")?;

    info!(
        "Evaluated {} images in {:.2?}; results in {}",
        summary.images.len(),
        start.elapsed(),
        summary.metrics_path.display()
    );
    Ok(())
}
