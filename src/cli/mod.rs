// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All work is delegated to Layer 2 (application).
//
//   1. `train`   — fine-tune the classifier on CIFAR-10
//   2. `serve`   — web server for image uploads
//   3. `predict` — classify image files from the command line
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use std::path::Path;

use commands::{Commands, PredictArgs, ServeArgs, TrainArgs};
use crate::domain::prediction::PredictionReport;

#[derive(Parser, Debug)]
#[command(
    name = "cifar10-classifier",
    version,
    about = "Fine-tune MobileNetV2 on CIFAR-10 and serve predictions over HTTP."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// One line of `predict` output
#[derive(Serialize)]
struct PredictOutput<'a> {
    image:  &'a Path,
    #[serde(flatten)]
    report: PredictionReport,
}

impl Cli {
    /// Dispatch to the matching use case. Only routes, never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Serve(args)   => run_serve(args),
            Commands::Predict(args) => run_predict(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on CIFAR-10 from: {}", args.data_dir);

    let use_case = TrainUseCase::new(args.into());
    let summary  = use_case.execute()?;

    match (summary.best_epoch, summary.best_val_accuracy) {
        (Some(epoch), Some(acc)) => println!(
            "Training complete after {} epochs. Best: epoch {} ({:.2}% val accuracy).",
            summary.epochs_run, epoch, acc * 100.0
        ),
        _ => println!("Training complete after {} epochs.", summary.epochs_run),
    }
    Ok(())
}

fn run_serve(args: ServeArgs) -> Result<()> {
    use crate::application::serve_use_case::ServeUseCase;

    ServeUseCase::new(args.into()).execute()
}

fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::classify_use_case::ClassifyUseCase;

    let use_case = ClassifyUseCase::new(&args.model_dir)?;
    for image in &args.images {
        let report = use_case.classify_path(image, args.top_k)?;
        let output = PredictOutput { image, report };
        println!("{}", serde_json::to_string_pretty(&output)?);
    }
    Ok(())
}
