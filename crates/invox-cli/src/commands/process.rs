//! Process command - extract data from a single invoice image.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use invox_core::{InvoicePipeline, PipelineStage};

use super::load_config;
use super::output::{format_result, OutputFormat};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input image
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// OCR language hint (default: ocr.language from config)
    #[arg(short, long)]
    lang: Option<String>,

    /// Include the recognized text in JSON output
    #[arg(long)]
    raw_text: bool,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;
    let pipeline = InvoicePipeline::from_config(&config)?;
    let language = args.lang.clone().unwrap_or_default();

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {msg}")?
            .progress_chars("##-"),
    );

    let input = args.input.clone();
    let observer_pb = pb.clone();
    let result = tokio::task::spawn_blocking(move || {
        pipeline.extract_invoice_observed(&input, &language, |stage| {
            report_stage(&observer_pb, stage)
        })
    })
    .await?;

    let result = match result {
        Ok(result) => {
            pb.finish_with_message("Done");
            result
        }
        Err(e) => {
            pb.abandon_with_message("Failed");
            return Err(e.into());
        }
    };

    let missing = result.invoice.missing_fields();
    if !missing.is_empty() {
        eprintln!(
            "{} Fields not found: {}",
            style("⚠").yellow(),
            missing.join(", ")
        );
    }

    let output = format_result(&result, args.format, args.raw_text)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn report_stage(pb: &ProgressBar, stage: PipelineStage) {
    let (position, message) = match stage {
        PipelineStage::Start => (0, "Starting..."),
        PipelineStage::Preprocessing => (10, "Preprocessing image..."),
        PipelineStage::Recognizing => (30, "Running OCR..."),
        PipelineStage::Cleanup => (70, "Cleaning up..."),
        PipelineStage::Extracting => (80, "Extracting invoice data..."),
        PipelineStage::Done => (100, "Done"),
        PipelineStage::Errored => return,
    };
    pb.set_position(position);
    pb.set_message(message);
}
