//! Parse command - run field extraction over already recognized text.

use std::fs;
use std::io::Read;
use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::debug;

use invox_core::{ExtractionResult, InvoiceParser, RuleBasedParser};

use super::output::{format_result, OutputFormat};

/// Arguments for the parse command.
#[derive(Args)]
pub struct ParseArgs {
    /// Text file to parse, or "-" for stdin
    #[arg(required = true)]
    input: String,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Include the input text in JSON output
    #[arg(long)]
    raw_text: bool,
}

pub async fn run(args: ParseArgs) -> anyhow::Result<()> {
    let text = read_input(&args.input)?;
    debug!("Parsing {} bytes of text", text.len());

    let result = ExtractionResult {
        invoice: RuleBasedParser::new().parse(&text),
        raw_text: text,
    };

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

    Ok(())
}

fn read_input(input: &str) -> anyhow::Result<String> {
    if input == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }

    fs::read_to_string(input)
        .map_err(|e| anyhow::anyhow!("Failed to read text file {}: {}", input, e))
}
