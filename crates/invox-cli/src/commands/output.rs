//! Output formatting shared by the process, batch and parse commands.

use invox_core::{ExtractionResult, ParsedInvoice};

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    /// File extension for outputs in this format.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

/// Render a result. `include_raw_text` only affects JSON output.
pub fn format_result(
    result: &ExtractionResult,
    format: OutputFormat,
    include_raw_text: bool,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json if include_raw_text => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&result.invoice)?),
        OutputFormat::Csv => format_csv(&result.invoice),
        OutputFormat::Text => Ok(format_text(&result.invoice)),
    }
}

/// One row per product line; invoices without products still get one row.
fn format_csv(invoice: &ParsedInvoice) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "invoice_number",
        "invoice_date",
        "due_date",
        "client",
        "subtotal",
        "total",
        "product_description",
        "product_unit_price",
        "product_total",
    ])?;

    let header = [
        opt(&invoice.invoice_number),
        opt(&invoice.invoice_date),
        opt(&invoice.due_date),
        opt(&invoice.client),
        opt(&invoice.subtotal),
        opt(&invoice.total),
    ];

    if invoice.products.is_empty() {
        wtr.write_record(header.iter().copied().chain(["", "", ""]))?;
    }

    for product in &invoice.products {
        wtr.write_record(header.iter().copied().chain([
            opt(&product.description),
            opt(&product.unit_price),
            opt(&product.total),
        ]))?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(invoice: &ParsedInvoice) -> String {
    let mut output = String::new();
    let show = |value: &Option<String>| value.as_deref().unwrap_or("-").to_string();

    output.push_str(&format!("Invoice: {}\n", show(&invoice.invoice_number)));
    output.push_str(&format!("Date:    {}\n", show(&invoice.invoice_date)));
    output.push_str(&format!("Due:     {}\n", show(&invoice.due_date)));
    output.push_str(&format!("Client:  {}\n", show(&invoice.client)));
    output.push('\n');

    if invoice.products.is_empty() {
        output.push_str("Products: none found\n");
    } else {
        output.push_str("Products:\n");
        for product in &invoice.products {
            output.push_str(&format!(
                "  {}  {}  {}\n",
                show(&product.description),
                show(&product.unit_price),
                show(&product.total)
            ));
        }
    }
    output.push('\n');

    output.push_str(&format!("Subtotal: {}\n", show(&invoice.subtotal)));
    output.push_str(&format!("Total:    {}\n", show(&invoice.total)));

    output
}

fn opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}
