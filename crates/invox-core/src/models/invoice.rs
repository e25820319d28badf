//! Invoice data models produced by the extractors.

use serde::{Deserialize, Serialize};

/// Structured invoice record extracted from OCR text.
///
/// Every scalar field is the raw matched substring, trimmed. Nothing is
/// normalized into calendar or numeric types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedInvoice {
    /// Invoice number (the digit run only).
    pub invoice_number: Option<String>,

    /// Invoice date as written, e.g. "March 3, 2023".
    pub invoice_date: Option<String>,

    /// Payment due date as written.
    pub due_date: Option<String>,

    /// Subtotal without the currency symbol, separators retained.
    pub subtotal: Option<String>,

    /// Amount due or total without the currency symbol.
    pub total: Option<String>,

    /// Billed party, rest of the "Bill To" line.
    pub client: Option<String>,

    /// Candidate line items in document order.
    #[serde(default)]
    pub products: Vec<ProductLine>,
}

/// One candidate line-item row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductLine {
    pub description: Option<String>,
    pub unit_price: Option<String>,
    pub total: Option<String>,
}

impl ParsedInvoice {
    /// True when nothing at all was extracted.
    pub fn is_empty(&self) -> bool {
        self.missing_fields().len() == 6 && self.products.is_empty()
    }

    /// Names of scalar fields that were not found.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("invoiceNumber", &self.invoice_number),
            ("invoiceDate", &self.invoice_date),
            ("dueDate", &self.due_date),
            ("subtotal", &self.subtotal),
            ("total", &self.total),
            ("client", &self.client),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Output of a pipeline run: the recognized text and the parsed invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    /// Raw text returned by the OCR engine.
    pub raw_text: String,
    /// Invoice parsed from `raw_text`.
    pub invoice: ParsedInvoice,
}
