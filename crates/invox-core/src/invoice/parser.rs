//! Rule-based invoice parser.

use tracing::debug;

use crate::models::invoice::ParsedInvoice;

use super::rules::{extract_fields, extract_products, InvoiceFields};

/// Trait for invoice parsing.
///
/// Parsing is total: unmatched fields come back as `None` and garbled text
/// simply yields fewer fields.
pub trait InvoiceParser: Send + Sync {
    /// Parse invoice from text.
    fn parse(&self, text: &str) -> ParsedInvoice;
}

/// Parser driven by the static rule tables in [`super::rules::patterns`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedParser;

impl RuleBasedParser {
    pub fn new() -> Self {
        Self
    }
}

impl InvoiceParser for RuleBasedParser {
    fn parse(&self, text: &str) -> ParsedInvoice {
        let InvoiceFields {
            invoice_number,
            invoice_date,
            due_date,
            subtotal,
            total,
            client,
        } = extract_fields(text);

        let invoice = ParsedInvoice {
            invoice_number,
            invoice_date,
            due_date,
            subtotal,
            total,
            client,
            products: extract_products(text),
        };

        debug!(
            "Parsed {} characters: {} products, missing {:?}",
            text.len(),
            invoice.products.len(),
            invoice.missing_fields()
        );

        invoice
    }
}
