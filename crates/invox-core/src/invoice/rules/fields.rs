//! Scalar invoice field extraction.

use super::patterns::{
    CLIENT_RULES, DUE_DATE_RULES, INVOICE_DATE_RULES, INVOICE_NUMBER_RULES, SUBTOTAL_RULES,
    TOTAL_RULES,
};
use super::FieldExtractor;

/// Scalar fields found in invoice text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceFields {
    pub invoice_number: Option<String>,
    pub invoice_date: Option<String>,
    pub due_date: Option<String>,
    pub subtotal: Option<String>,
    pub total: Option<String>,
    pub client: Option<String>,
}

/// Apply every field's rule table to the whole text.
pub fn extract_fields(text: &str) -> InvoiceFields {
    InvoiceFields {
        invoice_number: INVOICE_NUMBER_RULES.extract(text),
        invoice_date: INVOICE_DATE_RULES.extract(text),
        due_date: DUE_DATE_RULES.extract(text),
        subtotal: SUBTOTAL_RULES.extract(text),
        total: TOTAL_RULES.extract(text),
        client: CLIENT_RULES.extract(text),
    }
}
