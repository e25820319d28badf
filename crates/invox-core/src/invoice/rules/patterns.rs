//! Rule catalogue and shared regex patterns for invoice extraction.

use lazy_static::lazy_static;
use regex::Regex;

use super::{PatternRule, RuleSet};

/// "Month DD, YYYY", e.g. "March 3, 2023".
const LONG_DATE: &str = r"([A-Za-z0-9_]+\s[0-9]{1,2},\s[0-9]{4})";

/// Digits and thousands separators with at most one decimal point.
const AMOUNT: &str = r"([0-9,]*\.?[0-9,]+)";

lazy_static! {
    pub static ref INVOICE_NUMBER_RULES: RuleSet = RuleSet::new(
        "invoiceNumber",
        vec![PatternRule::new(
            "invoice_number",
            r"(?i)invoice\s*(?:number|no)?[:#]?\s*[^0-9]*?([0-9]{3,})",
            1,
        )],
    );

    // "invoice date" before the bare "date" label.
    pub static ref INVOICE_DATE_RULES: RuleSet = RuleSet::new(
        "invoiceDate",
        vec![
            PatternRule::new(
                "invoice_date",
                &format!(r"(?i)invoice\s*date[:\s]*{LONG_DATE}"),
                1,
            ),
            PatternRule::new("date", &format!(r"(?i)date[:\s]*{LONG_DATE}"), 1),
        ],
    );

    pub static ref DUE_DATE_RULES: RuleSet = RuleSet::new(
        "dueDate",
        vec![PatternRule::new(
            "due_date",
            &format!(r"(?i)due\s*date[:\s]*{LONG_DATE}"),
            1,
        )],
    );

    pub static ref SUBTOTAL_RULES: RuleSet = RuleSet::new(
        "subtotal",
        vec![PatternRule::new(
            "subtotal",
            &format!(r"(?i)subtotal[:\s]*\$?{AMOUNT}"),
            1,
        )],
    );

    // "balance due" before the bare "total" label.
    pub static ref TOTAL_RULES: RuleSet = RuleSet::new(
        "total",
        vec![
            PatternRule::new(
                "balance_due",
                &format!(r"(?i)balance\s*due[:\s]*\$?{AMOUNT}"),
                1,
            ),
            PatternRule::new("total", &format!(r"(?i)total[:\s]*\$?{AMOUNT}"), 1),
        ],
    );

    pub static ref CLIENT_RULES: RuleSet = RuleSet::new(
        "client",
        vec![PatternRule::new("bill_to", r"(?i)bill\s*to[:\s]*(.+)", 1)],
    );

    // Line items
    pub static ref CURRENCY_TOKEN: Regex = Regex::new(r"\$[0-9,.]+").unwrap();

    pub static ref SUMMARY_KEYWORDS: Regex = Regex::new(
        r"(?i)subtotal|sales\s*tax|balance\s*due|total"
    ).unwrap();
}

/// All field tables in output order.
pub fn field_rule_sets() -> [&'static RuleSet; 6] {
    [
        &*INVOICE_NUMBER_RULES,
        &*INVOICE_DATE_RULES,
        &*DUE_DATE_RULES,
        &*SUBTOTAL_RULES,
        &*TOTAL_RULES,
        &*CLIENT_RULES,
    ]
}
