//! Rule-based field extractors for invoice text.

pub mod fields;
pub mod patterns;
pub mod products;

pub use fields::{extract_fields, InvoiceFields};
pub use patterns::*;
pub use products::{extract_products, is_candidate_line, split_product_line};

use regex::{Captures, Regex};

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;
}

/// A single pattern rule: a case-insensitive expression plus the highest
/// capture group that may carry the value.
#[derive(Debug)]
pub struct PatternRule {
    /// Short label used in logs and tests.
    pub name: &'static str,
    /// Compiled expression, matched against the whole text.
    pub pattern: Regex,
    /// Highest capture group to read the value from.
    pub group: usize,
}

impl PatternRule {
    /// Compile a rule. Panics on an invalid expression, so rules must be
    /// declared in the static tables in [`patterns`].
    pub fn new(name: &'static str, pattern: &str, group: usize) -> Self {
        let pattern = Regex::new(pattern).unwrap_or_else(|e| panic!("invalid rule {name}: {e}"));
        Self {
            name,
            pattern,
            group,
        }
    }

    /// Try this rule. `None` means the pattern did not match at all;
    /// `Some(None)` means it matched but every capture was blank.
    pub fn apply(&self, text: &str) -> Option<Option<String>> {
        self.pattern
            .captures(text)
            .map(|caps| last_non_empty_group(&caps, self.group))
    }
}

/// Picks the highest-numbered capture group, from `max_group` down to 1,
/// whose trimmed text is non-empty.
fn last_non_empty_group(caps: &Captures<'_>, max_group: usize) -> Option<String> {
    (1..=max_group)
        .rev()
        .filter_map(|i| caps.get(i))
        .map(|m| m.as_str().trim())
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// An ordered list of rules for one field. The first rule that matches
/// decides the value; later rules are not consulted.
#[derive(Debug)]
pub struct RuleSet {
    /// Field name the rules populate.
    pub field: &'static str,
    /// Rules in precedence order.
    pub rules: Vec<PatternRule>,
}

impl RuleSet {
    pub fn new(field: &'static str, rules: Vec<PatternRule>) -> Self {
        Self { field, rules }
    }

    /// The first rule whose pattern matches, with its resolved value.
    pub fn first_match(&self, text: &str) -> Option<(&PatternRule, Option<String>)> {
        self.rules
            .iter()
            .find_map(|rule| rule.apply(text).map(|value| (rule, value)))
    }
}

impl FieldExtractor for RuleSet {
    type Output = String;

    fn extract(&self, text: &str) -> Option<String> {
        self.first_match(text).and_then(|(_, value)| value)
    }
}
