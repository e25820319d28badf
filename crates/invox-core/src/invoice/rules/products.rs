//! Line-item extraction from `$`-priced text lines.

use crate::models::invoice::ProductLine;

use super::patterns::{CURRENCY_TOKEN, SUMMARY_KEYWORDS};

/// Extract candidate product lines in document order.
pub fn extract_products(text: &str) -> Vec<ProductLine> {
    text.lines()
        .filter(|line| is_candidate_line(line))
        .map(parse_product_line)
        .collect()
}

/// A line is a product candidate when it carries a currency amount and is
/// not one of the summary rows (subtotal, tax, balance, total).
pub fn is_candidate_line(line: &str) -> bool {
    CURRENCY_TOKEN.is_match(line) && !SUMMARY_KEYWORDS.is_match(line)
}

/// Split a trimmed line at each whitespace character that directly precedes
/// a `$`. The whitespace itself is dropped.
pub fn split_product_line(line: &str) -> Vec<&str> {
    let line = line.trim();
    let mut segments = Vec::new();
    let mut start = 0;
    let mut chars = line.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if c.is_whitespace() && matches!(chars.peek(), Some((_, '$'))) {
            segments.push(&line[start..idx]);
            start = idx + c.len_utf8();
        }
    }
    segments.push(&line[start..]);

    segments
}

fn parse_product_line(line: &str) -> ProductLine {
    let segments: Vec<Option<String>> = split_product_line(line)
        .into_iter()
        .map(|s| Some(s.trim()).filter(|s| !s.is_empty()).map(str::to_string))
        .collect();
    let segment = |i: usize| segments.get(i).cloned().flatten();

    let unit_price = segment(1);
    ProductLine {
        description: segment(0),
        total: segment(2).or_else(|| unit_price.clone()),
        unit_price,
    }
}
