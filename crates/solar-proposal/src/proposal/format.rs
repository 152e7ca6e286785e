//! Brazilian presentation helpers. Applied only while drawing; nothing here
//! feeds back into the figures.

use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

const MAX_FILENAME_STEM_CHARS: usize = 50;
const FALLBACK_FILENAME_STEM: &str = "proposta";

/// `1234.5` → `"1.234,50"`. Negative or non-finite values render as `"0,00"`.
pub fn currency(value: f64) -> String {
    if !value.is_finite() || value < 0.0 {
        return "0,00".to_string();
    }

    let fixed = format!("{value:.2}");
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    format!("{},{}", group_thousands(whole), cents)
}

/// `12345` → `"12.345"`.
pub fn integer(value: i64) -> String {
    let grouped = group_thousands(&value.unsigned_abs().to_string());
    if value < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Six decimals with a comma, the way the distributor prints unit prices.
pub fn tariff(value: f64) -> String {
    format!("{value:.6}").replace('.', ",")
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }
    grouped
}

pub const fn month_name(month: u32) -> &'static str {
    match month {
        1 => "JANEIRO",
        2 => "FEVEREIRO",
        3 => "MARÇO",
        4 => "ABRIL",
        5 => "MAIO",
        6 => "JUNHO",
        7 => "JULHO",
        8 => "AGOSTO",
        9 => "SETEMBRO",
        10 => "OUTUBRO",
        11 => "NOVEMBRO",
        _ => "DEZEMBRO",
    }
}

/// `OUTUBRO/2026`
pub fn month_and_year(date: NaiveDate) -> String {
    format!("{}/{}", month_name(date.month()), date.year())
}

fn filename_patterns() -> &'static (Regex, Regex, Regex) {
    static PATTERNS: OnceLock<(Regex, Regex, Regex)> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        (
            Regex::new(r#"[<>:"/\\|?*]"#).expect("reserved character pattern"),
            Regex::new(r"\s+").expect("whitespace pattern"),
            Regex::new(r"_+").expect("underscore pattern"),
        )
    })
}

/// Filesystem-safe stem derived from the customer name.
pub fn sanitize_filename(name: &str) -> String {
    let (reserved, whitespace, underscores) = filename_patterns();

    let replaced = reserved.replace_all(name, "_");
    let spaced = whitespace.replace_all(replaced.trim(), "_");
    let collapsed = underscores.replace_all(&spaced, "_");
    let stem: String = collapsed
        .trim_matches('_')
        .chars()
        .take(MAX_FILENAME_STEM_CHARS)
        .collect();

    if stem.is_empty() {
        FALLBACK_FILENAME_STEM.to_string()
    } else {
        stem
    }
}

/// `simulacao_<sanitized-name>.pdf`
pub fn proposal_filename(name: &str) -> String {
    format!("simulacao_{}.pdf", sanitize_filename(name))
}
