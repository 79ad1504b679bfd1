//! Fallback Matcher: deterministic keyword/regex extraction used whenever the
//! text model is unavailable, times out, or answers with something unparseable.
//!
//! Rules are tried in order and the first one that produces a match wins:
//! 1. `kwh` / `kilowatt` with a number → electricity
//! 2. `gallon` / `gas` / `fuel` with a number of gallons → transportation
//! 3. `beef` / `chicken` / `cheese` anywhere → food, 1 kg

use std::sync::OnceLock;

use regex::Regex;

use crate::extraction::models::{Analysis, Confidence, Extraction};

const SOURCE_PREVIEW_CHARS: usize = 50;

/// Example inputs surfaced to the user when nothing could be matched.
pub const FALLBACK_SUGGESTIONS: &[&str] = &[
    "Text file: 'Electricity: 200 kWh'",
    "Text file: 'Gasoline: 15 gallons'",
    "Text file: 'Grocery: beef 2kg, chicken 1kg'",
];

fn electricity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d+(?:\.\d+)?)\s*(?:kwh|kilowatt)").expect("electricity pattern is valid")
    })
}

fn gallons_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)\s*gallons?").expect("gallons pattern is valid"))
}

fn food_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(beef|chicken|cheese)").expect("food pattern is valid"))
}

/// Runs the ordered rules over `text`. `file_name` only feeds the source description.
pub fn match_text(text: &str, file_name: &str) -> Analysis {
    let lowered = text.to_lowercase();

    if let Some(extraction) = match_electricity(&lowered)
        .or_else(|| match_fuel(&lowered))
        .or_else(|| match_food(&lowered))
    {
        return Analysis::Relevant(extraction);
    }

    let preview: String = text.trim().chars().take(SOURCE_PREVIEW_CHARS).collect();
    let described = if preview.is_empty() {
        file_name
    } else {
        preview.as_str()
    };

    Analysis::NotRelevant {
        reason: "Could not extract consumption data".to_string(),
        source_text: format!("Manual processing: {described}"),
        suggested_files: FALLBACK_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
    }
}

fn match_electricity(text: &str) -> Option<Extraction> {
    if !(text.contains("kwh") || text.contains("kilowatt")) {
        return None;
    }
    let raw = electricity_re().captures(text)?.get(1)?.as_str();
    let quantity = positive(raw)?;
    Some(Extraction {
        category: "electricity".to_string(),
        quantity,
        unit: "kWh".to_string(),
        subtype: None,
        source_text: format!("Electricity usage: {raw} kWh"),
        confidence: Some(Confidence::Medium),
        manual_entry: false,
    })
}

fn match_fuel(text: &str) -> Option<Extraction> {
    if !(text.contains("gallon") || text.contains("gas") || text.contains("fuel")) {
        return None;
    }
    let raw = gallons_re().captures(text)?.get(1)?.as_str();
    let quantity = positive(raw)?;
    Some(Extraction {
        category: "transportation".to_string(),
        quantity,
        unit: "gallons".to_string(),
        subtype: Some("gasoline".to_string()),
        source_text: format!("Gasoline purchase: {raw} gallons"),
        confidence: Some(Confidence::Medium),
        manual_entry: false,
    })
}

fn match_food(text: &str) -> Option<Extraction> {
    let item = food_re().captures(text)?.get(1)?.as_str();
    Some(Extraction {
        category: "food".to_string(),
        quantity: 1.0,
        unit: "kg".to_string(),
        subtype: Some(item.to_string()),
        source_text: "Food purchase detected".to_string(),
        confidence: Some(Confidence::Low),
        manual_entry: false,
    })
}

fn positive(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|q| q.is_finite() && *q > 0.0)
}
