use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// Structured consumption data pulled out of one input.
/// Only exists for relevant inputs, so downstream code never sees half-filled fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub category: String,
    pub quantity: f64,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    pub source_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    #[serde(default)]
    pub manual_entry: bool,
}

/// Outcome of analysing one input.
#[derive(Debug, Clone, PartialEq)]
pub enum Analysis {
    Relevant(Extraction),
    NotRelevant {
        reason: String,
        source_text: String,
        suggested_files: Vec<String>,
    },
}

impl Analysis {
    #[cfg(test)]
    pub fn is_relevant(&self) -> bool {
        matches!(self, Analysis::Relevant(_))
    }
}

/// Accepts a JSON number or a numeric string; `None` for anything that is not
/// a finite number strictly greater than zero.
pub fn parse_quantity(value: &Value) -> Option<f64> {
    let quantity = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (quantity.is_finite() && quantity > 0.0).then_some(quantity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_quantity_accepts_numbers_and_strings() {
        assert_eq!(parse_quantity(&json!(150)), Some(150.0));
        assert_eq!(parse_quantity(&json!("200")), Some(200.0));
        assert_eq!(parse_quantity(&json!(" 12.5 ")), Some(12.5));
    }

    #[test]
    fn test_parse_quantity_rejects_non_positive_and_garbage() {
        assert_eq!(parse_quantity(&json!(-5)), None);
        assert_eq!(parse_quantity(&json!("-5")), None);
        assert_eq!(parse_quantity(&json!(0)), None);
        assert_eq!(parse_quantity(&json!("abc")), None);
        assert_eq!(parse_quantity(&json!("NaN")), None);
        assert_eq!(parse_quantity(&json!("inf")), None);
        assert_eq!(parse_quantity(&json!(null)), None);
        assert_eq!(parse_quantity(&json!(true)), None);
    }

    #[test]
    fn test_extraction_omits_absent_optionals() {
        let extraction = Extraction {
            category: "food".into(),
            quantity: 1.0,
            unit: "kg".into(),
            subtype: None,
            source_text: "Food purchase detected".into(),
            confidence: Some(Confidence::Low),
            manual_entry: false,
        };
        let value = serde_json::to_value(&extraction).unwrap();
        assert!(value.get("subtype").is_none());
        assert_eq!(value["confidence"], "low");
    }
}
