// Extraction prompt templates.
// All prompts for the extraction module are defined here.

pub const EXTRACTION_SYSTEM: &str = "\
You analyse utility bills, fuel receipts and grocery receipts for carbon footprint calculation. \
You MUST respond with a single valid JSON object only with no markdown fences, no explanations. \
Never invent quantities: if the text has no consumption figure, mark it as not relevant.";

pub const EXTRACTION_PROMPT: &str = r#"Analyze this text for carbon footprint calculation. Return ONLY JSON.

TEXT:
{document_text}

If this contains energy/consumption data, return:
{
  "relevant": true,
  "category": "electricity" | "transportation" | "food" | "home" | "waste",
  "quantity": number,
  "unit": "kWh" | "gallons" | "kg" | "miles" | "therms",
  "subtype": "optional finer source, e.g. grid_average, gasoline, beef, natural_gas, landfill",
  "source_text": "Brief description",
  "confidence": "low" | "medium" | "high"
}

If not relevant, return:
{
  "relevant": false,
  "reason": "No consumption data found"
}

ONLY return JSON, no other text."#;

/// Suggestions surfaced when the model decides a document carries no consumption data.
pub const MODEL_SUGGESTIONS: &[&str] = &[
    "Text files with electricity usage (kWh)",
    "Text files with gasoline purchases (gallons)",
    "Text files with food items",
    "Utility bill data in text format",
];

/// Suggestions surfaced when an upload could not be read at all.
pub const UNSUPPORTED_FILE_SUGGESTIONS: &[&str] = &[
    "Text files with electricity usage (kWh)",
    "Text files with gasoline purchases (gallons)",
    "Text files with grocery items",
    "CSV files with consumption data",
];
