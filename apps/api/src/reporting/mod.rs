// Aggregation and reporting over stored records: summaries, the sustainability
// report and the downloadable exports. Pure functions over `&[EmissionRecord]`.

pub mod aggregate;
pub mod export;
pub mod handlers;
pub mod report;

pub use aggregate::{summarize, Summary};

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    use crate::carbon::calculator::UNIT_EMISSION;
    use crate::carbon::{CalculationResult, CarbonCalculator};
    use crate::extraction::{Extraction, FileType};
    use crate::records::models::{EmissionRecord, RecordAnalysis};

    pub fn record_at(category: &str, total: f64, created_at: DateTime<Utc>) -> EmissionRecord {
        let mut record = EmissionRecord::new(
            Uuid::new_v4(),
            "manual://entry".into(),
            FileType::Manual,
            RecordAnalysis::new(
                Extraction {
                    category: category.to_string(),
                    quantity: 1.0,
                    unit: "kg".into(),
                    subtype: None,
                    source_text: format!("{category} entry"),
                    confidence: None,
                    manual_entry: true,
                },
                CalculationResult {
                    total_emission: total,
                    unit_emission: UNIT_EMISSION.to_string(),
                    advice: vec![],
                    equivalents: CarbonCalculator::carbon_equivalents(total),
                },
                "test",
            ),
        );
        record.created_at = created_at;
        record.updated_at = created_at;
        record
    }
}
