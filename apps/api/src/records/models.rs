use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::carbon::CalculationResult;
use crate::extraction::{Extraction, FileType};

/// Extraction merged with its calculation; stored as the `analysis` document of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordAnalysis {
    /// Always `true`; stored records only ever come from relevant analyses.
    pub relevant: bool,
    #[serde(flatten)]
    pub extraction: Extraction,
    #[serde(flatten)]
    pub calculation: CalculationResult,
    pub calculated_with: String,
}

impl RecordAnalysis {
    pub fn new(
        extraction: Extraction,
        calculation: CalculationResult,
        calculated_with: &str,
    ) -> Self {
        Self {
            relevant: true,
            extraction,
            calculation,
            calculated_with: calculated_with.to_string(),
        }
    }

    pub fn category(&self) -> &str {
        &self.extraction.category
    }

    pub fn total_emission(&self) -> f64 {
        self.calculation.total_emission
    }
}

/// A persisted, user-owned emission record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmissionRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub file_url: String,
    pub file_type: FileType,
    pub analysis: RecordAnalysis,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EmissionRecord {
    pub fn new(owner_id: Uuid, file_url: String, file_type: FileType, analysis: RecordAnalysis) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            file_url,
            file_type,
            analysis,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct EmissionRecordRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub file_url: String,
    pub file_type: String,
    pub analysis: Json<RecordAnalysis>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EmissionRecordRow> for EmissionRecord {
    fn from(row: EmissionRecordRow) -> Self {
        Self {
            id: row.id,
            owner_id: row.owner_id,
            file_url: row.file_url,
            file_type: FileType::parse(&row.file_type),
            analysis: row.analysis.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carbon::calculator::CarbonEquivalents;
    use crate::carbon::CarbonCalculator;

    fn sample_analysis() -> RecordAnalysis {
        RecordAnalysis::new(
            Extraction {
                category: "electricity".into(),
                quantity: 200.0,
                unit: "kWh".into(),
                subtype: Some("grid_average".into()),
                source_text: "Manual entry: 200 kWh electricity".into(),
                confidence: None,
                manual_entry: true,
            },
            CalculationResult {
                total_emission: 77.0,
                unit_emission: "kg CO2e".into(),
                advice: vec!["Switch to LED bulbs and unplug devices when not in use.".into()],
                equivalents: CarbonCalculator::carbon_equivalents(77.0),
            },
            "CarbonKind Manual Entry",
        )
    }

    #[test]
    fn test_analysis_serializes_flat() {
        let value = serde_json::to_value(sample_analysis()).unwrap();
        assert_eq!(value["relevant"], true);
        assert_eq!(value["category"], "electricity");
        assert_eq!(value["total_emission"], 77.0);
        assert_eq!(value["unit_emission"], "kg CO2e");
        assert_eq!(value["equivalents"]["trees_needed"], 4);
        assert_eq!(value["manual_entry"], true);
    }

    #[test]
    fn test_analysis_reads_back_from_stored_json() {
        let original = sample_analysis();
        let stored = serde_json::to_string(&original).unwrap();
        let restored: RecordAnalysis = serde_json::from_str(&stored).unwrap();
        assert_eq!(restored, original);
        assert_eq!(
            restored.calculation.equivalents,
            CarbonEquivalents {
                trees_needed: 4,
                car_miles: 321,
                smartphones_charged: 9625
            }
        );
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = EmissionRecord::new(
            Uuid::new_v4(),
            "manual://entry".into(),
            FileType::Manual,
            sample_analysis(),
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["fileType"], "manual");
        assert_eq!(value["fileUrl"], "manual://entry");
        assert!(value.get("createdAt").is_some());
        assert!(value.get("ownerId").is_some());
    }
}
