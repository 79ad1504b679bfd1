//! Record Pipeline: input → analysis → calculation → owned record.
//!
//! Each request walks `Received → Analyzed → Calculated → Persisted`, or stops
//! at `Rejected`. Persisting is best-effort: a store failure after a successful
//! calculation is logged and the result is still returned to the caller.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::carbon::{CarbonCalculator, Category};
use crate::errors::AppError;
use crate::extraction::models::parse_quantity;
use crate::extraction::{Analysis, Extraction, ExtractionAdapter, FileType, UploadedFile};
use crate::records::archive::UploadArchive;
use crate::records::models::{EmissionRecord, RecordAnalysis};
use crate::records::store::RecordStore;

pub const CALCULATED_WITH: &str = "CarbonKind Calculator";
pub const MANUAL_CALCULATED_WITH: &str = "CarbonKind Manual Entry";

const TEXT_UPLOAD_URL: &str = "text://direct-upload";
const FILE_UPLOAD_URL: &str = "file://uploaded";
const MANUAL_ENTRY_URL: &str = "manual://entry";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Analyzed,
    Calculated,
    Persisted,
    Rejected,
}

/// Body of a manual entry or record edit. Every field is optional at the
/// wire level so missing input surfaces as a validation error, not a parse error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManualEntryRequest {
    #[serde(rename = "type")]
    pub category: Option<String>,
    pub value: Option<Value>,
    pub subtype: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedEntry {
    pub category: Category,
    pub quantity: f64,
    pub subtype: String,
    pub description: Option<String>,
}

impl ManualEntryRequest {
    pub fn validate(&self) -> Result<ValidatedEntry, AppError> {
        let category = non_blank(&self.category);
        let subtype = non_blank(&self.subtype);
        let value = self.value.as_ref().filter(|v| !v.is_null());

        let (Some(category), Some(subtype), Some(value)) = (category, subtype, value) else {
            return Err(AppError::Validation(
                "Missing required fields: type, value, subtype".to_string(),
            ));
        };

        let quantity = parse_quantity(value)
            .ok_or_else(|| AppError::Validation("Value must be a positive number".to_string()))?;

        let category = Category::parse(category).ok_or_else(|| {
            let known: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
            AppError::Validation(format!(
                "Unknown emission type '{category}'; expected one of: {}",
                known.join(", ")
            ))
        })?;

        Ok(ValidatedEntry {
            category,
            quantity,
            subtype: subtype.to_string(),
            description: non_blank(&self.description).map(str::to_string),
        })
    }
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Result handed back to the caller regardless of whether the write landed.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub record: EmissionRecord,
    pub persisted: bool,
}

#[derive(Clone)]
pub struct RecordPipeline {
    store: Arc<dyn RecordStore>,
    adapter: ExtractionAdapter,
    calculator: CarbonCalculator,
    archive: Option<UploadArchive>,
}

impl RecordPipeline {
    pub fn new(
        store: Arc<dyn RecordStore>,
        adapter: ExtractionAdapter,
        calculator: CarbonCalculator,
        archive: Option<UploadArchive>,
    ) -> Self {
        Self {
            store,
            adapter,
            calculator,
            archive,
        }
    }

    pub fn ai_model(&self) -> Option<&str> {
        self.adapter.model_name()
    }

    /// Upload path: the adapter decides what the file contains.
    pub async fn process_upload(
        &self,
        owner_id: Uuid,
        file: UploadedFile,
    ) -> Result<PipelineOutcome, AppError> {
        trace_stage(Stage::Received, owner_id);
        if file.bytes.is_empty() {
            trace_stage(Stage::Rejected, owner_id);
            return Err(AppError::Validation("Uploaded file is empty".to_string()));
        }

        let file_type = file.file_type();
        info!(
            "Processing upload {} ({}, {} bytes) for {owner_id}",
            file.file_name,
            file_type,
            file.bytes.len()
        );

        let extraction = self.accept(owner_id, self.adapter.analyze_upload(&file).await)?;
        let analysis = self.calculate(owner_id, extraction, CALCULATED_WITH)?;
        let file_url = self.file_url(owner_id, &file, file_type).await;

        let record = EmissionRecord::new(owner_id, file_url, file_type, analysis);
        let persisted = self.persist(&record).await;
        Ok(PipelineOutcome { record, persisted })
    }

    /// Manual path: validated fields become the analysis directly; no adapter involved.
    pub async fn process_manual(
        &self,
        owner_id: Uuid,
        request: &ManualEntryRequest,
    ) -> Result<PipelineOutcome, AppError> {
        trace_stage(Stage::Received, owner_id);
        let entry = request.validate().inspect_err(|_| trace_stage(Stage::Rejected, owner_id))?;

        let extraction = self.manual_extraction(&entry, "Manual entry");
        trace_stage(Stage::Analyzed, owner_id);
        let analysis = self.calculate(owner_id, extraction, MANUAL_CALCULATED_WITH)?;

        let record = EmissionRecord::new(
            owner_id,
            MANUAL_ENTRY_URL.to_string(),
            FileType::Manual,
            analysis,
        );
        let persisted = self.persist(&record).await;
        Ok(PipelineOutcome { record, persisted })
    }

    /// Re-runs calculation for an existing record the caller owns.
    pub async fn update_entry(
        &self,
        owner_id: Uuid,
        record_id: Uuid,
        request: &ManualEntryRequest,
    ) -> Result<PipelineOutcome, AppError> {
        trace_stage(Stage::Received, owner_id);
        let entry = request.validate().inspect_err(|_| trace_stage(Stage::Rejected, owner_id))?;

        let mut record = self
            .store
            .find_one_by_id_and_owner(record_id, owner_id)
            .await
            .map_err(AppError::Internal)?
            .ok_or_else(|| {
                trace_stage(Stage::Rejected, owner_id);
                not_owned(record_id, "edit")
            })?;

        let extraction = self.manual_extraction(&entry, "Updated entry");
        trace_stage(Stage::Analyzed, owner_id);
        record.analysis = self.calculate(owner_id, extraction, CALCULATED_WITH)?;
        record.updated_at = Utc::now();

        let persisted = match self.store.save(&record).await {
            Ok(true) => {
                trace_stage(Stage::Persisted, owner_id);
                true
            }
            Ok(false) => {
                trace_stage(Stage::Rejected, owner_id);
                return Err(not_owned(record_id, "edit"));
            }
            Err(e) => {
                error!("Failed to save updated record {record_id}: {e:?}");
                false
            }
        };

        Ok(PipelineOutcome { record, persisted })
    }

    pub async fn list(&self, owner_id: Uuid) -> Result<Vec<EmissionRecord>, AppError> {
        self.store
            .find_by_owner(owner_id)
            .await
            .map_err(AppError::Internal)
    }

    pub async fn delete(&self, owner_id: Uuid, record_id: Uuid) -> Result<EmissionRecord, AppError> {
        let deleted = self
            .store
            .delete_one_by_id_and_owner(record_id, owner_id)
            .await
            .map_err(AppError::Internal)?
            .ok_or_else(|| not_owned(record_id, "delete"))?;
        info!("Deleted record {record_id} for {owner_id}");
        Ok(deleted)
    }

    fn accept(&self, owner_id: Uuid, analysis: Analysis) -> Result<Extraction, AppError> {
        match analysis {
            Analysis::Relevant(extraction) => {
                trace_stage(Stage::Analyzed, owner_id);
                Ok(extraction)
            }
            Analysis::NotRelevant {
                reason,
                suggested_files,
                ..
            } => {
                trace_stage(Stage::Rejected, owner_id);
                Err(AppError::NotRelevant {
                    message: reason,
                    suggested_files,
                })
            }
        }
    }

    fn manual_extraction(&self, entry: &ValidatedEntry, label: &str) -> Extraction {
        let row = self
            .calculator
            .factors()
            .resolve(entry.category, Some(&entry.subtype));
        let source_text = entry.description.clone().unwrap_or_else(|| {
            format!(
                "{label}: {} {} {}",
                entry.quantity, row.unit, entry.category
            )
        });

        Extraction {
            category: entry.category.as_str().to_string(),
            quantity: entry.quantity,
            unit: row.unit.to_string(),
            subtype: Some(row.subtype.to_string()),
            source_text,
            confidence: None,
            manual_entry: true,
        }
    }

    fn calculate(
        &self,
        owner_id: Uuid,
        extraction: Extraction,
        calculated_with: &str,
    ) -> Result<RecordAnalysis, AppError> {
        let calculation = self
            .calculator
            .evaluate(
                &extraction.category,
                extraction.quantity,
                extraction.subtype.as_deref(),
            )
            .ok_or_else(|| {
                trace_stage(Stage::Rejected, owner_id);
                if Category::parse(&extraction.category).is_some() {
                    AppError::Validation(format!(
                        "Value {} is too large to calculate",
                        extraction.quantity
                    ))
                } else {
                    AppError::Validation(format!(
                        "Unrecognised emission category '{}'",
                        extraction.category
                    ))
                }
            })?;

        trace_stage(Stage::Calculated, owner_id);
        debug!(
            "Calculated {} {} for {} {} {}",
            calculation.total_emission,
            calculation.unit_emission,
            extraction.quantity,
            extraction.unit,
            extraction.category
        );
        Ok(RecordAnalysis::new(extraction, calculation, calculated_with))
    }

    async fn file_url(&self, owner_id: Uuid, file: &UploadedFile, file_type: FileType) -> String {
        if let Some(archive) = &self.archive {
            match archive.store(owner_id, file).await {
                Ok(url) => return url,
                Err(e) => warn!("Could not archive {}: {e:?}", file.file_name),
            }
        }
        match file_type {
            FileType::Text => TEXT_UPLOAD_URL.to_string(),
            _ => FILE_UPLOAD_URL.to_string(),
        }
    }

    async fn persist(&self, record: &EmissionRecord) -> bool {
        match self.store.create(record).await {
            Ok(()) => {
                trace_stage(Stage::Persisted, record.owner_id);
                true
            }
            Err(e) => {
                error!("Failed to persist record {}: {e:?}", record.id);
                false
            }
        }
    }
}

fn not_owned(record_id: Uuid, action: &str) -> AppError {
    AppError::NotFound(format!(
        "Record {record_id} not found or you don't have permission to {action} it"
    ))
}

fn trace_stage(stage: Stage, owner_id: Uuid) {
    debug!(?stage, %owner_id, "pipeline stage");
}
