use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::extraction::{FileType, UploadedFile};
use crate::records::models::{EmissionRecord, RecordAnalysis};
use crate::records::pipeline::ManualEntryRequest;
use crate::reporting::{summarize, Summary};
use crate::state::AppState;

const UPLOAD_FIELD: &str = "file";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub record_id: Uuid,
    pub file_url: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub data: RecordAnalysis,
    pub calculated_carbon: f64,
    pub persisted: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordView {
    pub id: Uuid,
    pub analysis: RecordAnalysis,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EmissionRecord> for RecordView {
    fn from(record: EmissionRecord) -> Self {
        Self {
            id: record.id,
            analysis: record.analysis,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryResponse {
    pub success: bool,
    pub message: String,
    pub calculated_carbon: f64,
    pub persisted: bool,
    pub record: RecordView,
}

#[derive(Serialize)]
pub struct ListResponse {
    pub success: bool,
    pub records: Vec<EmissionRecord>,
    pub summary: Summary,
}

#[derive(Serialize)]
pub struct DeletedRecord {
    pub id: Uuid,
    pub category: String,
    pub carbon: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
    pub deleted_record: DeletedRecord,
}

/// POST /ai/generate
pub async fn handle_upload(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let file = read_upload(multipart)
        .await?
        .ok_or_else(|| AppError::Validation("No file uploaded".to_string()))?;

    let outcome = state.pipeline.process_upload(owner_id, file).await?;
    let record = outcome.record;
    Ok(Json(UploadResponse {
        success: true,
        record_id: record.id,
        file_url: record.file_url,
        file_type: record.file_type,
        calculated_carbon: record.analysis.total_emission(),
        data: record.analysis,
        persisted: outcome.persisted,
    }))
}

/// POST /ai/manual-entry
pub async fn handle_manual_entry(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Json(req): Json<ManualEntryRequest>,
) -> Result<Json<EntryResponse>, AppError> {
    let outcome = state.pipeline.process_manual(owner_id, &req).await?;
    Ok(Json(EntryResponse {
        success: true,
        message: "Manual entry added successfully".to_string(),
        calculated_carbon: outcome.record.analysis.total_emission(),
        persisted: outcome.persisted,
        record: outcome.record.into(),
    }))
}

/// PUT /ai/record/:id
pub async fn handle_update(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<ManualEntryRequest>,
) -> Result<Json<EntryResponse>, AppError> {
    let record_id = parse_record_id(&id)?;
    let outcome = state
        .pipeline
        .update_entry(owner_id, record_id, &req)
        .await?;
    Ok(Json(EntryResponse {
        success: true,
        message: "Record updated successfully".to_string(),
        calculated_carbon: outcome.record.analysis.total_emission(),
        persisted: outcome.persisted,
        record: outcome.record.into(),
    }))
}

/// GET /ai/user-emissions
pub async fn handle_list(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
) -> Result<Json<ListResponse>, AppError> {
    let records = state.pipeline.list(owner_id).await?;
    let summary = summarize(&records);
    Ok(Json(ListResponse {
        success: true,
        records,
        summary,
    }))
}

/// DELETE /ai/record/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let record_id = parse_record_id(&id)?;
    let deleted = state.pipeline.delete(owner_id, record_id).await?;
    Ok(Json(DeleteResponse {
        success: true,
        message: "Record deleted successfully".to_string(),
        deleted_record: DeletedRecord {
            id: deleted.id,
            category: deleted.analysis.category().to_string(),
            carbon: deleted.analysis.total_emission(),
        },
    }))
}

/// A malformed id can't name a record the caller owns.
fn parse_record_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw)
        .map_err(|_| AppError::NotFound(format!("Record {raw} not found")))
}

/// First multipart field named `file`, or `None` if the form has none.
async fn read_upload(mut multipart: Multipart) -> Result<Option<UploadedFile>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes: Bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read uploaded file: {e}")))?;

        return Ok(Some(UploadedFile {
            file_name,
            content_type,
            bytes,
        }));
    }
    Ok(None)
}
