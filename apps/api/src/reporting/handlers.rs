use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::reporting::export::{
    build_data_export, data_export_csv, data_export_filename, report_csv, report_filename,
    DateRange,
};
use crate::reporting::report::build_sustainability_report;
use crate::state::AppState;

const JSON_CONTENT_TYPE: &str = "application/json";
const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn parse(raw: Option<&str>) -> Result<Self, AppError> {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("json") => Ok(ExportFormat::Json),
            Some("csv") => Ok(ExportFormat::Csv),
            Some(other) => Err(AppError::Validation(format!(
                "Unsupported format '{other}'; use json or csv"
            ))),
        }
    }

    fn is_csv(&self) -> bool {
        matches!(self, ExportFormat::Csv)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportQuery {
    pub format: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub format: Option<String>,
}

/// GET /export/export
pub async fn handle_export(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Query(params): Query<ExportQuery>,
) -> Result<Response, AppError> {
    let format = ExportFormat::parse(params.format.as_deref())?;
    let range = DateRange::parse(params.start_date.as_deref(), params.end_date.as_deref())?;

    let records = state.pipeline.list(owner_id).await?;
    let export = build_data_export(&records, &range)?;
    info!(
        "Exporting {} records for {owner_id} as {format:?}",
        export.metadata.total_records
    );

    let filename = data_export_filename(export.metadata.exported_at, format.is_csv());
    let body = match format {
        ExportFormat::Csv => data_export_csv(&export),
        ExportFormat::Json => to_json(&export)?,
    };
    Ok(attachment(body, format, filename))
}

/// GET /export/sustainability-report
pub async fn handle_sustainability_report(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Query(params): Query<ReportQuery>,
) -> Result<Response, AppError> {
    let format = ExportFormat::parse(params.format.as_deref())?;

    let records = state.pipeline.list(owner_id).await?;
    let report = build_sustainability_report(&records)?;
    info!("Generated report {} for {owner_id}", report.report_id);

    let filename = report_filename(&report, format.is_csv());
    let body = match format {
        ExportFormat::Csv => report_csv(&report),
        ExportFormat::Json => to_json(&report)?,
    };
    Ok(attachment(body, format, filename))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string(value).map_err(|e| AppError::Internal(e.into()))
}

fn attachment(body: String, format: ExportFormat, filename: String) -> Response {
    let content_type = match format {
        ExportFormat::Csv => CSV_CONTENT_TYPE,
        ExportFormat::Json => JSON_CONTENT_TYPE,
    };
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}
