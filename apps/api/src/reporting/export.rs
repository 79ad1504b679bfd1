//! Downloadable projections: the date-filtered raw data export, and CSV
//! renderings of both the export and the sustainability report.
//!
//! CSV numbers go through `serde_json::Number` so they read exactly as the
//! JSON variant of the same download.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::carbon::round2;
use crate::errors::AppError;
use crate::extraction::FileType;
use crate::records::models::EmissionRecord;
use crate::reporting::aggregate::{
    category_breakdown, monthly_trend, total_carbon, CategoryTotal, MonthlyTotal,
};
use crate::reporting::report::SustainabilityReport;

const BOM: char = '\u{feff}';
const CO2E: &str = "kg CO₂e";

/// Inclusive `createdAt` bounds. A date-only end bound covers that whole day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    start_label: Option<String>,
    end_label: Option<String>,
}

impl DateRange {
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, AppError> {
        let start = start.map(str::trim).filter(|s| !s.is_empty());
        let end = end.map(str::trim).filter(|s| !s.is_empty());

        Ok(Self {
            start: start
                .map(|s| parse_bound(s, "startDate", false))
                .transpose()?,
            end: end
                .map(|s| parse_bound(s, "endDate", true))
                .transpose()?,
            start_label: start.map(str::to_string),
            end_label: end.map(str::to_string),
        })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| at >= s) && self.end.map_or(true, |e| at <= e)
    }
}

/// RFC 3339 timestamp, or `YYYY-MM-DD` at the start (or last instant) of that UTC day.
fn parse_bound(raw: &str, name: &str, end_of_day: bool) -> Result<DateTime<Utc>, AppError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let time = if end_of_day {
        NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    };
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .zip(time)
        .map(|(d, t)| d.and_time(t).and_utc())
        .ok_or_else(|| {
            AppError::Validation(format!(
                "Invalid {name} '{raw}'; expected YYYY-MM-DD or an RFC 3339 timestamp"
            ))
        })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataExport {
    pub metadata: ExportMetadata,
    pub summary: ExportSummary,
    pub records: Vec<ExportRow>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub exported_at: DateTime<Utc>,
    pub time_range: TimeRange,
    pub total_records: usize,
    pub export_type: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub total_carbon: f64,
    pub average_per_record: f64,
    pub category_breakdown: Vec<CategoryTotal>,
    pub monthly_breakdown: Vec<MonthlyTotal>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRow {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub date: String,
    pub category: String,
    pub quantity: f64,
    pub unit: String,
    pub carbon_emission: f64,
    pub source: String,
    pub file_type: FileType,
    pub advice: Vec<String>,
    pub manual_entry: bool,
}

impl From<&EmissionRecord> for ExportRow {
    fn from(record: &EmissionRecord) -> Self {
        let analysis = &record.analysis;
        Self {
            id: record.id,
            created_at: record.created_at,
            date: us_date(record.created_at),
            category: analysis.extraction.category.clone(),
            quantity: analysis.extraction.quantity,
            unit: analysis.extraction.unit.clone(),
            carbon_emission: analysis.total_emission(),
            source: analysis.extraction.source_text.clone(),
            file_type: record.file_type,
            advice: analysis.calculation.advice.clone(),
            manual_entry: analysis.extraction.manual_entry,
        }
    }
}

pub fn build_data_export(
    records: &[EmissionRecord],
    range: &DateRange,
) -> Result<DataExport, AppError> {
    build_data_export_at(records, range, Utc::now())
}

/// Keeps the records inside `range`, preserving their (newest-first) order.
pub fn build_data_export_at(
    records: &[EmissionRecord],
    range: &DateRange,
    now: DateTime<Utc>,
) -> Result<DataExport, AppError> {
    let selected: Vec<EmissionRecord> = records
        .iter()
        .filter(|r| range.contains(r.created_at))
        .cloned()
        .collect();

    if selected.is_empty() {
        return Err(AppError::Validation(
            "No data available for export".to_string(),
        ));
    }

    let total = total_carbon(&selected);
    Ok(DataExport {
        metadata: ExportMetadata {
            exported_at: now,
            time_range: TimeRange {
                start_date: range.start_label.clone().unwrap_or_else(|| "all".into()),
                end_date: range.end_label.clone().unwrap_or_else(|| "all".into()),
            },
            total_records: selected.len(),
            export_type: "raw_data",
        },
        summary: ExportSummary {
            total_carbon: round2(total),
            average_per_record: round2(total / selected.len() as f64),
            category_breakdown: category_breakdown(&selected),
            monthly_breakdown: monthly_trend(&selected),
        },
        records: selected.iter().map(ExportRow::from).collect(),
    })
}

pub fn data_export_filename(now: DateTime<Utc>, csv: bool) -> String {
    let day = now.format("%Y-%m-%d");
    if csv {
        format!("carbonkind-export-{day}.csv")
    } else {
        format!("carbonkind-data-{day}.json")
    }
}

pub fn report_filename(report: &SustainabilityReport, csv: bool) -> String {
    let ext = if csv { "csv" } else { "json" };
    format!("sustainability-report-{}.{ext}", report.report_id)
}

pub fn data_export_csv(export: &DataExport) -> String {
    let mut out = String::new();
    out.push(BOM);

    out.push_str("CARBONKIND EXPORT - RAW DATA\n");
    line(&mut out, format!("Exported on: {}", us_date(export.metadata.exported_at)));
    line(&mut out, format!("Total Records: {}", export.metadata.total_records));
    line(
        &mut out,
        format!(
            "Time Range: {} to {}\n",
            export.metadata.time_range.start_date, export.metadata.time_range.end_date
        ),
    );

    out.push_str("DETAILED RECORDS\n");
    line(
        &mut out,
        format!("Date,Category,Quantity,Unit,Carbon Emission ({CO2E}),Source,Type,File Type"),
    );
    for row in &export.records {
        let kind = if row.manual_entry {
            "Manual Entry"
        } else {
            "Document Upload"
        };
        line(
            &mut out,
            [
                quote(&row.date),
                quote(&row.category),
                num(row.quantity),
                quote(&row.unit),
                num(row.carbon_emission),
                quote(&row.source),
                kind.to_string(),
                quote(row.file_type.as_str()),
            ]
            .join(","),
        );
    }

    out.push_str("\n\nSUMMARY\n");
    line(&mut out, format!("Total Carbon Emission,{} {CO2E}", num(export.summary.total_carbon)));
    line(
        &mut out,
        format!("Average Per Record,{} {CO2E}", num(export.summary.average_per_record)),
    );
    line(&mut out, format!("Total Records,{}", export.metadata.total_records));

    out.push_str("\nCATEGORY BREAKDOWN\n");
    line(&mut out, format!("Category,Total Emission ({CO2E}),Percentage"));
    for item in &export.summary.category_breakdown {
        line(
            &mut out,
            format!("{},{},{}%", quote(&item.category), num(item.total), item.percentage),
        );
    }

    out.push_str("\nMONTHLY BREAKDOWN\n");
    line(&mut out, format!("Month,Total Emission ({CO2E})"));
    for item in &export.summary.monthly_breakdown {
        line(&mut out, format!("{},{}", quote(&item.month), num(item.total)));
    }

    out.push_str("\n\nDATA INTERPRETATION TIPS\n");
    out.push_str("Tip,Description\n");
    for (tip, description) in [
        (
            "Focus Areas",
            "Categories with highest percentages are your biggest opportunities for reduction",
        ),
        (
            "Trend Analysis",
            "Compare monthly totals to identify patterns and progress",
        ),
        (
            "Carbon Equivalents",
            "1,000 kg CO₂e = 1 metric ton. The average person emits 4-5 tons annually",
        ),
    ] {
        line(&mut out, format!("{},{}", quote(tip), quote(description)));
    }

    out
}

pub fn report_csv(report: &SustainabilityReport) -> String {
    let mut out = String::new();
    out.push(BOM);

    out.push_str("CARBONKIND SUSTAINABILITY REPORT\n");
    line(&mut out, format!("Report ID: {}", report.report_id));
    line(&mut out, format!("Generated: {}", us_date(report.generated_at)));
    line(
        &mut out,
        format!(
            "Period: {} to {}\n",
            us_date(report.period.start),
            us_date(report.period.end)
        ),
    );

    let summary = &report.executive_summary;
    out.push_str("EXECUTIVE SUMMARY\n");
    out.push_str("Metric,Value,Rating\n");
    line(&mut out, format!("Total Carbon Footprint,{} {CO2E},", num(summary.total_carbon_footprint)));
    line(&mut out, format!("Average Daily Emission,{} {CO2E},", num(summary.average_daily_emission)));
    line(&mut out, format!("Carbon Intensity,{} kg/record,", num(summary.carbon_intensity)));
    line(
        &mut out,
        format!(
            "Carbon Intensity Score,{}/10,{}",
            summary.carbon_intensity_score,
            summary.overall_rating.as_str()
        ),
    );
    line(&mut out, format!("Data Quality,{},\n", summary.data_quality.as_str()));

    let findings = &report.key_findings;
    out.push_str("KEY FINDINGS\n");
    out.push_str("Finding,Details\n");
    line(&mut out, format!("Primary Emission Source,{}", findings.primary_source));
    line(&mut out, format!("Contribution,{}%", findings.primary_contribution));
    line(&mut out, format!("Monthly Average,{} {CO2E}", num(findings.monthly_average)));
    line(&mut out, format!("Trend Analysis,{}", findings.trend));
    line(&mut out, format!("Comparison,{}\n", findings.comparison));

    out.push_str("TOP RECOMMENDATIONS\n");
    out.push_str("Priority,Recommendation\n");
    for (i, rec) in report.recommendations.iter().enumerate() {
        let priority = if i == 0 { "High" } else { "Medium" };
        line(&mut out, format!("{},{}", quote(priority), quote(rec)));
    }
    out.push('\n');

    out.push_str("CATEGORY BREAKDOWN\n");
    line(
        &mut out,
        format!("Category,Total ({CO2E}),Percentage,Impact Level,Suggestion"),
    );
    for item in &report.detailed_analysis.category_breakdown {
        line(
            &mut out,
            format!(
                "{},{},{}%,{},{}",
                quote(&item.category),
                num(item.total),
                item.percentage,
                item.impact.as_str(),
                quote(item.suggestion)
            ),
        );
    }
    out.push('\n');

    out.push_str("MONTHLY TRENDS\n");
    line(
        &mut out,
        format!("Month,Total ({CO2E}),Average Per Record,Records,Trend"),
    );
    for item in &report.detailed_analysis.monthly_trends {
        line(
            &mut out,
            format!(
                "{},{},{},{},{}",
                quote(&item.month),
                num(item.total),
                num(item.average),
                item.records,
                item.trend.as_str()
            ),
        );
    }
    out.push('\n');

    out.push_str("ACTION PLAN\n");
    out.push_str("Timeline,Action Item\n");
    let plan = &report.action_plan;
    for (timeline, actions) in [
        ("Immediate (0-30 days)", &plan.immediate_actions),
        ("Medium Term (1-6 months)", &plan.medium_term_goals),
        ("Long Term (6+ months)", &plan.long_term_vision),
    ] {
        for action in actions {
            line(&mut out, format!("{},{}", quote(timeline), quote(action)));
        }
    }

    out
}

fn line(out: &mut String, text: String) {
    out.push_str(&text);
    out.push('\n');
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Same text serde_json writes for the value.
fn num(value: f64) -> String {
    serde_json::Number::from_f64(value)
        .map(|n| n.to_string())
        .unwrap_or_else(|| "0".to_string())
}

/// `3/5/2024`
fn us_date(at: DateTime<Utc>) -> String {
    at.format("%-m/%-d/%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::fixtures::record_at;
    use crate::reporting::report::build_at;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn sample() -> Vec<EmissionRecord> {
        let mut quoted = record_at("food", 27.0, at(2024, 3, 31, 22));
        quoted.analysis.extraction.source_text = "Receipt: \"beef\", 1kg".into();
        vec![
            quoted,
            record_at("electricity", 77.0, at(2024, 3, 5, 9)),
            record_at("electricity", 10.5, at(2024, 2, 1, 0)),
        ]
    }

    #[test]
    fn test_date_range_parsing() {
        let range = DateRange::parse(Some("2024-03-01"), Some("2024-03-31")).unwrap();
        assert_eq!(range.start, Some(at(2024, 3, 1, 0)));
        assert!(range.contains(at(2024, 3, 31, 23)));
        assert!(!range.contains(at(2024, 4, 1, 0)));
        assert!(!range.contains(at(2024, 2, 29, 23)));

        let range = DateRange::parse(None, Some("2024-03-05T10:00:00Z")).unwrap();
        assert!(range.contains(at(2024, 3, 5, 10)));
        assert!(!range.contains(at(2024, 3, 5, 11)));

        assert!(DateRange::parse(Some("   "), None).unwrap().start.is_none());
        assert!(matches!(
            DateRange::parse(Some("last tuesday"), None),
            Err(AppError::Validation(m)) if m.contains("startDate")
        ));
    }

    #[test]
    fn test_data_export_filters_and_summarizes() {
        let range = DateRange::parse(Some("2024-03-01"), Some("2024-03-31")).unwrap();
        let export = build_data_export_at(&sample(), &range, at(2024, 4, 1, 0)).unwrap();

        assert_eq!(export.metadata.total_records, 2);
        assert_eq!(export.metadata.time_range.start_date, "2024-03-01");
        assert_eq!(export.summary.total_carbon, 104.0);
        assert_eq!(export.summary.average_per_record, 52.0);
        assert_eq!(export.summary.category_breakdown[0].category, "electricity");
        assert_eq!(export.summary.monthly_breakdown.len(), 1);
        assert_eq!(export.records[0].date, "3/31/2024");
        assert_eq!(export.records[0].file_type, FileType::Manual);
    }

    #[test]
    fn test_data_export_without_range_uses_all() {
        let export = build_data_export(&sample(), &DateRange::default()).unwrap();
        assert_eq!(export.metadata.time_range.end_date, "all");
        assert_eq!(export.metadata.total_records, 3);
        let months: Vec<&str> = export
            .summary
            .monthly_breakdown
            .iter()
            .map(|m| m.month.as_str())
            .collect();
        assert_eq!(months, vec!["Feb 2024", "Mar 2024"]);
    }

    #[test]
    fn test_empty_selection_is_rejected() {
        let range = DateRange::parse(Some("2030-01-01"), None).unwrap();
        let err = build_data_export(&sample(), &range).unwrap_err();
        assert!(matches!(err, AppError::Validation(m) if m == "No data available for export"));
    }

    #[test]
    fn test_data_export_csv_layout() {
        let export = build_data_export_at(&sample(), &DateRange::default(), at(2024, 4, 1, 0)).unwrap();
        let csv = data_export_csv(&export);

        assert!(csv.starts_with('\u{feff}'));
        let sections = [
            "CARBONKIND EXPORT - RAW DATA",
            "DETAILED RECORDS",
            "SUMMARY",
            "CATEGORY BREAKDOWN",
            "MONTHLY BREAKDOWN",
            "DATA INTERPRETATION TIPS",
        ];
        let mut last = 0;
        for section in sections {
            let pos = csv[last..]
                .find(&format!("{section}\n"))
                .unwrap_or_else(|| panic!("missing section {section}"));
            last += pos;
        }

        assert!(csv.contains("Time Range: all to all\n"));
        assert!(csv.contains(
            "\"3/31/2024\",\"food\",1.0,\"kg\",27.0,\"Receipt: \"\"beef\"\", 1kg\",Manual Entry,\"manual\"\n"
        ));
        assert!(csv.contains("Total Carbon Emission,114.5 kg CO₂e\n"));
        assert!(csv.contains("\"electricity\",87.5,76%\n"));
        assert!(csv.contains("\"Feb 2024\",10.5\n"));
    }

    #[test]
    fn test_csv_numbers_match_json() {
        let export = build_data_export(&sample(), &DateRange::default()).unwrap();
        let json = serde_json::to_value(&export).unwrap();
        let csv = data_export_csv(&export);
        let total = json["summary"]["totalCarbon"].to_string();
        assert!(csv.contains(&format!("Total Carbon Emission,{total} ")));
    }

    #[test]
    fn test_report_csv_layout() {
        let report = build_at(&sample(), at(2024, 4, 1, 0)).unwrap();
        let csv = report_csv(&report);

        assert!(csv.starts_with('\u{feff}'));
        for section in [
            "CARBONKIND SUSTAINABILITY REPORT",
            "EXECUTIVE SUMMARY",
            "KEY FINDINGS",
            "TOP RECOMMENDATIONS",
            "CATEGORY BREAKDOWN",
            "MONTHLY TRENDS",
            "ACTION PLAN",
        ] {
            assert!(csv.contains(&format!("{section}\n")), "missing {section}");
        }
        assert!(csv.contains(&format!("Report ID: {}\n", report.report_id)));
        assert!(csv.contains("Period: 2/1/2024 to 3/31/2024\n"));
        assert!(csv.contains("Primary Emission Source,electricity\n"));
        assert!(csv.contains("\"High\",\"Focus on reducing electricity emissions (76% of total)\"\n"));
        assert!(csv.contains("\"Immediate (0-30 days)\",\"Review electricity consumption patterns\"\n"));
        assert_eq!(csv.matches("\"Long Term (6+ months)\"").count(), 3);
    }

    #[test]
    fn test_filenames() {
        let now = at(2024, 4, 1, 0);
        assert_eq!(data_export_filename(now, true), "carbonkind-export-2024-04-01.csv");
        assert_eq!(data_export_filename(now, false), "carbonkind-data-2024-04-01.json");
        let report = build_at(&sample(), now).unwrap();
        assert!(report_filename(&report, true).ends_with(".csv"));
        assert!(report_filename(&report, false).starts_with("sustainability-report-CR-"));
    }
}
