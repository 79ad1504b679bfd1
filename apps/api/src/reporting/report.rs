//! Sustainability report: aggregates plus a 1-10 carbon intensity score
//! (lower is better) and templated advice built around the dominant category.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::carbon::round2;
use crate::errors::AppError;
use crate::records::models::EmissionRecord;
use crate::reporting::aggregate::{
    category_breakdown, month_buckets, total_carbon, MonthBucket,
};

pub const REPORT_VERSION: &str = "1.0";
const DAYS_PER_MONTH: f64 = 30.0;
const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Rating {
    Excellent,
    Good,
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
}

impl Rating {
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=3 => Rating::Excellent,
            4..=6 => Rating::Good,
            _ => Rating::NeedsImprovement,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Excellent => "Excellent",
            Rating::Good => "Good",
            Rating::NeedsImprovement => "Needs Improvement",
        }
    }
}

/// Also used as the per-category impact level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Level {
    High,
    Medium,
    Low,
}

impl Level {
    pub fn data_quality(record_count: usize) -> Self {
        match record_count {
            n if n >= 10 => Level::High,
            n if n >= 5 => Level::Medium,
            _ => Level::Low,
        }
    }

    pub fn impact(category_total: f64, grand_total: f64) -> Self {
        if category_total > grand_total * 0.3 {
            Level::High
        } else if category_total > grand_total * 0.15 {
            Level::Medium
        } else {
            Level::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::High => "High",
            Level::Medium => "Medium",
            Level::Low => "Low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MonthTrend {
    #[serde(rename = "Above Average")]
    AboveAverage,
    #[serde(rename = "Below Average")]
    BelowAverage,
}

impl MonthTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonthTrend::AboveAverage => "Above Average",
            MonthTrend::BelowAverage => "Below Average",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SustainabilityReport {
    pub report_id: String,
    pub generated_at: DateTime<Utc>,
    pub period: ReportPeriod,
    pub executive_summary: ExecutiveSummary,
    pub key_findings: KeyFindings,
    pub recommendations: Vec<String>,
    pub detailed_analysis: DetailedAnalysis,
    pub action_plan: ActionPlan,
    pub methodology: Methodology,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub days: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutiveSummary {
    pub total_carbon_footprint: f64,
    pub average_daily_emission: f64,
    /// kg CO₂e per record.
    pub carbon_intensity: f64,
    pub carbon_intensity_score: u8,
    pub data_quality: Level,
    pub overall_rating: Rating,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyFindings {
    pub primary_source: String,
    pub primary_contribution: i64,
    pub monthly_average: f64,
    pub trend: String,
    pub comparison: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedAnalysis {
    pub category_breakdown: Vec<CategoryAnalysis>,
    pub monthly_trends: Vec<MonthAnalysis>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryAnalysis {
    pub category: String,
    pub total: f64,
    pub percentage: i64,
    pub impact: Level,
    pub suggestion: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthAnalysis {
    pub month: String,
    pub total: f64,
    pub average: f64,
    pub records: usize,
    pub trend: MonthTrend,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionPlan {
    pub immediate_actions: Vec<String>,
    pub medium_term_goals: Vec<String>,
    pub long_term_vision: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Methodology {
    pub calculation_standard: &'static str,
    pub emission_factors: &'static str,
    pub data_sources: &'static str,
    pub report_version: &'static str,
    pub last_updated: DateTime<Utc>,
}

pub fn category_suggestion(category: &str) -> &'static str {
    match category {
        "electricity" => "Switch to LED bulbs and use smart power strips",
        "transportation" => "Consider public transit or carpooling 2 days/week",
        "food" => "Incorporate 1-2 plant-based meals per week",
        "home" => "Improve insulation and use programmable thermostat",
        "waste" => "Increase recycling and composting efforts",
        _ => "Review consumption patterns and identify reduction opportunities",
    }
}

/// `clamp(round(total / records / 10), 1, 10)`.
pub fn intensity_score(total: f64, record_count: usize) -> u8 {
    if record_count == 0 {
        return 1;
    }
    (total / record_count as f64 / 10.0).round().clamp(1.0, 10.0) as u8
}

pub fn build_sustainability_report(
    records: &[EmissionRecord],
) -> Result<SustainabilityReport, AppError> {
    build_at(records, Utc::now())
}

pub fn build_at(
    records: &[EmissionRecord],
    now: DateTime<Utc>,
) -> Result<SustainabilityReport, AppError> {
    let (Some(start), Some(end)) = (
        records.iter().map(|r| r.created_at).min(),
        records.iter().map(|r| r.created_at).max(),
    ) else {
        return Err(AppError::Validation(
            "No data available for report generation".to_string(),
        ));
    };

    let total = total_carbon(records);
    let count = records.len();
    let breakdown = category_breakdown(records);
    let months = month_buckets(records);
    let monthly_average = total / months.len() as f64;
    let score = intensity_score(total, count);

    // breakdown is non-empty whenever records is.
    let (primary_source, primary_contribution) = breakdown
        .first()
        .map(|c| (c.category.clone(), c.percentage))
        .unwrap_or_default();

    let executive_summary = ExecutiveSummary {
        total_carbon_footprint: round2(total),
        average_daily_emission: round2(total / (months.len() as f64 * DAYS_PER_MONTH)),
        carbon_intensity: round2(total / count as f64),
        carbon_intensity_score: score,
        data_quality: Level::data_quality(count),
        overall_rating: Rating::from_score(score),
    };

    let key_findings = KeyFindings {
        primary_source: primary_source.clone(),
        primary_contribution,
        monthly_average: round2(monthly_average),
        trend: if months.len() >= 2 {
            "Analyzing"
        } else {
            "Insufficient data"
        }
        .to_string(),
        comparison: format!(
            "Your footprint is {} average for similar users",
            if score <= 5 { "below" } else { "above" }
        ),
    };

    let recommendations = vec![
        format!("Focus on reducing {primary_source} emissions ({primary_contribution}% of total)"),
        "Consider implementing energy-efficient practices".to_string(),
        "Explore carbon offset options for unavoidable emissions".to_string(),
        format!(
            "Track more consistently to {}",
            if count < 10 {
                "improve data quality"
            } else {
                "identify trends"
            }
        ),
    ];

    let detailed_analysis = DetailedAnalysis {
        category_breakdown: breakdown
            .iter()
            .map(|c| CategoryAnalysis {
                category: c.category.clone(),
                total: c.total,
                percentage: c.percentage,
                impact: Level::impact(c.raw_total, total),
                suggestion: category_suggestion(&c.category),
            })
            .collect(),
        monthly_trends: months
            .iter()
            .map(|m| month_analysis(m, monthly_average))
            .collect(),
    };

    let action_plan = ActionPlan {
        immediate_actions: vec![
            format!("Review {primary_source} consumption patterns"),
            "Set a 10% reduction target for next month".to_string(),
            "Document all major emission sources".to_string(),
        ],
        medium_term_goals: strings(&[
            "Implement at least 2 efficiency improvements",
            "Establish baseline for future comparisons",
            "Explore renewable energy options",
        ]),
        long_term_vision: strings(&[
            "Achieve carbon neutrality in key areas",
            "Develop comprehensive sustainability strategy",
            "Become a sustainability leader in your community",
        ]),
    };

    Ok(SustainabilityReport {
        report_id: format!("CR-{}", now.timestamp_millis()),
        generated_at: now,
        period: ReportPeriod {
            start,
            end,
            days: ceil_days((end - start).num_milliseconds()),
        },
        executive_summary,
        key_findings,
        recommendations,
        detailed_analysis,
        action_plan,
        methodology: Methodology {
            calculation_standard: "CarbonKind Enhanced Calculator",
            emission_factors: "Based on IPCC and EPA standards",
            data_sources: "User-provided documents and manual entries",
            report_version: REPORT_VERSION,
            last_updated: now,
        },
    })
}

fn month_analysis(bucket: &MonthBucket, monthly_average: f64) -> MonthAnalysis {
    MonthAnalysis {
        month: bucket.label("%B %Y"),
        total: round2(bucket.total),
        average: round2(bucket.total / bucket.count as f64),
        records: bucket.count,
        trend: if bucket.total > monthly_average {
            MonthTrend::AboveAverage
        } else {
            MonthTrend::BelowAverage
        },
    }
}

fn ceil_days(millis: i64) -> i64 {
    (millis + MS_PER_DAY - 1).div_euclid(MS_PER_DAY)
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::fixtures::record_at;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_records_is_an_error() {
        let err = build_sustainability_report(&[]).unwrap_err();
        assert!(matches!(err, AppError::Validation(m) if m.contains("No data available")));
    }

    #[test]
    fn test_intensity_score_and_rating_bands() {
        assert_eq!(intensity_score(0.0, 3), 1);
        assert_eq!(intensity_score(77.0, 1), 8);
        assert_eq!(intensity_score(5000.0, 1), 10);
        assert_eq!(intensity_score(35.0, 1), 4);
        assert_eq!(Rating::from_score(3), Rating::Excellent);
        assert_eq!(Rating::from_score(6), Rating::Good);
        assert_eq!(Rating::from_score(7), Rating::NeedsImprovement);
    }

    #[test]
    fn test_data_quality_and_impact() {
        assert_eq!(Level::data_quality(10), Level::High);
        assert_eq!(Level::data_quality(5), Level::Medium);
        assert_eq!(Level::data_quality(4), Level::Low);
        assert_eq!(Level::impact(31.0, 100.0), Level::High);
        assert_eq!(Level::impact(30.0, 100.0), Level::Medium);
        assert_eq!(Level::impact(15.0, 100.0), Level::Low);
    }

    #[test]
    fn test_single_month_report() {
        let now = at(2024, 3, 31, 0);
        let records = vec![
            record_at("electricity", 77.0, at(2024, 3, 10, 8)),
            record_at("food", 23.0, at(2024, 3, 12, 9)),
        ];
        let report = build_at(&records, now).unwrap();

        assert_eq!(report.report_id, format!("CR-{}", now.timestamp_millis()));
        assert_eq!(report.period.start, at(2024, 3, 10, 8));
        assert_eq!(report.period.end, at(2024, 3, 12, 9));
        // 2 days 1 hour rounds up.
        assert_eq!(report.period.days, 3);

        let summary = &report.executive_summary;
        assert_eq!(summary.total_carbon_footprint, 100.0);
        assert_eq!(summary.average_daily_emission, 3.33);
        assert_eq!(summary.carbon_intensity, 50.0);
        assert_eq!(summary.carbon_intensity_score, 5);
        assert_eq!(summary.overall_rating, Rating::Good);
        assert_eq!(summary.data_quality, Level::Low);

        let findings = &report.key_findings;
        assert_eq!(findings.primary_source, "electricity");
        assert_eq!(findings.primary_contribution, 77);
        assert_eq!(findings.monthly_average, 100.0);
        assert_eq!(findings.trend, "Insufficient data");
        assert!(findings.comparison.contains("below"));

        assert_eq!(report.recommendations.len(), 4);
        assert_eq!(
            report.recommendations[0],
            "Focus on reducing electricity emissions (77% of total)"
        );
        assert_eq!(
            report.action_plan.immediate_actions[0],
            "Review electricity consumption patterns"
        );

        let categories = &report.detailed_analysis.category_breakdown;
        assert_eq!(categories[0].impact, Level::High);
        assert_eq!(categories[1].impact, Level::Medium);
        assert_eq!(
            categories[1].suggestion,
            "Incorporate 1-2 plant-based meals per week"
        );

        let month = &report.detailed_analysis.monthly_trends[0];
        assert_eq!(month.month, "March 2024");
        assert_eq!(month.records, 2);
        assert_eq!(month.average, 50.0);
        assert_eq!(month.trend, MonthTrend::BelowAverage);
    }

    #[test]
    fn test_impact_uses_unrounded_category_totals() {
        let records = vec![
            record_at("electricity", 30.004, at(2024, 4, 1, 0)),
            record_at("food", 70.0, at(2024, 4, 2, 0)),
        ];
        let report = build_at(&records, at(2024, 4, 3, 0)).unwrap();
        let categories = &report.detailed_analysis.category_breakdown;
        assert_eq!(categories[1].category, "electricity");
        assert_eq!(categories[1].total, 30.0);
        assert_eq!(categories[1].impact, Level::High);
    }

    #[test]
    fn test_multi_month_trends() {
        let records = vec![
            record_at("transportation", 90.0, at(2024, 2, 1, 0)),
            record_at("transportation", 10.0, at(2024, 1, 1, 0)),
        ];
        let report = build_at(&records, at(2024, 2, 2, 0)).unwrap();
        assert_eq!(report.key_findings.trend, "Analyzing");
        assert_eq!(report.key_findings.monthly_average, 50.0);

        let trends = &report.detailed_analysis.monthly_trends;
        assert_eq!(trends[0].month, "January 2024");
        assert_eq!(trends[0].trend, MonthTrend::BelowAverage);
        assert_eq!(trends[1].trend, MonthTrend::AboveAverage);
        assert_eq!(report.period.days, 31);
    }

    #[test]
    fn test_report_serializes_camel_case_labels() {
        let records = vec![record_at("home", 500.0, at(2024, 5, 5, 5))];
        let value = serde_json::to_value(build_at(&records, at(2024, 5, 6, 0)).unwrap()).unwrap();
        assert_eq!(
            value["executiveSummary"]["overallRating"],
            "Needs Improvement"
        );
        assert_eq!(value["executiveSummary"]["dataQuality"], "Low");
        assert_eq!(
            value["detailedAnalysis"]["monthlyTrends"][0]["trend"],
            "Below Average"
        );
        assert_eq!(value["methodology"]["reportVersion"], "1.0");
        assert_eq!(value["period"]["days"], 0);
    }
}
