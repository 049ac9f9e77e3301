//! Offline summary report for one year.

mod generator;

pub use generator::{generate_json_report, generate_markdown_report, write_report};

use crate::engine::{EngineError, StatsEngine};
use crate::models::{HighRiskAreas, MonthlySeries, StatsOverview};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Everything the report renders, gathered from the engine.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearReport {
    pub year: i32,
    pub generated_at: DateTime<Utc>,
    /// Data file the numbers were read from.
    pub data_file: String,
    pub total_records: usize,
    pub overview: StatsOverview,
    pub high_risk: HighRiskAreas,
    pub monthly: MonthlySeries,
}

/// Collect a [`YearReport`]. `year` falls back like any API query.
pub fn build_report(
    engine: &StatsEngine,
    year: Option<i32>,
    high_risk_limit: usize,
    data_file: &str,
    total_records: usize,
) -> Result<YearReport, EngineError> {
    let overview = engine.overview(year)?;
    let year = overview.summary.data_year;
    let high_risk = engine.high_risk_areas(Some(year), high_risk_limit)?;
    let (_, monthly) = engine.monthly_distribution(Some(year))?;

    Ok(YearReport {
        year,
        generated_at: Utc::now(),
        data_file: data_file.to_string(),
        total_records,
        overview,
        high_risk,
        monthly,
    })
}
