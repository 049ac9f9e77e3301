//! Data models for the dengue statistics service.
//!
//! This module contains the stored case record, the aggregate rows produced
//! by the analysis layer, and the payloads returned by the API and reports.

use crate::analysis::metrics::fatality_rate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A case record as supplied by the import process.
///
/// Derived fields are not part of this shape: anything a source sends for
/// `totalDeaths` or `caseFatalityRate` is ignored during deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCaseRecord {
    pub province_code: String,
    pub province_name: String,
    pub regency_code: String,
    pub regency_name: String,
    pub year: i32,
    pub total_cases: u64,
    pub male_deaths: u64,
    pub female_deaths: u64,
    /// Calendar month (1-12) when the source carries monthly granularity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
}

/// One province/regency/year row of dengue incidence and mortality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseRecord {
    pub province_code: String,
    pub province_name: String,
    pub regency_code: String,
    pub regency_name: String,
    pub year: i32,
    pub total_cases: u64,
    pub male_deaths: u64,
    pub female_deaths: u64,
    /// Always `male_deaths + female_deaths`.
    #[serde(default)]
    pub total_deaths: u64,
    /// Deaths per hundred cases, two decimals, zero when there are no cases.
    #[serde(default)]
    pub case_fatality_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CaseRecord {
    /// Build a stored record from import input, computing the derived fields.
    pub fn from_new(new: NewCaseRecord, now: DateTime<Utc>) -> Self {
        let mut record = Self {
            province_code: new.province_code,
            province_name: new.province_name,
            regency_code: new.regency_code,
            regency_name: new.regency_name,
            year: new.year,
            total_cases: new.total_cases,
            male_deaths: new.male_deaths,
            female_deaths: new.female_deaths,
            total_deaths: 0,
            case_fatality_rate: 0.0,
            month: new.month,
            created_at: now,
            updated_at: now,
        };
        record.rederive();
        record
    }

    /// Recompute `total_deaths` and `case_fatality_rate` from the raw counts.
    pub fn rederive(&mut self) {
        self.total_deaths = self.male_deaths + self.female_deaths;
        self.case_fatality_rate = fatality_rate(self.total_deaths, self.total_cases);
    }
}

/// Year-over-year change of the summed metrics.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trends {
    /// Percent change in cases, one decimal. Zero when there is no baseline.
    pub cases: f64,
    /// Percent change in deaths, one decimal. Zero when there is no baseline.
    pub deaths: f64,
    /// False when the previous year had no cases to compare against.
    pub has_cases_baseline: bool,
    /// False when the previous year had no deaths to compare against.
    pub has_deaths_baseline: bool,
}

/// Totals for a single year across every record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearSummary {
    pub total_cases: u64,
    pub total_deaths: u64,
    pub male_deaths: u64,
    pub female_deaths: u64,
    pub case_fatality_rate: f64,
    pub affected_provinces: usize,
    pub affected_regencies: usize,
    pub trends: Trends,
    pub data_year: i32,
}

/// Aggregate of all records belonging to one province.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvinceBreakdown {
    pub province_code: String,
    pub province_name: String,
    pub total_cases: u64,
    pub total_deaths: u64,
    pub male_deaths: u64,
    pub female_deaths: u64,
    pub case_fatality_rate: f64,
    pub affected_regencies: usize,
}

/// Aggregate of all records belonging to one regency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegencyBreakdown {
    pub regency_code: String,
    pub regency_name: String,
    pub province_name: String,
    pub total_cases: u64,
    pub total_deaths: u64,
    pub male_deaths: u64,
    pub female_deaths: u64,
    pub case_fatality_rate: f64,
}

/// One point of the multi-year series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyTrend {
    pub year: i32,
    pub total_cases: u64,
    pub total_deaths: u64,
    pub male_deaths: u64,
    pub female_deaths: u64,
    pub case_fatality_rate: f64,
    pub affected_provinces: usize,
}

/// Cases and deaths attributed to one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPoint {
    /// 1-12.
    pub month: u32,
    pub label: String,
    pub cases: u64,
    pub deaths: u64,
    pub fatality_rate: f64,
}

/// A monthly series, tagged by where its numbers come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", content = "points", rename_all = "lowercase")]
pub enum MonthlySeries {
    /// Grouped from records that carry a real month.
    Measured(Vec<MonthlyPoint>),
    /// Spread from a yearly total with the seasonal weights.
    Estimated(Vec<MonthlyPoint>),
}

impl MonthlySeries {
    pub fn points(&self) -> &[MonthlyPoint] {
        match self {
            MonthlySeries::Measured(points) | MonthlySeries::Estimated(points) => points,
        }
    }

    pub fn is_estimated(&self) -> bool {
        matches!(self, MonthlySeries::Estimated(_))
    }
}

impl fmt::Display for MonthlySeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonthlySeries::Measured(_) => write!(f, "measured"),
            MonthlySeries::Estimated(_) => write!(f, "estimated"),
        }
    }
}

/// Grouping mode for the area breakdown endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AreaView {
    #[default]
    Province,
    Regency,
}

impl std::str::FromStr for AreaView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "province" => Ok(AreaView::Province),
            "regency" => Ok(AreaView::Regency),
            other => Err(format!(
                "unknown view '{}', expected 'province' or 'regency'",
                other
            )),
        }
    }
}

/// Summary payload: year totals plus the leading provinces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsOverview {
    pub summary: YearSummary,
    pub top_provinces: Vec<ProvinceBreakdown>,
}

/// Every record of one year plus its monthly shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CasesByYear {
    pub year: i32,
    pub total_records: usize,
    pub cases: Vec<CaseRecord>,
    pub monthly_trend: MonthlySeries,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvinceView {
    pub province_data: Vec<ProvinceBreakdown>,
    pub data_year: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegencyView {
    pub regency_data: Vec<RegencyBreakdown>,
    pub data_year: i32,
}

/// Area breakdown in either grouping mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "lowercase")]
pub enum AreaBreakdown {
    Province(ProvinceView),
    Regency(RegencyView),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSeries {
    pub trends: Vec<YearlyTrend>,
    /// `"<start>-<end>"`, inclusive.
    pub period: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighRiskAreas {
    pub high_risk_areas: Vec<RegencyBreakdown>,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseDetails {
    pub case_details: Vec<CaseRecord>,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaChartPoint {
    pub year: String,
    pub cases: u64,
    pub deaths: u64,
    pub fatality_rate: f64,
}

/// Everything the dashboard charts need in one payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub yearly_trends: Vec<YearlyTrend>,
    pub top_regencies: Vec<RegencyBreakdown>,
    pub area_chart_data: Vec<AreaChartPoint>,
    pub monthly_distribution: MonthlySeries,
    pub total_years: usize,
}
