//! Aggregation engine.
//!
//! Each public method serves one API operation: it resolves the query year,
//! reads the matching rows from the store and hands them to the pure
//! functions in [`crate::analysis`]. The engine never writes.

use crate::analysis::metrics::percent_change;
use crate::analysis::seasonal::estimate_monthly;
use crate::analysis::{self, Totals};
use crate::config::QueryConfig;
use crate::models::{
    AreaBreakdown, AreaChartPoint, AreaView, CaseDetails, CaseRecord, CasesByYear, ChartData,
    HighRiskAreas, MonthlySeries, ProvinceView, RegencyView, StatsOverview, TrendSeries, Trends,
    YearSummary,
};
use crate::store::{CaseFilter, CaseStore, StoreError};
use crate::year::{CalendarClock, YearResolver};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors surfaced by engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    NotFound(String),

    #[error("invalid {field}: {detail}")]
    Invalid { field: &'static str, detail: String },
}

/// Year window for the multi-year series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrendWindow {
    /// Number of years before the end year. Defaults to the configured window.
    pub years: Option<u32>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
}

/// Read-only statistics over a case store.
#[derive(Clone)]
pub struct StatsEngine {
    store: Arc<dyn CaseStore>,
    years: YearResolver,
    limits: QueryConfig,
}

impl StatsEngine {
    pub fn new(store: Arc<dyn CaseStore>, clock: Arc<dyn CalendarClock>, limits: QueryConfig) -> Self {
        let years = YearResolver::new(store.clone(), clock);
        Self {
            store,
            years,
            limits,
        }
    }

    /// Configured defaults and caps.
    pub fn limits(&self) -> &QueryConfig {
        &self.limits
    }

    /// Totals, fatality rate and year-over-year trends for one year, plus the
    /// provinces with the most cases.
    pub fn overview(&self, year: Option<i32>) -> Result<StatsOverview, EngineError> {
        let year = self.years.resolve(year)?;
        debug!("Summarising {}", year);

        let current = self.store.find(&CaseFilter::year(year))?;
        // No year precedes i32::MIN, so it has no baseline.
        let previous = match year.checked_sub(1) {
            Some(previous_year) => {
                analysis::sum_totals(&self.store.find(&CaseFilter::year(previous_year))?)
            }
            None => Totals::default(),
        };
        let totals = analysis::summarize(&current);

        let summary = YearSummary {
            total_cases: totals.totals.cases,
            total_deaths: totals.totals.deaths,
            male_deaths: totals.totals.male_deaths,
            female_deaths: totals.totals.female_deaths,
            case_fatality_rate: totals.totals.fatality_rate(),
            affected_provinces: totals.provinces,
            affected_regencies: totals.regencies,
            trends: year_over_year(&totals.totals, &previous),
            data_year: year,
        };

        let top_provinces = analysis::top_n(
            analysis::group_by_province(&current),
            self.limits.top_provinces,
        );

        Ok(StatsOverview {
            summary,
            top_provinces,
        })
    }

    /// Every record of a year with its monthly shape.
    pub fn cases_by_year(&self, year: Option<i32>) -> Result<CasesByYear, EngineError> {
        let year = self.years.resolve(year)?;

        let mut cases = self.store.find(&CaseFilter::year(year))?;
        analysis::sort_records_by_cases(&mut cases);
        let monthly_trend = monthly_series(&cases);

        Ok(CasesByYear {
            year,
            total_records: cases.len(),
            cases,
            monthly_trend,
        })
    }

    /// Breakdown of a year by province or by regency.
    ///
    /// `province_code` narrows either view to one province. The regency view
    /// is capped at the configured regency limit; the province view is not.
    pub fn area_breakdown(
        &self,
        year: Option<i32>,
        province_code: Option<&str>,
        view: AreaView,
    ) -> Result<AreaBreakdown, EngineError> {
        let year = self.years.resolve(year)?;

        let mut filter = CaseFilter::year(year);
        if let Some(code) = province_code {
            filter = filter.with_province(code);
        }
        let records = self.store.find(&filter)?;

        let breakdown = match view {
            AreaView::Province => AreaBreakdown::Province(ProvinceView {
                province_data: analysis::group_by_province(&records),
                data_year: year,
            }),
            AreaView::Regency => AreaBreakdown::Regency(RegencyView {
                regency_data: analysis::top_n(
                    analysis::group_by_regency(&records),
                    self.limits.regency_limit,
                ),
                data_year: year,
            }),
        };

        Ok(breakdown)
    }

    /// Per-year series, oldest first.
    ///
    /// Without explicit bounds the window is `[current - years, current]`
    /// where `current` is the calendar year.
    pub fn trends(&self, window: TrendWindow) -> Result<TrendSeries, EngineError> {
        let end = window.end_year.unwrap_or_else(|| self.years.current_year());
        let start = match window.start_year {
            Some(start) => start,
            None => {
                let span = window.years.unwrap_or(self.limits.trend_years);
                i32::try_from(span)
                    .ok()
                    .and_then(|span| end.checked_sub(span))
                    .ok_or_else(|| EngineError::Invalid {
                        field: "endYear",
                        detail: format!("a {} year window cannot end in {}", span, end),
                    })?
            }
        };

        if start > end {
            return Err(EngineError::Invalid {
                field: "startYear",
                detail: format!("start year {} is after end year {}", start, end),
            });
        }

        let records = self.store.find(&CaseFilter::between(start, end))?;

        Ok(TrendSeries {
            trends: analysis::group_by_year(&records),
            period: format!("{}-{}", start, end),
        })
    }

    /// Regencies with the most cases in a year.
    pub fn high_risk_areas(&self, year: Option<i32>, limit: usize) -> Result<HighRiskAreas, EngineError> {
        let year = self.years.resolve(year)?;
        let records = self.store.find(&CaseFilter::year(year))?;

        Ok(HighRiskAreas {
            high_risk_areas: analysis::top_n(analysis::group_by_regency(&records), limit),
            year,
        })
    }

    /// Raw records of a year, optionally for a single regency.
    ///
    /// A regency code that appears in no year at all is reported as not found;
    /// a known regency without rows for the year yields an empty list.
    pub fn case_details(
        &self,
        year: Option<i32>,
        regency_code: Option<&str>,
    ) -> Result<CaseDetails, EngineError> {
        let year = self.years.resolve(year)?;

        let mut filter = CaseFilter::year(year);
        if let Some(code) = regency_code {
            if !self.store.has_regency(code)? {
                return Err(EngineError::NotFound(format!("Regency {} not found", code)));
            }
            filter = filter.with_regency(code);
        }

        let mut case_details = self.store.find(&filter)?;
        analysis::sort_records_by_cases(&mut case_details);

        Ok(CaseDetails { case_details, year })
    }

    /// Monthly series for a year: measured when records carry months,
    /// estimated otherwise.
    pub fn monthly_distribution(&self, year: Option<i32>) -> Result<(i32, MonthlySeries), EngineError> {
        let year = self.years.resolve(year)?;
        let records = self.store.find(&CaseFilter::year(year))?;
        Ok((year, monthly_series(&records)))
    }

    /// Everything the dashboard charts need, over the whole collection.
    pub fn chart_data(&self) -> Result<ChartData, EngineError> {
        let records = self.store.find(&CaseFilter::all())?;

        let yearly_trends = analysis::group_by_year(&records);
        let top_regencies = analysis::top_n(
            analysis::group_by_regency(&records),
            self.limits.chart_top_regencies,
        );

        let area_chart_data = yearly_trends
            .iter()
            .map(|trend| AreaChartPoint {
                year: trend.year.to_string(),
                cases: trend.total_cases,
                deaths: trend.total_deaths,
                fatality_rate: trend.case_fatality_rate,
            })
            .collect();

        let monthly_distribution = match yearly_trends.last() {
            Some(latest) => {
                let latest_records: Vec<CaseRecord> = records
                    .iter()
                    .filter(|r| r.year == latest.year)
                    .cloned()
                    .collect();
                monthly_series(&latest_records)
            }
            None => estimate_monthly(0, 0, 0.0),
        };

        Ok(ChartData {
            total_years: yearly_trends.len(),
            yearly_trends,
            top_regencies,
            area_chart_data,
            monthly_distribution,
        })
    }
}

/// Percent changes against the previous year, zero when there is no baseline.
fn year_over_year(current: &Totals, previous: &Totals) -> Trends {
    let cases = percent_change(current.cases, previous.cases);
    let deaths = percent_change(current.deaths, previous.deaths);

    Trends {
        cases: cases.unwrap_or(0.0),
        deaths: deaths.unwrap_or(0.0),
        has_cases_baseline: cases.is_some(),
        has_deaths_baseline: deaths.is_some(),
    }
}

fn monthly_series(records: &[CaseRecord]) -> MonthlySeries {
    match analysis::group_by_month(records) {
        Some(points) => MonthlySeries::Measured(points),
        None => {
            let totals = analysis::sum_totals(records);
            estimate_monthly(totals.cases, totals.deaths, totals.fatality_rate())
        }
    }
}
