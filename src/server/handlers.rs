//! Endpoint handlers.
//!
//! Query parameters arrive as raw strings so that malformed values can be
//! reported through the envelope instead of axum's plain-text rejection.

use super::response::{success, ApiError, ApiFailure};
use super::AppState;
use crate::config::QueryConfig;
use crate::engine::TrendWindow;
use crate::models::AreaView;
use crate::year::parse_year_param;
use axum::extract::{OriginalUri, Query, State};
use axum::response::Response;
use serde::Deserialize;
use serde_json::Value;

/// Query string shared by every dengue endpoint.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DengueQuery {
    pub year: Option<String>,
    pub years: Option<String>,
    pub limit: Option<String>,
    pub view: Option<String>,
    pub province_code: Option<String>,
    pub regency_code: Option<String>,
    pub start_year: Option<String>,
    pub end_year: Option<String>,
}

fn non_empty(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Parse a positive count bounded by `max`, falling back to `default`.
fn parse_count(
    field: &'static str,
    raw: &Option<String>,
    default: usize,
    max: usize,
) -> Result<usize, ApiError> {
    let Some(raw) = non_empty(raw) else {
        return Ok(default);
    };

    let value: usize = raw.parse().map_err(|_| ApiError::Validation {
        field,
        detail: format!("'{}' is not a positive integer", raw),
    })?;

    if value == 0 || value > max {
        return Err(ApiError::Validation {
            field,
            detail: format!("must be between 1 and {}", max),
        });
    }

    Ok(value)
}

/// Strict year parse for explicit range bounds.
fn parse_bound(field: &'static str, raw: &Option<String>) -> Result<Option<i32>, ApiError> {
    non_empty(raw)
        .map(|raw| {
            raw.parse::<i32>().map_err(|_| ApiError::Validation {
                field,
                detail: format!("'{}' is not a year", raw),
            })
        })
        .transpose()
}

fn parse_view(raw: &Option<String>) -> Result<AreaView, ApiError> {
    match non_empty(raw) {
        None => Ok(AreaView::default()),
        Some(raw) => raw
            .parse()
            .map_err(|detail| ApiError::Validation { field: "view", detail }),
    }
}

fn requested_year(query: &DengueQuery) -> Option<i32> {
    parse_year_param(query.year.as_deref())
}

fn trend_window(query: &DengueQuery, limits: &QueryConfig) -> Result<TrendWindow, ApiError> {
    let years = parse_count(
        "years",
        &query.years,
        limits.trend_years as usize,
        limits.max_limit,
    )?;

    Ok(TrendWindow {
        years: Some(years as u32),
        start_year: parse_bound("startYear", &query.start_year)?,
        end_year: parse_bound("endYear", &query.end_year)?,
    })
}

/// `GET /api/dengue/stats`
pub async fn stats(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<DengueQuery>,
) -> Result<Response, ApiFailure> {
    let path = uri.to_string();
    let overview = state
        .engine
        .overview(requested_year(&query))
        .map_err(|e| ApiError::from(e).at(&path))?;

    Ok(success("Dengue statistics retrieved successfully", overview, &path))
}

/// `GET /api/dengue/cases-by-year`
pub async fn cases_by_year(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<DengueQuery>,
) -> Result<Response, ApiFailure> {
    let path = uri.to_string();
    let cases = state
        .engine
        .cases_by_year(requested_year(&query))
        .map_err(|e| ApiError::from(e).at(&path))?;

    Ok(success("Cases by year retrieved successfully", cases, &path))
}

/// `GET /api/dengue/cases-by-province`
pub async fn cases_by_province(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<DengueQuery>,
) -> Result<Response, ApiFailure> {
    let path = uri.to_string();
    let view = parse_view(&query.view).map_err(|e| e.at(&path))?;

    let breakdown = state
        .engine
        .area_breakdown(requested_year(&query), non_empty(&query.province_code), view)
        .map_err(|e| ApiError::from(e).at(&path))?;

    Ok(success("Province data retrieved successfully", breakdown, &path))
}

/// `GET /api/dengue/trends`
pub async fn trends(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<DengueQuery>,
) -> Result<Response, ApiFailure> {
    let path = uri.to_string();
    let window = trend_window(&query, state.engine.limits()).map_err(|e| e.at(&path))?;

    let series = state
        .engine
        .trends(window)
        .map_err(|e| ApiError::from(e).at(&path))?;

    Ok(success("Trend data retrieved successfully", series, &path))
}

/// `GET /api/dengue/high-risk-areas`
pub async fn high_risk_areas(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<DengueQuery>,
) -> Result<Response, ApiFailure> {
    let path = uri.to_string();
    let limits = state.engine.limits();
    let limit = parse_count("limit", &query.limit, limits.high_risk_limit, limits.max_limit)
        .map_err(|e| e.at(&path))?;

    let areas = state
        .engine
        .high_risk_areas(requested_year(&query), limit)
        .map_err(|e| ApiError::from(e).at(&path))?;

    Ok(success("High risk areas retrieved successfully", areas, &path))
}

/// `GET /api/dengue/case-details`
pub async fn case_details(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<DengueQuery>,
) -> Result<Response, ApiFailure> {
    let path = uri.to_string();
    let details = state
        .engine
        .case_details(requested_year(&query), non_empty(&query.regency_code))
        .map_err(|e| ApiError::from(e).at(&path))?;

    Ok(success("Case details retrieved successfully", details, &path))
}

/// `GET /api/dengue/chart-data`
pub async fn chart_data(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
) -> Result<Response, ApiFailure> {
    let path = uri.to_string();
    let charts = state
        .engine
        .chart_data()
        .map_err(|e| ApiError::from(e).at(&path))?;

    Ok(success("Chart data retrieved successfully", charts, &path))
}

/// `GET /api/health`
pub async fn health(OriginalUri(uri): OriginalUri) -> Response {
    success("Server is running", Value::Null, &uri.to_string())
}

/// Fallback for unknown routes.
pub async fn not_found(OriginalUri(uri): OriginalUri) -> ApiFailure {
    ApiError::NotFound(format!("Not found endpoint: {}", uri)).at(uri.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::StatsEngine;
    use crate::models::NewCaseRecord;
    use crate::store::{CaseStore, MemoryStore};
    use crate::year::FixedClock;
    use axum::body::to_bytes;
    use axum::http::{StatusCode, Uri};
    use axum::response::IntoResponse;
    use std::sync::Arc;

    fn record(regency: (&str, &str), year: i32, cases: u64, deaths: u64) -> NewCaseRecord {
        NewCaseRecord {
            province_code: "32".to_string(),
            province_name: "JAWA BARAT".to_string(),
            regency_code: regency.0.to_string(),
            regency_name: regency.1.to_string(),
            year,
            total_cases: cases,
            male_deaths: deaths,
            female_deaths: 0,
            month: None,
        }
    }

    fn test_state() -> AppState {
        let store = MemoryStore::new();
        store
            .insert_many(vec![
                record(("3201", "KAB BOGOR"), 2022, 100, 1),
                record(("3201", "KAB BOGOR"), 2023, 150, 3),
                record(("3273", "KOTA BANDUNG"), 2023, 300, 2),
            ])
            .unwrap();

        AppState {
            engine: Arc::new(StatsEngine::new(
                Arc::new(store),
                Arc::new(FixedClock(2024)),
                QueryConfig::default(),
            )),
        }
    }

    fn uri(path: &'static str) -> OriginalUri {
        OriginalUri(Uri::from_static(path))
    }

    fn query(pairs: &[(&str, &str)]) -> Query<DengueQuery> {
        let mut q = DengueQuery::default();
        for (key, value) in pairs {
            let value = Some(value.to_string());
            match *key {
                "year" => q.year = value,
                "years" => q.years = value,
                "limit" => q.limit = value,
                "view" => q.view = value,
                "provinceCode" => q.province_code = value,
                "regencyCode" => q.regency_code = value,
                "startYear" => q.start_year = value,
                "endYear" => q.end_year = value,
                other => panic!("unknown query key {}", other),
            }
        }
        Query(q)
    }

    async fn into_json(response: impl IntoResponse) -> (StatusCode, serde_json::Value) {
        let response = response.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_stats_defaults_to_latest_year() {
        let response = stats(State(test_state()), uri("/api/dengue/stats"), query(&[])).await;
        let (status, body) = into_json(response).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Dengue statistics retrieved successfully");
        assert_eq!(body["data"]["summary"]["dataYear"], 2023);
        assert_eq!(body["data"]["summary"]["totalCases"], 450);
        assert_eq!(body["data"]["summary"]["trends"]["cases"], 350.0);
        assert_eq!(body["path"], "/api/dengue/stats");
    }

    #[tokio::test]
    async fn test_stats_ignores_unparsable_year() {
        let response = stats(
            State(test_state()),
            uri("/api/dengue/stats?year=abc"),
            query(&[("year", "abc")]),
        )
        .await;
        let (status, body) = into_json(response).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["summary"]["dataYear"], 2023);
        assert_eq!(body["path"], "/api/dengue/stats?year=abc");
    }

    #[tokio::test]
    async fn test_extreme_years_do_not_panic() {
        let response = stats(
            State(test_state()),
            uri("/api/dengue/stats?year=-2147483648"),
            query(&[("year", "-2147483648")]),
        )
        .await;
        let (status, body) = into_json(response).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["summary"]["dataYear"], i32::MIN);

        let response = trends(
            State(test_state()),
            uri("/api/dengue/trends?endYear=-2147483648"),
            query(&[("endYear", "-2147483648")]),
        )
        .await;
        let (status, body) = into_json(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"]["field"], "endYear");
    }

    #[tokio::test]
    async fn test_regency_view() {
        let response = cases_by_province(
            State(test_state()),
            uri("/api/dengue/cases-by-province?view=regency"),
            query(&[("view", "regency"), ("year", "2023")]),
        )
        .await;
        let (status, body) = into_json(response).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["view"], "regency");
        assert_eq!(body["data"]["regencyData"][0]["regencyName"], "KOTA BANDUNG");
    }

    #[tokio::test]
    async fn test_unknown_view_is_rejected() {
        let response = cases_by_province(
            State(test_state()),
            uri("/api/dengue/cases-by-province?view=district"),
            query(&[("view", "district")]),
        )
        .await;
        let (status, body) = into_json(response).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["errors"]["field"], "view");
    }

    #[tokio::test]
    async fn test_high_risk_limit_validation() {
        for bad in ["0", "-3", "ten", "100000"] {
            let response = high_risk_areas(
                State(test_state()),
                uri("/api/dengue/high-risk-areas"),
                query(&[("limit", bad)]),
            )
            .await;
            let (status, body) = into_json(response).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "limit={}", bad);
            assert_eq!(body["errors"]["field"], "limit");
        }
    }

    #[tokio::test]
    async fn test_high_risk_limit_applies() {
        let response = high_risk_areas(
            State(test_state()),
            uri("/api/dengue/high-risk-areas?limit=1"),
            query(&[("limit", "1")]),
        )
        .await;
        let (status, body) = into_json(response).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["highRiskAreas"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"]["year"], 2023);
    }

    #[tokio::test]
    async fn test_trends_window() {
        let response = trends(
            State(test_state()),
            uri("/api/dengue/trends?years=2"),
            query(&[("years", "2")]),
        )
        .await;
        let (status, body) = into_json(response).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["period"], "2022-2024");
        assert_eq!(body["data"]["trends"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_trends_reversed_bounds() {
        let response = trends(
            State(test_state()),
            uri("/api/dengue/trends"),
            query(&[("startYear", "2024"), ("endYear", "2020")]),
        )
        .await;
        let (status, body) = into_json(response).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"]["field"], "startYear");
    }

    #[tokio::test]
    async fn test_case_details_unknown_regency() {
        let response = case_details(
            State(test_state()),
            uri("/api/dengue/case-details?regencyCode=9999"),
            query(&[("regencyCode", "9999")]),
        )
        .await;
        let (status, body) = into_json(response).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Regency 9999 not found");
    }

    #[tokio::test]
    async fn test_case_details_for_regency() {
        let response = case_details(
            State(test_state()),
            uri("/api/dengue/case-details?regencyCode=3201&year=2022"),
            query(&[("regencyCode", "3201"), ("year", "2022")]),
        )
        .await;
        let (status, body) = into_json(response).await;

        assert_eq!(status, StatusCode::OK);
        let details = body["data"]["caseDetails"].as_array().unwrap();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0]["totalCases"], 100);
    }

    #[tokio::test]
    async fn test_chart_data() {
        let response = chart_data(State(test_state()), uri("/api/dengue/chart-data")).await;
        let (status, body) = into_json(response).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["totalYears"], 2);
        assert_eq!(body["data"]["areaChartData"][0]["year"], "2022");
        assert_eq!(body["data"]["monthlyDistribution"]["source"], "estimated");
    }

    #[test]
    fn test_health_and_fallback() {
        let (status, body) = tokio_test::block_on(async {
            into_json(health(uri("/api/health")).await).await
        });
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"].is_null());

        let (status, body) = tokio_test::block_on(async {
            into_json(not_found(uri("/api/nope")).await).await
        });
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Not found endpoint: /api/nope");
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("limit", &None, 10, 500).unwrap(), 10);
        assert_eq!(parse_count("limit", &Some(" ".to_string()), 10, 500).unwrap(), 10);
        assert_eq!(parse_count("limit", &Some("25".to_string()), 10, 500).unwrap(), 25);
        assert!(parse_count("limit", &Some("501".to_string()), 10, 500).is_err());
    }
}
