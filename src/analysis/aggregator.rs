//! Case aggregation and statistics.
//!
//! This module groups case records by year, province, regency and month and
//! computes the summed counts and derived rates for each group. All functions
//! are pure: they take the rows a store returned and never touch storage.

use crate::analysis::metrics::fatality_rate;
use crate::analysis::seasonal::month_label;
use crate::models::{
    CaseRecord, MonthlyPoint, ProvinceBreakdown, RegencyBreakdown, YearlyTrend,
};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Summed counts over a set of records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Totals {
    pub cases: u64,
    pub deaths: u64,
    pub male_deaths: u64,
    pub female_deaths: u64,
}

impl Totals {
    fn add(&mut self, record: &CaseRecord) {
        self.cases += record.total_cases;
        self.deaths += record.total_deaths;
        self.male_deaths += record.male_deaths;
        self.female_deaths += record.female_deaths;
    }

    /// Zero-guarded fatality rate of these totals.
    pub fn fatality_rate(&self) -> f64 {
        fatality_rate(self.deaths, self.cases)
    }
}

/// Totals plus distinct area counts for one year.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct YearTotals {
    pub totals: Totals,
    pub provinces: usize,
    pub regencies: usize,
}

/// Sum every record, counting distinct provinces and regencies by code.
pub fn summarize(records: &[CaseRecord]) -> YearTotals {
    let mut totals = Totals::default();
    let mut provinces = HashSet::new();
    let mut regencies = HashSet::new();

    for record in records {
        totals.add(record);
        provinces.insert(record.province_code.as_str());
        regencies.insert(record.regency_code.as_str());
    }

    YearTotals {
        totals,
        provinces: provinces.len(),
        regencies: regencies.len(),
    }
}

/// Sum only the cases and deaths of a set of records.
pub fn sum_totals(records: &[CaseRecord]) -> Totals {
    let mut totals = Totals::default();
    for record in records {
        totals.add(record);
    }
    totals
}

/// Group records by province.
///
/// Sorted by total cases (highest first), then province name and code.
pub fn group_by_province(records: &[CaseRecord]) -> Vec<ProvinceBreakdown> {
    struct Acc<'a> {
        totals: Totals,
        regencies: HashSet<&'a str>,
    }

    let mut grouped: HashMap<(&str, &str), Acc> = HashMap::new();

    for record in records {
        let acc = grouped
            .entry((record.province_code.as_str(), record.province_name.as_str()))
            .or_insert_with(|| Acc {
                totals: Totals::default(),
                regencies: HashSet::new(),
            });
        acc.totals.add(record);
        acc.regencies.insert(record.regency_code.as_str());
    }

    let mut provinces: Vec<ProvinceBreakdown> = grouped
        .into_iter()
        .map(|((code, name), acc)| ProvinceBreakdown {
            province_code: code.to_string(),
            province_name: name.to_string(),
            total_cases: acc.totals.cases,
            total_deaths: acc.totals.deaths,
            male_deaths: acc.totals.male_deaths,
            female_deaths: acc.totals.female_deaths,
            case_fatality_rate: acc.totals.fatality_rate(),
            affected_regencies: acc.regencies.len(),
        })
        .collect();

    provinces.sort_by(|a, b| {
        b.total_cases
            .cmp(&a.total_cases)
            .then_with(|| a.province_name.cmp(&b.province_name))
            .then_with(|| a.province_code.cmp(&b.province_code))
    });

    provinces
}

/// Group records by regency.
///
/// The key includes the parent province name so that regencies sharing a
/// name in different provinces stay apart. Sorted by total cases (highest
/// first), then regency name, province name and regency code.
pub fn group_by_regency(records: &[CaseRecord]) -> Vec<RegencyBreakdown> {
    let mut grouped: HashMap<(&str, &str, &str), Totals> = HashMap::new();

    for record in records {
        grouped
            .entry((
                record.regency_code.as_str(),
                record.regency_name.as_str(),
                record.province_name.as_str(),
            ))
            .or_default()
            .add(record);
    }

    let mut regencies: Vec<RegencyBreakdown> = grouped
        .into_iter()
        .map(|((code, name, province), totals)| RegencyBreakdown {
            regency_code: code.to_string(),
            regency_name: name.to_string(),
            province_name: province.to_string(),
            total_cases: totals.cases,
            total_deaths: totals.deaths,
            male_deaths: totals.male_deaths,
            female_deaths: totals.female_deaths,
            case_fatality_rate: totals.fatality_rate(),
        })
        .collect();

    regencies.sort_by(compare_regencies);
    regencies
}

fn compare_regencies(a: &RegencyBreakdown, b: &RegencyBreakdown) -> Ordering {
    b.total_cases
        .cmp(&a.total_cases)
        .then_with(|| a.regency_name.cmp(&b.regency_name))
        .then_with(|| a.province_name.cmp(&b.province_name))
        .then_with(|| a.regency_code.cmp(&b.regency_code))
}

/// Group records by year, oldest first.
pub fn group_by_year(records: &[CaseRecord]) -> Vec<YearlyTrend> {
    struct Acc<'a> {
        totals: Totals,
        provinces: HashSet<&'a str>,
    }

    let mut grouped: BTreeMap<i32, Acc> = BTreeMap::new();

    for record in records {
        let acc = grouped.entry(record.year).or_insert_with(|| Acc {
            totals: Totals::default(),
            provinces: HashSet::new(),
        });
        acc.totals.add(record);
        acc.provinces.insert(record.province_code.as_str());
    }

    grouped
        .into_iter()
        .map(|(year, acc)| YearlyTrend {
            year,
            total_cases: acc.totals.cases,
            total_deaths: acc.totals.deaths,
            male_deaths: acc.totals.male_deaths,
            female_deaths: acc.totals.female_deaths,
            case_fatality_rate: acc.totals.fatality_rate(),
            affected_provinces: acc.provinces.len(),
        })
        .collect()
}

/// Group records that carry a real month, January first.
///
/// Returns `None` when no record has a month, so callers can fall back to
/// the seasonal estimate explicitly.
pub fn group_by_month(records: &[CaseRecord]) -> Option<Vec<MonthlyPoint>> {
    let mut grouped: BTreeMap<u32, Totals> = BTreeMap::new();

    for record in records {
        if let Some(month) = record.month.filter(|m| (1..=12).contains(m)) {
            grouped.entry(month).or_default().add(record);
        }
    }

    if grouped.is_empty() {
        return None;
    }

    Some(
        grouped
            .into_iter()
            .map(|(month, totals)| MonthlyPoint {
                month,
                label: month_label(month).to_string(),
                cases: totals.cases,
                deaths: totals.deaths,
                fatality_rate: totals.fatality_rate(),
            })
            .collect(),
    )
}

/// Sort raw records by total cases (highest first), then regency name.
pub fn sort_records_by_cases(records: &mut [CaseRecord]) {
    records.sort_by(|a, b| {
        b.total_cases
            .cmp(&a.total_cases)
            .then_with(|| a.regency_name.cmp(&b.regency_name))
            .then_with(|| a.regency_code.cmp(&b.regency_code))
    });
}

/// Keep only the first `n` entries of an already ranked list.
pub fn top_n<T>(mut ranked: Vec<T>, n: usize) -> Vec<T> {
    ranked.truncate(n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewCaseRecord;
    use chrono::Utc;

    fn record(
        province: (&str, &str),
        regency: (&str, &str),
        year: i32,
        cases: u64,
        male: u64,
        female: u64,
    ) -> CaseRecord {
        CaseRecord::from_new(
            NewCaseRecord {
                province_code: province.0.to_string(),
                province_name: province.1.to_string(),
                regency_code: regency.0.to_string(),
                regency_name: regency.1.to_string(),
                year,
                total_cases: cases,
                male_deaths: male,
                female_deaths: female,
                month: None,
            },
            Utc::now(),
        )
    }

    const PROV_A: (&str, &str) = ("11", "ProvinceA");
    const PROV_B: (&str, &str) = ("12", "ProvinceB");

    #[test]
    fn test_summarize_counts_distinct_areas() {
        let records = vec![
            record(PROV_A, ("1101", "Alpha"), 2024, 100, 1, 1),
            record(PROV_A, ("1102", "Beta"), 2024, 50, 0, 1),
            record(PROV_B, ("1201", "Gamma"), 2024, 25, 0, 0),
        ];

        let summary = summarize(&records);

        assert_eq!(summary.totals.cases, 175);
        assert_eq!(summary.totals.deaths, 3);
        assert_eq!(summary.totals.male_deaths, 1);
        assert_eq!(summary.totals.female_deaths, 2);
        assert_eq!(summary.provinces, 2);
        assert_eq!(summary.regencies, 3);
        assert_eq!(summary.totals.fatality_rate(), 1.71);
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&[]);
        assert_eq!(summary, YearTotals::default());
        assert_eq!(summary.totals.fatality_rate(), 0.0);
    }

    #[test]
    fn test_group_by_province_sums_regencies() {
        let records = vec![
            record(PROV_A, ("1101", "Alpha"), 2024, 120, 2, 0),
            record(PROV_A, ("1102", "Beta"), 2024, 80, 0, 2),
            record(PROV_B, ("1201", "Gamma"), 2024, 150, 1, 0),
        ];

        let provinces = group_by_province(&records);

        assert_eq!(provinces.len(), 2);
        assert_eq!(provinces[0].province_name, "ProvinceA");
        assert_eq!(provinces[0].total_cases, 200);
        assert_eq!(provinces[0].affected_regencies, 2);
        assert_eq!(provinces[0].total_deaths, 4);
        assert_eq!(provinces[0].case_fatality_rate, 2.0);
        assert_eq!(provinces[1].province_code, "12");
    }

    #[test]
    fn test_group_by_province_ties_break_on_name() {
        let records = vec![
            record(("13", "Zeta"), ("1301", "R1"), 2024, 10, 0, 0),
            record(("14", "Eta"), ("1401", "R2"), 2024, 10, 0, 0),
        ];

        let provinces = group_by_province(&records);

        assert_eq!(provinces[0].province_name, "Eta");
        assert_eq!(provinces[1].province_name, "Zeta");
    }

    #[test]
    fn test_group_by_regency_keeps_same_names_apart() {
        let records = vec![
            record(PROV_A, ("1101", "KOTA BARU"), 2024, 30, 0, 0),
            record(PROV_B, ("1201", "KOTA BARU"), 2024, 40, 0, 0),
            record(PROV_B, ("1201", "KOTA BARU"), 2023, 5, 0, 0),
        ];

        let regencies = group_by_regency(&records);

        assert_eq!(regencies.len(), 2);
        assert_eq!(regencies[0].province_name, "ProvinceB");
        assert_eq!(regencies[0].total_cases, 45);
        assert_eq!(regencies[1].province_name, "ProvinceA");
    }

    #[test]
    fn test_group_by_regency_zero_cases() {
        let records = vec![record(PROV_A, ("1101", "Alpha"), 2024, 0, 1, 0)];

        let regencies = group_by_regency(&records);

        assert_eq!(regencies[0].total_deaths, 1);
        assert_eq!(regencies[0].case_fatality_rate, 0.0);
    }

    #[test]
    fn test_group_by_year_is_chronological() {
        let records = vec![
            record(PROV_A, ("1101", "Alpha"), 2024, 150, 4, 2),
            record(PROV_A, ("1101", "Alpha"), 2022, 90, 0, 0),
            record(PROV_B, ("1201", "Gamma"), 2024, 50, 0, 0),
            record(PROV_A, ("1101", "Alpha"), 2023, 100, 3, 2),
        ];

        let years = group_by_year(&records);

        let order: Vec<i32> = years.iter().map(|y| y.year).collect();
        assert_eq!(order, vec![2022, 2023, 2024]);
        assert_eq!(years[2].total_cases, 200);
        assert_eq!(years[2].affected_provinces, 2);
        assert_eq!(years[2].case_fatality_rate, 3.0);
    }

    #[test]
    fn test_group_by_month_requires_months() {
        let records = vec![record(PROV_A, ("1101", "Alpha"), 2024, 10, 0, 0)];
        assert!(group_by_month(&records).is_none());
    }

    #[test]
    fn test_group_by_month() {
        let mut march = record(PROV_A, ("1101", "Alpha"), 2024, 10, 1, 0);
        march.month = Some(3);
        let mut january = record(PROV_A, ("1102", "Beta"), 2024, 20, 0, 0);
        january.month = Some(1);
        let mut bogus = record(PROV_A, ("1103", "Gamma"), 2024, 99, 0, 0);
        bogus.month = Some(13);

        let points = group_by_month(&[march, january, bogus]).unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].label, "Jan");
        assert_eq!(points[0].cases, 20);
        assert_eq!(points[1].month, 3);
        assert_eq!(points[1].fatality_rate, 10.0);
    }

    #[test]
    fn test_top_n() {
        let records: Vec<CaseRecord> = (0..10)
            .map(|i| {
                record(
                    PROV_A,
                    (format!("11{:02}", i).as_str(), format!("R{}", i).as_str()),
                    2024,
                    i * 10,
                    0,
                    0,
                )
            })
            .collect();

        let top = top_n(group_by_regency(&records), 3);

        assert_eq!(top.len(), 3);
        assert_eq!(top[0].total_cases, 90);
        assert_eq!(top[1].total_cases, 80);
        assert_eq!(top[2].total_cases, 70);
    }

    #[test]
    fn test_sort_records_by_cases() {
        let mut records = vec![
            record(PROV_A, ("1101", "Beta"), 2024, 5, 0, 0),
            record(PROV_A, ("1102", "Alpha"), 2024, 5, 0, 0),
            record(PROV_A, ("1103", "Gamma"), 2024, 9, 0, 0),
        ];

        sort_records_by_cases(&mut records);

        let names: Vec<&str> = records.iter().map(|r| r.regency_name.as_str()).collect();
        assert_eq!(names, vec!["Gamma", "Alpha", "Beta"]);
    }
}
