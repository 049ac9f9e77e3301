//! Markdown and JSON rendering of a [`YearReport`].

use super::YearReport;
use crate::models::{MonthlySeries, ProvinceBreakdown, RegencyBreakdown, YearSummary};
use anyhow::{Context, Result};
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &YearReport) -> String {
    let mut output = String::new();

    output.push_str(&format!("# Dengue Surveillance Report {}\n\n", report.year));
    output.push_str(&generate_metadata_section(report));
    output.push_str(&generate_summary_section(&report.overview.summary));
    output.push_str(&generate_provinces_section(&report.overview.top_provinces));
    output.push_str(&generate_high_risk_section(&report.high_risk.high_risk_areas));
    output.push_str(&generate_monthly_section(&report.monthly));
    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(report: &YearReport) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Data Year:** {}\n", report.year));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Source:** `{}`\n", report.data_file));
    section.push_str(&format!("- **Records in Source:** {}\n", report.total_records));
    section.push('\n');

    section
}

fn generate_summary_section(summary: &YearSummary) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| Cases | Deaths | Male Deaths | Female Deaths | CFR (%) | Provinces | Regencies |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} | {:.2} | {} | {} |\n\n",
        summary.total_cases,
        summary.total_deaths,
        summary.male_deaths,
        summary.female_deaths,
        summary.case_fatality_rate,
        summary.affected_provinces,
        summary.affected_regencies,
    ));

    let Some(previous) = summary.data_year.checked_sub(1) else {
        section.push_str("No earlier year to compare against.\n\n");
        return section;
    };

    let trends = &summary.trends;
    let cases = if trends.has_cases_baseline {
        format!("cases {:+.1}%", trends.cases)
    } else {
        "no cases to compare".to_string()
    };
    let deaths = if trends.has_deaths_baseline {
        format!("deaths {:+.1}%", trends.deaths)
    } else {
        "no deaths to compare".to_string()
    };
    section.push_str(&format!("Compared with {}: {}, {}.\n\n", previous, cases, deaths));

    section
}

fn generate_provinces_section(provinces: &[ProvinceBreakdown]) -> String {
    let mut section = String::new();

    section.push_str("## Top Provinces\n\n");
    if provinces.is_empty() {
        section.push_str("No provinces reported cases this year.\n\n");
        return section;
    }

    section.push_str("| # | Province | Cases | Deaths | CFR (%) | Regencies |\n");
    section.push_str("|:---:|:---|:---:|:---:|:---:|:---:|\n");
    for (i, p) in provinces.iter().enumerate() {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {:.2} | {} |\n",
            i + 1,
            p.province_name,
            p.total_cases,
            p.total_deaths,
            p.case_fatality_rate,
            p.affected_regencies
        ));
    }
    section.push('\n');

    section
}

fn generate_high_risk_section(regencies: &[RegencyBreakdown]) -> String {
    let mut section = String::new();

    section.push_str("## High-Risk Areas\n\n");
    if regencies.is_empty() {
        section.push_str("No regencies reported cases this year.\n\n");
        return section;
    }

    section.push_str("| # | Regency | Province | Cases | Deaths | CFR (%) |\n");
    section.push_str("|:---:|:---|:---|:---:|:---:|:---:|\n");
    for (i, r) in regencies.iter().enumerate() {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {:.2} |\n",
            i + 1,
            r.regency_name,
            r.province_name,
            r.total_cases,
            r.total_deaths,
            r.case_fatality_rate
        ));
    }
    section.push('\n');

    section
}

fn generate_monthly_section(monthly: &MonthlySeries) -> String {
    let mut section = String::new();

    section.push_str(&format!("## Monthly Distribution ({})\n\n", monthly));
    if monthly.is_estimated() {
        section.push_str("*Estimated from the yearly totals using the seasonal profile.*\n\n");
    }

    section.push_str("| Month | Cases | Deaths | CFR (%) |\n");
    section.push_str("|:---|:---:|:---:|:---:|\n");
    for point in monthly.points() {
        section.push_str(&format!(
            "| {} | {} | {} | {:.2} |\n",
            point.label, point.cases, point.deaths, point.fatality_rate
        ));
    }
    section.push('\n');

    section
}

fn generate_footer() -> String {
    format!(
        "---\n\n*Report generated by dengue-stats v{}*\n",
        env!("CARGO_PKG_VERSION")
    )
}

/// Generate a JSON report.
pub fn generate_json_report(report: &YearReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write rendered report content to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::seasonal::estimate_monthly;
    use crate::models::{HighRiskAreas, MonthlyPoint, StatsOverview, Trends};
    use chrono::Utc;

    fn create_test_report() -> YearReport {
        let summary = YearSummary {
            total_cases: 150,
            total_deaths: 3,
            male_deaths: 2,
            female_deaths: 1,
            case_fatality_rate: 2.0,
            affected_provinces: 1,
            affected_regencies: 1,
            trends: Trends {
                cases: 50.0,
                deaths: -25.0,
                has_cases_baseline: true,
                has_deaths_baseline: true,
            },
            data_year: 2024,
        };

        let regency = RegencyBreakdown {
            regency_code: "3201".to_string(),
            regency_name: "KABUPATEN BOGOR".to_string(),
            province_name: "JAWA BARAT".to_string(),
            total_cases: 150,
            total_deaths: 3,
            male_deaths: 2,
            female_deaths: 1,
            case_fatality_rate: 2.0,
        };

        YearReport {
            year: 2024,
            generated_at: Utc::now(),
            data_file: "data/dengue_cases.json".to_string(),
            total_records: 2,
            overview: StatsOverview {
                summary,
                top_provinces: vec![ProvinceBreakdown {
                    province_code: "32".to_string(),
                    province_name: "JAWA BARAT".to_string(),
                    total_cases: 150,
                    total_deaths: 3,
                    male_deaths: 2,
                    female_deaths: 1,
                    case_fatality_rate: 2.0,
                    affected_regencies: 1,
                }],
            },
            high_risk: HighRiskAreas {
                high_risk_areas: vec![regency],
                year: 2024,
            },
            monthly: estimate_monthly(150, 3, 2.0),
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let markdown = generate_markdown_report(&create_test_report());

        assert!(markdown.contains("# Dengue Surveillance Report 2024"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Summary"));
        assert!(markdown.contains("## Top Provinces"));
        assert!(markdown.contains("KABUPATEN BOGOR"));
        assert!(markdown.contains("## Monthly Distribution (estimated)"));
        assert!(markdown.contains("| Jan |"));
    }

    #[test]
    fn test_summary_trend_wording() {
        let report = create_test_report();
        let section = generate_summary_section(&report.overview.summary);
        assert!(section.contains("Compared with 2023: cases +50.0%, deaths -25.0%."));

        let mut summary = report.overview.summary.clone();
        summary.trends = Trends::default();
        let section = generate_summary_section(&summary);
        assert!(section.contains("Compared with 2023: no cases to compare, no deaths to compare."));

        summary.trends = Trends {
            cases: 0.0,
            deaths: 0.0,
            has_cases_baseline: true,
            has_deaths_baseline: false,
        };
        let section = generate_summary_section(&summary);
        assert!(section.contains("Compared with 2023: cases +0.0%, no deaths to compare."));

        summary.data_year = i32::MIN;
        let section = generate_summary_section(&summary);
        assert!(section.contains("No earlier year to compare against."));
    }

    #[test]
    fn test_empty_sections() {
        assert!(generate_provinces_section(&[]).contains("No provinces reported"));
        assert!(generate_high_risk_section(&[]).contains("No regencies reported"));
    }

    #[test]
    fn test_measured_monthly_section() {
        let monthly = MonthlySeries::Measured(vec![MonthlyPoint {
            month: 2,
            label: "Feb".to_string(),
            cases: 10,
            deaths: 1,
            fatality_rate: 10.0,
        }]);

        let section = generate_monthly_section(&monthly);
        assert!(section.contains("(measured)"));
        assert!(!section.contains("Estimated from"));
        assert!(section.contains("| Feb | 10 | 1 | 10.00 |"));
    }

    #[test]
    fn test_generate_json_report() {
        let json = generate_json_report(&create_test_report()).unwrap();

        assert!(json.contains("\"overview\""));
        assert!(json.contains("\"highRiskAreas\""));
        assert!(json.contains("\"source\": \"estimated\""));
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");

        write_report("# hello\n", &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# hello\n");
    }
}
