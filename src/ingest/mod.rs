//! Import of tabular JSON exports.
//!
//! The export is a JSON array of objects such as
//! `{"type": "table", "name": "dengue_fever_dataset", "data": [...]}`.
//! The first row of the table's `data` is a header mapping column keys to
//! column names; every following row is one case record keyed the same way.

use crate::models::NewCaseRecord;
use crate::store::{CaseFilter, CaseStore, StoreError};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Name of the table holding the case rows.
pub const DATASET_TABLE: &str = "dengue_fever_dataset";

/// Errors that abort an import. Bad rows are skipped, not reported here.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid export JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Dengue fever dataset table not found in export")]
    TableNotFound,

    #[error("Dengue fever dataset table has no header row")]
    MissingHeader,

    #[error("Column mapping failed for {0}")]
    MissingColumn(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One top-level object of the export.
#[derive(Debug, Deserialize)]
struct ExportObject {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    data: Option<Vec<Value>>,
}

/// Row keys for each field, resolved from the header row.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ColumnMapping {
    province_code: String,
    province_name: String,
    regency_code: String,
    regency_name: String,
    year: String,
    total_cases: String,
    male_deaths: String,
    female_deaths: String,
    month: Option<String>,
}

impl ColumnMapping {
    fn from_header(header: &Map<String, Value>) -> Result<Self, ImportError> {
        let required = |column: &'static str| {
            column_key(header, column).ok_or(ImportError::MissingColumn(column))
        };

        Ok(Self {
            province_code: required("kode_provinsi")?,
            province_name: required("nama_provinsi")?,
            regency_code: required("kode_kabupaten_kota")?,
            regency_name: required("nama_kabupaten_kota")?,
            year: required("tahun")?,
            total_cases: required("jumlah_kasus")?,
            male_deaths: required("jumlah_kasus_meninggal_laki")?,
            female_deaths: required("jumlah_kasus_meninggal_perempuan")?,
            month: column_key(header, "bulan"),
        })
    }

    /// Normalise one data row. `None` when a required key field is missing.
    fn record(&self, row: &Map<String, Value>) -> Option<NewCaseRecord> {
        let province_code = cell_text(row, &self.province_code)?;
        let regency_code = cell_text(row, &self.regency_code)?;
        let year = cell_text(row, &self.year).and_then(|raw| leading_integer(&raw))?;

        Some(NewCaseRecord {
            province_code,
            province_name: cell_text(row, &self.province_name).unwrap_or_default(),
            regency_code,
            regency_name: cell_text(row, &self.regency_name).unwrap_or_default(),
            year: i32::try_from(year).ok()?,
            total_cases: count(row, &self.total_cases),
            male_deaths: count(row, &self.male_deaths),
            female_deaths: count(row, &self.female_deaths),
            month: self
                .month
                .as_ref()
                .and_then(|key| cell_text(row, key))
                .and_then(|raw| leading_integer(&raw))
                .and_then(|m| u32::try_from(m).ok())
                .filter(|m| (1..=12).contains(m)),
        })
    }
}

fn column_key(header: &Map<String, Value>, column: &str) -> Option<String> {
    header
        .iter()
        .find(|(_, name)| name.as_str().map(str::trim) == Some(column))
        .map(|(key, _)| key.clone())
}

/// Trimmed text of a cell. Empty strings, nulls and nested values count as missing.
fn cell_text(row: &Map<String, Value>, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Integer prefix of a string, so `"12"`, `"12.0"` and `"12 kasus"` all read as 12.
fn leading_integer(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, raw.strip_prefix('+').unwrap_or(raw)),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

/// Non-negative count, zero when missing or unparsable.
fn count(row: &Map<String, Value>, key: &str) -> u64 {
    cell_text(row, key)
        .and_then(|raw| leading_integer(&raw))
        .and_then(|n| u64::try_from(n).ok())
        .unwrap_or(0)
}

/// Records extracted from an export.
#[derive(Debug, Default)]
pub struct ExtractedRows {
    pub records: Vec<NewCaseRecord>,
    /// Data rows dropped for missing key fields.
    pub skipped: usize,
}

/// Parse an export document and normalise its dataset rows.
pub fn parse_export(content: &str, show_progress: bool) -> Result<ExtractedRows, ImportError> {
    let objects: Vec<ExportObject> = serde_json::from_str(content)?;

    let table = objects
        .into_iter()
        .find(|obj| obj.kind == "table" && obj.name.as_deref() == Some(DATASET_TABLE))
        .ok_or(ImportError::TableNotFound)?;

    let mut rows = table.data.unwrap_or_default().into_iter();
    let header = match rows.next() {
        Some(Value::Object(header)) => header,
        _ => return Err(ImportError::MissingHeader),
    };
    let mapping = ColumnMapping::from_header(&header)?;
    debug!("Column mapping: {:?}", mapping);

    let rows: Vec<Value> = rows.collect();
    let progress = progress_bar(rows.len() as u64, show_progress);

    let mut extracted = ExtractedRows::default();
    for (index, row) in rows.iter().enumerate() {
        let record = row.as_object().and_then(|row| mapping.record(row));
        match record {
            Some(record) => extracted.records.push(record),
            None => {
                warn!("Skipping row {} due to missing required data: {}", index + 1, row);
                extracted.skipped += 1;
            }
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    Ok(extracted)
}

fn progress_bar(len: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} rows")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb
}

/// How an import writes to the store.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Keep existing records instead of replacing the collection.
    pub append: bool,
    pub show_progress: bool,
}

/// Outcome of an import, read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub skipped: usize,
    pub total_records: usize,
    pub years: Vec<i32>,
    pub regencies: usize,
}

/// Import an export file into `store`.
pub fn import_file(
    path: &Path,
    store: &dyn CaseStore,
    options: ImportOptions,
) -> Result<ImportSummary, ImportError> {
    info!("Reading export {}", path.display());
    let content = std::fs::read_to_string(path).map_err(|source| ImportError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let extracted = parse_export(&content, options.show_progress)?;
    info!("Processing {} records...", extracted.records.len());

    let inserted = if options.append {
        store.insert_many(extracted.records)?
    } else {
        let inserted = store.replace_all(extracted.records)?;
        info!("Old dengue data cleared");
        inserted
    };

    let records = store.find(&CaseFilter::all())?;
    let regencies: BTreeSet<&str> = records.iter().map(|r| r.regency_code.as_str()).collect();

    let summary = ImportSummary {
        inserted,
        skipped: extracted.skipped,
        total_records: records.len(),
        years: store.distinct_years()?,
        regencies: regencies.len(),
    };
    info!(
        "Imported {} records ({} skipped), {} in store",
        summary.inserted, summary.skipped, summary.total_records
    );

    Ok(summary)
}
