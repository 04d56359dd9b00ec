//! CSV ingest and normalization.
//!
//! This module turns the two input tables into typed rows:
//!
//! - the diffusion-profile table (`Expt`, `x`, one column per oxide)
//! - the range table (`Expt.`, `Min x`, `Max x`)
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Separation of concerns**: no filtering or fitting logic here

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use serde::Serialize;

use crate::domain::{ProfileRow, RangeRecord};
use crate::error::{AppError, EXIT_NO_DATA};

/// Experiment ID column of the profile table.
pub const PROFILE_EXPT_COLUMN: &str = "expt";
/// Position column of the profile table.
pub const POSITION_COLUMN: &str = "x";
/// Accepted experiment columns of the range table, in order of preference.
pub const RANGE_EXPT_COLUMNS: [&str; 2] = ["expt.", "expt"];
pub const RANGE_MIN_COLUMN: &str = "min x";
pub const RANGE_MAX_COLUMN: &str = "max x";

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Loaded profile table.
#[derive(Debug, Clone)]
pub struct ProfileTable {
    /// Oxide names in the order of each row's `values`.
    pub oxides: Vec<String>,
    pub rows: Vec<ProfileRow>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

impl ProfileTable {
    pub fn oxide_index(&self, oxide: &str) -> Option<usize> {
        self.oxides.iter().position(|o| o == oxide)
    }
}

/// Loaded range table.
#[derive(Debug, Clone)]
pub struct RangeTable {
    pub records: Vec<RangeRecord>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load the profile table, keeping the requested oxide columns.
pub fn load_profiles(path: &Path, oxides: &[String]) -> Result<ProfileTable, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open profile CSV '{}': {e}", path.display())))?;
    let table = read_profiles(file, oxides)?;
    log::info!(
        "loaded {} profile row(s) from '{}' ({} skipped)",
        table.rows.len(),
        path.display(),
        table.row_errors.len()
    );
    Ok(table)
}

/// Load the range table.
pub fn load_ranges(path: &Path) -> Result<RangeTable, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open range CSV '{}': {e}", path.display())))?;
    let table = read_ranges(file)?;
    log::info!(
        "loaded {} range record(s) from '{}' ({} malformed row(s))",
        table.records.len(),
        path.display(),
        table.row_errors.len()
    );
    Ok(table)
}

pub fn read_profiles<R: Read>(input: R, oxides: &[String]) -> Result<ProfileTable, AppError> {
    let mut reader = csv_reader(input);
    let headers = reader
        .headers()
        .map_err(|e| AppError::input(format!("Failed to read profile CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let expt_idx = require_column(&header_map, PROFILE_EXPT_COLUMN, "profile")?;
    let x_idx = require_column(&header_map, POSITION_COLUMN, "profile")?;
    let oxide_idx = oxides
        .iter()
        .map(|o| {
            header_map
                .get(&normalize_header_name(o))
                .copied()
                .ok_or_else(|| AppError::input(format!("Missing oxide column in profile CSV: `{o}`")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header, and lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let Some(expt) = get_value(&record, expt_idx) else {
            row_errors.push(RowError {
                line,
                message: "Missing experiment ID.".to_string(),
            });
            continue;
        };

        let x = match get_value(&record, x_idx).map(parse_f64) {
            Some(Ok(x)) => x,
            Some(Err(raw)) => {
                row_errors.push(RowError {
                    line,
                    message: format!("Invalid position '{raw}'."),
                });
                continue;
            }
            None => {
                row_errors.push(RowError {
                    line,
                    message: "Missing position `x`.".to_string(),
                });
                continue;
            }
        };

        let values = oxide_idx
            .iter()
            .map(|&i| get_value(&record, i).and_then(|s| parse_f64(s).ok()))
            .collect();

        rows.push(ProfileRow {
            line,
            expt: expt.to_string(),
            x,
            values,
        });
    }

    if rows.is_empty() {
        return Err(AppError::new(EXIT_NO_DATA, "Profile CSV contains no usable rows."));
    }

    Ok(ProfileTable {
        oxides: oxides.to_vec(),
        rows,
        row_errors,
        rows_read,
    })
}

pub fn read_ranges<R: Read>(input: R) -> Result<RangeTable, AppError> {
    let mut reader = csv_reader(input);
    let headers = reader
        .headers()
        .map_err(|e| AppError::input(format!("Failed to read range CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let expt_idx = RANGE_EXPT_COLUMNS
        .iter()
        .find_map(|name| header_map.get(*name).copied())
        .ok_or_else(|| AppError::input("Missing required column in range CSV: `Expt.`"))?;
    let min_idx = require_column(&header_map, RANGE_MIN_COLUMN, "range")?;
    let max_idx = require_column(&header_map, RANGE_MAX_COLUMN, "range")?;

    let mut records = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_range_row(&record, expt_idx, min_idx, max_idx) {
            Ok(r) => records.push(r),
            Err((label, message)) => {
                // A labelled row still counts towards its experiment: lookup
                // then reports it as ambiguous or invalid instead of missing.
                if let Some(expt) = label {
                    records.push(RangeRecord {
                        expt,
                        min_x: f64::NAN,
                        max_x: f64::NAN,
                    });
                }
                row_errors.push(RowError { line, message });
            }
        }
    }

    Ok(RangeTable {
        records,
        row_errors,
        rows_read,
    })
}

/// Normalize an experiment label so `3`, `3.0` and ` 3 ` compare equal.
pub fn normalize_label(raw: &str) -> String {
    let s = raw.trim();
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 => format!("{}", v as i64),
        _ => s.to_string(),
    }
}

/// On failure, returns the normalized label (when present) with the message.
fn parse_range_row(
    record: &StringRecord,
    expt_idx: usize,
    min_idx: usize,
    max_idx: usize,
) -> Result<RangeRecord, (Option<String>, String)> {
    let Some(raw) = get_value(record, expt_idx) else {
        return Err((None, "Missing experiment label.".to_string()));
    };
    let expt = normalize_label(raw);

    let bound = |idx: usize, name: &str| {
        get_value(record, idx)
            .ok_or_else(|| format!("Missing `{name}`."))
            .and_then(|s| parse_f64(s).map_err(|raw| format!("Invalid `{name}` '{raw}'.")))
    };
    let bounds = bound(min_idx, "Min x").and_then(|min_x| bound(max_idx, "Max x").map(|max_x| (min_x, max_x)));

    match bounds {
        Ok((min_x, max_x)) => Ok(RangeRecord { expt, min_x, max_x }),
        Err(message) => Err((Some(expt), message)),
    }
}

fn csv_reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input)
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    // First occurrence wins on duplicate names.
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        map.entry(normalize_header_name(name)).or_insert(idx);
    }
    map
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often carry a UTF-8 BOM on the first header.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn require_column(header_map: &HashMap<String, usize>, name: &str, table: &str) -> Result<usize, AppError> {
    header_map
        .get(name)
        .copied()
        .ok_or_else(|| AppError::input(format!("Missing required column in {table} CSV: `{name}`")))
}

fn get_value(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

/// Parse a finite float; the error carries the raw text.
fn parse_f64(s: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(s.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oxides(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn profiles_read_with_bom_and_mixed_case() {
        let csv = "\u{feff}Expt,X,SiO2,TiO2,extra\nSpDis3,0,50.1,2.0,a\nSpDis3,1.5,49.0,,b\n";
        let table = read_profiles(csv.as_bytes(), &oxides(&["TiO2", "SiO2"])).unwrap();

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].values, vec![Some(2.0), Some(50.1)]);
        assert_eq!(table.rows[1].values, vec![None, Some(49.0)]);
        assert_eq!(table.rows[1].line, 3);
        assert_eq!(table.oxide_index("SiO2"), Some(1));
    }

    #[test]
    fn missing_oxide_column_is_structural() {
        let csv = "Expt,x,SiO2\nSpDis3,0,50.1\n";
        let err = read_profiles(csv.as_bytes(), &oxides(&["SiO2", "K2O"])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("`K2O`"), "{err}");
    }

    #[test]
    fn bad_rows_are_reported_and_skipped() {
        let csv = "Expt,x,CaO\nSpDis3,abc,1.0\n,1,2.0\nSpDis3,2,n.d.\nSpDis3,3,4.0\n";
        let table = read_profiles(csv.as_bytes(), &oxides(&["CaO"])).unwrap();

        assert_eq!(table.rows_read, 4);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].values, vec![None]);
        let lines: Vec<usize> = table.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, [2, 3]);
    }

    #[test]
    fn profiles_without_rows_abort() {
        let csv = "Expt,x,CaO\n";
        let err = read_profiles(csv.as_bytes(), &oxides(&["CaO"])).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_NO_DATA);
    }

    #[test]
    fn ranges_normalize_labels() {
        let csv = "Expt.,Min x,Max x\n3,0,4\n7.0,1.5,9\n 10 ,2,x\n";
        let table = read_ranges(csv.as_bytes()).unwrap();

        assert_eq!(table.records[0].expt, "3");
        assert_eq!(table.records[1].expt, "7");
        assert_eq!(table.records[1].min_x, 1.5);
        assert_eq!(table.row_errors.len(), 1);
        assert_eq!(table.row_errors[0].line, 4);
    }

    #[test]
    fn malformed_range_rows_keep_their_label() {
        let csv = "Expt.,Min x,Max x
3,0,4
3,abc,4
7,,9
,0,1
";
        let table = read_ranges(csv.as_bytes()).unwrap();

        let lines: Vec<usize> = table.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, [3, 4, 5]);
        assert!(table.row_errors[0].message.contains("Min x"), "{}", table.row_errors[0].message);

        // The unlabelled row is dropped; the labelled ones stay with NaN bounds.
        let labels: Vec<&str> = table.records.iter().map(|r| r.expt.as_str()).collect();
        assert_eq!(labels, ["3", "3", "7"]);
        assert!(table.records[1].min_x.is_nan());

        let ambiguous = crate::data::lookup_range(&table.records, "3").unwrap_err();
        assert_eq!(ambiguous.kind(), "ambiguous_range");
        let invalid = crate::data::lookup_range(&table.records, "7").unwrap_err();
        assert_eq!(invalid.kind(), "invalid_range");
    }

    #[test]
    fn ranges_accept_plain_expt_header() {
        let csv = "Expt,Min x,Max x\n21,0,4\n";
        let table = read_ranges(csv.as_bytes()).unwrap();
        assert_eq!(table.records[0].expt, "21");
    }

    #[test]
    fn ranges_require_bounds() {
        let csv = "Expt.,Min x\n3,0\n";
        assert!(read_ranges(csv.as_bytes()).is_err());
    }

    #[test]
    fn label_normalization() {
        assert_eq!(normalize_label(" 3 "), "3");
        assert_eq!(normalize_label("3.0"), "3");
        assert_eq!(normalize_label("3.5"), "3.5");
        assert_eq!(normalize_label("A1"), "A1");
    }
}
