//! Write results and synthetic inputs.
//!
//! The results CSV is meant to be easy to consume in spreadsheets or
//! downstream scripts: one row per (experiment, oxide), failed pairs included
//! with empty numeric fields and a `Status` tag.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{FitRecord, ProfileRow, RangeRecord, ResultTable, RunConfig};
use crate::error::AppError;
use crate::io::ingest::RowError;

/// Write the result table as CSV.
pub fn write_results_csv(path: &Path, table: &ResultTable) -> Result<(), AppError> {
    let file = create(path, "results CSV")?;
    write_results(file, table)?;
    log::info!("wrote {} result row(s) to '{}'", table.len(), path.display());
    Ok(())
}

/// Serialize the result table as CSV to any writer.
pub fn write_results<W: Write>(out: W, table: &ResultTable) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);
    let records = table.records();
    if records.is_empty() {
        // serde only emits headers alongside the first record.
        writer
            .write_record(["Expt", "Oxide", "Slope", "c0", "Slope_err", "c0_err", "N", "RMSE", "R2", "Status"])
            .map_err(|e| AppError::input(format!("Failed to write results header: {e}")))?;
    }
    for record in &records {
        writer
            .serialize(record)
            .map_err(|e| AppError::input(format!("Failed to write results row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::input(format!("Failed to flush results CSV: {e}")))?;
    Ok(())
}

/// JSON document describing a whole run.
#[derive(Debug, Serialize)]
pub struct RunDocument<'a> {
    pub tool: &'static str,
    pub version: &'static str,
    pub generated: DateTime<Utc>,
    pub profiles: &'a Path,
    pub ranges: &'a Path,
    pub experiments: &'a [String],
    pub oxides: &'a [String],
    pub expt_prefix: &'a str,
    pub results: Vec<FitRecord>,
    pub profile_row_errors: &'a [RowError],
    pub range_row_errors: &'a [RowError],
}

/// Write the run as pretty JSON.
pub fn write_run_json(
    path: &Path,
    config: &RunConfig,
    table: &ResultTable,
    profile_row_errors: &[RowError],
    range_row_errors: &[RowError],
) -> Result<(), AppError> {
    let file = create(path, "run JSON")?;
    let doc = RunDocument {
        tool: "dfit",
        version: env!("CARGO_PKG_VERSION"),
        generated: Utc::now(),
        profiles: &config.profiles_path,
        ranges: &config.ranges_path,
        experiments: &config.experiments,
        oxides: &config.oxides,
        expt_prefix: &config.expt_prefix,
        results: table.records(),
        profile_row_errors,
        range_row_errors,
    };
    serde_json::to_writer_pretty(file, &doc)
        .map_err(|e| AppError::input(format!("Failed to write run JSON: {e}")))?;
    log::info!("wrote run JSON to '{}'", path.display());
    Ok(())
}

/// Write a profile table (`Expt,x,<oxides...>`).
pub fn write_profiles_csv(path: &Path, oxides: &[String], rows: &[ProfileRow]) -> Result<(), AppError> {
    let file = create(path, "profile CSV")?;
    let mut writer = csv::Writer::from_writer(file);

    let mut header = vec!["Expt".to_string(), "x".to_string()];
    header.extend(oxides.iter().cloned());
    writer
        .write_record(&header)
        .map_err(|e| AppError::input(format!("Failed to write profile header: {e}")))?;

    for row in rows {
        let mut fields = vec![row.expt.clone(), row.x.to_string()];
        fields.extend(row.values.iter().map(|v| v.map(|c| c.to_string()).unwrap_or_default()));
        writer
            .write_record(&fields)
            .map_err(|e| AppError::input(format!("Failed to write profile row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::input(format!("Failed to flush profile CSV: {e}")))?;
    Ok(())
}

/// Write a range table (`Expt.,Min x,Max x`).
pub fn write_ranges_csv(path: &Path, ranges: &[RangeRecord]) -> Result<(), AppError> {
    let file = create(path, "range CSV")?;
    let mut writer = csv::Writer::from_writer(file);
    writer
        .write_record(["Expt.", "Min x", "Max x"])
        .map_err(|e| AppError::input(format!("Failed to write range header: {e}")))?;
    for r in ranges {
        writer
            .write_record([r.expt.clone(), r.min_x.to_string(), r.max_x.to_string()])
            .map_err(|e| AppError::input(format!("Failed to write range row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::input(format!("Failed to flush range CSV: {e}")))?;
    Ok(())
}

fn create(path: &Path, what: &str) -> Result<File, AppError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .map_err(|e| AppError::input(format!("Failed to create directory '{}': {e}", dir.display())))?;
    }
    File::create(path).map_err(|e| AppError::input(format!("Failed to create {what} '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DiffusionParams, FitQuality, PairResult, ProfileFit, ResultTableBuilder, StartKind};
    use crate::error::PairError;

    fn table() -> ResultTable {
        let mut builder = ResultTableBuilder::default();
        builder.push(PairResult {
            expt: "3".to_string(),
            oxide: "TiO2".to_string(),
            outcome: Ok(ProfileFit {
                params: DiffusionParams { slope: 0.5, c0: 2.0 },
                slope_err: None,
                c0_err: None,
                quality: FitQuality {
                    n: 5,
                    sse: 0.0,
                    rmse: 0.0,
                    r_squared: Some(1.0),
                },
                evaluations: 6,
                start: StartKind::Primary,
            }),
        });
        builder.push(PairResult {
            expt: "7".to_string(),
            oxide: "TiO2".to_string(),
            outcome: Err(PairError::MissingRangeRecord {
                expt: "7".to_string(),
                oxide: "TiO2".to_string(),
            }),
        });
        builder.build()
    }

    #[test]
    fn results_csv_layout() {
        let mut buf = Vec::new();
        write_results(&mut buf, &table()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Expt,Oxide,Slope,c0,Slope_err,c0_err,N,RMSE,R2,Status");
        assert_eq!(lines[1], "3,TiO2,0.5,2.0,,,5,0.0,1.0,ok");
        assert_eq!(lines[2], "7,TiO2,,,,,,,,missing_range");
    }

    #[test]
    fn run_json_lists_results_and_row_errors() {
        let dir = std::env::temp_dir().join(format!("dfit-json-{}", std::process::id()));
        let path = dir.join("nested/run.json");
        let config = RunConfig {
            profiles_path: "profiles.csv".into(),
            ranges_path: "ranges.csv".into(),
            output_path: "out.csv".into(),
            export_json: Some(path.clone()),
            experiments: vec!["3".to_string(), "7".to_string()],
            oxides: vec!["TiO2".to_string()],
            expt_prefix: "SpDis".to_string(),
            fallback: true,
            strict: false,
            lm: Default::default(),
        };
        let row_errors = [RowError {
            line: 4,
            message: "Invalid position 'oops'.".to_string(),
        }];

        write_run_json(&path, &config, &table(), &row_errors, &[]).unwrap();
        let doc: serde_json::Value = serde_json::from_reader(File::open(&path).unwrap()).unwrap();

        assert_eq!(doc["tool"], "dfit");
        assert_eq!(doc["expt_prefix"], "SpDis");
        assert_eq!(doc["results"][0]["Slope"], 0.5);
        assert_eq!(doc["results"][1]["Status"], "missing_range");
        assert!(doc["results"][1]["Slope"].is_null());
        assert_eq!(doc["profile_row_errors"][0]["line"], 4);
        assert!(doc["generated"].is_string());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_table_still_has_header() {
        let mut buf = Vec::new();
        write_results(&mut buf, &ResultTable::default()).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap().trim_end(),
            "Expt,Oxide,Slope,c0,Slope_err,c0_err,N,RMSE,R2,Status"
        );
    }
}
