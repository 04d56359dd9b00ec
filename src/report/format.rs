//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized (important for snapshot tests)

use crate::app::pipeline::RunOutput;
use crate::domain::{PairResult, ResultTable, RunConfig};
use crate::io::ingest::RowError;

/// Row errors listed in full before the summary switches to a count.
const MAX_LISTED_ROW_ERRORS: usize = 5;

/// Format the full run summary (inputs + per-pair results table).
pub fn format_run_summary(run: &RunOutput, config: &RunConfig) -> String {
    let mut out = String::new();

    out.push_str("=== dfit - erfc diffusion profile fit ===\n");
    out.push_str(&format!(
        "Profiles: {} ({} of {} rows used)\n",
        config.profiles_path.display(),
        run.profiles.rows.len(),
        run.profiles.rows_read,
    ));
    out.push_str(&format!(
        "Ranges:   {} ({} records)\n",
        config.ranges_path.display(),
        run.ranges.records.len(),
    ));
    out.push_str(&format!(
        "Pairs:    {} experiment(s) x {} oxide(s), {} failed\n",
        config.experiments.len(),
        config.oxides.len(),
        run.table.failed(),
    ));

    push_row_errors(&mut out, "profile", &run.profiles.row_errors);
    push_row_errors(&mut out, "range", &run.ranges.row_errors);

    out.push('\n');
    out.push_str(&format_results_table(&run.table));
    out
}

/// Format the results as an aligned table.
pub fn format_results_table(table: &ResultTable) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<8} {:<8} {:>12} {:>12} {:>5} {:>10} {:>8} {:<18}",
            "Expt", "Oxide", "Slope", "c0", "N", "RMSE", "R2", "Status"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<8} {:-<8} {:-<12} {:-<12} {:-<5} {:-<10} {:-<8} {:-<18}",
            "", "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for row in table.rows() {
        out.push_str(format_row(row).trim_end());
        out.push('\n');
    }
    out
}

fn format_row(row: &PairResult) -> String {
    let rec = row.to_record();
    format!(
        "{:<8} {:<8} {:>12} {:>12} {:>5} {:>10} {:>8} {:<18}",
        truncate(&rec.expt, 8),
        truncate(&rec.oxide, 8),
        fmt_opt(rec.slope, 6),
        fmt_opt(rec.c0, 4),
        rec.n.map(|n| n.to_string()).unwrap_or_default(),
        fmt_opt(rec.rmse, 4),
        fmt_opt(rec.r_squared, 4),
        rec.status,
    )
}

fn push_row_errors(out: &mut String, table: &str, errors: &[RowError]) {
    if errors.is_empty() {
        return;
    }
    out.push_str(&format!("Skipped {} {table} row(s):\n", errors.len()));
    for e in errors.iter().take(MAX_LISTED_ROW_ERRORS) {
        out.push_str(&format!("  line {}: {}\n", e.line, e.message));
    }
    if errors.len() > MAX_LISTED_ROW_ERRORS {
        out.push_str(&format!("  ... and {} more\n", errors.len() - MAX_LISTED_ROW_ERRORS));
    }
}

fn fmt_opt(v: Option<f64>, precision: usize) -> String {
    v.map(|x| format!("{x:.precision$}")).unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DiffusionParams, FitQuality, ProfileFit, ResultTableBuilder, StartKind};
    use crate::error::PairError;

    #[test]
    fn results_table_snapshot() {
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
            expt: "21".to_string(),
            oxide: "Na2O".to_string(),
            outcome: Err(PairError::InsufficientData {
                expt: "21".to_string(),
                oxide: "Na2O".to_string(),
                n: 1,
                required: 2,
            }),
        });

        let txt = format_results_table(&builder.build());
        let expected = concat!(
            "Expt     Oxide           Slope           c0     N       RMSE       R2 Status\n",
            "-------- -------- ------------ ------------ ----- ---------- -------- ------------------\n",
            "3        TiO2         0.500000       2.0000     5     0.0000   1.0000 ok\n",
            "21       Na2O                -            -     1          -        - insufficient_data\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("Al2O3", 8), "Al2O3");
        assert_eq!(truncate("VeryLongOxide", 5), "Very.");
    }
}
