//! Range lookup and row selection.
//!
//! Each experiment is fitted only over its validity window `[min x, max x]`
//! from the range table. Lookup is strict: exactly one range record must match
//! an experiment, anything else is reported instead of guessed.

use crate::domain::{ProfileRow, ProfileSeries, RangeRecord, RangeWindow};
use crate::error::PairError;

/// Resolve the window for experiment `label`.
///
/// The returned error has an empty oxide; callers attach it with
/// [`PairError::with_oxide`].
pub fn lookup_range(records: &[RangeRecord], label: &str) -> Result<RangeWindow, PairError> {
    let mut matches = records.iter().filter(|r| r.expt == label);
    let Some(record) = matches.next() else {
        return Err(PairError::MissingRangeRecord {
            expt: label.to_string(),
            oxide: String::new(),
        });
    };

    let extra = matches.count();
    if extra > 0 {
        return Err(PairError::AmbiguousRangeRecord {
            expt: label.to_string(),
            oxide: String::new(),
            count: extra + 1,
        });
    }

    if !(record.min_x.is_finite() && record.max_x.is_finite()) || record.min_x > record.max_x {
        return Err(PairError::InvalidRange {
            expt: label.to_string(),
            oxide: String::new(),
            min: record.min_x,
            max: record.max_x,
        });
    }

    Ok(RangeWindow {
        min: record.min_x,
        max: record.max_x,
    })
}

/// Rows of experiment `expt_id` with `x` inside `window`, in input order.
pub fn filter_rows<'a, I>(rows: I, expt_id: &str, window: &RangeWindow) -> Vec<&'a ProfileRow>
where
    I: IntoIterator<Item = &'a ProfileRow>,
{
    rows.into_iter()
        .filter(|r| r.expt == expt_id && window.contains(r.x))
        .collect()
}

/// Collect `(x, c)` for oxide column `oxide_idx`, skipping rows without a value.
pub fn extract_series(rows: &[&ProfileRow], oxide_idx: usize) -> ProfileSeries {
    let mut series = ProfileSeries::with_capacity(rows.len());
    for row in rows {
        match row.values.get(oxide_idx).copied().flatten() {
            Some(c) if c.is_finite() => series.push(row.x, c),
            _ => log::debug!("line {}: no value for oxide column {oxide_idx}", row.line),
        }
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(expt: &str, min_x: f64, max_x: f64) -> RangeRecord {
        RangeRecord {
            expt: expt.to_string(),
            min_x,
            max_x,
        }
    }

    fn row(line: usize, expt: &str, x: f64, values: Vec<Option<f64>>) -> ProfileRow {
        ProfileRow {
            line,
            expt: expt.to_string(),
            x,
            values,
        }
    }

    #[test]
    fn lookup_with_zero_one_and_two_matches() {
        let none: Vec<RangeRecord> = vec![range("7", 0.0, 1.0)];
        assert!(matches!(
            lookup_range(&none, "3"),
            Err(PairError::MissingRangeRecord { ref expt, .. }) if expt == "3"
        ));

        let one = vec![range("3", 0.5, 4.0), range("7", 0.0, 1.0)];
        assert_eq!(lookup_range(&one, "3").unwrap(), RangeWindow { min: 0.5, max: 4.0 });

        let two = vec![range("3", 0.5, 4.0), range("3", 1.0, 2.0)];
        assert!(matches!(
            lookup_range(&two, "3"),
            Err(PairError::AmbiguousRangeRecord { count: 2, .. })
        ));
    }

    #[test]
    fn lookup_rejects_inverted_window() {
        let records = vec![range("3", 4.0, 1.0)];
        assert!(matches!(lookup_range(&records, "3"), Err(PairError::InvalidRange { .. })));
    }

    #[test]
    fn filter_is_inclusive_and_ordered() {
        let rows = vec![
            row(2, "SpDis3", 3.0, vec![]),
            row(3, "SpDis3", -1.0, vec![]),
            row(4, "SpDis7", 1.0, vec![]),
            row(5, "SpDis3", 0.0, vec![]),
            row(6, "SpDis3", 4.0, vec![]),
            row(7, "SpDis3", 4.5, vec![]),
        ];
        let window = RangeWindow { min: 0.0, max: 4.0 };

        let picked: Vec<usize> = filter_rows(&rows, "SpDis3", &window).iter().map(|r| r.line).collect();
        assert_eq!(picked, [2, 5, 6]);
    }

    #[test]
    fn filter_is_idempotent() {
        let rows: Vec<ProfileRow> = (0..20)
            .map(|i| row(i + 2, if i % 3 == 0 { "SpDis10" } else { "SpDis11" }, i as f64 * 0.5, vec![]))
            .collect();
        let window = RangeWindow { min: 1.0, max: 7.0 };

        let once = filter_rows(&rows, "SpDis11", &window);
        let twice = filter_rows(once.iter().copied(), "SpDis11", &window);
        assert_eq!(once, twice);
        assert!(!once.is_empty());
    }

    #[test]
    fn filter_can_be_empty() {
        let rows = vec![row(2, "SpDis3", 10.0, vec![])];
        let window = RangeWindow { min: 0.0, max: 4.0 };
        assert!(filter_rows(&rows, "SpDis3", &window).is_empty());
    }

    #[test]
    fn series_skips_missing_values() {
        let rows = vec![
            row(2, "SpDis3", 0.0, vec![Some(1.0), Some(5.0)]),
            row(3, "SpDis3", 1.0, vec![None, Some(4.0)]),
            row(4, "SpDis3", 2.0, vec![Some(0.5), Some(3.0)]),
        ];
        let refs: Vec<&ProfileRow> = rows.iter().collect();

        let first = extract_series(&refs, 0);
        assert_eq!(first.x, [0.0, 2.0]);
        assert_eq!(first.c, [1.0, 0.5]);

        let second = extract_series(&refs, 1);
        assert_eq!(second.len(), 3);
    }
}
