//! Small geometric and date helpers shared across the placement, loader and
//! scheduler layers.

use chrono::NaiveDate;

/// Chebyshev distance between two grid cells.
pub fn chebyshev(a: (i64, i64), b: (i64, i64)) -> i64 {
    (a.0 - b.0).abs().max((a.1 - b.1).abs())
}

/// Parses a deadline given either as an ISO date (`"2024-06-15"`) or the `YYMMDD`
/// shorthand (`"240615"` -> `2024-06-15`). Pure function, no file I/O.
pub fn parse_deadline(raw: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if raw.len() == 6 && raw.chars().all(|c| c.is_ascii_digit()) {
        let yy: i32 = raw[0..2].parse().ok()?;
        let mm: u32 = raw[2..4].parse().ok()?;
        let dd: u32 = raw[4..6].parse().ok()?;
        return NaiveDate::from_ymd_opt(2000 + yy, mm, dd);
    }
    None
}

/// Inclusive loading window `[deadline - window_days, deadline - 1]`.
pub fn loading_window(deadline: NaiveDate, window_days: i64) -> (NaiveDate, NaiveDate) {
    (
        deadline - chrono::Duration::days(window_days),
        deadline - chrono::Duration::days(1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chebyshev_distance_is_symmetric_max_axis() {
        assert_eq!(chebyshev((0, 0), (3, 1)), 3);
        assert_eq!(chebyshev((0, 0), (1, 5)), 5);
        assert_eq!(chebyshev((2, 2), (2, 2)), 0);
    }

    #[test]
    fn parse_deadline_accepts_iso_and_yymmdd() {
        assert_eq!(
            parse_deadline("2024-06-15"),
            NaiveDate::from_ymd_opt(2024, 6, 15)
        );
        assert_eq!(
            parse_deadline("240615"),
            NaiveDate::from_ymd_opt(2024, 6, 15)
        );
        assert_eq!(parse_deadline("not-a-date"), None);
    }

    #[test]
    fn loading_window_is_deadline_minus_14_to_minus_1() {
        let deadline = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let (start, end) = loading_window(deadline, 14);
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 6, 14).unwrap());
    }
}
