//! Pure value filters applied while rendering pages.

use crate::error::{Error, Result};
use crate::types::DateValue;

pub use crate::tags::filter_denylist;

/// Format as `dd Mon yyyy` in UTC, e.g. `05 Jan 2024`
pub fn readable_date(date: impl Into<DateValue>) -> String {
    date.into().as_utc().format("%d %b %Y").to_string()
}

/// Format as `yyyy-mm-dd` in UTC, suitable for `<time datetime>`
pub fn html_date_string(date: impl Into<DateValue>) -> String {
    date.into().as_utc().format("%Y-%m-%d").to_string()
}

/// First `n` items, or the last `|n|` items when `n` is negative.
///
/// Counts larger than the slice are clamped.
pub fn head<T: Clone>(items: &[T], n: i64) -> Vec<T> {
    if items.is_empty() {
        return Vec::new();
    }

    let len = items.len();
    let count = usize::try_from(n.unsigned_abs())
        .unwrap_or(usize::MAX)
        .min(len);

    if n < 0 {
        items[len - count..].to_vec()
    } else {
        items[..count].to_vec()
    }
}

/// Smallest of `numbers`. An unordered value (NaN) wins, as it poisons the
/// comparison.
pub fn min<T: PartialOrd + Copy>(numbers: &[T]) -> Result<T> {
    let (first, rest) = numbers.split_first().ok_or_else(|| {
        Error::InvalidArgument("min requires at least one number".to_string())
    })?;

    Ok(rest.iter().fold(*first, |acc, &x| {
        if acc.partial_cmp(&acc).is_none() {
            acc
        } else if x.partial_cmp(&x).is_none() || x < acc {
            x
        } else {
            acc
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    #[test]
    fn test_readable_date() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(readable_date(date), "05 Jan 2024");

        let date = NaiveDate::from_ymd_opt(1999, 12, 31).unwrap();
        assert_eq!(readable_date(date), "31 Dec 1999");
    }

    #[test]
    fn test_html_date_string() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(html_date_string(date), "2024-01-05");
    }

    #[test]
    fn test_dates_use_utc_day() {
        // 23:30 UTC on the 4th is already the 5th in UTC+2
        let late = Utc.with_ymd_and_hms(2024, 1, 4, 23, 30, 0).unwrap();
        assert_eq!(readable_date(late), "04 Jan 2024");
        assert_eq!(html_date_string(late), "2024-01-04");

        let offset = chrono::FixedOffset::east_opt(2 * 3600).unwrap();
        let local = offset.with_ymd_and_hms(2024, 1, 5, 1, 30, 0).unwrap();
        assert_eq!(html_date_string(local), "2024-01-04");
    }

    #[test]
    fn test_head_positive_and_negative() {
        let items = [1, 2, 3, 4, 5];
        assert_eq!(head(&items, 2), vec![1, 2]);
        assert_eq!(head(&items, -2), vec![4, 5]);
        assert_eq!(head(&items, 0), Vec::<i32>::new());
    }

    #[test]
    fn test_head_empty_input() {
        let empty: [i32; 0] = [];
        for n in [-3, -1, 0, 1, 3] {
            assert!(head(&empty, n).is_empty());
        }
    }

    #[test]
    fn test_head_clamps_large_counts() {
        let items = ["a", "b", "c"];
        assert_eq!(head(&items, 10), vec!["a", "b", "c"]);
        assert_eq!(head(&items, -10), vec!["a", "b", "c"]);
        assert_eq!(head(&items, i64::MIN), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_min() {
        assert_eq!(min(&[3, 1, 2]).unwrap(), 1);
        assert_eq!(min(&[5]).unwrap(), 5);
        assert_eq!(min(&[2.5, -1.0, 0.0]).unwrap(), -1.0);
    }

    #[test]
    fn test_min_no_arguments_is_invalid() {
        let err = min::<f64>(&[]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_min_nan_propagates() {
        assert!(min(&[1.0, f64::NAN, 0.0]).unwrap().is_nan());
        assert!(min(&[f64::NAN, 1.0]).unwrap().is_nan());
    }
}
