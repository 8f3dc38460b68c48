use chrono::{DateTime, Months, NaiveDate, NaiveTime, Utc};

use crate::error::{AppError, AppResult};

pub mod auth_service;
pub mod member_service;
pub mod order_service;
pub mod product_service;

/// Resolve a "YYYY-MM" month string to the half-open UTC interval
/// [start of month, start of next month).
pub fn month_range(month: &str) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    let start = NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d")
        .map_err(|_| AppError::InvalidMonth(month.to_string()))?;
    let end = start
        .checked_add_months(Months::new(1))
        .ok_or_else(|| AppError::InvalidMonth(month.to_string()))?;
    Ok((
        start.and_time(NaiveTime::MIN).and_utc(),
        end.and_time(NaiveTime::MIN).and_utc(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn month_range_is_half_open() {
        let (start, end) = month_range("2024-09").unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn month_range_rolls_over_december() {
        let (start, end) = month_range("2024-12").unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn month_range_rejects_malformed_input() {
        for input in ["invalid-month", "2024", "2024-13", "2024-09-05", ""] {
            assert!(
                matches!(month_range(input), Err(AppError::InvalidMonth(_))),
                "expected {input:?} to be rejected"
            );
        }
    }
}
