//! Expiry date computation for newly purchased tickets.
//!
//! Subscription tickets expire at the end of the month one year after
//! purchase, so every ticket sold in a given month lapses on the same day.
//! Short promotional offers instead expire a literal number of days out.

use chrono::{Datelike, Days, NaiveDate};

use super::error::TicketError;

/// Validity at or above this many days collapses to the month-end rule.
pub const MONTH_END_THRESHOLD_DAYS: i32 = 365;

/// Computes the stored expiry date for a ticket bought on `purchase_date`.
///
/// `None` (or zero) validity and anything `>= 365` days yields the last day
/// of the month one year after purchase. Smaller positive values are plain
/// calendar-day addition. Negative values are rejected.
pub fn calculate_expiry_date(
    purchase_date: NaiveDate,
    validity_days: Option<i32>,
) -> Result<NaiveDate, TicketError> {
    match validity_days {
        Some(days) if days < 0 => Err(TicketError::InvalidArgument(format!(
            "validity_days must not be negative (got {})",
            days
        ))),
        Some(days) if days > 0 && days < MONTH_END_THRESHOLD_DAYS => purchase_date
            .checked_add_days(Days::new(days as u64))
            .ok_or_else(|| out_of_range(purchase_date)),
        _ => one_year_month_end(purchase_date).ok_or_else(|| out_of_range(purchase_date)),
    }
}

/// Last calendar day of the month one year after `date`.
///
/// The purchase day of month never matters, which also takes care of
/// 29 February rolling into a non-leap year.
pub fn one_year_month_end(date: NaiveDate) -> Option<NaiveDate> {
    last_day_of_month(date.year().checked_add(1)?, date.month())
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year.checked_add(1)?, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

fn out_of_range(date: NaiveDate) -> TicketError {
    TicketError::InvalidArgument(format!("expiry for {} is outside the calendar range", date))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_no_validity_snaps_to_month_end_next_year() {
        assert_eq!(
            calculate_expiry_date(date(2025, 1, 20), None).unwrap(),
            date(2026, 1, 31)
        );
        assert_eq!(
            calculate_expiry_date(date(2025, 3, 15), None).unwrap(),
            date(2026, 3, 31)
        );
    }

    #[test]
    fn test_leap_day_normalizes_to_february_end() {
        assert_eq!(
            calculate_expiry_date(date(2024, 2, 29), None).unwrap(),
            date(2025, 2, 28)
        );
        // Into a leap year February has 29 days.
        assert_eq!(
            calculate_expiry_date(date(2023, 2, 1), None).unwrap(),
            date(2024, 2, 29)
        );
    }

    #[test]
    fn test_december_purchase_ends_next_december() {
        assert_eq!(
            calculate_expiry_date(date(2025, 12, 31), None).unwrap(),
            date(2026, 12, 31)
        );
    }

    #[test]
    fn test_short_validity_adds_exact_days() {
        assert_eq!(
            calculate_expiry_date(date(2025, 6, 1), Some(30)).unwrap(),
            date(2025, 7, 1)
        );
        assert_eq!(
            calculate_expiry_date(date(2025, 12, 15), Some(180)).unwrap(),
            date(2026, 6, 13)
        );
        assert_eq!(
            calculate_expiry_date(date(2025, 1, 1), Some(364)).unwrap(),
            date(2025, 12, 31)
        );
    }

    #[test]
    fn test_long_validity_collapses_to_month_end_rule() {
        let purchase = date(2025, 6, 1);
        let month_end = calculate_expiry_date(purchase, None).unwrap();
        assert_eq!(calculate_expiry_date(purchase, Some(400)).unwrap(), month_end);
        assert_eq!(calculate_expiry_date(purchase, Some(365)).unwrap(), month_end);
        assert_eq!(month_end, date(2026, 6, 30));
    }

    #[test]
    fn test_zero_validity_is_treated_as_unset() {
        let purchase = date(2025, 4, 10);
        assert_eq!(
            calculate_expiry_date(purchase, Some(0)).unwrap(),
            date(2026, 4, 30)
        );
    }

    #[test]
    fn test_negative_validity_is_rejected() {
        let err = calculate_expiry_date(date(2025, 6, 1), Some(-1)).unwrap_err();
        assert!(matches!(err, TicketError::InvalidArgument(_)));
    }

    #[test]
    fn test_month_end_result_is_always_last_day_one_year_out() {
        let mut day = date(2023, 1, 1);
        while day < date(2025, 1, 1) {
            let expiry = calculate_expiry_date(day, None).unwrap();
            assert_eq!(expiry.year(), day.year() + 1);
            assert_eq!(expiry.month(), day.month());
            assert_ne!(expiry.succ_opt().unwrap().month(), expiry.month());
            day = day.succ_opt().unwrap();
        }
    }
}
