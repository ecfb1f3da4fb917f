//! Money and date normalization for pt-BR statement text
//!
//! Amounts are printed as `1.234,56` (dot thousands, comma decimals) and
//! dates as `dd/mm` or `dd/mm/yyyy`. Parsing never fails: a malformed amount
//! reads as zero and a malformed date as `None`.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::models::TransactionDate;

/// Parse a pt-BR amount such as `1.234,56`, `-35,90` or `- 1 234,00`.
///
/// Whitespace inside the token is dropped first (text extraction tends to
/// split digits). Returns zero on anything unparseable.
pub fn parse_money(text: &str) -> Decimal {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let normalized = compact.replace('.', "").replace(',', ".");
    Decimal::from_str(&normalized).unwrap_or(Decimal::ZERO)
}

/// Parse a full `dd/mm/yyyy` date
pub fn parse_full_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%d/%m/%Y").ok()
}

/// Split a `dd/mm` token into (day, month)
pub fn parse_day_month(text: &str) -> Option<(u32, u32)> {
    let (day, month) = text.trim().split_once('/')?;
    let day: u32 = day.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    Some((day, month))
}

/// Where a `dd/mm` transaction falls relative to the due date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateResolution {
    /// Current billing period; carries the absolute date (or the raw pair when
    /// the day/month does not form a valid calendar date)
    Current(TransactionDate),
    /// Upcoming installment printed as a preview of a later statement
    FuturePreview,
}

/// Infer the year of a `dd/mm` transaction from the statement due date.
///
/// `delta = month - due_month`:
/// - `0 < delta < 6` is a future preview;
/// - `delta >= 6` belongs to the year before the due date;
/// - `delta == 0` with a day after the due day is a future preview;
/// - anything else is in the due date's year.
///
/// Without a due date the pair is kept as printed.
pub fn resolve_transaction_date(day: u32, month: u32, due: Option<NaiveDate>) -> DateResolution {
    let partial = TransactionDate::Partial { day, month };
    let Some(due) = due else {
        return DateResolution::Current(partial);
    };

    let delta = month as i32 - due.month() as i32;
    let mut year = due.year();
    if delta > 0 {
        if delta < 6 {
            return DateResolution::FuturePreview;
        }
        year -= 1;
    } else if delta == 0 && day > due.day() {
        return DateResolution::FuturePreview;
    }

    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => DateResolution::Current(TransactionDate::Resolved(date)),
        None => DateResolution::Current(partial),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_money_locale_format() {
        assert_eq!(parse_money("1.234,56"), dec!(1234.56));
        assert_eq!(parse_money("0,00"), Decimal::ZERO);
        assert_eq!(parse_money("35,90"), dec!(35.90));
        assert_eq!(parse_money("1.000.000,00"), dec!(1000000.00));
    }

    #[test]
    fn test_parse_money_negative_and_split_tokens() {
        assert_eq!(parse_money("-35,90"), dec!(-35.90));
        assert_eq!(parse_money("- 1 234,00"), dec!(-1234.00));
        assert_eq!(parse_money(" 12,3 4 "), dec!(12.34));
    }

    #[test]
    fn test_parse_money_garbage_is_zero() {
        assert_eq!(parse_money(""), Decimal::ZERO);
        assert_eq!(parse_money("R$"), Decimal::ZERO);
        assert_eq!(parse_money(",,"), Decimal::ZERO);
        assert_eq!(parse_money("abc"), Decimal::ZERO);
        assert_eq!(parse_money("."), Decimal::ZERO);
    }

    #[test]
    fn test_parse_dates() {
        assert_eq!(parse_full_date("10/10/2025"), Some(date(2025, 10, 10)));
        assert_eq!(parse_full_date("31/02/2025"), None);
        assert_eq!(parse_day_month("05/01"), Some((5, 1)));
        assert_eq!(parse_day_month("5-1"), None);
    }

    #[test]
    fn test_future_preview_within_six_months() {
        // due 10/10/2025, transaction 12/12: delta 2
        let res = resolve_transaction_date(12, 12, Some(date(2025, 10, 10)));
        assert_eq!(res, DateResolution::FuturePreview);
    }

    #[test]
    fn test_previous_year_at_six_months_or_more() {
        // due 05/01/2026, transaction 20/12: delta 11
        let res = resolve_transaction_date(20, 12, Some(date(2026, 1, 5)));
        assert_eq!(
            res,
            DateResolution::Current(TransactionDate::Resolved(date(2025, 12, 20)))
        );

        // exactly six months ahead is also last year
        let res = resolve_transaction_date(1, 7, Some(date(2026, 1, 5)));
        assert_eq!(
            res,
            DateResolution::Current(TransactionDate::Resolved(date(2025, 7, 1)))
        );
    }

    #[test]
    fn test_same_month_after_due_day_is_preview() {
        let due = Some(date(2025, 10, 10));
        assert_eq!(resolve_transaction_date(11, 10, due), DateResolution::FuturePreview);
        assert_eq!(
            resolve_transaction_date(10, 10, due),
            DateResolution::Current(TransactionDate::Resolved(date(2025, 10, 10)))
        );
    }

    #[test]
    fn test_earlier_month_same_year() {
        let res = resolve_transaction_date(28, 9, Some(date(2025, 10, 10)));
        assert_eq!(
            res,
            DateResolution::Current(TransactionDate::Resolved(date(2025, 9, 28)))
        );
    }

    #[test]
    fn test_unresolvable_dates_stay_partial() {
        assert_eq!(
            resolve_transaction_date(3, 7, None),
            DateResolution::Current(TransactionDate::Partial { day: 3, month: 7 })
        );
        // 31/09 is not a calendar date
        assert_eq!(
            resolve_transaction_date(31, 9, Some(date(2025, 10, 10))),
            DateResolution::Current(TransactionDate::Partial { day: 31, month: 9 })
        );
    }
}
