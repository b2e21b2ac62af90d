// src/processing/products/dekad.rs
use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Which date of its 10-day period a product is stamped with.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DekadConvention {
    /// Stamped with the first day (1st, 11th, 21st).
    PeriodStart,
    /// Stamped with the last day (10th, 20th, month end).
    PeriodEnd,
}

/// First and last day covered by a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeCoverage {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimeCoverage {
    pub fn start_timestamp(&self) -> String {
        format!("{}T00:00:00", self.start.format("%Y-%m-%d"))
    }

    pub fn end_timestamp(&self) -> String {
        format!("{}T23:59:59", self.end.format("%Y-%m-%d"))
    }
}

fn first_of_month(d: NaiveDate) -> NaiveDate {
    d - Days::new(d.day0() as u64)
}

fn last_of_month(d: NaiveDate) -> NaiveDate {
    first_of_month(first_of_month(d) + Days::new(31)) - Days::new(1)
}

fn last_of_previous_month(d: NaiveDate) -> NaiveDate {
    first_of_month(d) - Days::new(1)
}

/// Date of the most recent product expected to be published by `today`.
pub fn target_date(convention: DekadConvention, today: NaiveDate) -> NaiveDate {
    let first = first_of_month(today);
    match convention {
        DekadConvention::PeriodStart => match today.day() {
            1..=10 => first_of_month(last_of_previous_month(today)) + Days::new(20),
            11..=20 => first,
            _ => first + Days::new(10),
        },
        DekadConvention::PeriodEnd => match today.day() {
            1..=11 => last_of_previous_month(today),
            12..=21 => first + Days::new(9),
            _ => first + Days::new(19),
        },
    }
}

pub fn time_coverage(convention: DekadConvention, date: NaiveDate) -> TimeCoverage {
    match convention {
        DekadConvention::PeriodStart => {
            let end = if date.day() >= 21 { last_of_month(date) } else { date + Days::new(9) };
            TimeCoverage { start: date, end }
        }
        DekadConvention::PeriodEnd => {
            let start = match date.day() {
                1..=10 => first_of_month(date),
                11..=20 => first_of_month(date) + Days::new(10),
                _ => first_of_month(date) + Days::new(20),
            };
            TimeCoverage { start, end: date }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_period_start_targets() {
        let c = DekadConvention::PeriodStart;
        assert_eq!(target_date(c, d(2025, 3, 5)), d(2025, 2, 21));
        assert_eq!(target_date(c, d(2025, 1, 10)), d(2024, 12, 21));
        assert_eq!(target_date(c, d(2025, 3, 11)), d(2025, 3, 1));
        assert_eq!(target_date(c, d(2025, 3, 20)), d(2025, 3, 1));
        assert_eq!(target_date(c, d(2025, 3, 31)), d(2025, 3, 11));
    }

    #[test]
    fn test_period_end_targets() {
        let c = DekadConvention::PeriodEnd;
        assert_eq!(target_date(c, d(2024, 3, 11)), d(2024, 2, 29));
        assert_eq!(target_date(c, d(2025, 1, 1)), d(2024, 12, 31));
        assert_eq!(target_date(c, d(2025, 5, 12)), d(2025, 5, 10));
        assert_eq!(target_date(c, d(2025, 5, 21)), d(2025, 5, 10));
        assert_eq!(target_date(c, d(2025, 5, 22)), d(2025, 5, 20));
    }

    #[test]
    fn test_coverage() {
        let c = time_coverage(DekadConvention::PeriodStart, d(2025, 2, 21));
        assert_eq!((c.start, c.end), (d(2025, 2, 21), d(2025, 2, 28)));
        assert_eq!(c.end_timestamp(), "2025-02-28T23:59:59");

        let c = time_coverage(DekadConvention::PeriodStart, d(2025, 5, 11));
        assert_eq!(c.end, d(2025, 5, 20));

        let c = time_coverage(DekadConvention::PeriodEnd, d(2025, 5, 31));
        assert_eq!(c.start, d(2025, 5, 21));
        assert_eq!(c.start_timestamp(), "2025-05-21T00:00:00");

        let c = time_coverage(DekadConvention::PeriodEnd, d(2025, 5, 10));
        assert_eq!(c.start, d(2025, 5, 1));
    }
}
