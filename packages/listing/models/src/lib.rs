#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Short-term rental listing types.
//!
//! A [`Listing`] is one snapshot row of a rental listing: the same listing
//! id appears once per snapshot date. [`YearMonth`] is the calendar month
//! used to scope listings by snapshot date.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Minimum-nights threshold below which a listing counts as a short-term
/// rental.
pub const SHORT_TERM_MAX_NIGHTS: u32 = 28;

/// A single listing snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    /// Listing identifier. Shared by every snapshot row of the same listing.
    pub id: u64,
    /// WGS84 latitude.
    pub latitude: f64,
    /// WGS84 longitude.
    pub longitude: f64,
    /// Nightly list price in dollars.
    pub price: f64,
    /// Room type label (e.g. "Entire home/apt").
    pub room_type: String,
    /// Property type label (e.g. "Entire rental unit").
    pub property_type: String,
    /// Minimum number of nights per booking.
    pub minimum_nights: u32,
    /// Whether the listing was open for booking on `date`.
    pub available: bool,
    /// Snapshot date.
    pub date: NaiveDate,
    /// Amenity tags.
    pub amenities: BTreeSet<String>,
}

impl Listing {
    /// Returns `true` when both coordinates are finite and inside the
    /// WGS84 range.
    #[must_use]
    pub fn has_valid_coordinates(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Returns `true` when the listing accepts stays shorter than
    /// [`SHORT_TERM_MAX_NIGHTS`].
    #[must_use]
    pub const fn is_short_term(&self) -> bool {
        self.minimum_nights < SHORT_TERM_MAX_NIGHTS
    }
}

/// A calendar month.
///
/// Scoping by month uses the half-open interval
/// `[first_day(), next().first_day())`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

/// Error returned when a month selection cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid month '{input}': {reason}")]
pub struct ParseMonthError {
    /// The rejected input.
    pub input: String,
    /// Why it was rejected.
    pub reason: &'static str,
}

impl YearMonth {
    /// Creates a month, validating that `month` is in `1..=12` and that the
    /// year is representable.
    ///
    /// # Errors
    ///
    /// Returns [`ParseMonthError`] if the month or year is out of range.
    pub fn new(year: i32, month: u32) -> Result<Self, ParseMonthError> {
        if !(1..=12).contains(&month) {
            return Err(ParseMonthError {
                input: format!("{year}-{month}"),
                reason: "month must be between 1 and 12",
            });
        }
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(ParseMonthError {
                input: format!("{year}-{month}"),
                reason: "year out of range",
            });
        }
        Ok(Self { year, month })
    }

    /// Returns the month containing `date`.
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Calendar year.
    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    /// Month number, `1..=12`.
    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }

    /// First day of the month.
    #[must_use]
    pub fn first_day(self) -> NaiveDate {
        // Validated in `new`/`of`.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// The following calendar month.
    #[must_use]
    pub const fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Returns `true` if `date` falls in this month.
    #[must_use]
    pub fn contains(self, date: NaiveDate) -> bool {
        date >= self.first_day() && date < self.next().first_day()
    }

    /// Long label such as "April 2023".
    #[must_use]
    pub fn long_label(self) -> String {
        self.first_day().format("%B %Y").to_string()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = ParseMonthError;

    /// Accepts `2023-04`, `2023/04`, `4-2023`, `April 2023` and a full
    /// date such as `2023-04-15`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let fail = |reason| ParseMonthError {
            input: input.to_string(),
            reason,
        };

        if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
            return Ok(Self::of(date));
        }

        if let Some((name, year)) = input.split_once(char::is_whitespace) {
            let month = name
                .parse::<chrono::Month>()
                .map_err(|_| fail("unknown month name"))?;
            let year = year.trim().parse().map_err(|_| fail("invalid year"))?;
            return Self::new(year, month.number_from_month());
        }

        let (first, second) = input
            .split_once(['-', '/'])
            .ok_or_else(|| fail("expected YYYY-MM, M-YYYY or 'Month YYYY'"))?;

        let (year, month) = if first.len() == 4 {
            (first, second)
        } else {
            (second, first)
        };

        let year = year.parse().map_err(|_| fail("invalid year"))?;
        let month = month.parse().map_err(|_| fail("invalid month"))?;
        Self::new(year, month)
    }
}

impl TryFrom<(i32, u32)> for YearMonth {
    type Error = ParseMonthError;

    fn try_from((year, month): (i32, u32)) -> Result<Self, Self::Error> {
        Self::new(year, month)
    }
}

impl TryFrom<String> for YearMonth {
    type Error = ParseMonthError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_all_month_forms() {
        let expected = YearMonth::new(2023, 4).unwrap();
        for input in ["2023-04", "2023/4", "4-2023", "04-2023", "April 2023", "apr 2023"] {
            assert_eq!(input.parse::<YearMonth>().unwrap(), expected, "{input}");
        }
    }

    #[test]
    fn rejects_invalid_months() {
        assert!("2023-13".parse::<YearMonth>().is_err());
        assert!("2023-00".parse::<YearMonth>().is_err());
        assert!("Smarch 2023".parse::<YearMonth>().is_err());
        assert!("2023".parse::<YearMonth>().is_err());
    }

    #[test]
    fn full_date_selects_its_month() {
        assert_eq!("2023-04-15".parse::<YearMonth>().unwrap(), YearMonth::new(2023, 4).unwrap());
        assert_eq!("2023-12-31".parse::<YearMonth>().unwrap(), YearMonth::new(2023, 12).unwrap());
        assert!("2023-04-31".parse::<YearMonth>().is_err());
        assert!("2023-13-01".parse::<YearMonth>().is_err());
    }

    #[test]
    fn month_interval_is_half_open() {
        let april = YearMonth::new(2023, 4).unwrap();
        assert!(april.contains(date(2023, 4, 1)));
        assert!(april.contains(date(2023, 4, 15)));
        assert!(april.contains(date(2023, 4, 30)));
        assert!(!april.contains(date(2023, 5, 1)));
        assert!(!april.contains(date(2023, 3, 31)));
    }

    #[test]
    fn december_rolls_into_next_year() {
        let december = YearMonth::new(2023, 12).unwrap();
        assert_eq!(december.next(), YearMonth::new(2024, 1).unwrap());
        assert!(december.contains(date(2023, 12, 31)));
        assert!(!december.contains(date(2024, 1, 1)));
    }

    #[test]
    fn formats_labels() {
        let month = YearMonth::new(2024, 3).unwrap();
        assert_eq!(month.to_string(), "2024-03");
        assert_eq!(month.long_label(), "March 2024");
    }

    #[test]
    fn coordinate_validation() {
        let mut listing = Listing {
            id: 1,
            latitude: 42.35,
            longitude: -71.06,
            price: 150.0,
            room_type: "Private room".to_string(),
            property_type: "Private room in home".to_string(),
            minimum_nights: 2,
            available: true,
            date: date(2023, 4, 15),
            amenities: BTreeSet::new(),
        };
        assert!(listing.has_valid_coordinates());
        assert!(listing.is_short_term());

        listing.latitude = f64::NAN;
        assert!(!listing.has_valid_coordinates());

        listing.latitude = 95.0;
        assert!(!listing.has_valid_coordinates());
    }
}
