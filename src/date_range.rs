//! Inclusive date window for message timestamps

use crate::error::{Error, Result};
use chrono::{DateTime, FixedOffset, NaiveDate};

/// A date window, open-ended on either side.
///
/// Both bounds are calendar dates and both are inclusive: a message
/// received at 23:59:59 on `to` is still inside.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// A range that contains every timestamp.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            from: None,
            to: None,
        }
    }

    /// Parse textual bounds with a `chrono` format string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first bound that does not
    /// match `format`.
    pub fn parse(from: Option<&str>, to: Option<&str>, format: &str) -> Result<Self> {
        let parse_bound = |name: &str, value: Option<&str>| {
            value
                .map(|v| {
                    NaiveDate::parse_from_str(v.trim(), format).map_err(|e| {
                        Error::Config(format!("Invalid {name} '{v}' for format '{format}': {e}"))
                    })
                })
                .transpose()
        };

        Ok(Self {
            from: parse_bound("date_from", from)?,
            to: parse_bound("date_to", to)?,
        })
    }

    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    #[must_use]
    pub fn contains(&self, timestamp: DateTime<FixedOffset>) -> bool {
        in_range(timestamp, self.from, self.to)
    }
}

/// Whether `timestamp` falls within `[date_from, date_to]`.
///
/// The offset is dropped before comparing, so the check is made
/// against the wall-clock date the sender's `Date` header shows.
#[must_use]
pub fn in_range(
    timestamp: DateTime<FixedOffset>,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
) -> bool {
    let date = timestamp.naive_local().date();
    date_from.is_none_or(|from| date >= from) && date_to.is_none_or(|to| date <= to)
}
