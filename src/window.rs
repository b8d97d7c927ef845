//! Date windowing for the fetch loop.
//!
//! The overall target range is cut into consecutive fixed-length windows, each
//! of which is fetched as one pagination sequence. Windows are half-open
//! (`[start, end)`) so that adjacent windows share a boundary date without
//! both claiming it, and they are walked oldest first.

use chrono::{Days, Local, NaiveDate};
use std::fmt;
use thiserror::Error;

/// Default window length in days.
pub const DEFAULT_WINDOW_DAYS: u32 = 30;

/// Errors produced while building windows.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum WindowError {
    #[error("window start {start} is not before end {end}")]
    Empty { start: NaiveDate, end: NaiveDate },

    #[error("window length must be at least one day")]
    ZeroLength,

    #[error("date range starts after it ends: {start} > {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },

    #[error("moving {days} days from {from} leaves the supported calendar range")]
    OutOfRange { from: NaiveDate, days: u64 },
}

/// A half-open date interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    /// Build a window; `start` must be strictly before `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, WindowError> {
        if start >= end {
            return Err(WindowError::Empty { start, end });
        }
        Ok(Self { start, end })
    }

    /// First day covered by the window.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// First day after the window.
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days covered.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    #[cfg(test)]
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day < self.end
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Partition an inclusive day range into consecutive windows, oldest first.
///
/// # Arguments
///
/// * `first` - First day of the range
/// * `last` - Last day of the range, inclusive
/// * `window_days` - Length of every window except possibly the last
///
/// # Returns
///
/// Contiguous, non-overlapping windows covering every day of `first..=last`
/// exactly once. The final window is clipped to the range.
///
/// # Errors
///
/// [`WindowError::ZeroLength`] for a zero `window_days`,
/// [`WindowError::InvertedRange`] when `first > last`, and
/// [`WindowError::OutOfRange`] when `last` is the final representable date.
pub fn partition(
    first: NaiveDate,
    last: NaiveDate,
    window_days: u32,
) -> Result<Vec<DateWindow>, WindowError> {
    if window_days == 0 {
        return Err(WindowError::ZeroLength);
    }
    if first > last {
        return Err(WindowError::InvertedRange {
            start: first,
            end: last,
        });
    }

    let stop = shift_forward(last, 1)?;
    let step = u64::from(window_days);
    let mut windows = Vec::new();
    let mut cursor = first;
    while cursor < stop {
        // Past the calendar's end means past `stop` too.
        let next = cursor
            .checked_add_days(Days::new(step))
            .map_or(stop, |d| d.min(stop));
        windows.push(DateWindow::new(cursor, next)?);
        cursor = next;
    }
    Ok(windows)
}

/// The inclusive day range covering the last `years` years up to and including `today`.
///
/// A year is counted as 365 days.
///
/// # Errors
///
/// [`WindowError::OutOfRange`] if the start date would precede the earliest
/// date `chrono` can represent.
pub fn years_back(today: NaiveDate, years: u32) -> Result<(NaiveDate, NaiveDate), WindowError> {
    let days = 365 * u64::from(years);
    let first = today
        .checked_sub_days(Days::new(days))
        .ok_or(WindowError::OutOfRange { from: today, days })?;
    Ok((first, today))
}

fn shift_forward(from: NaiveDate, days: u64) -> Result<NaiveDate, WindowError> {
    from.checked_add_days(Days::new(days))
        .ok_or(WindowError::OutOfRange { from, days })
}

/// Today's date in the local timezone.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
