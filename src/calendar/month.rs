use crate::dates::OutOfTimeError;
use crate::leg::Leg;
use std::str::FromStr;
use thiserror::Error;
use time::{error::ComponentRange, Date, Month};

pub(crate) const DAYS_IN_WEEK: usize = 7;

/// The month currently shown by the calendar.
///
/// Always holds the first day of a month, so every day-of-month derived from
/// it is representable.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub(crate) struct MonthCursor(Date);

impl MonthCursor {
    pub(crate) fn new(year: i32, month: Month) -> Result<MonthCursor, ComponentRange> {
        Date::from_calendar_date(year, month, 1).map(MonthCursor)
    }

    pub(crate) fn containing(date: Date) -> MonthCursor {
        // Day 1 of any existing date's month always exists, too
        MonthCursor(date.replace_day(1).unwrap_or(date))
    }

    pub(crate) fn year(self) -> i32 {
        self.0.year()
    }

    pub(crate) fn month(self) -> Month {
        self.0.month()
    }

    /// Number of days in the month, found by stepping back from the first of
    /// the following month
    pub(crate) fn days_in_month(self) -> u8 {
        match self.next_month() {
            Ok(next) => next.0.previous_day().map_or(31, Date::day),
            // Only December of the final year lacks a successor
            Err(_) => 31,
        }
    }

    /// Weekday of the 1st, counting Sunday as 0 and Saturday as 6
    pub(crate) fn first_weekday(self) -> u8 {
        self.0.weekday().number_days_from_sunday()
    }

    /// Cells of a seven-column month grid in row-major order: one `None` per
    /// blank cell before the 1st, then the days of the month.  The final row
    /// is not padded.
    pub(crate) fn build_grid(self) -> Vec<Option<u8>> {
        let blanks = usize::from(self.first_weekday());
        let days = self.days_in_month();
        let mut grid = Vec::with_capacity(blanks + usize::from(days));
        grid.resize(blanks, None);
        grid.extend((1..=days).map(Some));
        grid
    }

    pub(crate) fn prev_month(self) -> Result<MonthCursor, OutOfTimeError> {
        let (year, month) = match self.month() {
            Month::January => (self.year().checked_sub(1).ok_or(OutOfTimeError)?, Month::December),
            m => (self.year(), m.previous()),
        };
        MonthCursor::new(year, month).map_err(|_| OutOfTimeError)
    }

    pub(crate) fn next_month(self) -> Result<MonthCursor, OutOfTimeError> {
        let (year, month) = match self.month() {
            Month::December => (self.year().checked_add(1).ok_or(OutOfTimeError)?, Month::January),
            m => (self.year(), m.next()),
        };
        MonthCursor::new(year, month).map_err(|_| OutOfTimeError)
    }

    /// The date of the given day in this month, if the month has such a day
    pub(crate) fn date(self, day: u8) -> Option<Date> {
        self.0.replace_day(day).ok()
    }
}

impl FromStr for MonthCursor {
    type Err = ParseMonthError;

    /// Parse a month written as `YYYY-MM`
    fn from_str(s: &str) -> Result<MonthCursor, ParseMonthError> {
        let (year, month) = s.split_once('-').ok_or(ParseMonthError)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(ParseMonthError);
        }
        if !s.chars().all(|c| c.is_ascii_digit() || c == '-') {
            return Err(ParseMonthError);
        }
        let year = year.parse::<i32>().map_err(|_| ParseMonthError)?;
        let month = month
            .parse::<u8>()
            .ok()
            .and_then(|m| Month::try_from(m).ok())
            .ok_or(ParseMonthError)?;
        MonthCursor::new(year, month).map_err(|_| ParseMonthError)
    }
}

#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[error("expected a month in YYYY-MM form")]
pub(crate) struct ParseMonthError;

/// Returns the first leg, in list order, whose inclusive span covers `date`.
/// Overlapping legs are not reconciled; earlier entries simply win.
pub(crate) fn leg_for_day(legs: &[Leg], date: Date) -> Option<&Leg> {
    leg_position(legs, date).map(|(_, leg)| leg)
}

/// Like `leg_for_day`, but also gives the leg's index in `legs`
pub(crate) fn leg_position(legs: &[Leg], date: Date) -> Option<(usize, &Leg)> {
    legs.iter().enumerate().find(|(_, leg)| leg.contains(date))
}
