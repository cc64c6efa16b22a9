use thiserror::Error;
use time::{format_description::FormatItem, macros::format_description, Date, Duration};

/// Storage format for leg dates.  The same description is used when writing
/// and when reading back so that no offset is ever applied to a stored day.
static YMD_FMT: &[FormatItem<'_>] = format_description!("[year]-[month]-[day]");

static DISPLAY_FMT: &[FormatItem<'_>] =
    format_description!("[month repr:short] [day padding:none], [year]");

pub(crate) fn parse_iso_date(s: &str) -> Result<Date, time::error::Parse> {
    Date::parse(s, &YMD_FMT)
}

pub(crate) fn format_iso_date(date: Date) -> String {
    date.format(&YMD_FMT).unwrap_or_else(|_| {
        format!(
            "{}-{:02}-{:02}",
            date.year(),
            u8::from(date.month()),
            date.day()
        )
    })
}

/// Render a date for humans, e.g. `Mar 1, 2025`, or `N/A` if there is none
pub(crate) fn format_date(date: Option<Date>) -> String {
    match date {
        Some(d) => d
            .format(&DISPLAY_FMT)
            .unwrap_or_else(|_| format_iso_date(d)),
        None => String::from("N/A"),
    }
}

pub(crate) fn add_days(date: Date, days: i64) -> Result<Date, OutOfTimeError> {
    date.checked_add(Duration::days(days)).ok_or(OutOfTimeError)
}

#[derive(Copy, Clone, Debug, Eq, Error, PartialEq)]
#[error("reached the end of time")]
pub(crate) struct OutOfTimeError;

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn test_format_date() {
        assert_eq!(format_date(None), "N/A");
        assert_eq!(format_date(Some(date!(2025 - 03 - 01))), "Mar 1, 2025");
        assert_eq!(format_date(Some(date!(2025 - 01 - 05))), "Jan 5, 2025");
        assert_eq!(format_date(Some(date!(2024 - 12 - 25))), "Dec 25, 2024");
    }

    #[test]
    fn test_format_parsed_date() {
        let d = parse_iso_date("2025-03-01").unwrap();
        assert_eq!(format_date(Some(d)), "Mar 1, 2025");
    }

    #[test]
    fn test_iso_dates() {
        assert_eq!(parse_iso_date("2025-01-05").unwrap(), date!(2025 - 01 - 05));
        assert_eq!(format_iso_date(date!(2025 - 01 - 05)), "2025-01-05");
        assert!(parse_iso_date("2025-02-30").is_err());
        assert!(parse_iso_date("Jan 5, 2025").is_err());
        assert!(parse_iso_date("").is_err());
    }

    #[test]
    fn test_add_days() {
        let start = date!(2025 - 01 - 05);
        assert_eq!(add_days(start, 7), Ok(date!(2025 - 01 - 12)));
        assert_eq!(add_days(start, 0), Ok(start));
        assert_eq!(add_days(start, -5), Ok(date!(2024 - 12 - 31)));
        assert_eq!(add_days(date!(2024 - 02 - 28), 1), Ok(date!(2024 - 02 - 29)));
        assert_eq!(start, date!(2025 - 01 - 05));
    }

    #[test]
    fn test_add_days_out_of_time() {
        assert_eq!(add_days(Date::MAX, 1), Err(OutOfTimeError));
        assert_eq!(add_days(Date::MIN, -1), Err(OutOfTimeError));
    }
}
