use crate::dates::{add_days, format_iso_date, parse_iso_date, OutOfTimeError};
use crate::store::{Document, DocumentId, Fields, CREATED_AT_FIELD};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use time::{format_description::well_known::Rfc3339, Date, OffsetDateTime};

/// Stored field by which legs are ordered
pub(crate) const ORDER_FIELD: &str = "startDate";

/// One segment of a sailing itinerary.
///
/// `end_date` is always `start_date + duration_days`; both ends are
/// inclusive.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Leg {
    pub(crate) id: DocumentId,
    pub(crate) name: String,
    pub(crate) start_date: Date,
    pub(crate) end_date: Date,
    pub(crate) duration_days: u32,
    pub(crate) created_at: Option<OffsetDateTime>,
}

impl Leg {
    pub(crate) fn contains(&self, date: Date) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub(crate) fn from_document(doc: &Document) -> Result<Leg, DecodeError> {
        let record = LegRecord::deserialize(&Value::Object(doc.fields.clone()))?;
        let start_date = parse_iso_date(&record.start_date)
            .map_err(|_| DecodeError::Date(record.start_date.clone()))?;
        if record.duration_days == 0 {
            return Err(DecodeError::Duration);
        }
        let end_date = add_days(start_date, i64::from(record.duration_days))?;
        if parse_iso_date(&record.end_date).ok() != Some(end_date) {
            tracing::warn!(
                id = %doc.id,
                stored = %record.end_date,
                derived = %format_iso_date(end_date),
                "Stored end date disagrees with start date and duration; using derived value"
            );
        }
        let created_at = doc
            .fields
            .get(CREATED_AT_FIELD)
            .and_then(Value::as_str)
            .and_then(|s| OffsetDateTime::parse(s, &Rfc3339).ok());
        Ok(Leg {
            id: doc.id.clone(),
            name: record.name,
            start_date,
            end_date,
            duration_days: record.duration_days,
            created_at,
        })
    }

    /// Decode a snapshot, skipping (and logging) any documents that are not
    /// valid legs
    pub(crate) fn from_snapshot(snapshot: &[Document]) -> Vec<Leg> {
        snapshot
            .iter()
            .filter_map(|doc| match Leg::from_document(doc) {
                Ok(leg) => Some(leg),
                Err(e) => {
                    tracing::warn!(id = %doc.id, error = %e, "Skipping malformed leg record");
                    None
                }
            })
            .collect()
    }
}

/// Shape of a leg as written to the store
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
struct LegRecord {
    name: String,
    start_date: String,
    end_date: String,
    duration_days: u32,
}

/// User input for a new or replacement leg, validated and with its end date
/// computed
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct LegDraft {
    pub(crate) name: String,
    pub(crate) start_date: Date,
    pub(crate) end_date: Date,
    pub(crate) duration_days: u32,
}

impl LegDraft {
    pub(crate) fn parse(
        name: &str,
        start_date: &str,
        duration_days: &str,
    ) -> Result<LegDraft, ValidationError> {
        let (name, start_date, duration_days) =
            (name.trim(), start_date.trim(), duration_days.trim());
        if name.is_empty() || start_date.is_empty() || duration_days.is_empty() {
            return Err(ValidationError::MissingFields);
        }
        let duration_days = duration_days
            .parse::<i64>()
            .ok()
            .filter(|&d| d > 0)
            .and_then(|d| u32::try_from(d).ok())
            .ok_or(ValidationError::Duration)?;
        let start_date = parse_iso_date(start_date).map_err(|_| ValidationError::Date)?;
        let end_date = add_days(start_date, i64::from(duration_days))?;
        Ok(LegDraft {
            name: name.to_owned(),
            start_date,
            end_date,
            duration_days,
        })
    }

    /// The complete field set written on both create and update
    pub(crate) fn to_fields(&self) -> Fields {
        // Keys match the camelCase names `LegRecord` reads back
        Fields::from_iter([
            (String::from("name"), Value::from(self.name.as_str())),
            (String::from(ORDER_FIELD), Value::from(format_iso_date(self.start_date))),
            (String::from("endDate"), Value::from(format_iso_date(self.end_date))),
            (String::from("durationDays"), Value::from(self.duration_days)),
        ])
    }
}

#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub(crate) enum ValidationError {
    #[error("Please fill in all fields.")]
    MissingFields,
    #[error("Duration must be a whole number of days, at least 1.")]
    Duration,
    #[error("Start date must be a real date written as YYYY-MM-DD.")]
    Date,
    #[error("That leg would end beyond the calendar.")]
    OutOfRange(#[from] OutOfTimeError),
}

#[derive(Debug, Error)]
pub(crate) enum DecodeError {
    #[error("record has missing or mistyped fields")]
    Malformed(#[from] serde_json::Error),
    #[error("invalid stored date {0:?}")]
    Date(String),
    #[error("stored duration is zero")]
    Duration,
    #[error("leg ends beyond the calendar")]
    OutOfRange(#[from] OutOfTimeError),
}

#[cfg(test)]
pub(crate) fn test_leg(id: &str, name: &str, start_date: Date, duration_days: u32) -> Leg {
    Leg {
        id: DocumentId::new(id),
        name: name.to_owned(),
        start_date,
        end_date: add_days(start_date, i64::from(duration_days)).unwrap(),
        duration_days,
        created_at: None,
    }
}
