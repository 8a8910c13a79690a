use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::tree::CategoryPath;

const FIELD_DELIMITER: char = ',';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordParseError {
    #[error("expected 3 fields, found {0}")]
    FieldCount(usize),
    #[error("invalid timestamp {0:?}")]
    Timestamp(String),
    #[error("invalid minutes {0:?}")]
    Minutes(String),
}

/// A single answer to "what are you doing?". Records are only ever appended, never changed.
///
/// On disk a record is one line with the fields ordered by key name (`ACTIVITY`, `MINUTES`) after
/// the timestamp in milliseconds: `1530662400000,Books.Reading,25`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedActivity {
    pub activity: String,
    pub minutes: i64,
    pub timestamp: DateTime<Utc>,
}

impl RecordedActivity {
    pub fn new(path: &CategoryPath, minutes: i64, timestamp: DateTime<Utc>) -> Self {
        Self {
            activity: path.joined(),
            minutes,
            timestamp,
        }
    }

    pub fn to_line(&self) -> String {
        format!(
            "{}{FIELD_DELIMITER}{}{FIELD_DELIMITER}{}",
            self.timestamp.timestamp_millis(),
            self.activity,
            self.minutes
        )
    }

    pub fn parse_line(line: &str) -> Result<Self, RecordParseError> {
        let mut fields = line.trim_end().split(FIELD_DELIMITER).collect::<Vec<_>>();
        // Older logs terminate every field with a delimiter.
        if fields.len() == 4 && fields[3].is_empty() {
            fields.pop();
        }
        let [timestamp, activity, minutes] = fields[..] else {
            return Err(RecordParseError::FieldCount(fields.len()));
        };

        let timestamp = timestamp
            .parse::<i64>()
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .ok_or_else(|| RecordParseError::Timestamp(timestamp.to_owned()))?;
        let minutes = minutes
            .parse::<i64>()
            .map_err(|_| RecordParseError::Minutes(minutes.to_owned()))?;

        Ok(Self {
            activity: activity.to_owned(),
            minutes,
            timestamp,
        })
    }
}
