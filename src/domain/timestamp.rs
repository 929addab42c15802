use super::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Oldest accepted event time, relative to the moment the timestamp is set.
pub const MAX_TIMESTAMP_AGE_MICROS: i64 = 3 * 24 * 60 * 60 * MICROS_PER_SECOND;

const MICROS_PER_SECOND: i64 = 1_000_000;

// Integers below this are second-precision unix times (10 digits covers
// every second up to the year 2286); anything larger is microseconds.
const SECONDS_UPPER_BOUND: i64 = 10_000_000_000;

/// A request-level event time with microsecond precision.
///
/// Construction validates against the current clock, so a `Timestamp` that
/// exists was at most three days old when it was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn from_micros(micros: i64) -> Result<Self, ValidationError> {
        Self::from_micros_at(micros, Utc::now())
    }

    pub fn from_secs(secs: i64) -> Result<Self, ValidationError> {
        let micros = secs
            .checked_mul(MICROS_PER_SECOND)
            .ok_or_else(|| ValidationError::TimestampOutOfRange {
                input: secs.to_string(),
            })?;
        Self::from_micros(micros)
    }

    pub fn from_secs_f64(secs: f64) -> Result<Self, ValidationError> {
        if !secs.is_finite() {
            return Err(ValidationError::NonNumericTimestamp {
                input: secs.to_string(),
            });
        }
        let micros = (secs * MICROS_PER_SECOND as f64).round();
        // i64::MAX is not exactly representable; its f64 rounds up to 2^63.
        if !(i64::MIN as f64..i64::MAX as f64).contains(&micros) {
            return Err(ValidationError::TimestampOutOfRange {
                input: secs.to_string(),
            });
        }
        Self::from_micros(micros as i64)
    }

    /// Parses numeric text in either precision. Fractional values are
    /// seconds; integers are seconds when they have at most ten digits and
    /// microseconds otherwise.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if let Ok(whole) = trimmed.parse::<i64>() {
            return if whole < SECONDS_UPPER_BOUND {
                Self::from_secs(whole)
            } else {
                Self::from_micros(whole)
            };
        }

        match trimmed.parse::<f64>() {
            Ok(secs) => Self::from_secs_f64(secs),
            Err(_) => Err(ValidationError::NonNumericTimestamp {
                input: input.to_string(),
            }),
        }
    }

    pub fn now() -> Self {
        Self(Utc::now().timestamp_micros())
    }

    pub(crate) fn from_micros_at(micros: i64, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        if micros <= 0 {
            return Err(ValidationError::InvalidTimestamp { micros });
        }
        if DateTime::from_timestamp_micros(micros).is_none() {
            return Err(ValidationError::TimestampOutOfRange {
                input: micros.to_string(),
            });
        }
        if now.timestamp_micros().saturating_sub(micros) > MAX_TIMESTAMP_AGE_MICROS {
            return Err(ValidationError::TimestampTooOld { micros });
        }
        Ok(Self(micros))
    }

    pub fn as_micros(&self) -> i64 {
        self.0
    }

}
