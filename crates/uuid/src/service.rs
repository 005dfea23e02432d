//! Internal implementation of identifier services.
//!
//! This module contains the implementation details for UUID and timestamp-based
//! unique identifiers used for workspaces.

use crate::{UuidError, UuidResult};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use std::{fmt, str::FromStr};

use ::uuid::Uuid;

const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%.3f";

/// Canonical UUID representation (32 lowercase hex characters, no hyphens).
///
/// Once constructed, the contained UUID is guaranteed to be in canonical form.
///
/// # Construction
/// - [`CanonicalUuid::new`] generates a new random UUID.
/// - [`CanonicalUuid::parse`] validates an externally supplied identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalUuid(Uuid);

impl Default for CanonicalUuid {
    fn default() -> Self {
        Self::new()
    }
}

impl CanonicalUuid {
    /// Generates a new random (v4) UUID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses a UUID string that must already be in canonical form.
    ///
    /// This does **not** normalise other common UUID forms (for example, hyphenated or
    /// uppercase).
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is not in canonical form.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if !Self::is_canonical(input) {
            return Err(UuidError::InvalidInput(format!(
                "UUID must be 32 lowercase hex characters without hyphens, got: '{}'",
                input
            )));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|e| UuidError::InvalidInput(format!("invalid UUID '{}': {}", input, e)))
    }

    /// Returns true if `input` is in canonical UUID form.
    ///
    /// Purely syntactic: exactly 32 bytes of lowercase hex.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }
}

impl fmt::Display for CanonicalUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for CanonicalUuid {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CanonicalUuid::parse(s)
    }
}

/// A time-prefixed unique identifier.
///
/// Format:
/// `YYYYMMDDTHHMMSS.mmmZ-<canonical_uuid>`
///
/// Example:
/// `20260111T143522.045Z-550e8400e29b41d4a716446655440000`
///
/// Ordering compares the timestamp first, so ids sort in creation order.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimestampId {
    timestamp: DateTime<Utc>,
    uuid: CanonicalUuid,
}

impl TimestampId {
    /// Returns the timestamp component (millisecond precision).
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns a reference to the UUID component.
    pub fn uuid(&self) -> &CanonicalUuid {
        &self.uuid
    }

    /// Builds an id for `timestamp`, truncated to whole milliseconds so that the value
    /// survives a round trip through its string form.
    fn at(timestamp: DateTime<Utc>) -> Self {
        let millis = timestamp.timestamp_millis();
        let timestamp = DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or(timestamp);
        Self {
            timestamp,
            uuid: CanonicalUuid::new(),
        }
    }
}

impl FromStr for TimestampId {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ts_str, uuid_str) = s.split_once('-').ok_or_else(|| {
            UuidError::InvalidInput(format!("Invalid timestamp id format: '{}'", s))
        })?;

        let ts_no_z = ts_str.strip_suffix('Z').ok_or_else(|| {
            UuidError::InvalidInput(format!("Timestamp must end with 'Z': '{}'", ts_str))
        })?;

        let naive = NaiveDateTime::parse_from_str(ts_no_z, TIMESTAMP_FORMAT).map_err(|e| {
            UuidError::InvalidInput(format!("Invalid timestamp format '{}': {}", ts_str, e))
        })?;

        Ok(Self {
            timestamp: DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc),
            uuid: CanonicalUuid::parse(uuid_str)?,
        })
    }
}

impl fmt::Display for TimestampId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}Z-{}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.uuid
        )
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for TimestampId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for TimestampId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Issues strictly increasing [`TimestampId`]s.
///
/// If the clock has not moved past the last issued timestamp, the next id is stamped one
/// millisecond later than the previous one.
#[derive(Clone, Debug, Default)]
pub struct TimestampIdGenerator {
    last: Option<DateTime<Utc>>,
}

impl TimestampIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues the next id using the current wall clock.
    pub fn next_id(&mut self) -> TimestampId {
        self.next_id_at(Utc::now())
    }

    /// Issues the next id as if the clock read `now`.
    pub fn next_id_at(&mut self, now: DateTime<Utc>) -> TimestampId {
        let candidate = TimestampId::at(now);
        let id = match self.last {
            Some(prev) if candidate.timestamp <= prev => TimestampId {
                timestamp: prev + Duration::milliseconds(1),
                uuid: candidate.uuid,
            },
            _ => candidate,
        };
        self.last = Some(id.timestamp);
        id
    }

    /// Records an id issued elsewhere (for example loaded from storage) so later ids sort after it.
    pub fn observe(&mut self, id: &TimestampId) {
        match self.last {
            Some(last) if id.timestamp <= last => {}
            _ => self.last = Some(id.timestamp),
        }
    }
}
