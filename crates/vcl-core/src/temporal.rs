//! # Timestamps
//!
//! Ledger commits are stamped with a [`Timestamp`], proof identifiers name
//! the registry state they were built against by one, and non-revocation
//! intervals are inclusive ranges of them. Whole seconds in UTC, so an
//! instant has exactly one canonical spelling.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::VclError;

/// A UTC instant with seconds precision. Wire form `YYYY-MM-DDTHH:MM:SSZ`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Wall-clock now, sub-seconds dropped.
    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt.with_nanosecond(0).unwrap_or(dt))
    }

    /// Parse RFC 3339 with a `Z` suffix. Fractional seconds are dropped;
    /// numeric offsets, even `+00:00`, are refused so that two spellings of
    /// one instant never reach the ledger.
    pub fn parse(s: &str) -> Result<Self, VclError> {
        if !s.ends_with('Z') {
            return Err(VclError::Validation(format!(
                "timestamp {s:?} must be UTC with a Z suffix"
            )));
        }
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| VclError::Validation(format!("timestamp {s:?}: {e}")))?;
        Ok(Self::from_utc(dt.with_timezone(&Utc)))
    }

    /// Seconds since the Unix epoch.
    pub fn unix_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Shifted by `secs` (negative moves back).
    pub fn plus_secs(&self, secs: i64) -> Self {
        Self(self.0 + chrono::Duration::seconds(secs))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Secs, true))
    }
}

impl FromStr for Timestamp {
    type Err = VclError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
