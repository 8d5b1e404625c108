//! Picker options.

use super::error::PickError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;

/// Default dist-tag used as a tie-break.
pub const DEFAULT_TAG: &str = "latest";

/// Options for [`pick_manifest`](super::pick_manifest).
///
/// Deserializes from camelCase JSON (`defaultTag`, `includeDeprecated`, …);
/// unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct PickOptions {
    /// Tag preferred when it satisfies the wanted range.
    pub default_tag: String,

    /// Only consider versions published at or before this instant.
    #[serde(alias = "enjoyBy")]
    pub before: Option<Before>,

    /// Current Node.js version, used to prefer engine-compatible versions.
    pub node_version: Option<String>,

    /// Treat deprecated versions like any other version.
    pub include_deprecated: bool,

    /// Merge staged versions into the candidate pool.
    pub include_staged: bool,

    /// Range of versions to steer away from.
    pub avoid: Option<String>,

    /// Never return an avoided version, even outside the wanted range.
    pub avoid_strict: bool,
}

impl Default for PickOptions {
    fn default() -> Self {
        Self {
            default_tag: DEFAULT_TAG.to_string(),
            before: None,
            node_version: None,
            include_deprecated: false,
            include_staged: false,
            avoid: None,
            avoid_strict: false,
        }
    }
}

impl PickOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_default_tag(mut self, tag: impl Into<String>) -> Self {
        self.default_tag = tag.into();
        self
    }

    #[must_use]
    pub fn with_before(mut self, before: impl Into<Before>) -> Self {
        self.before = Some(before.into());
        self
    }

    #[must_use]
    pub fn with_node_version(mut self, version: impl Into<String>) -> Self {
        self.node_version = Some(version.into());
        self
    }

    #[must_use]
    pub fn with_include_deprecated(mut self, include: bool) -> Self {
        self.include_deprecated = include;
        self
    }

    #[must_use]
    pub fn with_include_staged(mut self, include: bool) -> Self {
        self.include_staged = include;
        self
    }

    #[must_use]
    pub fn with_avoid(mut self, range: impl Into<String>) -> Self {
        self.avoid = Some(range.into());
        self
    }

    #[must_use]
    pub fn with_avoid_strict(mut self, strict: bool) -> Self {
        self.avoid_strict = strict;
        self
    }

    /// The publish-time cutoff in epoch milliseconds.
    ///
    /// # Errors
    /// Returns an error if `before` is a string that is not a date.
    pub fn cutoff(&self) -> Result<Option<i64>, PickError> {
        self.before.as_ref().map(Before::to_millis).transpose()
    }
}

/// A publish-time cutoff: a date string, epoch milliseconds, or a date value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawBefore")]
pub enum Before {
    Millis(i64),
    Instant(DateTime<Utc>),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBefore {
    Millis(i64),
    Text(String),
}

impl From<RawBefore> for Before {
    fn from(raw: RawBefore) -> Self {
        match raw {
            RawBefore::Millis(ms) => Self::Millis(ms),
            RawBefore::Text(text) => Self::Text(text),
        }
    }
}

impl Before {
    /// Normalize to epoch milliseconds.
    ///
    /// # Errors
    /// Returns [`PickError::InvalidBefore`] for a string that is not a date.
    pub fn to_millis(&self) -> Result<i64, PickError> {
        match self {
            Self::Millis(ms) => Ok(*ms),
            Self::Instant(instant) => Ok(instant.timestamp_millis()),
            Self::Text(text) => {
                parse_instant(text).ok_or_else(|| PickError::InvalidBefore(text.clone()))
            }
        }
    }
}

impl From<i64> for Before {
    fn from(ms: i64) -> Self {
        Self::Millis(ms)
    }
}

impl From<DateTime<Utc>> for Before {
    fn from(instant: DateTime<Utc>) -> Self {
        Self::Instant(instant)
    }
}

impl From<&str> for Before {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Before {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// Parse an ISO-8601 date or date-time into epoch milliseconds.
///
/// Date-times without an offset and bare dates are read as UTC.
pub(crate) fn parse_instant(input: &str) -> Option<i64> {
    const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

    let input = input.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(input) {
        return Some(instant.timestamp_millis());
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis())
}
