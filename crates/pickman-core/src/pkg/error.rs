//! Manifest picking error types.

use super::spec::{SpecError, SpecType};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error;

/// Stable error codes.
pub mod codes {
    pub const EINVALIDTAGNAME: &str = "EINVALIDTAGNAME";
    pub const EUNSUPPORTEDSPEC: &str = "EUNSUPPORTEDSPEC";
    pub const ENOVERSIONS: &str = "ENOVERSIONS";
    pub const E403: &str = "E403";
    pub const ETARGET: &str = "ETARGET";
    pub const EINVALIDDATE: &str = "EINVALIDDATE";
}

/// Error returned by [`pick_manifest`](super::pick_manifest).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PickError {
    /// The wanted string could not be parsed as a specifier.
    #[error(transparent)]
    InvalidSpecifier(#[from] SpecError),

    /// The specifier is a git/file/url/alias spec.
    #[error("Only tag, version, and range are supported")]
    UnsupportedSpecifierType,

    #[error("No valid versions available for {name}")]
    NoVersions {
        name: String,
        spec_type: SpecType,
        wanted: String,
    },

    /// Every version was removed by policy restrictions.
    #[error("No valid versions available for {name}; no versions match the policy")]
    NoPolicyVersions {
        name: String,
        spec_type: SpecType,
        wanted: String,
    },

    /// The resolved version is policy-restricted.
    #[error("Could not download {name}@{wanted} due to policy violations")]
    PolicyRestricted {
        name: String,
        spec_type: SpecType,
        wanted: String,
    },

    /// `avoid_strict` was set and every eligible version is avoided.
    #[error("No avoidable versions for {name}")]
    NoAvoidableVersions { name: String, avoid: String },

    #[error("No matching version found for {name}@{wanted}{suffix}", suffix = enjoy_by_suffix(.before))]
    NoMatchingVersion {
        name: String,
        spec_type: SpecType,
        wanted: String,
        /// Every eligible version that was considered.
        versions: Vec<String>,
        dist_tags: BTreeMap<String, String>,
        default_tag: String,
        /// Publish-time cutoff, when one was active.
        before: Option<DateTime<Utc>>,
    },

    /// The `before` option is not a date.
    #[error("Invalid date for before: {0}")]
    InvalidBefore(String),
}

impl PickError {
    /// Get the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidSpecifier(err) => err.code(),
            Self::UnsupportedSpecifierType => codes::EUNSUPPORTEDSPEC,
            Self::NoVersions { .. } => codes::ENOVERSIONS,
            Self::NoPolicyVersions { .. } | Self::PolicyRestricted { .. } => codes::E403,
            Self::NoAvoidableVersions { .. } | Self::NoMatchingVersion { .. } => codes::ETARGET,
            Self::InvalidBefore(_) => codes::EINVALIDDATE,
        }
    }

    /// Diagnostic fields carried by the error, as JSON.
    #[must_use]
    pub fn details(&self) -> serde_json::Value {
        match self {
            Self::InvalidSpecifier(_) | Self::UnsupportedSpecifierType => json!({}),
            Self::NoVersions {
                name,
                spec_type,
                wanted,
            }
            | Self::NoPolicyVersions {
                name,
                spec_type,
                wanted,
            }
            | Self::PolicyRestricted {
                name,
                spec_type,
                wanted,
            } => json!({ "name": name, "type": spec_type, "wanted": wanted }),
            Self::NoAvoidableVersions { name, avoid } => json!({ "name": name, "avoid": avoid }),
            Self::NoMatchingVersion {
                name,
                spec_type,
                wanted,
                versions,
                dist_tags,
                default_tag,
                before,
            } => json!({
                "name": name,
                "type": spec_type,
                "wanted": wanted,
                "versions": versions,
                "distTags": dist_tags,
                "defaultTag": default_tag,
                "before": before.map(|b| b.to_rfc3339_opts(SecondsFormat::Millis, true)),
            }),
            Self::InvalidBefore(value) => json!({ "before": value }),
        }
    }
}

#[allow(clippy::ref_option)]
fn enjoy_by_suffix(before: &Option<DateTime<Utc>>) -> String {
    before.map_or_else(String::new, |b| {
        format!(
            " with an Enjoy By date of {}",
            b.to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    })
}
