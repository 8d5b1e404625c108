//! Packument and manifest model.
//!
//! A packument is the registry document for a package: every published version
//! plus dist-tags, publish times, staged versions and policy restrictions.

use super::options::parse_instant;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Package metadata document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Packument {
    #[serde(default)]
    pub name: String,

    #[serde(rename = "dist-tags", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dist_tags: BTreeMap<String, String>,

    #[serde(default)]
    pub versions: BTreeMap<String, Manifest>,

    /// Publish times keyed by version. Also holds `created`/`modified` and, for
    /// unpublished packages, non-string entries.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub time: BTreeMap<String, Value>,

    /// Versions taken down by registry policy.
    #[serde(
        rename = "policyRestrictions",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub policy_restrictions: Option<VersionSet>,

    /// Published but not yet promoted versions.
    #[serde(
        rename = "stagedVersions",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub staged_versions: Option<VersionSet>,

    /// Everything else in the document.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A `{ "versions": { … } }` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionSet {
    #[serde(default)]
    pub versions: BTreeMap<String, Manifest>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Packument {
    /// Versions removed by policy restrictions.
    #[must_use]
    pub fn restricted_versions(&self) -> Option<&BTreeMap<String, Manifest>> {
        self.policy_restrictions.as_ref().map(|set| &set.versions)
    }

    /// Check whether a version is policy-restricted.
    #[must_use]
    pub fn is_restricted(&self, version: &str) -> bool {
        self.restricted_versions()
            .is_some_and(|versions| versions.contains_key(version))
    }

    /// Staged versions, if any.
    #[must_use]
    pub fn staged(&self) -> Option<&BTreeMap<String, Manifest>> {
        self.staged_versions.as_ref().map(|set| &set.versions)
    }

    /// Publish time of a version in epoch milliseconds.
    ///
    /// Returns `None` if there is no entry or it is not a date string.
    #[must_use]
    pub fn published_at(&self, version: &str) -> Option<i64> {
        self.time.get(version)?.as_str().and_then(parse_instant)
    }
}

/// One published version of a package.
///
/// Manifests are open-ended JSON objects; only a handful of fields matter for
/// picking, and everything else is carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(Map<String, Value>);

impl Manifest {
    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// The `version` field.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.0.get("version").and_then(Value::as_str)
    }

    /// Whether `deprecated` is set to a truthy value.
    #[must_use]
    pub fn is_deprecated(&self) -> bool {
        self.0.get("deprecated").is_some_and(is_truthy)
    }

    /// The `engines.node` range, if it is a string.
    #[must_use]
    pub fn node_engine(&self) -> Option<&str> {
        self.0.get("engines")?.get("node")?.as_str()
    }

    /// Get a raw field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Rewrite a string `bin` into the object form.
    ///
    /// `"./bin/foo.js"` on `@scope/foo` becomes `{ "foo": "bin/foo.js" }`.
    pub fn normalize_bin(&mut self, package_name: &str) {
        let Some(Value::String(path)) = self.0.get("bin") else {
            return;
        };

        let bin_name = package_name.rsplit('/').next().unwrap_or(package_name);
        let path = path.trim_start_matches("./").to_string();

        let mut bin = Map::new();
        bin.insert(bin_name.to_string(), Value::String(path));
        self.0.insert("bin".to_string(), Value::Object(bin));
    }
}

impl From<Map<String, Value>> for Manifest {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// JavaScript truthiness, for registry fields like `deprecated`.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
