//! Version comparison using semver.
//!
//! Versions and ranges follow npm's loose rules:
//! - Version strings may carry leading `v`/`=` and surrounding whitespace
//! - Build metadata is ignored
//! - Ranges support `||`, hyphen ranges, x-ranges and space-separated comparators
//! - Bare versions inside a range are exact (`1.2.3` means `=1.2.3`)
//!
//! Matching itself is delegated to [`semver::VersionReq`], which already implements
//! the npm prerelease rule: a prerelease only satisfies a comparator set that names
//! a prerelease on the same `major.minor.patch`.

use semver::{BuildMetadata, Comparator, Op, Prerelease, Version, VersionReq};
use std::fmt;
use thiserror::Error;

/// A range string that has no usable alternative.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid version range '{0}'")]
pub struct RangeError(String);

/// Parse a version string in loose mode.
///
/// Accepts `v1.2.3`, `=1.2.3`, ` 1.2.3 ` and `1.2.3beta` (missing hyphen).
/// Build metadata is dropped so `1.2.3+abc` equals `1.2.3`.
#[must_use]
pub fn parse_loose(input: &str) -> Option<Version> {
    let trimmed = strip_loose_prefix(input.trim());
    let mut version = Version::parse(trimmed)
        .ok()
        .or_else(|| parse_unhyphenated_prerelease(trimmed))?;
    version.build = BuildMetadata::EMPTY;
    Some(version)
}

/// Check whether a string is a valid version in loose mode.
#[must_use]
pub fn is_valid(input: &str) -> bool {
    parse_loose(input).is_some()
}

/// Clean a version string: `" =v1.2.3+build "` becomes `"1.2.3"`.
///
/// Returns `None` if the input is not a version (ranges are not cleaned).
#[must_use]
pub fn clean(input: &str) -> Option<String> {
    parse_loose(input).map(|v| v.to_string())
}

/// Check whether `version` satisfies `range`.
///
/// Returns `false` if either side fails to parse.
#[must_use]
pub fn satisfies(version: &str, range: &str) -> bool {
    match (parse_loose(version), Range::parse(range)) {
        (Some(version), Ok(range)) => range.matches(&version),
        _ => false,
    }
}

/// Return the highest version in `versions` that satisfies `range`.
///
/// Strings that are not valid versions are skipped. When two strings parse to the
/// same version, the first one wins.
pub fn max_satisfying<'a, I>(versions: I, range: &Range) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&'a str, Version)> = None;
    for raw in versions {
        let Some(version) = parse_loose(raw) else {
            continue;
        };
        if !range.matches(&version) {
            continue;
        }
        match &best {
            Some((_, current)) if *current >= version => {}
            _ => best = Some((raw, version)),
        }
    }
    best.map(|(raw, _)| raw)
}

/// A parsed npm version range: a set of alternatives joined by `||`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Range {
    alternatives: Vec<VersionReq>,
}

impl Range {
    /// Parse a range string in loose mode.
    ///
    /// Comparators that cannot be parsed are dropped, and an alternative left with
    /// nothing usable is dropped as well. An empty alternative means `*`.
    ///
    /// # Errors
    /// Returns an error if no alternative survives.
    pub fn parse(input: &str) -> Result<Self, RangeError> {
        let mut alternatives = Vec::new();

        for raw in input.split("||") {
            let raw = raw.trim();
            if raw.is_empty() {
                alternatives.push(VersionReq::STAR);
                continue;
            }
            if let Some(req) = parse_alternative(raw) {
                alternatives.push(req);
            }
        }

        if alternatives.is_empty() {
            return Err(RangeError(input.to_string()));
        }

        Ok(Self { alternatives })
    }

    /// The `*` range.
    #[must_use]
    pub fn any() -> Self {
        Self {
            alternatives: vec![VersionReq::STAR],
        }
    }

    /// A range matching exactly one version.
    #[must_use]
    pub fn exact(version: &Version) -> Self {
        let comparator = Comparator {
            op: Op::Exact,
            major: version.major,
            minor: Some(version.minor),
            patch: Some(version.patch),
            pre: version.pre.clone(),
        };
        Self {
            alternatives: vec![VersionReq {
                comparators: vec![comparator],
            }],
        }
    }

    /// Check whether a version satisfies any alternative.
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }

    /// Check whether a version string satisfies the range (loose parse).
    #[must_use]
    pub fn matches_str(&self, version: &str) -> bool {
        parse_loose(version).is_some_and(|v| self.matches(&v))
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, req) in self.alternatives.iter().enumerate() {
            if i > 0 {
                f.write_str(" || ")?;
            }
            write!(f, "{req}")?;
        }
        Ok(())
    }
}

/// Strip npm's loose prefix `[v=\s]*`.
fn strip_loose_prefix(input: &str) -> &str {
    input.trim_start_matches(|c: char| c == 'v' || c == 'V' || c == '=' || c.is_whitespace())
}

/// Parse `1.2.3beta` as `1.2.3-beta`.
fn parse_unhyphenated_prerelease(input: &str) -> Option<Version> {
    let split = input.find(|c: char| !(c.is_ascii_digit() || c == '.'))?;
    let (core, rest) = input.split_at(split);
    if core.matches('.').count() != 2 || core.ends_with('.') || rest.starts_with(['-', '+']) {
        return None;
    }
    Version::parse(&format!("{core}-{rest}")).ok()
}

/// Parse one `||` alternative into a comparator set.
///
/// Returns `None` if no comparator in it is usable.
fn parse_alternative(raw: &str) -> Option<VersionReq> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();

    // Hyphen range: "1.0.0 - 2.0.0"
    if let [start, "-", end] = tokens.as_slice() {
        let start = Partial::parse(strip_loose_prefix(start))?;
        let end = Partial::parse(strip_loose_prefix(end))?;
        let mut comparators = Vec::new();
        if let Some(lower) = start.comparator(Op::GreaterEq) {
            comparators.push(lower);
        }
        if let Some(upper) = end.comparator(Op::LessEq) {
            comparators.push(upper);
        }
        return Some(VersionReq { comparators });
    }

    // Re-attach operators separated from their version: ">= 1.2.3" -> ">=1.2.3"
    let mut merged: Vec<String> = Vec::new();
    let mut pending_op = String::new();
    for token in tokens {
        if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '~' | '^')) {
            pending_op.push_str(token);
        } else {
            merged.push(format!("{pending_op}{token}"));
            pending_op.clear();
        }
    }

    let mut comparators = Vec::new();
    let mut any_valid = false;
    for token in &merged {
        if let Some(parsed) = parse_comparator(token) {
            any_valid = true;
            comparators.extend(parsed);
        }
    }

    any_valid.then_some(VersionReq { comparators })
}

/// Parse a single comparator token like `^1.2`, `>=2.0.0-rc.1` or `1.x`.
///
/// A wildcard yields no comparators at all.
fn parse_comparator(token: &str) -> Option<Vec<Comparator>> {
    let (op, rest) = split_operator(token);
    let partial = Partial::parse(strip_loose_prefix(rest))?;

    let comparator = match op {
        // `>*` and `<*` can never be satisfied
        Some(Op::Greater | Op::Less) if partial.major.is_none() => Some(Comparator {
            op: Op::Less,
            major: 0,
            minor: Some(0),
            patch: Some(0),
            pre: Prerelease::new("0").ok()?,
        }),
        Some(op) => partial.comparator(op),
        None => partial.comparator(Op::Exact),
    };

    Some(comparator.into_iter().collect())
}

fn split_operator(token: &str) -> (Option<Op>, &str) {
    const OPERATORS: [(&str, Op); 8] = [
        (">=", Op::GreaterEq),
        ("<=", Op::LessEq),
        ("~>", Op::Tilde),
        (">", Op::Greater),
        ("<", Op::Less),
        ("=", Op::Exact),
        ("~", Op::Tilde),
        ("^", Op::Caret),
    ];

    for (prefix, op) in OPERATORS {
        if let Some(rest) = token.strip_prefix(prefix) {
            return (Some(op), rest);
        }
    }
    (None, token)
}

/// A possibly-partial version: `1`, `1.2`, `1.2.3-beta`, `1.x`, `*`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Partial {
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    pre: Prerelease,
}

impl Partial {
    fn parse(input: &str) -> Option<Self> {
        if input.is_empty() {
            return None;
        }

        // Build metadata never affects matching.
        let input = input.split_once('+').map_or(input, |(core, _)| core);
        let (core, pre) = match input.split_once('-') {
            Some((core, pre)) => (core, Some(pre)),
            None => (input, None),
        };

        let mut parts = core.split('.');
        let major = parse_part(parts.next()?)?;
        let minor = parts.next().map(parse_part).unwrap_or(Some(None))?;
        let patch = parts.next().map(parse_part).unwrap_or(Some(None))?;
        if parts.next().is_some() {
            return None;
        }

        // Everything after the first wildcard is a wildcard too: "1.x.3" == "1.x".
        let minor = major.and(minor);
        let patch = minor.and(patch);

        let pre = match pre {
            Some(pre) if patch.is_some() => Prerelease::new(pre).ok()?,
            Some(_) => return None,
            None => Prerelease::EMPTY,
        };

        Some(Self {
            major,
            minor,
            patch,
            pre,
        })
    }

    /// Build a comparator, or `None` when the partial matches everything.
    fn comparator(&self, op: Op) -> Option<Comparator> {
        let major = self.major?;
        Some(Comparator {
            op,
            major,
            minor: self.minor,
            patch: self.patch,
            pre: self.pre.clone(),
        })
    }
}

/// Parse one dotted component. `Some(None)` is a wildcard, `None` is invalid.
fn parse_part(part: &str) -> Option<Option<u64>> {
    match part {
        "x" | "X" | "*" => Some(None),
        _ if !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()) => {
            part.parse().ok().map(Some)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(input: &str) -> Range {
        Range::parse(input).unwrap()
    }

    fn pick<'a>(versions: &[&'a str], input: &str) -> Option<&'a str> {
        max_satisfying(versions.iter().copied(), &range(input))
    }

    #[test]
    fn test_parse_loose_prefixes() {
        assert_eq!(parse_loose("v1.2.3"), Some(Version::new(1, 2, 3)));
        assert_eq!(parse_loose(" =1.2.3 "), Some(Version::new(1, 2, 3)));
        assert_eq!(parse_loose("=v1.2.3"), Some(Version::new(1, 2, 3)));
        assert!(parse_loose("lol ok").is_none());
        assert!(parse_loose("1.2").is_none());
    }

    #[test]
    fn test_parse_loose_unhyphenated_prerelease() {
        let version = parse_loose("1.2.3beta").unwrap();
        assert_eq!(version.pre.as_str(), "beta");
        assert!(parse_loose("1.2.beta").is_none());
    }

    #[test]
    fn test_clean() {
        assert_eq!(clean("  1.0.0 ").as_deref(), Some("1.0.0"));
        assert_eq!(clean("v1.0.0+build.5").as_deref(), Some("1.0.0"));
        assert_eq!(clean("1.0.0-pre.0").as_deref(), Some("1.0.0-pre.0"));
        assert_eq!(clean("^1.0.0"), None);
    }

    #[test]
    fn test_caret_and_tilde() {
        let versions = ["1.0.0", "1.0.1", "1.0.2", "1.1.0", "2.0.0"];
        assert_eq!(pick(&versions, "^1.0.0"), Some("1.1.0"));
        assert_eq!(pick(&versions, "~1.0.0"), Some("1.0.2"));
        assert_eq!(pick(&versions, "~>1.0"), Some("1.0.2"));
        assert_eq!(pick(&versions, "^0.1.0"), None);
    }

    #[test]
    fn test_bare_version_is_exact() {
        let versions = ["1.0.0", "1.0.1", "2.0.0"];
        assert_eq!(pick(&versions, "1.0.0"), Some("1.0.0"));
        assert_eq!(pick(&versions, "=1.0.0"), Some("1.0.0"));
        assert_eq!(pick(&versions, "1.0"), Some("1.0.1"));
        assert_eq!(pick(&versions, "1"), Some("1.0.1"));
    }

    #[test]
    fn test_x_ranges() {
        let versions = ["1.0.0", "1.5.0", "1.5.3", "2.0.0"];
        assert_eq!(pick(&versions, "1.x"), Some("1.5.3"));
        assert_eq!(pick(&versions, "1.5.X"), Some("1.5.3"));
        assert_eq!(pick(&versions, "1.*"), Some("1.5.3"));
        assert_eq!(pick(&versions, "*"), Some("2.0.0"));
        assert_eq!(pick(&versions, "x"), Some("2.0.0"));
        assert_eq!(pick(&versions, ""), Some("2.0.0"));
    }

    #[test]
    fn test_hyphen_range() {
        let versions = ["1.0.0", "1.5.0", "2.0.0", "2.3.9", "2.4.0", "3.0.0"];
        assert_eq!(pick(&versions, "1.0.0 - 2.0.0"), Some("2.0.0"));
        assert_eq!(pick(&versions, "1.0.0 - 2.3"), Some("2.3.9"));
    }

    #[test]
    fn test_space_separated_comparators() {
        let versions = ["2.0.0", "2.1.2", "2.5.0", "3.0.0"];
        assert_eq!(pick(&versions, ">= 2.1.2 < 3.0.0"), Some("2.5.0"));
        assert_eq!(pick(&versions, ">=2.1.2 <3"), Some("2.5.0"));
        assert_eq!(pick(&versions, ">2.1.2 <=2.1.2"), None);
    }

    #[test]
    fn test_or_ranges() {
        let versions = ["1.5.0", "2.5.0", "3.0.0"];
        assert_eq!(pick(&versions, "^1.0.0 || ^2.0.0"), Some("2.5.0"));
        assert_eq!(pick(&versions, "^1.0.0||^4.0.0"), Some("1.5.0"));
        assert_eq!(pick(&versions, "^5.0.0 || ^4.0.0"), None);
    }

    #[test]
    fn test_loose_garbage_is_dropped() {
        let versions = ["1.0.0", "1.0.1", "2.0.0"];
        assert_eq!(pick(&versions, "== 1.0.0 || foo"), Some("1.0.0"));
        assert_eq!(pick(&versions, ">=1.0.0 garbage <2"), Some("1.0.1"));
    }

    #[test]
    fn test_tags_are_not_ranges() {
        assert!(Range::parse("latest").is_err());
        assert!(Range::parse("beta || next").is_err());
        assert!(Range::parse("!?!?!?!").is_err());
    }

    #[test]
    fn test_prereleases_need_explicit_opt_in() {
        let versions = ["1.0.0-pre.0", "1.0.0-pre.1", "2.0.0-beta.0"];
        assert_eq!(pick(&versions, "*"), None);
        assert_eq!(pick(&versions, "^1.0.0-pre.0"), Some("1.0.0-pre.1"));
        assert_eq!(pick(&versions, ">=1.0.0-pre.0"), Some("1.0.0-pre.1"));
    }

    #[test]
    fn test_unsatisfiable_wildcard_comparators() {
        let versions = ["0.0.1", "1.0.0"];
        assert_eq!(pick(&versions, ">*"), None);
        assert_eq!(pick(&versions, "<x"), None);
        assert_eq!(pick(&versions, ">=*"), Some("1.0.0"));
    }

    #[test]
    fn test_max_satisfying_skips_invalid_keys() {
        let versions = ["1.0.0", "lol ok", "1.0.1"];
        assert_eq!(pick(&versions, "^1.0.0"), Some("1.0.1"));
    }

    #[test]
    fn test_satisfies() {
        assert!(satisfies("1.2.3", "^1.0.0"));
        assert!(satisfies("v1.2.3", ">=1.2.3"));
        assert!(!satisfies("1.2.3", "^2.0.0"));
        assert!(!satisfies("nope", "*"));
        assert!(!satisfies("1.2.3", "nope"));
    }

    #[test]
    fn test_exact_range() {
        let version = Version::parse("1.0.0-pre.1").unwrap();
        let exact = Range::exact(&version);
        assert!(exact.matches(&version));
        assert!(!exact.matches_str("1.0.0"));
        assert!(Range::any().matches_str("3.1.4"));
    }
}
