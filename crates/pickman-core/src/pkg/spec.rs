//! Specifier parsing.
//!
//! Classifies the wanted half of `name@wanted` the way npm does:
//! - `latest`, `beta` (tag)
//! - `1.2.3`, `v1.2.3` (version)
//! - `^1.2.0`, `1.x || >=3` (range)
//! - `git+https://…`, `github:user/repo`, `user/repo` (git)
//! - `https://example.com/pkg.tgz` (remote)
//! - `./pkg.tgz`, `file:../pkg` (file, directory)
//! - `npm:other@^1` (alias)

use super::version::{self, Range};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Specifier type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecType {
    Tag,
    Version,
    Range,
    Git,
    File,
    Directory,
    Remote,
    Alias,
}

impl SpecType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tag => "tag",
            Self::Version => "version",
            Self::Range => "range",
            Self::Git => "git",
            Self::File => "file",
            Self::Directory => "directory",
            Self::Remote => "remote",
            Self::Alias => "alias",
        }
    }

    /// Whether the type resolves against registry metadata.
    #[must_use]
    pub fn is_registry(&self) -> bool {
        matches!(self, Self::Tag | Self::Version | Self::Range)
    }
}

impl fmt::Display for SpecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Specifier parse error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error(
        "Invalid tag name \"{tag}\" of package \"{name}\": Tags may not have any characters that encodeURIComponent encodes."
    )]
    InvalidTagName { name: String, tag: String },
}

impl SpecError {
    /// Get the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidTagName { .. } => super::error::codes::EINVALIDTAGNAME,
        }
    }
}

/// A classified specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSpec {
    /// Package name the spec was resolved against.
    pub name: String,
    pub spec_type: SpecType,
    /// The spec as given.
    pub raw_spec: String,
    /// The spec to resolve with: trimmed, and `*` for an empty spec.
    pub fetch_spec: String,
}

/// Classify `wanted` as a specifier for package `name`.
///
/// # Errors
/// Returns an error if `wanted` would be a tag but contains characters that are not
/// allowed in tags.
pub fn resolve_spec(name: &str, wanted: &str) -> Result<ParsedSpec, SpecError> {
    let spec_type = classify(name, wanted)?;
    let trimmed = wanted.trim();
    let fetch_spec = if spec_type.is_registry() && trimmed.is_empty() {
        "*".to_string()
    } else {
        trimmed.to_string()
    };

    Ok(ParsedSpec {
        name: name.to_string(),
        spec_type,
        raw_spec: wanted.to_string(),
        fetch_spec,
    })
}

fn classify(name: &str, wanted: &str) -> Result<SpecType, SpecError> {
    if !wanted.is_empty() && (is_file_spec(wanted) || starts_with_ignore_case(wanted, "file:")) {
        return Ok(file_or_directory(wanted));
    }
    if starts_with_ignore_case(wanted, "npm:") {
        return Ok(SpecType::Alias);
    }
    if is_git_spec(wanted) {
        return Ok(SpecType::Git);
    }
    if has_url_scheme(wanted) {
        return Ok(SpecType::Remote);
    }
    if wanted.contains(['/', '\\']) || is_tarball_name(wanted) {
        return Ok(file_or_directory(wanted));
    }

    let spec = wanted.trim();
    if version::is_valid(spec) {
        return Ok(SpecType::Version);
    }
    if spec.is_empty() || Range::parse(spec).is_ok() {
        return Ok(SpecType::Range);
    }
    if !spec.chars().all(is_uri_component_safe) {
        return Err(SpecError::InvalidTagName {
            name: name.to_string(),
            tag: spec.to_string(),
        });
    }
    Ok(SpecType::Tag)
}

fn file_or_directory(spec: &str) -> SpecType {
    if is_tarball_name(spec) {
        SpecType::File
    } else {
        SpecType::Directory
    }
}

/// Paths: `.`, `~/`, `/`, `\` or a drive letter.
fn is_file_spec(spec: &str) -> bool {
    let bytes = spec.as_bytes();
    match bytes {
        [b'.', ..] | [b'/' | b'\\', ..] | [b'~', b'/', ..] => true,
        [drive, b':', ..] => drive.is_ascii_alphabetic(),
        _ => false,
    }
}

fn is_tarball_name(spec: &str) -> bool {
    let lower = spec.to_ascii_lowercase();
    lower.ends_with(".tgz") || lower.ends_with(".tar.gz") || lower.ends_with(".tar")
}

fn is_git_spec(spec: &str) -> bool {
    const GIT_PREFIXES: [&str; 6] = ["git+", "git://", "github:", "gitlab:", "bitbucket:", "gist:"];
    const GIT_HOSTS: [&str; 4] = ["github.com", "gitlab.com", "bitbucket.org", "gist.github.com"];

    if GIT_PREFIXES
        .iter()
        .any(|prefix| starts_with_ignore_case(spec, prefix))
    {
        return true;
    }

    if let Some((_, rest)) = spec.split_once("://") {
        let host = rest.split(['/', ':']).next().unwrap_or_default();
        let host = host.rsplit('@').next().unwrap_or(host);
        return GIT_HOSTS.contains(&host.to_ascii_lowercase().as_str());
    }

    is_github_shorthand(spec)
}

/// `user/repo` or `user/repo#ref`.
fn is_github_shorthand(spec: &str) -> bool {
    let path = spec.split_once('#').map_or(spec, |(path, _)| path);
    let Some((user, repo)) = path.split_once('/') else {
        return false;
    };

    let forbidden = |c: char| matches!(c, '@' | '%' | '/' | ':') || c.is_whitespace();
    let Some(first) = user.chars().next() else {
        return false;
    };

    !matches!(first, '.' | '-')
        && !user.chars().any(forbidden)
        && !repo.is_empty()
        && !repo.chars().any(forbidden)
}

/// `scheme:` prefix, e.g. `https:` or `ftp:`.
fn has_url_scheme(spec: &str) -> bool {
    spec.split_once(':').is_some_and(|(scheme, _)| {
        !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphabetic())
    })
}

/// Characters `encodeURIComponent` leaves untouched.
fn is_uri_component_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '!' | '~' | '*' | '\'' | '(' | ')')
}

fn starts_with_ignore_case(spec: &str, prefix: &str) -> bool {
    spec.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec_type(wanted: &str) -> SpecType {
        resolve_spec("foo", wanted).unwrap().spec_type
    }

    #[test]
    fn test_registry_types() {
        assert_eq!(spec_type("latest"), SpecType::Tag);
        assert_eq!(spec_type("next-11"), SpecType::Tag);
        assert_eq!(spec_type("1.0.0"), SpecType::Version);
        assert_eq!(spec_type("  1.0.0 "), SpecType::Version);
        assert_eq!(spec_type("v1.0.0"), SpecType::Version);
        assert_eq!(spec_type("=1.0.0"), SpecType::Version);
        assert_eq!(spec_type("^1.0.0"), SpecType::Range);
        assert_eq!(spec_type("2.1"), SpecType::Range);
        assert_eq!(spec_type(">=1.0.0 <2"), SpecType::Range);
        assert_eq!(spec_type("== 1.0.0 || foo"), SpecType::Range);
        assert_eq!(spec_type("*"), SpecType::Range);
    }

    #[test]
    fn test_empty_spec_is_wildcard_range() {
        let spec = resolve_spec("foo", "").unwrap();
        assert_eq!(spec.spec_type, SpecType::Range);
        assert_eq!(spec.fetch_spec, "*");
        assert_eq!(spec.raw_spec, "");
    }

    #[test]
    fn test_fetch_spec_is_trimmed() {
        let spec = resolve_spec("foo", "  1.0.0 ").unwrap();
        assert_eq!(spec.fetch_spec, "1.0.0");
        assert_eq!(spec.name, "foo");
    }

    #[test]
    fn test_invalid_tag_name() {
        let err = resolve_spec("foo", "!?!?!?!").unwrap_err();
        assert!(err.to_string().starts_with("Invalid tag name \"!?!?!?!\""));
        assert_eq!(err.code(), "EINVALIDTAGNAME");
        assert!(resolve_spec("foo", "has space").is_err());
    }

    #[test]
    fn test_non_registry_types() {
        assert_eq!(spec_type("file://foo.tar.gz"), SpecType::File);
        assert_eq!(spec_type("file:../foo"), SpecType::Directory);
        assert_eq!(spec_type("./foo.tgz"), SpecType::File);
        assert_eq!(spec_type("../foo"), SpecType::Directory);
        assert_eq!(spec_type("/abs/foo"), SpecType::Directory);
        assert_eq!(spec_type("C:\\foo"), SpecType::Directory);
        assert_eq!(spec_type("npm:bar@^1.0.0"), SpecType::Alias);
        assert_eq!(spec_type("git+https://example.com/foo.git"), SpecType::Git);
        assert_eq!(spec_type("github:user/repo"), SpecType::Git);
        assert_eq!(spec_type("user/repo#main"), SpecType::Git);
        assert_eq!(spec_type("https://github.com/user/repo"), SpecType::Git);
        assert_eq!(spec_type("https://example.com/foo.tgz"), SpecType::Remote);
        assert_eq!(spec_type("foo.tgz"), SpecType::File);
    }

    #[test]
    fn test_spec_type_serializes_lowercase() {
        let json = serde_json::to_value(SpecType::Directory).unwrap();
        assert_eq!(json, "directory");
        assert_eq!(SpecType::Tag.to_string(), "tag");
        assert!(SpecType::Range.is_registry());
        assert!(!SpecType::Git.is_registry());
    }
}
