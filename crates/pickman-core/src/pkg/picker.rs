//! Manifest picking.
//!
//! Selects one manifest from a packument for a wanted tag, version or range.
//!
//! # Phases
//! 1. Classify and clean the wanted spec
//! 2. Build the candidate pool (`versions`, plus staged versions when opted in)
//! 3. Filter to eligible versions (valid semver, published before the cutoff)
//! 4. Run the target strategies in priority order, stopping at the first hit
//! 5. Re-rank away from `avoid`, veto policy-restricted targets, validate
//! 6. Normalize `bin` and return

use super::error::PickError;
use super::options::PickOptions;
use super::packument::{Manifest, Packument};
use super::spec::{resolve_spec, SpecType};
use super::version::{self, max_satisfying, parse_loose, Range};
use chrono::{DateTime, Utc};
use semver::{Prerelease, Version};
use serde::Serialize;
use std::collections::BTreeMap;

/// Why a version was picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PickReason {
    /// The wanted tag points at it.
    DistTag,
    /// It is the wanted version.
    ExactVersion,
    /// The default tag points at it and it satisfies the range.
    DefaultTag,
    /// Highest non-deprecated version satisfying the range.
    HighestUndeprecated,
    /// Highest version satisfying the range.
    Highest,
    /// `*` with nothing satisfying it fell back to the default tag.
    LegacyWildcard,
    /// Only a policy-restricted version satisfies the range.
    RestrictedMatch,
    /// The target matched `avoid`; a non-avoided version in range replaced it.
    AvoidInRange,
    /// The target matched `avoid`; a non-avoided version outside the range replaced it.
    AvoidOutsideRange,
}

impl PickReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DistTag => "dist-tag",
            Self::ExactVersion => "exact-version",
            Self::DefaultTag => "default-tag",
            Self::HighestUndeprecated => "highest-undeprecated",
            Self::Highest => "highest",
            Self::LegacyWildcard => "legacy-wildcard",
            Self::RestrictedMatch => "restricted-match",
            Self::AvoidInRange => "avoid-in-range",
            Self::AvoidOutsideRange => "avoid-outside-range",
        }
    }
}

/// The picked manifest plus advisory flags.
///
/// Serializes as the manifest object with `_shouldAvoid`,
/// `_outsideDependencyRange` and `_isSemVerMajor` added when set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PickedManifest {
    #[serde(flatten)]
    pub manifest: Manifest,

    #[serde(skip)]
    pub reason: PickReason,

    /// The version matches `avoid` and nothing in range could replace it.
    #[serde(rename = "_shouldAvoid", skip_serializing_if = "is_false")]
    pub should_avoid: bool,

    /// The version was picked outside the wanted range to honor `avoid_strict`.
    #[serde(rename = "_outsideDependencyRange", skip_serializing_if = "is_false")]
    pub outside_dependency_range: bool,

    /// Set with `outside_dependency_range`: whether the major version changed.
    #[serde(rename = "_isSemVerMajor", skip_serializing_if = "Option::is_none")]
    pub is_semver_major: Option<bool>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

impl PickedManifest {
    fn new(manifest: Manifest, reason: PickReason) -> Self {
        Self {
            manifest,
            reason,
            should_avoid: false,
            outside_dependency_range: false,
            is_semver_major: None,
        }
    }

    /// The picked version string.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.manifest.version()
    }
}

/// Pick the best manifest in `packument` for `wanted`.
///
/// Never mutates the packument; the result owns a copy of the stored manifest.
///
/// # Errors
/// - `InvalidSpecifier` / `UnsupportedSpecifierType` if `wanted` is not a tag,
///   version or range
/// - `NoVersions` / `NoPolicyVersions` if no version is eligible
/// - `NoAvoidableVersions` if `avoid_strict` leaves nothing to pick
/// - `PolicyRestricted` if the target is policy-restricted
/// - `NoMatchingVersion` if nothing eligible matches
pub fn pick_manifest(
    packument: &Packument,
    wanted: &str,
    opts: &PickOptions,
) -> Result<PickedManifest, PickError> {
    let ctx = Context::new(packument, wanted, opts)?;

    if ctx.eligible.is_empty() {
        return Err(ctx.no_versions_error());
    }

    let mut target = Strategy::ORDER
        .iter()
        .find_map(|strategy| strategy.resolve(&ctx).map(|version| (version, strategy.reason())));

    // A restricted match only exists to fail the policy veto below.
    let mut flags = Flags::default();
    if let Some((version, reason)) = &mut target {
        if *reason != PickReason::RestrictedMatch {
            flags = ctx.apply_avoid(version, reason)?;
        }
    }

    if let Some((version, _)) = &target {
        if packument.is_restricted(version) {
            return Err(PickError::PolicyRestricted {
                name: packument.name.clone(),
                spec_type: ctx.spec_type,
                wanted: ctx.wanted.clone(),
            });
        }
    }

    let Some((version, reason)) = target else {
        return Err(ctx.no_match_error());
    };

    let within_cutoff = ctx.cutoff.is_none()
        || reason == PickReason::LegacyWildcard
        || ctx.eligible.contains(&version.as_str());
    let manifest = match ctx.pool.get(version.as_str()) {
        Some(manifest) if within_cutoff => *manifest,
        _ => return Err(ctx.no_match_error()),
    };

    let mut manifest = manifest.clone();
    manifest.normalize_bin(&packument.name);

    let mut picked = PickedManifest::new(manifest, reason);
    picked.should_avoid = flags.should_avoid;
    picked.outside_dependency_range = flags.outside_dependency_range;
    picked.is_semver_major = flags.is_semver_major;
    Ok(picked)
}

/// Target strategies, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    DistTag,
    ExactVersion,
    DefaultTag,
    HighestUndeprecated,
    Highest,
    LegacyWildcard,
    RestrictedMatch,
}

impl Strategy {
    const ORDER: [Self; 7] = [
        Self::DistTag,
        Self::ExactVersion,
        Self::DefaultTag,
        Self::HighestUndeprecated,
        Self::Highest,
        Self::LegacyWildcard,
        Self::RestrictedMatch,
    ];

    fn reason(self) -> PickReason {
        match self {
            Self::DistTag => PickReason::DistTag,
            Self::ExactVersion => PickReason::ExactVersion,
            Self::DefaultTag => PickReason::DefaultTag,
            Self::HighestUndeprecated => PickReason::HighestUndeprecated,
            Self::Highest => PickReason::Highest,
            Self::LegacyWildcard => PickReason::LegacyWildcard,
            Self::RestrictedMatch => PickReason::RestrictedMatch,
        }
    }

    fn resolve(self, ctx: &Context<'_>) -> Option<String> {
        match self {
            Self::DistTag => (ctx.spec_type == SpecType::Tag)
                .then(|| ctx.dist_tag(&ctx.wanted))
                .flatten()
                .map(str::to_string),
            Self::ExactVersion => {
                (ctx.spec_type == SpecType::Version).then(|| ctx.wanted.clone())
            }
            Self::DefaultTag => {
                let range = ctx.wanted_range.as_ref()?;
                let tagged = ctx.dist_tag(&ctx.opts.default_tag)?;
                let usable = ctx.pool.contains_key(tagged)
                    && (ctx.cutoff.is_none() || ctx.eligible.contains(&tagged))
                    && range.matches_str(tagged);
                usable.then(|| tagged.to_string())
            }
            Self::HighestUndeprecated => {
                if ctx.opts.include_deprecated {
                    return None;
                }
                let range = ctx.wanted_range.as_ref()?;
                ctx.highest(ctx.undeprecated(ctx.eligible.iter().copied()), range)
                    .map(str::to_string)
            }
            Self::Highest => {
                let range = ctx.wanted_range.as_ref()?;
                ctx.highest(ctx.eligible.iter().copied(), range)
                    .map(str::to_string)
            }
            Self::LegacyWildcard => {
                if ctx.spec_type != SpecType::Range {
                    return None;
                }
                matches!(ctx.wanted.as_str(), "*" | "")
                    .then(|| ctx.dist_tag(&ctx.opts.default_tag))
                    .flatten()
                    .map(str::to_string)
            }
            Self::RestrictedMatch => {
                let range = ctx.wanted_range.as_ref()?;
                let restricted = ctx.packument.restricted_versions()?;
                max_satisfying(restricted.keys().map(String::as_str), range).map(str::to_string)
            }
        }
    }
}

/// Advisory flags set by avoidance.
#[derive(Debug, Default)]
struct Flags {
    should_avoid: bool,
    outside_dependency_range: bool,
    is_semver_major: Option<bool>,
}

/// Everything derived from the inputs before strategies run.
struct Context<'a> {
    packument: &'a Packument,
    opts: &'a PickOptions,
    spec_type: SpecType,
    /// Wanted spec after cleaning.
    wanted: String,
    /// The wanted range, for range specs only.
    wanted_range: Option<Range>,
    /// `versions` merged with opted-in staged versions.
    pool: BTreeMap<&'a str, &'a Manifest>,
    /// Pool keys that are valid versions published before the cutoff.
    eligible: Vec<&'a str>,
    cutoff: Option<i64>,
    node_version: Option<Version>,
}

impl<'a> Context<'a> {
    fn new(packument: &'a Packument, wanted: &str, opts: &'a PickOptions) -> Result<Self, PickError> {
        let spec = resolve_spec(&packument.name, wanted)?;
        let spec_type = spec.spec_type;
        if !spec_type.is_registry() {
            return Err(PickError::UnsupportedSpecifierType);
        }

        let wanted = match spec_type {
            SpecType::Version | SpecType::Range => {
                version::clean(&spec.fetch_spec).unwrap_or(spec.fetch_spec)
            }
            _ => spec.fetch_spec,
        };
        let wanted_range = if spec_type == SpecType::Range {
            Range::parse(&wanted).ok()
        } else {
            None
        };

        // Abbreviated documents carry no `time` map; the cutoff cannot apply to them.
        let cutoff = opts.cutoff()?.filter(|_| !packument.time.is_empty());

        let mut pool: BTreeMap<&str, &Manifest> = packument
            .versions
            .iter()
            .map(|(key, manifest)| (key.as_str(), manifest))
            .collect();
        if opts.include_staged {
            if let Some(staged) = packument.staged() {
                for (key, manifest) in staged {
                    pool.entry(key.as_str()).or_insert(manifest);
                }
            }
        }

        let eligible = pool
            .keys()
            .copied()
            .filter(|key| version::is_valid(key))
            .filter(|key| {
                cutoff.map_or(true, |cutoff| {
                    packument
                        .published_at(key)
                        .is_some_and(|published| published <= cutoff)
                })
            })
            .collect();

        // Engine ranges are checked against the release the prerelease leads up to.
        let node_version = opts.node_version.as_deref().and_then(parse_loose).map(|mut v| {
            v.pre = Prerelease::EMPTY;
            v
        });

        Ok(Self {
            packument,
            opts,
            spec_type,
            wanted,
            wanted_range,
            pool,
            eligible,
            cutoff,
            node_version,
        })
    }

    fn dist_tag(&self, tag: &str) -> Option<&'a str> {
        self.packument.dist_tags.get(tag).map(String::as_str)
    }

    fn undeprecated<'s, I>(&'s self, versions: I) -> impl Iterator<Item = &'a str> + Clone + 's
    where
        I: Iterator<Item = &'a str> + Clone + 's,
    {
        versions.filter(|v| self.pool.get(v).is_some_and(|m| !m.is_deprecated()))
    }

    /// Highest version in range, preferring versions whose `engines.node`
    /// accepts the current Node.js version.
    fn highest<I>(&self, versions: I, range: &Range) -> Option<&'a str>
    where
        I: Iterator<Item = &'a str> + Clone,
    {
        if let Some(node) = &self.node_version {
            let compatible = versions.clone().filter(|v| self.engine_ok(v, node));
            if let Some(found) = max_satisfying(compatible, range) {
                return Some(found);
            }
        }
        max_satisfying(versions, range)
    }

    /// Highest in range, non-deprecated first unless deprecated versions are included.
    fn highest_preferring_undeprecated<'s, I>(&'s self, versions: I, range: &Range) -> Option<&'a str>
    where
        I: Iterator<Item = &'a str> + Clone + 's,
    {
        if !self.opts.include_deprecated {
            if let Some(found) = self.highest(self.undeprecated(versions.clone()), range) {
                return Some(found);
            }
        }
        self.highest(versions, range)
    }

    fn engine_ok(&self, version: &str, node: &Version) -> bool {
        let Some(manifest) = self.pool.get(version) else {
            return false;
        };
        match manifest.node_engine() {
            None => true,
            Some(engine) => Range::parse(engine).is_ok_and(|range| range.matches(node)),
        }
    }

    /// The range the caller asked for, used when searching for a replacement.
    fn requested_range(&self, target: &str) -> Option<Range> {
        match &self.wanted_range {
            Some(range) => Some(range.clone()),
            None => parse_loose(target).map(|v| Range::exact(&v)),
        }
    }

    /// Move `target` off avoided versions where possible.
    fn apply_avoid(&self, target: &mut String, reason: &mut PickReason) -> Result<Flags, PickError> {
        let mut flags = Flags::default();
        let Some(avoid_spec) = self.opts.avoid.as_deref() else {
            return Ok(flags);
        };
        let Ok(avoid) = Range::parse(avoid_spec) else {
            return Ok(flags);
        };
        if !avoid.matches_str(target) {
            return Ok(flags);
        }

        let unavoided: Vec<&'a str> = self
            .eligible
            .iter()
            .copied()
            .filter(|v| !avoid.matches_str(v))
            .collect();

        if let Some(range) = self.requested_range(target) {
            if let Some(found) =
                self.highest_preferring_undeprecated(unavoided.clone().into_iter(), &range)
            {
                *target = found.to_string();
                *reason = PickReason::AvoidInRange;
                return Ok(flags);
            }
        }

        if !self.opts.avoid_strict {
            flags.should_avoid = true;
            return Ok(flags);
        }

        let Some(found) = self.highest_preferring_undeprecated(unavoided.into_iter(), &Range::any())
        else {
            return Err(PickError::NoAvoidableVersions {
                name: self.packument.name.clone(),
                avoid: avoid_spec.to_string(),
            });
        };

        let major = |v: &str| parse_loose(v).map(|v| v.major);
        flags.outside_dependency_range = true;
        flags.is_semver_major = Some(major(found) != major(target.as_str()));
        *target = found.to_string();
        *reason = PickReason::AvoidOutsideRange;
        Ok(flags)
    }

    fn no_versions_error(&self) -> PickError {
        let name = self.packument.name.clone();
        let spec_type = self.spec_type;
        let wanted = self.wanted.clone();
        if self
            .packument
            .restricted_versions()
            .is_some_and(|versions| !versions.is_empty())
        {
            PickError::NoPolicyVersions {
                name,
                spec_type,
                wanted,
            }
        } else {
            PickError::NoVersions {
                name,
                spec_type,
                wanted,
            }
        }
    }

    fn no_match_error(&self) -> PickError {
        PickError::NoMatchingVersion {
            name: self.packument.name.clone(),
            spec_type: self.spec_type,
            wanted: self.wanted.clone(),
            versions: self.eligible.iter().map(|v| (*v).to_string()).collect(),
            dist_tags: self.packument.dist_tags.clone(),
            default_tag: self.opts.default_tag.clone(),
            before: self.cutoff.and_then(DateTime::<Utc>::from_timestamp_millis),
        }
    }
}
