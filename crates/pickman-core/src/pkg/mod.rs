//! Registry manifest selection.
//!
//! Provides utilities for:
//! - Modelling packuments and manifests
//! - Classifying `name@wanted` specifiers
//! - Loose npm semver ranges on top of `semver`
//! - Picking one manifest for a tag, version or range

pub mod error;
pub mod options;
pub mod packument;
pub mod picker;
pub mod spec;
pub mod version;

pub use error::{codes as pick_codes, PickError};
pub use options::{Before, PickOptions, DEFAULT_TAG};
pub use packument::{Manifest, Packument, VersionSet};
pub use picker::{pick_manifest, PickReason, PickedManifest};
pub use spec::{resolve_spec, ParsedSpec, SpecError, SpecType};
pub use version::{clean, is_valid, max_satisfying, parse_loose, satisfies, Range, RangeError};
