//! `pickman pick` command implementation.

use miette::{IntoDiagnostic, Result};
use pickman_core::pkg::{pick_manifest, Before, PickError, PickOptions, PickedManifest};
use pickman_core::{load_options, load_packument};
use serde::Serialize;
use std::path::PathBuf;

/// Exit code when no manifest could be picked.
const EXIT_NO_PICK: i32 = 2;

/// Pick command action.
#[derive(Debug, Clone, Default)]
pub struct PickAction {
    /// Packument document, or `-` for stdin.
    pub packument: PathBuf,
    pub wanted: String,
    /// camelCase options file. Flags override its values.
    pub options_file: Option<PathBuf>,
    pub overrides: OptionOverrides,
}

/// Option values given as flags.
#[derive(Debug, Clone, Default)]
pub struct OptionOverrides {
    pub default_tag: Option<String>,
    pub before: Option<String>,
    pub node_version: Option<String>,
    pub include_deprecated: bool,
    pub include_staged: bool,
    pub avoid: Option<String>,
    pub avoid_strict: bool,
}

impl OptionOverrides {
    fn apply(&self, mut opts: PickOptions) -> PickOptions {
        if let Some(tag) = &self.default_tag {
            opts = opts.with_default_tag(tag.clone());
        }
        if let Some(before) = &self.before {
            opts = opts.with_before(parse_before(before));
        }
        if let Some(node) = &self.node_version {
            opts = opts.with_node_version(node.clone());
        }
        if self.include_deprecated {
            opts = opts.with_include_deprecated(true);
        }
        if self.include_staged {
            opts = opts.with_include_staged(true);
        }
        if let Some(avoid) = &self.avoid {
            opts = opts.with_avoid(avoid.clone());
        }
        if self.avoid_strict {
            opts = opts.with_avoid_strict(true);
        }
        opts
    }
}

/// `--before` takes a date string or epoch milliseconds.
fn parse_before(value: &str) -> Before {
    value
        .parse::<i64>()
        .map_or_else(|_| Before::from(value), Before::from)
}

#[derive(Serialize)]
struct PickJsonResult<'a> {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    manifest: Option<&'a PickedManifest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<PickErrorInfo>,
}

#[derive(Serialize)]
struct PickErrorInfo {
    code: &'static str,
    message: String,
    details: serde_json::Value,
}

impl From<&PickError> for PickErrorInfo {
    fn from(err: &PickError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
            details: err.details(),
        }
    }
}

/// Run the pick command.
///
/// When `json` is true, writes a single JSON object to stdout.
pub fn run(action: &PickAction, json: bool) -> Result<()> {
    let packument = load_packument(&action.packument).into_diagnostic()?;
    let base = match &action.options_file {
        Some(path) => load_options(path).into_diagnostic()?,
        None => PickOptions::default(),
    };
    let opts = action.overrides.apply(base);

    tracing::debug!(
        name = %packument.name,
        versions = packument.versions.len(),
        options = ?opts,
        "loaded packument"
    );

    match pick_manifest(&packument, &action.wanted, &opts) {
        Ok(picked) => {
            tracing::info!(
                version = picked.version().unwrap_or_default(),
                reason = picked.reason.as_str(),
                should_avoid = picked.should_avoid,
                outside_dependency_range = picked.outside_dependency_range,
                "picked manifest"
            );
            print_picked(&packument.name, &picked, json)
        }
        Err(err) => {
            tracing::debug!(code = err.code(), "pick failed");
            print_error(&err, json)?;
            std::process::exit(EXIT_NO_PICK);
        }
    }
}

fn print_picked(name: &str, picked: &PickedManifest, json: bool) -> Result<()> {
    if json {
        let result = PickJsonResult {
            ok: true,
            reason: Some(picked.reason.as_str()),
            manifest: Some(picked),
            error: None,
        };
        println!("{}", serde_json::to_string_pretty(&result).into_diagnostic()?);
        return Ok(());
    }

    println!(
        "{name}@{} ({})",
        picked.version().unwrap_or("?"),
        picked.reason.as_str()
    );
    if picked.should_avoid {
        eprintln!("warning: picked version matches --avoid; nothing in range can replace it");
    }
    if picked.outside_dependency_range {
        let kind = if picked.is_semver_major == Some(true) {
            "a semver-major"
        } else {
            "an"
        };
        eprintln!("warning: picked {kind} version outside the wanted range to honor --avoid");
    }
    Ok(())
}

fn print_error(err: &PickError, json: bool) -> Result<()> {
    if json {
        let result = PickJsonResult {
            ok: false,
            reason: None,
            manifest: None,
            error: Some(PickErrorInfo::from(err)),
        };
        println!("{}", serde_json::to_string_pretty(&result).into_diagnostic()?);
    } else {
        eprintln!("error[{}]: {err}", err.code());
    }
    Ok(())
}
