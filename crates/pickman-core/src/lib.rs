#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

pub mod config;
pub mod error;
pub mod pkg;
pub mod version;

pub use config::{load_options, load_packument, Config};
pub use error::Error;
pub use pkg::{pick_manifest, PickError, PickOptions, PickedManifest, Packument};
pub use version::VERSION;
