#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::unnecessary_wraps)]

mod commands;
mod logging;

use clap::Parser;
use commands::pick::{OptionOverrides, PickAction};
use miette::Result;
use pickman_core::Config;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pickman")]
#[command(author, version, about = "Pick a manifest from an npm packument", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Pick the best manifest for a tag, version or range
    Pick {
        /// Packument JSON file, or `-` to read stdin
        packument: PathBuf,

        /// Wanted tag, version or range (empty means `*`)
        #[arg(default_value = "")]
        wanted: String,

        /// Options JSON file (camelCase keys); flags override its values
        #[arg(long, value_name = "FILE")]
        options: Option<PathBuf>,

        /// Tag preferred when it satisfies the range
        #[arg(long, env = "PICKMAN_DEFAULT_TAG")]
        default_tag: Option<String>,

        /// Ignore versions published after this date (ISO date or epoch millis)
        #[arg(long, value_name = "DATE")]
        before: Option<String>,

        /// Prefer versions whose engines.node accepts this Node.js version
        #[arg(long, value_name = "VERSION")]
        node_version: Option<String>,

        /// Treat deprecated versions like any other
        #[arg(long)]
        include_deprecated: bool,

        /// Consider staged versions
        #[arg(long)]
        include_staged: bool,

        /// Range of versions to steer away from
        #[arg(long, value_name = "RANGE")]
        avoid: Option<String>,

        /// Never pick an avoided version, even outside the wanted range
        #[arg(long, requires = "avoid")]
        avoid_strict: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::new()
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json);

    logging::init(config.verbosity, config.json_logs);

    match cli.command {
        Some(Commands::Version) | None => commands::version::run(),
        Some(Commands::Pick {
            packument,
            wanted,
            options,
            default_tag,
            before,
            node_version,
            include_deprecated,
            include_staged,
            avoid,
            avoid_strict,
        }) => {
            let span = tracing::info_span!("pick", cmd = "pick", wanted = %wanted);
            let _guard = span.enter();

            let action = PickAction {
                packument,
                wanted,
                options_file: options,
                overrides: OptionOverrides {
                    default_tag,
                    before,
                    node_version,
                    include_deprecated,
                    include_staged,
                    avoid,
                    avoid_strict,
                },
            };
            commands::pick::run(&action, config.json_logs)
        }
    }
}
