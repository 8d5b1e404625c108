//! Stderr logging for `pickman`.
//!
//! stdout is reserved for the picked manifest (or the `--json` result), so
//! every log line goes to stderr. The core crate never logs; the `pick`
//! command records its inputs and the resolution reason here.

use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

/// Install the global subscriber.
///
/// `-v` raises the `pickman` target to DEBUG and `-vv` to TRACE. Other
/// targets stay at `warn` unless `RUST_LOG` says otherwise. With `json`, each
/// event is one JSON object carrying the `pick` span fields:
/// ```json
/// {"timestamp":"...","level":"INFO","fields":{"message":"picked manifest","version":"1.0.2","reason":"highest-undeprecated"},"span":{"cmd":"pick","wanted":"^1"}}
/// ```
pub fn init(verbosity: u8, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"))
        .add_directive(pickman_directive(verbosity_level(verbosity)));

    let stderr = fmt::layer().with_writer(std::io::stderr);
    let output = if json {
        stderr
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .boxed()
    } else {
        stderr.with_target(false).boxed()
    };

    tracing_subscriber::registry().with(output).with(filter).init();
}

fn verbosity_level(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn pickman_directive(level: Level) -> Directive {
    // `pickman=<level>` always parses
    format!("pickman={level}")
        .parse()
        .unwrap_or_else(|_| level.into())
}
