//! Structured logging setup for the `kobuki-rtc` binary.
//!
//! | Variable | Effect |
//! |---|---|
//! | `RUST_LOG` | Log filter. Defaults to `info`, or `debug` when the component config sets `debug = true`. |
//! | `KOBUKI_LOG_FORMAT=json` | Emit newline-delimited JSON logs. |

use tracing_subscriber::EnvFilter;

/// Default filter directive for the given `debug` config flag.
pub fn default_level(debug: bool) -> &'static str {
    if debug { "debug" } else { "info" }
}

/// Install the global `tracing` subscriber. Call once, before the runtime
/// starts.
pub fn init(debug: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(debug)));

    if std::env::var("KOBUKI_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    }
}
