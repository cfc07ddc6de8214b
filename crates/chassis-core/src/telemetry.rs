//! Tracing setup for the `chassis` binary.
//!
//! Logs always go to stderr. Stdout is reserved for reports, so
//! `chassis --json validate > report.json` stays parseable.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Crates whose events are shown at the requested level.
const CHASSIS_TARGETS: [&str; 3] = ["chassis_core", "chassis_build", "chassis_cli"];

/// Filter used when `RUST_LOG` is unset: chassis crates at `level`,
/// everything else at `warn`.
fn default_directives(level: Level) -> String {
    let mut directives = vec!["warn".to_string()];
    directives.extend(CHASSIS_TARGETS.iter().map(|t| format!("{t}={level}")));
    directives.join(",")
}

/// Install the global subscriber. Only the first call has an effect.
///
/// `RUST_LOG` overrides `level`. With `json`, every event is one JSON line,
/// which the deploy platform's build log viewer keeps intact.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let registry = tracing_subscriber::registry().with(env_filter);
    let layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
    if json {
        registry.with(layer.json()).try_init().ok();
    } else {
        registry.with(layer.without_time()).try_init().ok();
    }
}
