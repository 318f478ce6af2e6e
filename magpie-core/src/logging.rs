//! Logger configuration
//!
//! Explicit logger setup owned by the process entry point: no ambient
//! color or formatting state beyond the subscriber installation itself.

use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Logger configuration, built once at process start.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Maximum level to emit.
    pub level: Level,
    /// Colorize output with ANSI escapes.
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            ansi: true,
        }
    }
}

/// Install the process-wide subscriber.
///
/// Returns `false` if a subscriber was already installed (tests, embedders).
pub fn init_logging(config: &LogConfig) -> bool {
    FmtSubscriber::builder()
        .with_max_level(config.level)
        .with_target(false)
        .with_thread_ids(false)
        .with_ansi(config.ansi)
        .compact()
        .try_init()
        .is_ok()
}

/// Level implied by a message's four-character prefix.
///
/// `DBG_`, `INFO`, `WARN`, `ERR_` and `FATA` select their level; anything
/// else is info. `FATA` maps to error, the highest level `tracing` has.
fn level_for(message: &str) -> Level {
    let tag: String = message.chars().take(4).collect::<String>().to_uppercase();
    match tag.as_str() {
        "DBG_" => Level::DEBUG,
        "WARN" => Level::WARN,
        "ERR_" | "FATA" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Emit a message at the level its prefix implies.
pub fn log_tagged(message: &str) {
    match level_for(message) {
        Level::DEBUG => debug!("{}", message),
        Level::WARN => warn!("{}", message),
        Level::ERROR => error!("{}", message),
        _ => info!("{}", message),
    }
}
