//! Structured logging for scrivener.
//!
//! Every pipeline step runs inside an `item` span carrying the image path, so JSON lines can be
//! grouped per image even when a batch runs on several workers. `info` is the default because
//! per-image routing and persistence events are the useful record of a batch run; classifier
//! predictions and prompt previews stay at `debug`.
//!
//! Logs go to stderr. Stdout belongs to the CLI's one-line result so it can be piped.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding an `EnvFilter` directive, e.g. `scrivener=debug`.
pub const LOG_ENV: &str = "SCRIVENER_LOG";

/// Install the JSON subscriber. Calling it again (or after another subscriber was set) is a no-op.
pub fn init() {
    let filter = EnvFilter::builder()
        .with_env_var(LOG_ENV)
        .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
        .from_env_lossy();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(true)
                .with_span_list(true),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init();
        init();
    }
}
