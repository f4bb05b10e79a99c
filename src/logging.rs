//! Structured diagnostic logging, threaded through connect/handshake/frame/
//! keepalive/close paths. Each client owns its own `slog::Logger` rather than
//! relying on a process-wide global, so more than one client can run in the
//! same process with independent log configuration.

use sloggers::terminal::{Destination, TerminalLoggerBuilder};
use sloggers::types::Severity;
use sloggers::Build;

/// Build a terminal logger writing to stderr at `level`. This is the default
/// used by [`crate::ClientBuilder`] when the embedder doesn't supply their
/// own `slog::Logger`.
pub fn default_logger(level: Severity) -> slog::Logger {
    let mut builder = TerminalLoggerBuilder::new();
    builder.level(level);
    builder.destination(Destination::Stderr);
    builder.build().expect("terminal logger configuration is always valid")
}

pub fn discard() -> slog::Logger {
    slog::Logger::root(slog::Discard, slog::o!())
}
