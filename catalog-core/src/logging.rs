//! Logging setup for embedders that want this crate's `tracing` output on a
//! standard `fmt` subscriber without wiring one up themselves.
//!
//! Defaults `RUST_LOG` if unset and installs a `fmt()` builder with
//! file/line and thread metadata. `setup` is opt-in — a library has no
//! business installing a process-wide subscriber on its own initiative, so
//! callers who already run their own `tracing-subscriber` setup can skip
//! this entirely.

use std::env;
use tracing_subscriber::EnvFilter;

/// Sets `RUST_LOG` to `"<module>=<log_level>"` if unset, then installs a
/// `tracing_subscriber::fmt` subscriber with file/line and thread metadata.
/// Panics if a global subscriber is already installed (as `tracing`'s own
/// `set_global_default` does) — call this at most once, and only from a
/// binary, not from within a library that might itself be embedded.
pub fn setup(module: &str, log_level: &str) {
    if env::var_os("RUST_LOG").is_none() {
        env::set_var("RUST_LOG", format!("{module}={log_level}"));
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .init();
}
