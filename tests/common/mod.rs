//! Shared test support. `init_logging` is safe to call from every test —
//! `env_logger::init` panics if called twice in one process, and integration
//! test binaries share a process per file, so the `Once` guards it.

use std::sync::Once;

static INIT: Once = Once::new();

/// Initialises `env_logger` once per test binary. Run with `RUST_LOG=trace`
/// to see the compiler's `debug!`/`trace!` output for a failing scenario.
pub fn init_logging() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}
