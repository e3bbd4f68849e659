//! Tracing subscriber setup.

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install a hierarchical tracing subscriber.
///
/// Call this once at startup. Safe to call multiple times. The filter comes
/// from `TESSEL_LOG`, falling back to `RUST_LOG`; with neither set nothing
/// is installed. `TESSEL_LOG=tessel_exec=trace` shows every variable the
/// binder creates, nested under its `build_scope` span.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{prelude::*, EnvFilter};
        use tracing_tree::HierarchicalLayer;

        let filter =
            EnvFilter::try_from_env("TESSEL_LOG").or_else(|_| EnvFilter::try_from_default_env());
        if let Ok(filter) = filter {
            // Another subscriber may already be installed; keep it.
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(
                    HierarchicalLayer::new(2)
                        .with_targets(true)
                        .with_bracketed_fields(true),
                )
                .try_init();
        }
    });
}
