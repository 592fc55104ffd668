//! Logging initialisation

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Install the global fmt subscriber. `RUST_LOG` wins over `filter`.
/// Later calls are ignored.
pub fn init(filter: &str) {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(filter))
            .unwrap_or_else(|_| EnvFilter::new("info"));
        let installed = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .try_init()
            .is_ok();
        if installed {
            tracing::debug!("Logging initialised with filter {:?}", filter);
        }
    });
}
