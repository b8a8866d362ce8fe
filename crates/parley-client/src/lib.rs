//! # parley-client
//!
//! The messaging core consumed by a presentation layer: [`SyncCoordinator`]
//! gates chat and message actions through the chat's rules, forwards them
//! to a [`RemoteSource`], and keeps the local [`ChatStore`] in step through
//! delta sync.
//!
//! [`ChatStore`]: parley_store::ChatStore

pub mod config;
pub mod coordinator;
pub mod error;
pub mod remote;
pub mod sync;

mod streaming;

use tracing_subscriber::{fmt, EnvFilter};

pub use config::ClientConfig;
pub use coordinator::{SyncCoordinator, SyncOutcome};
pub use error::{ClientError, RemoteError, Result};
pub use remote::{decode_delta_page, encode_delta_page, RemoteSource};
pub use sync::{SyncCommand, SyncHandle};

/// Install the default `tracing` subscriber.
///
/// `RUST_LOG` overrides the default filter. Does nothing if a global
/// subscriber is already set.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("parley_client=debug,parley_store=info,warn"));

    let installed = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("Starting {} client core", parley_shared::constants::APP_NAME);
    }
}
