//! # Observability & Tracing
//!
//! Every actor logs through the `tracing` macros with structured fields:
//!
//! - **Lifecycle**: `Actor started` with the actor name and mailbox capacity, `Shutdown` with
//!   processed and drained/discarded counters.
//! - **Dispatch**: one `debug` event per message (`kind`, `id`), plus `Signup`, `Signoff` and
//!   dropped messages.
//! - **Errors**: dispatch failures inside a run loop are logged at `warn`, since no caller is
//!   left to receive them.
//!
//! Log levels come from `RUST_LOG`:
//!
//! ```bash
//! # lifecycle only
//! RUST_LOG=info cargo run -p mailbox-sample
//!
//! # every dispatched message
//! RUST_LOG=actor_mailbox=debug cargo run -p mailbox-sample
//! ```

/// Installs the global subscriber. Panics if one is already installed, so call it once from
/// `main`.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}

/// Like [`setup_tracing`], but returns `false` instead of panicking when a subscriber is
/// already installed. Meant for tests, which may each try to install one.
pub fn try_setup_tracing() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .with_test_writer()
        .try_init()
        .is_ok()
}
