//! Global logging bootstrap.
//!
//! The framework and plugin RPC both log through `tracing`; this installs
//! a process-wide subscriber once. Hosts embedding the framework that
//! already installed their own subscriber keep it: a second init is a
//! no-op.

use tracing_subscriber::EnvFilter;

pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
