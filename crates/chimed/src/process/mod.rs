//! Process lifecycle: configuration, startup, signal wait, and shutdown.

mod errors;
pub(crate) mod launch;
pub(crate) mod shutdown;

pub use errors::LaunchError;
pub use launch::{
    ConfigLoader, Connection, SocketConnector, SystemConfigLoader, TransportConnector, run_daemon,
};
pub use shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
