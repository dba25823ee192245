//! Logging facilities for Tricep.
//!
//! Tricep instruments itself with the `tracing` crate. Nothing is printed
//! until the application installs a subscriber:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("tricep_net=debug")
//!     .init();
//! ```
//!
//! Every event carries one of the [`targets`] below so a subsystem can be
//! filtered on its own.

/// Target names for log filtering.
pub mod targets {
    /// Outbound connector lifecycle and dispatch.
    pub const CONNECTOR: &str = "tricep_net::connector";
    /// Listening endpoint lifecycle and dispatch.
    pub const LISTENER: &str = "tricep_net::listener";
    /// Tokio TCP transport internals.
    pub const TCP: &str = "tricep_net::tcp";
    /// Plugin registration.
    pub const PLUGIN: &str = "tricep::plugin";
    /// Configuration loading.
    pub const CONFIG: &str = "tricep::config";
}
