//! Prelude module for Tricep.
//!
//! ```ignore
//! use tricep::prelude::*;
//! ```

// ============================================================================
// Components
// ============================================================================

pub use crate::{Connector, Listener};

// ============================================================================
// Settings
// ============================================================================

pub use crate::{
    ConnectionOptions, ConnectionSettings, CreateOptions, ListenerOptions, ListenerSettings,
    SocketFlags,
};

// ============================================================================
// Handler Slots and Lifecycle
// ============================================================================

pub use crate::{ErrorSlot, HandlerSlot, LifecycleState};

// ============================================================================
// Errors
// ============================================================================

pub use crate::{ConfigError, SocketError};

// ============================================================================
// Registration and Configuration
// ============================================================================

pub use crate::config::TricepConfig;
pub use crate::plugin::{ListenerHost, PluginOptions, register};

// ============================================================================
// Transports
// ============================================================================

pub use crate::tcp::{TcpServer, TcpSocket, TcpTransport};
pub use crate::transport::{RawServer, RawSocket, Transport};
