//! Socket lifecycle adapters for Tricep.
//!
//! This crate wraps raw sockets in two small objects:
//!
//! - **[`Connector`]**: one outbound session with four reassignable handler
//!   slots (`on_data`, `on_connect`, `on_disconnect`, `on_error`)
//! - **[`Listener`]**: a bound endpoint that hands every accepted connection
//!   to a connect hook
//!
//! Both run on any [`transport::Transport`]. The tokio TCP transport in
//! [`tcp`] is the default; [`memory`] raises events by hand for tests.
//!
//! # Error handling
//!
//! A connector's `on_error` starts out *unset*. Errors delivered while it is
//! unset are not swallowed: the dispatcher returns them as `Err`, the driver
//! task ends with that error, and the connector moves to
//! [`LifecycleState::Fatal`](tricep_core::LifecycleState::Fatal). Listeners
//! behave the same way when built without an error hook.
//!
//! # Client
//!
//! ```ignore
//! use tricep_net::{ConnectionOptions, Connector};
//!
//! let client = Connector::new(Some(ConnectionOptions::new("127.0.0.1", 9000)));
//! client.on_data.set(|bytes| println!("{} bytes", bytes.len()));
//! client.on_error.set(|err| eprintln!("{err}"));
//! client.connect(None, Some(Box::new(|| println!("ready"))));
//! client.write("hello")?;
//! ```
//!
//! # Server
//!
//! ```ignore
//! use tricep_net::{Connector, Listener, ListenerSettings};
//!
//! let listener = Listener::bind(
//!     ListenerSettings::new("127.0.0.1", 9000),
//!     |socket| {
//!         let peer = Connector::adopt(socket);
//!         peer.on_data.set(|bytes| println!("{} bytes", bytes.len()));
//!         peer.connect(None, None);
//!     },
//!     None,
//! );
//! ```

pub mod config;
pub mod connector;
mod error;
pub mod listener;
pub mod memory;
pub mod tcp;
pub mod transport;

pub use config::{
    ConnectionOptions, ConnectionSettings, CreateOptions, ListenerOptions, ListenerSettings,
    SocketFlags,
};
pub use connector::{ConnectListener, Connector, SocketDispatcher};
pub use error::{Result, SocketError};
pub use listener::{ConnectHook, ErrorHook, Listener, ServerDispatcher};
pub use tcp::{TcpServer, TcpSocket, TcpTransport};
pub use transport::{RawServer, RawSocket, ServerEvent, SocketEvent, Transport};
