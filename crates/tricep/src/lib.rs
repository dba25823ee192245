//! # Tricep
//!
//! A minimal lifecycle layer over raw TCP sockets.
//!
//! Tricep gives the two ends of a TCP conversation a small callback surface:
//!
//! - a [`Connector`] dials out and routes `connect`, `data`, `disconnect` and
//!   `error` events to handler slots that can be swapped at any time
//! - a [`Listener`] accepts connections and hands each one to a connect hook
//!
//! Errors are never dropped silently. When no error handler is bound, the
//! error is raised out of the event dispatch and the component turns
//! [`LifecycleState::Fatal`].
//!
//! ## Quick Start
//!
//! ```ignore
//! use tricep::prelude::*;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut host: Option<std::sync::Arc<Listener>> = None;
//!     let options = PluginOptions::new()
//!         .server(ListenerOptions::new("127.0.0.1", 9000))
//!         .on_connect(|socket| {
//!             let peer = Connector::adopt(socket);
//!             peer.on_data.set(|bytes| println!("got {} bytes", bytes.len()));
//!             peer.connect(None, None);
//!         });
//!
//!     register(&mut host, &TcpTransport, options, |err| assert!(err.is_none()));
//! }
//! ```
//!
//! ## Crates
//!
//! - `tricep-core`: handler slots, lifecycle state, logging targets
//! - `tricep-net`: settings, transports, `Connector`, `Listener`
//! - `tricep`: registration and configuration files

pub mod config;
mod error;
pub mod plugin;
pub mod prelude;

pub use error::{ConfigError, ConfigResult};

pub use tricep_core::*;

pub use tricep_net::{
    ConnectHook, ConnectListener, ConnectionOptions, ConnectionSettings, Connector,
    CreateOptions, ErrorHook, Listener, ListenerOptions, ListenerSettings, RawServer, RawSocket,
    Result, ServerDispatcher, ServerEvent, SocketDispatcher, SocketError, SocketEvent,
    SocketFlags, TcpServer, TcpSocket, TcpTransport, Transport,
};
pub use tricep_net::{memory, tcp, transport};
