//! Tokio TCP transport.
//!
//! - **TcpSocket**: a raw socket that dials out, or wraps an accepted stream
//! - **TcpServer**: a listening endpoint handing out accepted `TcpSocket`s
//! - **TcpTransport**: the factory tying the two together
//!
//! # Example
//!
//! ```ignore
//! use tricep_net::tcp::TcpTransport;
//! use tricep_net::{Connector, Transport};
//!
//! let transport = TcpTransport;
//! let client = Connector::with_socket(transport.create_socket(), None);
//! client.connect(None, None);
//! ```

mod server;
mod socket;

pub use server::TcpServer;
pub use socket::TcpSocket;

use crate::config::SocketFlags;
use crate::transport::Transport;

/// Factory producing tokio-backed sockets and servers.
#[derive(Clone, Copy, Debug, Default)]
pub struct TcpTransport;

impl Transport for TcpTransport {
    type Socket = TcpSocket;
    type Server = TcpServer;

    fn create_socket(&self) -> TcpSocket {
        TcpSocket::new()
    }

    fn create_server(&self, flags: SocketFlags) -> TcpServer {
        TcpServer::new(flags)
    }
}
