//! The raw transport contract.
//!
//! Connectors and listeners never touch sockets directly. They talk to a
//! [`RawSocket`] or [`RawServer`] and receive the transport's events through
//! a dispatcher handed over at connect/listen time. A transport raises events
//! by calling `dispatch` on that dispatcher; the returned `Result` is how an
//! unhandled error travels back out of the event source.
//!
//! Two transports ship with the crate: [`crate::tcp`] (tokio sockets) and
//! [`crate::memory`] (in-process, events injected by hand).

use bytes::Bytes;

use crate::config::{ConnectionSettings, ListenerSettings, SocketFlags};
use crate::connector::SocketDispatcher;
use crate::error::{Result, SocketError};
use crate::listener::ServerDispatcher;

/// An event raised by a raw socket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SocketEvent {
    /// The connection is established.
    Connect,
    /// A chunk of bytes arrived.
    Data(Bytes),
    /// The connection closed.
    Close,
    /// A transport-level failure.
    Error(SocketError),
}

/// An event raised by a raw server.
#[derive(Debug)]
pub enum ServerEvent<C> {
    /// An inbound connection was accepted.
    Connection(C),
    /// A listener-level failure (bind, accept).
    Error(SocketError),
}

/// A stream-oriented, full-duplex byte socket.
pub trait RawSocket: Send + Sync + 'static {
    /// Start establishing the connection and route its events to `events`.
    ///
    /// Must return without blocking; the outcome arrives as a
    /// [`SocketEvent::Connect`] or [`SocketEvent::Error`]. `target` is `None`
    /// when the caller left the destination to the transport's defaults.
    /// Calling this again replaces the previous event routing.
    fn connect(&self, target: Option<&ConnectionSettings>, events: SocketDispatcher);

    /// Queue bytes for sending.
    fn write(&self, data: Bytes) -> Result<()>;

    /// Close the write side once queued data is flushed.
    fn end(&self);
}

/// A listening endpoint factory product.
pub trait RawServer: Send + Sync + 'static {
    /// What an accepted connection looks like.
    type Connection: Send + 'static;

    /// Start listening and route accepted connections and errors to `events`.
    ///
    /// Must return without blocking; bind failures arrive as
    /// [`ServerEvent::Error`].
    fn listen(&self, settings: &ListenerSettings, events: ServerDispatcher<Self::Connection>);
}

/// Factory for raw sockets and servers.
pub trait Transport: Send + Sync + 'static {
    /// Socket type produced by [`create_socket`](Self::create_socket).
    type Socket: RawSocket;
    /// Server type produced by [`create_server`](Self::create_server).
    type Server: RawServer;

    /// Create an unconnected socket.
    fn create_socket(&self) -> Self::Socket;

    /// Create a server whose accepted sockets use `flags`.
    fn create_server(&self, flags: SocketFlags) -> Self::Server;
}
