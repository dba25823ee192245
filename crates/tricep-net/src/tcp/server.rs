//! Tokio-backed raw server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpSocket as TokioSocket, lookup_host};
use tokio::task::JoinHandle;
use tracing::Instrument;
use tricep_core::logging::targets;

use super::socket::TcpSocket;
use crate::config::{ListenerSettings, SocketFlags};
use crate::error::{Result, SocketError};
use crate::listener::ServerDispatcher;
use crate::transport::{RawServer, ServerEvent};

const ACCEPT_BACKOFF_BASE: Duration = Duration::from_millis(10);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

struct ServerShared {
    local_addr: Mutex<Option<SocketAddr>>,
    driver: Mutex<Option<JoinHandle<Result<()>>>>,
    /// Error raised before any driver could be spawned.
    raised: Mutex<Option<SocketError>>,
}

/// A TCP listening endpoint driven by a tokio task.
///
/// Accepted connections are handed out as [`TcpSocket`]s carrying the
/// server's [`SocketFlags`]. There is no stop operation: the accept loop runs
/// until the runtime shuts down or an unhandled error ends it.
#[derive(Clone)]
pub struct TcpServer {
    flags: SocketFlags,
    shared: Arc<ServerShared>,
}

impl TcpServer {
    /// Create a server whose accepted sockets use `flags`.
    pub fn new(flags: SocketFlags) -> Self {
        Self {
            flags,
            shared: Arc::new(ServerShared {
                local_addr: Mutex::new(None),
                driver: Mutex::new(None),
                raised: Mutex::new(None),
            }),
        }
    }

    /// Flags applied to accepted sockets.
    pub fn flags(&self) -> SocketFlags {
        self.flags
    }

    /// The bound address once listening.
    ///
    /// Useful when binding to port 0 to learn the assigned port.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.shared.local_addr.lock()
    }

    /// Wait for the accept loop to end.
    ///
    /// Yields the error a dispatch raised when an error event found no error
    /// handler, including one raised because no runtime was available.
    /// Returns `Ok` when listening never started or a bind failure was
    /// handled.
    pub async fn finished(&self) -> Result<()> {
        let handle = self.shared.driver.lock().take();
        match handle {
            Some(handle) => match handle.await {
                Ok(result) => result,
                Err(join_err) => Err(SocketError::Io(join_err.to_string())),
            },
            None => match self.shared.raised.lock().take() {
                Some(err) => Err(err),
                None => Ok(()),
            },
        }
    }

    async fn bind(settings: &ListenerSettings) -> std::io::Result<TcpListener> {
        let addr = lookup_host((settings.host.as_str(), settings.port))
            .await?
            .next()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no address resolved"))?;

        let socket = if addr.is_ipv4() {
            TokioSocket::new_v4()?
        } else {
            TokioSocket::new_v6()?
        };

        // Address reuse only covers TIME_WAIT leftovers. A port held by another
        // listening socket still fails with EADDRINUSE, exclusive or not.
        #[cfg(not(windows))]
        socket.set_reuseaddr(true)?;

        socket.bind(addr)?;
        socket.listen(settings.backlog)
    }

    async fn drive(
        shared: Arc<ServerShared>,
        flags: SocketFlags,
        settings: ListenerSettings,
        events: ServerDispatcher<TcpSocket>,
    ) -> Result<()> {
        let listener = match Self::bind(&settings).await {
            Ok(listener) => listener,
            Err(e) => {
                events.dispatch(ServerEvent::Error(SocketError::bind(settings.bind_addr(), e)))?;
                return Ok(());
            }
        };

        let local_addr = listener.local_addr().ok();
        *shared.local_addr.lock() = local_addr;
        tracing::debug!(target: targets::TCP, ?local_addr, "accept loop started");

        let mut failures = 0u32;
        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    failures = 0;
                    tracing::trace!(target: targets::TCP, %peer_addr, "accepted");
                    events.dispatch(ServerEvent::Connection(TcpSocket::accepted(stream, flags)))?;
                }
                Err(e) => {
                    events.dispatch(ServerEvent::Error(SocketError::Accept(e.to_string())))?;
                    // Handled: keep accepting, but back off so a persistent
                    // failure (EMFILE) does not spin.
                    failures = failures.saturating_add(1);
                    let delay = accept_backoff(failures);
                    tracing::debug!(target: targets::TCP, failures, ?delay, "backing off after accept error");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Delay before retrying after the `failures`-th consecutive accept error.
///
/// Doubles from 10ms and caps at one second.
fn accept_backoff(failures: u32) -> Duration {
    let exponent = failures.saturating_sub(1).min(7);
    (ACCEPT_BACKOFF_BASE * 2u32.pow(exponent)).min(ACCEPT_BACKOFF_MAX)
}

impl RawServer for TcpServer {
    type Connection = TcpSocket;

    fn listen(&self, settings: &ListenerSettings, events: ServerDispatcher<TcpSocket>) {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                let err = SocketError::Runtime(e.to_string());
                if let Err(err) = events.dispatch(ServerEvent::Error(err)) {
                    tracing::error!(target: targets::TCP, error = %err, "cannot drive listener");
                    *self.shared.raised.lock() = Some(err);
                }
                return;
            }
        };

        let span = tracing::debug_span!(target: targets::TCP, "accept_loop", addr = %settings.bind_addr());
        let task = Self::drive(self.shared.clone(), self.flags, settings.clone(), events);
        let handle = runtime.spawn(task.instrument(span));
        self.shared.raised.lock().take();
        *self.shared.driver.lock() = Some(handle);
    }
}

impl std::fmt::Debug for TcpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpServer")
            .field("flags", &self.flags)
            .field("local_addr", &self.local_addr())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_backoff_grows_and_caps() {
        assert_eq!(accept_backoff(1), Duration::from_millis(10));
        assert_eq!(accept_backoff(2), Duration::from_millis(20));
        assert_eq!(accept_backoff(4), Duration::from_millis(80));
        assert_eq!(accept_backoff(8), Duration::from_secs(1));
        assert_eq!(accept_backoff(u32::MAX), Duration::from_secs(1));
    }

    #[test]
    fn test_accept_backoff_never_zero() {
        assert!(accept_backoff(0) >= ACCEPT_BACKOFF_BASE);
    }
}
