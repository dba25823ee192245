//! Tokio-backed raw socket.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::Instrument;
use tricep_core::logging::targets;

use crate::config::{ConnectionSettings, SocketFlags};
use crate::connector::SocketDispatcher;
use crate::error::{Result, SocketError};
use crate::transport::{RawSocket, SocketEvent};

/// Read buffer size in bytes.
const READ_BUFFER_SIZE: usize = 8192;

/// Command sent to the socket's driver task.
enum WriteCommand {
    Data(Bytes),
    End,
}

/// Where the driver gets its stream from.
enum Source {
    Dial(ConnectionSettings),
    Accepted(TcpStream),
}

struct SocketShared {
    flags: SocketFlags,
    accepted: Mutex<Option<TcpStream>>,
    peer_addr: Mutex<Option<SocketAddr>>,
    command_tx: Mutex<Option<mpsc::UnboundedSender<WriteCommand>>>,
    paused: watch::Sender<bool>,
    driver: Mutex<Option<JoinHandle<Result<()>>>>,
    /// Error raised before any driver could be spawned.
    raised: Mutex<Option<SocketError>>,
}

/// A TCP socket driven by a tokio task.
///
/// Created unconnected by [`TcpSocket::new`], or by a [`super::TcpServer`]
/// for each accepted connection. The first [`RawSocket::connect`] on an
/// accepted socket ignores its target and starts pumping the live stream.
///
/// Must be connected from inside a tokio runtime.
#[derive(Clone)]
pub struct TcpSocket {
    shared: Arc<SocketShared>,
}

impl Default for TcpSocket {
    fn default() -> Self {
        Self::new()
    }
}

impl TcpSocket {
    /// Create an unconnected socket.
    pub fn new() -> Self {
        Self::build(SocketFlags::default(), None)
    }

    pub(crate) fn accepted(stream: TcpStream, flags: SocketFlags) -> Self {
        let socket = Self::build(flags, stream.peer_addr().ok());
        *socket.shared.accepted.lock() = Some(stream);
        socket
    }

    fn build(flags: SocketFlags, peer_addr: Option<SocketAddr>) -> Self {
        let (paused, _) = watch::channel(flags.pause_on_connect);
        Self {
            shared: Arc::new(SocketShared {
                flags,
                accepted: Mutex::new(None),
                peer_addr: Mutex::new(peer_addr),
                command_tx: Mutex::new(None),
                paused,
                driver: Mutex::new(None),
                raised: Mutex::new(None),
            }),
        }
    }

    /// The remote address once connected.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        *self.shared.peer_addr.lock()
    }

    /// Flags this socket was created with.
    pub fn flags(&self) -> SocketFlags {
        self.shared.flags
    }

    /// Whether reading is currently held back.
    pub fn is_paused(&self) -> bool {
        *self.shared.paused.borrow()
    }

    /// Stop reading from the stream.
    pub fn pause(&self) {
        self.shared.paused.send_replace(true);
    }

    /// Resume reading from the stream.
    pub fn resume(&self) {
        self.shared.paused.send_replace(false);
    }

    /// Whether the write side is currently open.
    pub fn is_writable(&self) -> bool {
        self.shared.command_tx.lock().is_some()
    }

    /// Wait for the driver task to finish.
    ///
    /// Yields the error a dispatch raised when an error event found no error
    /// handler, including one raised because no runtime was available.
    /// Returns `Ok` straight away if the socket was never connected.
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

    async fn drive(shared: Arc<SocketShared>, source: Source, events: SocketDispatcher) -> Result<()> {
        let stream = match source {
            Source::Accepted(stream) => stream,
            Source::Dial(target) => {
                let address = target.address();
                match TcpStream::connect(&address).await {
                    Ok(stream) => stream,
                    Err(e) => {
                        events.dispatch(SocketEvent::Error(SocketError::connect(address, e)))?;
                        return Ok(());
                    }
                }
            }
        };

        *shared.peer_addr.lock() = stream.peer_addr().ok();
        let (mut reader, mut writer) = stream.into_split();

        let (tx, mut rx) = mpsc::unbounded_channel::<WriteCommand>();
        *shared.command_tx.lock() = Some(tx);

        events.dispatch(SocketEvent::Connect)?;

        let mut paused = shared.paused.subscribe();
        let mut buffer = vec![0u8; READ_BUFFER_SIZE];
        let mut readable = true;
        let mut writable = true;

        loop {
            tokio::select! {
                cmd = rx.recv(), if writable => {
                    match cmd {
                        Some(WriteCommand::Data(data)) => {
                            if let Err(e) = writer.write_all(&data).await {
                                shared.command_tx.lock().take();
                                events.dispatch(SocketEvent::Error(e.into()))?;
                                break;
                            }
                        }
                        Some(WriteCommand::End) | None => {
                            let _ = writer.shutdown().await;
                            shared.command_tx.lock().take();
                            writable = false;
                            if !readable {
                                break;
                            }
                        }
                    }
                }

                result = read_unpaused(&mut reader, &mut buffer, &mut paused), if readable => {
                    match result {
                        Ok(0) => {
                            readable = false;
                            if !shared.flags.allow_half_open && writable {
                                let _ = writer.shutdown().await;
                                shared.command_tx.lock().take();
                                writable = false;
                            }
                            if !writable {
                                break;
                            }
                        }
                        Ok(n) => {
                            events.dispatch(SocketEvent::Data(Bytes::copy_from_slice(&buffer[..n])))?;
                        }
                        Err(e) => {
                            shared.command_tx.lock().take();
                            events.dispatch(SocketEvent::Error(e.into()))?;
                            break;
                        }
                    }
                }

                else => break,
            }
        }

        shared.command_tx.lock().take();
        events.dispatch(SocketEvent::Close)
    }
}

/// Read once the pause flag is clear.
async fn read_unpaused(
    reader: &mut OwnedReadHalf,
    buffer: &mut [u8],
    paused: &mut watch::Receiver<bool>,
) -> io::Result<usize> {
    loop {
        let is_paused = *paused.borrow_and_update();
        if !is_paused {
            break;
        }
        if paused.changed().await.is_err() {
            break;
        }
    }
    reader.read(buffer).await
}

impl RawSocket for TcpSocket {
    fn connect(&self, target: Option<&ConnectionSettings>, events: SocketDispatcher) {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                let err = SocketError::Runtime(e.to_string());
                if let Err(err) = events.dispatch(SocketEvent::Error(err)) {
                    tracing::error!(target: targets::TCP, error = %err, "cannot drive socket");
                    *self.shared.raised.lock() = Some(err);
                }
                return;
            }
        };

        // Only taken once a runtime can drive it; otherwise a later connect
        // from inside a runtime still finds the accepted stream.
        let source = match self.shared.accepted.lock().take() {
            Some(stream) => Source::Accepted(stream),
            None => Source::Dial(target.cloned().unwrap_or_default()),
        };

        if let Some(previous) = self.shared.driver.lock().take() {
            previous.abort();
        }
        self.shared.command_tx.lock().take();

        let span = tracing::debug_span!(target: targets::TCP, "connection", peer = ?self.peer_addr());
        let handle = runtime.spawn(Self::drive(self.shared.clone(), source, events).instrument(span));
        self.shared.raised.lock().take();
        *self.shared.driver.lock() = Some(handle);
    }

    fn write(&self, data: Bytes) -> Result<()> {
        let tx = self.shared.command_tx.lock();
        match tx.as_ref() {
            Some(tx) => tx
                .send(WriteCommand::Data(data))
                .map_err(|_| SocketError::Closed),
            None => Err(SocketError::NotConnected),
        }
    }

    fn end(&self) {
        if let Some(tx) = self.shared.command_tx.lock().as_ref() {
            let _ = tx.send(WriteCommand::End);
        }
    }
}

impl std::fmt::Debug for TcpSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpSocket")
            .field("peer_addr", &self.peer_addr())
            .field("flags", &self.shared.flags)
            .field("paused", &self.is_paused())
            .finish()
    }
}
