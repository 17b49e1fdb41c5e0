//! Connection-side seam for finished responses.
//!
//! The call object never writes to a socket. It hands each finished
//! response to its [`ConnectionHandle`], a cheaply cloneable handle over
//! an mpsc channel; a dedicated writer task owned by the connection
//! drains the channel to the socket. Queueing is non-blocking from the
//! responding thread's point of view.
//!
//! # Architecture
//!
//! ```text
//! Worker 1 ─┐
//! Worker 2 ─┼─► mpsc::Sender<ResponseFrame> ─► Writer Task ─► Socket
//! Worker N ─┘
//! ```
//!
//! The handle also carries the per-connection context the call core
//! consumes: remote address, connection-level credentials, and the
//! response-size policy ([`ConnectionConfig`]).

use std::net::SocketAddr;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Result, RpcError};
use crate::protocol::{DEFAULT_MAX_PAYLOAD_SIZE, DEFAULT_MAX_SIDECAR_BYTES};

/// Default response channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 128;

/// Credentials context for a call.
///
/// Opaque to this crate; authentication happens during connection
/// establishment, elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserCredentials {
    user: String,
}

impl UserCredentials {
    /// Credentials for a named user.
    pub fn new(user: impl Into<String>) -> Self {
        Self { user: user.into() }
    }

    /// The user string; empty means anonymous.
    #[inline]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Whether no user was supplied.
    #[inline]
    pub fn is_anonymous(&self) -> bool {
        self.user.is_empty()
    }
}

/// Per-connection policy consumed by the call core.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionConfig {
    /// Response channel capacity.
    pub channel_capacity: usize,
    /// Aggregate sidecar byte cap per call.
    pub max_sidecar_bytes: usize,
    /// Maximum serialized response payload size.
    pub max_payload_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            max_sidecar_bytes: DEFAULT_MAX_SIDECAR_BYTES,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }
}

/// A finished, serialized response ready for transmission.
#[derive(Debug)]
pub struct ResponseFrame {
    /// Call identifier, for correlation and diagnostics.
    pub call_id: u32,
    /// The complete wire bytes (header, payload, sidecars).
    pub buf: Bytes,
}

impl ResponseFrame {
    /// Create a response frame.
    pub fn new(call_id: u32, buf: Bytes) -> Self {
        Self { call_id, buf }
    }

    /// Total frame size in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.buf.len()
    }
}

/// Handle to the connection that originated a call.
///
/// Cloneable; each in-flight call holds one. Dropping every handle (and
/// the call objects with them) closes the response channel and stops the
/// writer task once drained.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    tx: mpsc::Sender<ResponseFrame>,
    remote_addr: SocketAddr,
    credentials: UserCredentials,
    config: ConnectionConfig,
}

impl ConnectionHandle {
    /// Build a handle plus the receiving end of its response channel.
    ///
    /// For connection layers that run their own write loop; most callers
    /// want [`spawn_connection_writer`] instead.
    pub fn channel(
        remote_addr: SocketAddr,
        credentials: UserCredentials,
        config: ConnectionConfig,
    ) -> (Self, mpsc::Receiver<ResponseFrame>) {
        let (tx, rx) = mpsc::channel(config.channel_capacity);
        (
            Self {
                tx,
                remote_addr,
                credentials,
                config,
            },
            rx,
        )
    }

    /// Queue a finished response for transmission.
    ///
    /// Never blocks; the actual write happens on the connection's writer
    /// task.
    ///
    /// # Errors
    ///
    /// [`RpcError::ResponseQueueFull`] when the channel is at capacity,
    /// [`RpcError::ConnectionClosed`] when the writer side is gone.
    pub fn queue_response(&self, frame: ResponseFrame) -> Result<()> {
        self.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => RpcError::ResponseQueueFull,
            mpsc::error::TrySendError::Closed(_) => RpcError::ConnectionClosed,
        })
    }

    /// Address of the remote peer.
    #[inline]
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Connection-level credentials context.
    #[inline]
    pub fn credentials(&self) -> &UserCredentials {
        &self.credentials
    }

    /// Per-connection policy.
    #[inline]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }
}

/// Spawn the connection's writer task, draining queued responses into
/// `writer`.
///
/// Frames already queued are batched: the task writes until the channel
/// is momentarily empty, then flushes once.
pub fn spawn_connection_writer<W>(
    writer: W,
    remote_addr: SocketAddr,
    credentials: UserCredentials,
    config: ConnectionConfig,
) -> (ConnectionHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (handle, rx) = ConnectionHandle::channel(remote_addr, credentials, config);
    let task = tokio::spawn(write_loop(writer, rx));
    (handle, task)
}

async fn write_loop<W>(mut writer: W, mut rx: mpsc::Receiver<ResponseFrame>) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = rx.recv().await {
        writer.write_all(&frame.buf).await?;

        // Drain whatever queued behind it before paying for a flush.
        while let Ok(next) = rx.try_recv() {
            writer.write_all(&next.buf).await?;
        }
        writer.flush().await?;
    }
    Ok(())
}
