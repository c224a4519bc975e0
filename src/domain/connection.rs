//! Handle to one open push-channel connection.
//!
//! A [`Connection`] owns the sending half of a bounded outbound queue. The
//! WebSocket writer task owns the receiving half and drains it into the
//! socket, so [`Connection::send`] never waits on the network.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::extract::ws::Utf8Bytes;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::ConnectionId;

/// Why a frame could not be queued for one connection.
///
/// Always recovered locally by the dispatcher; never surfaced to callers
/// of a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryFailure {
    /// The connection was closed, or its writer task has gone away.
    #[error("connection closed")]
    Closed,

    /// The peer is not draining its queue fast enough.
    #[error("outbound queue full")]
    QueueFull,
}

/// Observable lifecycle of a connection. The only transition is
/// `Open -> Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Frames may be delivered.
    Open,
    /// Terminal. The connection will never accept frames again.
    Closed,
}

/// Cheap-clone handle to a single client connection.
///
/// Clones share the same queue and the same open/closed flag.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    outbound: mpsc::Sender<Utf8Bytes>,
    closed: Arc<AtomicBool>,
}

impl Connection {
    /// Opens a new connection with a fresh id and an outbound queue of
    /// `capacity` frames (at least one).
    ///
    /// Returns the handle and the receiver the transport writer drains.
    #[must_use]
    pub fn open(capacity: usize) -> (Self, mpsc::Receiver<Utf8Bytes>) {
        let (outbound, rx) = mpsc::channel(capacity.max(1));
        let conn = Self {
            id: ConnectionId::new(),
            outbound,
            closed: Arc::new(AtomicBool::new(false)),
        };
        (conn, rx)
    }

    /// Returns this connection's identity.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        if self.closed.load(Ordering::Acquire) {
            ConnectionState::Closed
        } else {
            ConnectionState::Open
        }
    }

    /// Returns `true` while the connection has not been closed.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Marks the connection closed.
    ///
    /// Returns `true` if this call performed the `Open -> Closed`
    /// transition, `false` if it was already closed.
    pub fn close(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }

    /// Queues one encoded frame for delivery without waiting.
    ///
    /// The frame is reference-counted, so every recipient of a broadcast
    /// shares the same bytes.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryFailure::Closed`] if the connection is closed or
    /// its receiver was dropped, and [`DeliveryFailure::QueueFull`] if the
    /// queue is at capacity.
    pub fn send(&self, frame: &Utf8Bytes) -> Result<(), DeliveryFailure> {
        if !self.is_open() {
            return Err(DeliveryFailure::Closed);
        }
        self.outbound
            .try_send(frame.clone())
            .map_err(|err| match err {
                TrySendError::Full(_) => DeliveryFailure::QueueFull,
                TrySendError::Closed(_) => DeliveryFailure::Closed,
            })
    }
}
