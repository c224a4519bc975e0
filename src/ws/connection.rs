//! Per-connection read/write loop.
//!
//! The socket's lifecycle has two states. While open, frames queued by the
//! dispatcher are written to the socket and client messages are logged.
//! Any close frame, read error, write error, stalled write or end of stream
//! moves it to closed, which deregisters it from the registry.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;

use crate::domain::{Connection, ConnectionId, ConnectionRegistry};

/// Why a connection loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The client sent a close frame or the stream ended.
    ClientClosed,
    /// Reading from the socket failed.
    ReadFailed,
    /// Writing to the socket failed.
    WriteFailed,
    /// A write did not complete within the send timeout.
    WriteTimedOut,
    /// The dispatcher dropped the connection's queue.
    Pruned,
}

/// Registers a freshly upgraded socket and runs it until it closes.
///
/// Frames queued on the connection are forwarded to the client. When the
/// dispatcher prunes the connection its queue is closed and the loop ends.
/// A write that stalls longer than `send_timeout` also ends it.
pub async fn run_connection(
    socket: WebSocket,
    registry: Arc<ConnectionRegistry>,
    queue_capacity: usize,
    send_timeout: Duration,
) {
    let (connection, outbound) = Connection::open(queue_capacity);
    let id = connection.id();
    registry.register(connection).await;
    tracing::info!(connection_id = %id, "push channel opened");

    let (ws_tx, ws_rx) = socket.split();
    let reason = pump(id, ws_tx, ws_rx, outbound, send_timeout).await;

    registry.deregister(id).await;
    tracing::info!(connection_id = %id, ?reason, "push channel closed");
}

/// Forwards queued frames to `ws_tx` and drains `ws_rx` until either side
/// ends, then closes the sink.
async fn pump<Tx, Rx, E>(
    id: ConnectionId,
    mut ws_tx: Tx,
    mut ws_rx: Rx,
    mut outbound: mpsc::Receiver<Utf8Bytes>,
    send_timeout: Duration,
) -> CloseReason
where
    Tx: Sink<Message> + Unpin,
    Rx: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let reason = loop {
        tokio::select! {
            // Incoming message from client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!(connection_id = %id, message = %text.as_str(), "client message");
                    }
                    Some(Ok(Message::Close(_))) | None => break CloseReason::ClientClosed,
                    Some(Err(err)) => {
                        tracing::debug!(connection_id = %id, error = %err, "socket read failed");
                        break CloseReason::ReadFailed;
                    }
                    Some(Ok(_)) => {}
                }
            }

            // Frame queued by the dispatcher
            frame = outbound.recv() => {
                let Some(frame) = frame else {
                    tracing::debug!(connection_id = %id, "connection pruned by dispatcher");
                    break CloseReason::Pruned;
                };
                match tokio::time::timeout(send_timeout, ws_tx.send(Message::Text(frame))).await {
                    Ok(Ok(())) => {}
                    Ok(Err(_)) => break CloseReason::WriteFailed,
                    Err(_) => {
                        tracing::warn!(connection_id = %id, timeout = ?send_timeout, "socket write stalled");
                        break CloseReason::WriteTimedOut;
                    }
                }
            }
        }
    };

    let _ = tokio::time::timeout(send_timeout, ws_tx.close()).await;
    reason
}
