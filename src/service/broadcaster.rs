//! Broadcast dispatcher: fan one payload out to every registered
//! connection.
//!
//! A payload is encoded exactly once. The encoded frame is shared by all
//! recipients, so every connection receives byte-identical data. Delivery
//! is best effort: a connection whose send fails is deregistered and the
//! batch carries on. Only an encoding failure reaches the caller, and it
//! aborts the broadcast before any send is attempted.

use std::sync::Arc;

use axum::extract::ws::Utf8Bytes;
use serde::Serialize;

use crate::domain::ConnectionRegistry;
use crate::error::RelayError;

/// Outcome of a single delivery round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections the frame was queued for.
    pub delivered: usize,
    /// Connections removed because their send failed.
    pub pruned: usize,
}

/// Delivers payloads to every connection in a [`ConnectionRegistry`].
///
/// Cheap to clone; all clones share the same registry.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: Arc<ConnectionRegistry>,
}

impl Broadcaster {
    /// Creates a dispatcher over the given registry.
    #[must_use]
    pub const fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Returns a reference to the inner [`ConnectionRegistry`].
    #[must_use]
    pub const fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Encodes a payload to its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Encoding`] if the payload cannot be serialized.
    pub fn encode<T: Serialize + ?Sized>(payload: &T) -> Result<Utf8Bytes, RelayError> {
        let json = serde_json::to_string(payload)?;
        Ok(Utf8Bytes::from(json))
    }

    /// Encodes `payload` as JSON and delivers it to every registered
    /// connection.
    ///
    /// Each call is an independent delivery round over the connections
    /// registered at that moment.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Encoding`] if the payload cannot be
    /// serialized. No connection is sent anything in that case.
    pub async fn broadcast<T: Serialize + ?Sized>(
        &self,
        payload: &T,
    ) -> Result<BroadcastReport, RelayError> {
        let frame = Self::encode(payload)?;
        Ok(self.deliver(&frame).await)
    }

    /// Delivers a plain string verbatim, without JSON quoting.
    pub async fn broadcast_text(&self, text: &str) -> BroadcastReport {
        self.deliver(&Utf8Bytes::from(text)).await
    }

    async fn deliver(&self, frame: &Utf8Bytes) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for connection in self.registry.snapshot().await {
            match connection.send(frame) {
                Ok(()) => report.delivered += 1,
                Err(failure) => {
                    tracing::debug!(
                        connection_id = %connection.id(),
                        %failure,
                        "delivery failed, pruning connection"
                    );
                    if self.registry.deregister(connection.id()).await {
                        report.pruned += 1;
                    }
                }
            }
        }

        if report.pruned > 0 {
            tracing::warn!(
                delivered = report.delivered,
                pruned = report.pruned,
                "broadcast pruned dead connections"
            );
        } else {
            tracing::trace!(delivered = report.delivered, "broadcast delivered");
        }
        report
    }
}
