//! Polling bridge from contract logs to the broadcast dispatcher.
//!
//! The watcher anchors at the chain head on its first poll, so only events
//! emitted after start-up are relayed. Each later poll fetches the blocks
//! since the last cursor (capped at `max_block_range`), decodes them and
//! broadcasts every event in log order. The cursor advances only after a
//! successful fetch; a failed poll is retried on the next tick.

use std::time::Duration;

use tokio::time::MissedTickBehavior;

use super::decode::decode_log;
use super::rpc::LogSource;
use crate::error::RelayError;
use crate::service::Broadcaster;

/// Upstream event watcher driving [`Broadcaster::broadcast`].
#[derive(Debug)]
pub struct EventWatcher<S> {
    source: S,
    broadcaster: Broadcaster,
    poll_interval: Duration,
    max_block_range: u64,
    cursor: Option<u64>,
}

impl<S: LogSource> EventWatcher<S> {
    /// Creates a watcher that has not yet anchored to the chain head.
    #[must_use]
    pub fn new(
        source: S,
        broadcaster: Broadcaster,
        poll_interval: Duration,
        max_block_range: u64,
    ) -> Self {
        Self {
            source,
            broadcaster,
            poll_interval,
            max_block_range: max_block_range.max(1),
            cursor: None,
        }
    }

    /// Returns the last block whose logs have been processed.
    #[must_use]
    pub const fn cursor(&self) -> Option<u64> {
        self.cursor
    }

    /// Runs one poll and returns how many events were broadcast.
    ///
    /// Logs that fail to decode are skipped, and events whose payload
    /// fails to encode are dropped; both are logged.
    ///
    /// # Errors
    ///
    /// Returns the upstream error if the head or the logs cannot be
    /// fetched. The cursor is left untouched in that case.
    pub async fn poll_once(&mut self) -> Result<usize, RelayError> {
        let head = self.source.latest_block().await?;

        let Some(last) = self.cursor else {
            tracing::info!(head, "watcher anchored at chain head");
            self.cursor = Some(head);
            return Ok(0);
        };
        if head <= last {
            return Ok(0);
        }

        let from = last + 1;
        let to = head.min(last.saturating_add(self.max_block_range));
        let logs = self.source.logs(from, to).await?;
        tracing::debug!(from, to, logs = logs.len(), "fetched contract logs");

        let mut relayed = 0;
        for log in logs.iter().filter(|log| !log.removed) {
            let event = match decode_log(log) {
                Ok(event) => event,
                Err(err) => {
                    tracing::warn!(error = %err, block = %log.block_number, "skipping undecodable log");
                    continue;
                }
            };

            tracing::info!(
                event = event.name(),
                block = event.block_number(),
                "relaying contract event"
            );
            match self.broadcaster.broadcast(&event).await {
                Ok(report) => {
                    relayed += 1;
                    tracing::debug!(
                        delivered = report.delivered,
                        pruned = report.pruned,
                        "contract event broadcast"
                    );
                }
                Err(err) => tracing::error!(error = %err, "dropping contract event"),
            }
        }

        self.cursor = Some(to);
        Ok(relayed)
    }

    /// Polls forever at the configured interval.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if let Err(err) = self.poll_once().await {
                tracing::warn!(error = %err, "log poll failed, retrying next tick");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use axum::extract::ws::Utf8Bytes;
    use tokio::sync::{Mutex, mpsc};

    use super::*;
    use crate::domain::{Connection, ConnectionRegistry};
    use crate::watcher::decode::test_support::pathz_log;
    use crate::watcher::rpc::RawLog;

    #[derive(Debug, Default)]
    struct FakeChain {
        head: Mutex<u64>,
        logs: Mutex<Vec<RawLog>>,
        requests: Mutex<Vec<(u64, u64)>>,
        failing: Mutex<bool>,
    }

    impl FakeChain {
        async fn set_head(&self, head: u64) {
            *self.head.lock().await = head;
        }
    }

    impl LogSource for Arc<FakeChain> {
        async fn latest_block(&self) -> Result<u64, RelayError> {
            if *self.failing.lock().await {
                return Err(RelayError::Rpc {
                    code: -32000,
                    message: "unavailable".to_string(),
                });
            }
            Ok(*self.head.lock().await)
        }

        async fn logs(&self, from: u64, to: u64) -> Result<Vec<RawLog>, RelayError> {
            self.requests.lock().await.push((from, to));
            let logs = self.logs.lock().await;
            Ok(logs
                .iter()
                .filter(|log| {
                    crate::watcher::decode::parse_quantity(&log.block_number)
                        .is_ok_and(|block| (from..=to).contains(&block))
                })
                .cloned()
                .collect())
        }
    }

    async fn setup(
        head: u64,
        max_block_range: u64,
    ) -> (
        Arc<FakeChain>,
        EventWatcher<Arc<FakeChain>>,
        mpsc::Receiver<Utf8Bytes>,
    ) {
        let chain = Arc::new(FakeChain::default());
        chain.set_head(head).await;

        let registry = Arc::new(ConnectionRegistry::new());
        let (conn, rx) = Connection::open(16);
        registry.register(conn).await;

        let watcher = EventWatcher::new(
            Arc::clone(&chain),
            Broadcaster::new(registry),
            Duration::from_millis(10),
            max_block_range,
        );
        (chain, watcher, rx)
    }

    fn drain(rx: &mut mpsc::Receiver<Utf8Bytes>) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame.as_str().to_string());
        }
        frames
    }

    #[tokio::test]
    async fn first_poll_anchors_without_fetching_logs() {
        let (chain, mut watcher, _rx) = setup(100, 50).await;

        assert!(matches!(watcher.poll_once().await, Ok(0)));
        assert_eq!(watcher.cursor(), Some(100));
        assert!(chain.requests.lock().await.is_empty());
    }

    #[tokio::test]
    async fn new_events_are_broadcast_to_connections() {
        let (chain, mut watcher, mut rx) = setup(100, 50).await;
        assert!(matches!(watcher.poll_once().await, Ok(0)));

        chain.logs.lock().await.push(pathz_log(3, "z", 17, 101));
        chain.set_head(101).await;

        assert!(matches!(watcher.poll_once().await, Ok(1)));
        assert_eq!(watcher.cursor(), Some(101));
        assert_eq!(
            drain(&mut rx),
            vec![
                r#"{"type":"PathzChoosed","storyId":3,"letter":"z","pathzId":17,"blockNumber":101}"#
                    .to_string()
            ]
        );
    }

    #[tokio::test]
    async fn block_range_is_capped() {
        let (chain, mut watcher, _rx) = setup(100, 10).await;
        assert!(matches!(watcher.poll_once().await, Ok(0)));
        chain.set_head(200).await;

        assert!(matches!(watcher.poll_once().await, Ok(0)));
        assert!(matches!(watcher.poll_once().await, Ok(0)));

        assert_eq!(*chain.requests.lock().await, vec![(101, 110), (111, 120)]);
        assert_eq!(watcher.cursor(), Some(120));
    }

    #[tokio::test]
    async fn upstream_failure_keeps_cursor() {
        let (chain, mut watcher, _rx) = setup(100, 10).await;
        assert!(matches!(watcher.poll_once().await, Ok(0)));
        chain.set_head(105).await;
        *chain.failing.lock().await = true;

        assert!(watcher.poll_once().await.is_err());
        assert_eq!(watcher.cursor(), Some(100));

        *chain.failing.lock().await = false;
        assert!(watcher.poll_once().await.is_ok());
        assert_eq!(watcher.cursor(), Some(105));
    }

    #[tokio::test]
    async fn undecodable_and_removed_logs_are_skipped() {
        let (chain, mut watcher, mut rx) = setup(100, 50).await;
        assert!(matches!(watcher.poll_once().await, Ok(0)));

        let mut broken = pathz_log(1, "a", 1, 101);
        broken.data = "0x00".to_string();
        let mut removed = pathz_log(2, "b", 2, 101);
        removed.removed = true;
        {
            let mut logs = chain.logs.lock().await;
            logs.push(broken);
            logs.push(removed);
            logs.push(pathz_log(3, "c", 3, 102));
        }
        chain.set_head(102).await;

        assert!(matches!(watcher.poll_once().await, Ok(1)));
        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 1);
        assert!(frames.iter().all(|f| f.contains(r#""letter":"c""#)));
    }

    #[tokio::test]
    async fn events_are_relayed_in_log_order() {
        let (chain, mut watcher, mut rx) = setup(10, 50).await;
        assert!(matches!(watcher.poll_once().await, Ok(0)));
        {
            let mut logs = chain.logs.lock().await;
            logs.push(pathz_log(1, "a", 1, 11));
            logs.push(pathz_log(1, "b", 2, 11));
            logs.push(pathz_log(1, "c", 3, 12));
        }
        chain.set_head(12).await;

        assert!(matches!(watcher.poll_once().await, Ok(3)));
        let letters: Vec<bool> = drain(&mut rx)
            .iter()
            .zip(["a", "b", "c"])
            .map(|(frame, letter)| frame.contains(&format!(r#""letter":"{letter}""#)))
            .collect();
        assert_eq!(letters, vec![true, true, true]);
    }
}
