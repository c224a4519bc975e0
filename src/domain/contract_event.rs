//! Contract events relayed to push-channel clients.
//!
//! Each decoded on-chain event becomes one [`ContractEvent`], which is the
//! payload handed to [`crate::service::Broadcaster::broadcast`].

use serde::Serialize;

/// A contract event in the shape clients receive it.
///
/// Serialized with a `type` discriminator followed by the event fields in
/// declaration order, e.g.
/// `{"type":"PathzChoosed","storyId":3,"letter":"z","pathzId":17,"blockNumber":1000}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum ContractEvent {
    /// A holder picked a path letter for a story.
    #[serde(rename_all = "camelCase")]
    PathzChoosed {
        /// Story the choice belongs to (`pathStoryNumber`, indexed).
        story_id: u16,
        /// The chosen letter.
        letter: String,
        /// Token that made the choice.
        pathz_id: u16,
        /// Block in which the event was emitted.
        block_number: u64,
    },
}

impl ContractEvent {
    /// Returns the event name as it appears in the contract ABI.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PathzChoosed { .. } => "PathzChoosed",
        }
    }

    /// Returns the block number the event was observed in.
    #[must_use]
    pub const fn block_number(&self) -> u64 {
        match self {
            Self::PathzChoosed { block_number, .. } => *block_number,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pathz_choosed_wire_format() {
        let event = ContractEvent::PathzChoosed {
            story_id: 3,
            letter: "z".to_string(),
            pathz_id: 17,
            block_number: 1000,
        };
        let json = serde_json::to_string(&event).unwrap_or_default();
        assert_eq!(
            json,
            r#"{"type":"PathzChoosed","storyId":3,"letter":"z","pathzId":17,"blockNumber":1000}"#
        );
    }

    #[test]
    fn accessors() {
        let event = ContractEvent::PathzChoosed {
            story_id: 1,
            letter: "a".to_string(),
            pathz_id: 2,
            block_number: 42,
        };
        assert_eq!(event.name(), "PathzChoosed");
        assert_eq!(event.block_number(), 42);
    }
}
