//! Service layer: the broadcast dispatcher.

pub mod broadcaster;

pub use broadcaster::{BroadcastReport, Broadcaster};
