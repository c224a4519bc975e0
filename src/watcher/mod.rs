//! Upstream event watcher: follows the contract's `PathzChoosed` logs on a
//! node provider and hands each decoded event to the broadcast dispatcher.

pub mod decode;
pub mod event_watcher;
pub mod network;
pub mod rpc;

pub use event_watcher::EventWatcher;
pub use network::Network;
pub use rpc::{LogSource, RawLog, RpcClient};
