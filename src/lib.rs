//! # pathz-relay
//!
//! WebSocket relay for `PathzChoosed` contract events.
//!
//! Clients open a push channel; an upstream watcher follows the contract's
//! logs on a JSON-RPC node provider and every decoded event is broadcast,
//! best effort, to all open channels.
//!
//! ## Architecture
//!
//! ```text
//! Node provider (eth_getLogs)
//!     │
//!     ├── EventWatcher (watcher/)
//!     │
//!     ├── Broadcaster (service/)
//!     │
//!     ├── ConnectionRegistry (domain/)
//!     │
//!     ├── WS Handler (ws/)  ◄── upgrade requests
//!     │
//!     └── Clients (WebSocket)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod watcher;
pub mod ws;
