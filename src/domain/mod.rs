//! Domain layer: connection identity, the connection registry, and the
//! contract events relayed to clients.
//!
//! The registry is the only shared mutable state in the service. It is
//! constructed once in `main` and handed to the upgrade handler and the
//! event watcher through [`crate::app_state::AppState`].

pub mod connection;
pub mod connection_id;
pub mod connection_registry;
pub mod contract_event;

pub use connection::{Connection, ConnectionState, DeliveryFailure};
pub use connection_id::ConnectionId;
pub use connection_registry::ConnectionRegistry;
pub use contract_event::ContractEvent;
