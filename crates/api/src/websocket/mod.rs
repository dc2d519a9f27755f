//! WebSocket support for real-time features
//!
//! Provides presence and live message delivery for direct chats:
//! - Online roster broadcast whenever a user connects or disconnects
//! - Live push of freshly stored messages to the receiver's connection
//!
//! # Architecture
//!
//! - **Registry**: one live connection per online user, newest wins
//! - **Hub**: every live socket (anonymous ones too), send-to-one and broadcast
//! - **Presence**: roster snapshot pushed through the hub
//! - **Relay**: at-most-once push of a stored message to its receiver
//! - **Lifecycle**: open/close bookkeeping that keeps the above in step
//! - **State**: the surface the HTTP layer calls into
//! - **Handler**: Axum WebSocket route handler
//! - **Events**: wire format for client/server communication

pub mod connection;
pub mod events;
pub mod handler;
pub mod hub;
pub mod lifecycle;
pub mod presence;
pub mod registry;
pub mod relay;
pub mod state;

pub use handler::ws_handler;
pub use hub::{ChannelHub, ConnectionHub};
pub use relay::RelayOutcome;
pub use state::{WebSocketState, MIN_OUTBOUND_QUEUE_CAPACITY};
