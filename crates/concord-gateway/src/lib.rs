//! # concord-gateway
//!
//! Gateway session client: envelope codec, session state machine with
//! heartbeat and resume, packet handlers, and ordered fan-out of decoded
//! events to application listeners.

pub mod broadcast;
pub mod client;
pub mod connection;
pub mod error;
pub mod events;
pub mod handlers;
pub mod listeners;
pub mod protocol;
pub mod rest;
pub mod transport;

// Re-export the surface most applications need
pub use broadcast::EventDispatcher;
pub use client::{GatewayClient, GatewayClientBuilder};
pub use connection::ConnectionState;
pub use error::GatewayError;
pub use events::{Event, EventCategories, GatewayEventType, Lifecycle};
pub use listeners::{listener_fn, EventListener, ListenerRegistry, RegistrationHandle};
pub use protocol::{Activity, Status};
