//! Connection management
//!
//! Session state, heartbeat scheduling, reconnect backoff and the driver
//! task that ties them to a transport.

mod backoff;
mod driver;
mod heartbeat;
mod session;
mod state;

pub use backoff::Backoff;
pub use driver::{Command, DriverChannels, GatewayEndpoint, SessionDriver, IO_TIMEOUT};
pub use heartbeat::{Heartbeat, HeartbeatTick};
pub use session::{Session, SessionAction, SessionConfig, SessionMachine};
pub use state::ConnectionState;
