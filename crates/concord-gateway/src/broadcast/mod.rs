//! Event broadcasting
//!
//! Fans decoded events out to listener lanes.

mod dispatcher;

pub use dispatcher::EventDispatcher;
pub(crate) use dispatcher::Lane;
