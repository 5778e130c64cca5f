//! Listener registration
//!
//! Listeners are registered globally or on a single object and selected per
//! event by category and dispatch target.

mod listener;
mod registry;

pub use listener::{listener_fn, EventListener, FnListener};
pub use registry::{ListenerId, ListenerRegistry, Matching, Registration, RegistrationHandle};
