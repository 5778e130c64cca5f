//! Cache implementations

mod memory;

pub use memory::{MemoryCache, DEFAULT_MESSAGE_CAPACITY, DEFAULT_MESSAGE_MAX_AGE};
