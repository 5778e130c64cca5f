//! # concord-core
//!
//! Identity layer shared by the gateway: snowflakes, object kinds with their
//! capability sets, intents, and the collaborator traits (entity cache, REST).
//! This crate has no dependency on networking.

pub mod cache;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use cache::MemoryCache;
pub use traits::{
    Entity, EntityCache, RestClient, RestError, RestMethod, RestResponse, RestResult,
};
pub use value_objects::{
    Intents, IntentsParseError, ObjectKind, ObjectRef, Snowflake, SnowflakeParseError,
};
