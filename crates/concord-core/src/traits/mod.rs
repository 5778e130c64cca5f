//! Collaborator traits (ports)
//!
//! The gateway consumes an entity cache and a REST client through these
//! traits. Implementations live elsewhere: `MemoryCache` in this crate,
//! the HTTP client in the gateway crate, scripted fakes in tests.

mod cache;
mod rest;

pub use cache::{Entity, EntityCache};
pub use rest::{RestClient, RestError, RestMethod, RestResponse, RestResult};
