//! REST collaborator
//!
//! HTTP implementation of [`RestClient`](concord_core::RestClient) plus the
//! gateway URL lookup the client runs before its first connect.

mod http;

pub use http::{discover_gateway_url, HttpRestClient};
