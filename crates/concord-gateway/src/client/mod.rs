//! Public client handle

mod builder;
mod gateway_client;

pub use builder::GatewayClientBuilder;
pub use gateway_client::GatewayClient;
