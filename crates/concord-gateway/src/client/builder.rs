//! Client builder
//!
//! Every collaborator has a production default; tests swap in an
//! in-memory connector, a recording REST client or a custom handler set.

use super::gateway_client::GatewayClient;
use crate::error::GatewayError;
use crate::handlers::PacketHandlerRegistry;
use crate::protocol::{IdentifyProperties, PresenceUpdatePayload};
use crate::rest::HttpRestClient;
use crate::transport::{Connector, WebSocketConnector};
use concord_common::ClientConfig;
use concord_core::{EntityCache, MemoryCache, RestClient};
use std::sync::Arc;

pub struct GatewayClientBuilder {
    config: ClientConfig,
    connector: Option<Arc<dyn Connector>>,
    rest: Option<Arc<dyn RestClient>>,
    cache: Option<Arc<dyn EntityCache>>,
    handlers: Option<PacketHandlerRegistry>,
    properties: Option<IdentifyProperties>,
    presence: Option<PresenceUpdatePayload>,
}

impl GatewayClientBuilder {
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            connector: None,
            rest: None,
            cache: None,
            handlers: None,
            properties: None,
            presence: None,
        }
    }

    #[must_use]
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    #[must_use]
    pub fn rest_client(mut self, rest: Arc<dyn RestClient>) -> Self {
        self.rest = Some(rest);
        self
    }

    #[must_use]
    pub fn cache(mut self, cache: Arc<dyn EntityCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replace the packet handler units
    #[must_use]
    pub fn handlers(mut self, handlers: PacketHandlerRegistry) -> Self {
        self.handlers = Some(handlers);
        self
    }

    /// Connection properties sent in Identify
    #[must_use]
    pub fn properties(mut self, properties: IdentifyProperties) -> Self {
        self.properties = Some(properties);
        self
    }

    /// Presence to identify with
    #[must_use]
    pub fn presence(mut self, presence: PresenceUpdatePayload) -> Self {
        self.presence = Some(presence);
        self
    }

    /// Validate the configuration and assemble the client
    pub fn build(self) -> Result<GatewayClient, GatewayError> {
        self.config.validate()?;

        let rest: Arc<dyn RestClient> = match self.rest {
            Some(rest) => rest,
            None => Arc::new(
                HttpRestClient::from_config(&self.config).map_err(GatewayError::Discovery)?,
            ),
        };

        let limits = self.config.message_cache;
        let cache: Arc<dyn EntityCache> = match self.cache {
            Some(cache) => cache,
            None => Arc::new(MemoryCache::with_message_limits(limits.capacity, limits.max_age)),
        };

        Ok(GatewayClient::assemble(
            self.config,
            self.connector.unwrap_or_else(|| Arc::new(WebSocketConnector)),
            rest,
            cache,
            self.handlers
                .unwrap_or_else(PacketHandlerRegistry::with_default_handlers),
            self.properties.unwrap_or_default(),
            self.presence,
        ))
    }
}
