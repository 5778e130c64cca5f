//! reqwest-backed REST client

use concord_common::ClientConfig;
use concord_core::{RestClient, RestError, RestMethod, RestResponse, RestResult};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// REST client authenticated with the bot token
#[derive(Clone)]
pub struct HttpRestClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRestClient {
    /// Create a client sending `Authorization: Bot <token>` on every request
    pub fn new(token: &str, base_url: impl Into<String>) -> RestResult<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bot {token}"))
            .map_err(|e| RestError::Request(format!("invalid token header: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("concord/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RestError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> RestResult<Self> {
        Self::new(&config.token, config.api_base_url.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl RestClient for HttpRestClient {
    async fn send(
        &self,
        method: RestMethod,
        path: &str,
        body: Option<Value>,
    ) -> RestResult<RestResponse> {
        let http_method = match method {
            RestMethod::Get => reqwest::Method::GET,
            RestMethod::Post => reqwest::Method::POST,
            RestMethod::Put => reqwest::Method::PUT,
            RestMethod::Patch => reqwest::Method::PATCH,
            RestMethod::Delete => reqwest::Method::DELETE,
        };

        let mut request = self.client.request(http_method, self.url(path));
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RestError::Request(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| RestError::Request(e.to_string()))?;

        tracing::debug!(method = %method, path, status, "REST call");
        into_response(status, &text)
    }
}

fn into_response(status: u16, text: &str) -> RestResult<RestResponse> {
    let body = if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
    };

    match status {
        401 => Err(RestError::Unauthorized),
        200..=299 => Ok(RestResponse::new(status, body)),
        _ => {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| body.to_string());
            Err(RestError::Status { status, message })
        }
    }
}

#[derive(Deserialize)]
struct GatewayBot {
    url: String,
}

/// Ask the REST API for the gateway URL
pub async fn discover_gateway_url(rest: &dyn RestClient) -> RestResult<String> {
    let response = rest.send(RestMethod::Get, "/gateway/bot", None).await?;
    let url = response.json::<GatewayBot>()?.url;
    tracing::debug!(url = %url, "Gateway URL discovered");
    Ok(url)
}
