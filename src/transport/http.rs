//! HTTP transport backed by reqwest.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;

use super::{ApiRequest, ApiResponse, Method, Transport};
use crate::config::ClientConfig;
use crate::error::{QueryError, Result};

/// Header carrying the Storage API token.
const TOKEN_HEADER: &str = "x-storageapi-token";

/// reqwest-based transport. Cloning shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    api_root: String,
    max_retries: u32,
}

impl HttpTransport {
    /// Creates a transport with authentication headers set on every request.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut token = HeaderValue::from_str(&config.token)
            .map_err(|_| QueryError::config("Token contains characters not allowed in a header"))?;
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|_| QueryError::config("Token contains characters not allowed in a header"))?;
        token.set_sensitive(true);
        bearer.set_sensitive(true);
        headers.insert(TOKEN_HEADER, token);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()
            .map_err(|e| QueryError::service(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_root: config.api_root(),
            max_retries: config.max_retries,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_root, path)
    }

    async fn send_once(
        &self,
        request: &ApiRequest,
    ) -> std::result::Result<ApiResponse, reqwest::Error> {
        let url = self.url(&request.path);
        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.header(CONTENT_TYPE, "application/json").json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        Ok(ApiResponse { status, body })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let mut attempt = 0;
        loop {
            tracing::debug!(method = %request.method, path = %request.path, attempt, "Sending request");
            match self.send_once(request).await {
                Ok(response) => {
                    tracing::debug!(
                        method = %request.method,
                        path = %request.path,
                        status = response.status,
                        "Received response"
                    );
                    return Ok(response);
                }
                // Only failures where the request never reached the service are retried.
                Err(e) if e.is_connect() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        path = %request.path,
                        attempt,
                        max_retries = self.max_retries,
                        "Connection failed, retrying: {}",
                        e
                    );
                }
                Err(e) => return Err(QueryError::from(e)),
            }
        }
    }
}
