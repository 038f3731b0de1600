//! apiato-client: the default JSON-over-HTTP transport, backed by reqwest.

use std::time::{Duration, Instant};

use anyhow::Context;
use apiato_types::domain::http::{HttpMethod, HttpRequest, TransportResponse};
use apiato_types::ports::transport::{HttpTransport, TransportError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct ReqwestTransportBuilder {
    headers: HeaderMap,
    timeout: Option<Duration>,
    client: Option<reqwest::Client>,
}

/// Sends provider requests with `Accept: application/json`, decodes the
/// body as JSON and turns any non-2xx status into `TransportError::Status`.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> anyhow::Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::default()
    }

    async fn send(&self, request: HttpRequest) -> Result<TransportResponse, TransportError> {
        let started = Instant::now();
        let mut builder = self
            .client
            .request(reqwest_method(request.method), &request.url)
            .header(ACCEPT, "application/json");
        if let Some(body) = request.body {
            builder = builder.header(CONTENT_TYPE, "application/json").body(body);
        }

        let res = builder.send().await.map_err(transport_error)?;
        let status = res.status();
        let headers = res
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = res.text().await.map_err(transport_error)?;
        let json = serde_json::from_str(&body).unwrap_or(Value::Null);

        tracing::info!(
            status = %status,
            latency_ms = %started.elapsed().as_millis(),
            "response"
        );

        if !status.is_success() {
            let message = json
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
            return Err(TransportError::Status {
                status: status.as_u16(),
                message,
                body: json,
            });
        }

        Ok(TransportResponse {
            status: status.as_u16(),
            headers,
            body,
            json,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn fetch(&self, request: HttpRequest) -> Result<TransportResponse, TransportError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "http_request",
            %request_id,
            method = %request.method,
            url = %request.url
        );
        self.send(request).instrument(span).await
    }
}

fn reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

fn transport_error(err: reqwest::Error) -> TransportError {
    if err.is_builder() {
        TransportError::InvalidRequest(err.to_string())
    } else {
        TransportError::Network(err.to_string())
    }
}

impl ReqwestTransportBuilder {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(
        mut self,
        key: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> anyhow::Result<Self> {
        let header_name =
            HeaderName::from_bytes(key.as_ref().as_bytes()).context("invalid header name")?;
        let header_value = HeaderValue::from_str(value.as_ref()).context("invalid header value")?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    pub fn with_reqwest_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> anyhow::Result<ReqwestTransport> {
        if let Some(client) = self.client {
            return Ok(ReqwestTransport { client });
        }

        let mut builder = reqwest::Client::builder();
        if !self.headers.is_empty() {
            builder = builder.default_headers(self.headers);
        }
        if let Some(t) = self.timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build()?;
        Ok(ReqwestTransport { client })
    }
}
