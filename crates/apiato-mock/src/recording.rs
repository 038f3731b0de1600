//! A scripted `HttpTransport`: records every request it sees and answers
//! from canned responses keyed by method and url.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use apiato_types::domain::http::{HttpMethod, HttpRequest, TransportResponse};
use apiato_types::ports::transport::{HttpTransport, TransportError};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

#[derive(Debug, Clone)]
enum Reply {
    Json(Value),
    Status { status: u16, message: String },
    Network(String),
}

#[derive(Debug, Clone)]
struct Scripted {
    reply: Reply,
    delay: Option<Duration>,
}

#[derive(Clone, Default)]
pub struct RecordingTransport {
    routes: Arc<DashMap<(HttpMethod, String), Scripted>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `method url` with a 200 carrying `json`.
    pub fn respond(&self, method: HttpMethod, url: impl Into<String>, json: Value) -> &Self {
        self.script(method, url, Reply::Json(json), None)
    }

    /// Like `respond`, but only after `delay` has elapsed.
    pub fn respond_after(
        &self,
        method: HttpMethod,
        url: impl Into<String>,
        json: Value,
        delay: Duration,
    ) -> &Self {
        self.script(method, url, Reply::Json(json), Some(delay))
    }

    /// Fail `method url` with an HTTP error status.
    pub fn fail(
        &self,
        method: HttpMethod,
        url: impl Into<String>,
        status: u16,
        message: &str,
    ) -> &Self {
        let reply = Reply::Status {
            status,
            message: message.to_string(),
        };
        self.script(method, url, reply, None)
    }

    /// Fail `method url` as if the connection dropped.
    pub fn disconnect(&self, method: HttpMethod, url: impl Into<String>) -> &Self {
        self.script(method, url, Reply::Network("connection reset".into()), None)
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn script(
        &self,
        method: HttpMethod,
        url: impl Into<String>,
        reply: Reply,
        delay: Option<Duration>,
    ) -> &Self {
        self.routes
            .insert((method, url.into()), Scripted { reply, delay });
        self
    }
}

#[async_trait]
impl HttpTransport for RecordingTransport {
    async fn fetch(&self, request: HttpRequest) -> Result<TransportResponse, TransportError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        // clone out so no map guard is held across the sleep
        let scripted = self
            .routes
            .get(&(request.method, request.url.clone()))
            .map(|entry| entry.value().clone());
        let Some(scripted) = scripted else {
            return Err(TransportError::Status {
                status: 404,
                message: format!("no scripted response for {} {}", request.method, request.url),
                body: Value::Null,
            });
        };

        if let Some(delay) = scripted.delay {
            tokio::time::sleep(delay).await;
        }

        match scripted.reply {
            Reply::Json(json) => Ok(TransportResponse::from_json(json)),
            Reply::Status { status, message } => Err(TransportError::Status {
                status,
                message,
                body: Value::Null,
            }),
            Reply::Network(reason) => Err(TransportError::Network(reason)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn replays_scripted_json_and_records_requests() {
        let transport = RecordingTransport::new();
        transport.respond(HttpMethod::Get, "http://t/posts/1", json!({ "data": { "id": 1 } }));

        let res = transport
            .fetch(HttpRequest::get("http://t/posts/1"))
            .await
            .unwrap();
        assert_eq!(res.json["data"]["id"], 1);
        assert_eq!(transport.requests(), vec![HttpRequest::get("http://t/posts/1")]);
    }

    #[tokio::test]
    async fn unscripted_requests_fail_with_404() {
        let transport = RecordingTransport::new();
        let err = transport
            .fetch(HttpRequest::new(HttpMethod::Delete, "http://t/posts/1"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Status { status: 404, .. }));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn method_is_part_of_the_key() {
        let transport = RecordingTransport::new();
        transport
            .respond(HttpMethod::Get, "http://t/posts/1", json!({ "data": {} }))
            .fail(HttpMethod::Patch, "http://t/posts/1", 422, "invalid");

        assert!(transport.fetch(HttpRequest::get("http://t/posts/1")).await.is_ok());
        let err = transport
            .fetch(HttpRequest::new(HttpMethod::Patch, "http://t/posts/1"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Status { status: 422, .. }));
    }
}
