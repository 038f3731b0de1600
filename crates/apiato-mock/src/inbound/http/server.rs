use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    serve, Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::errors::AppError;
use crate::memory::{Direction, ListQuery, MemoryStore, Page, Record};

#[derive(Clone)]
pub struct HttpServerConfig {
    pub port: String,
}

#[derive(Clone)]
pub struct HttpServer {
    pub store: MemoryStore,
    pub config: HttpServerConfig,
}

/// A server running on a background task. Aborted on drop.
pub struct RunningServer {
    pub addr: SocketAddr,
    pub base_url: String,
    handle: JoinHandle<()>,
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl HttpServer {
    pub fn new(store: MemoryStore, config: HttpServerConfig) -> Self {
        Self { store, config }
    }

    pub fn router(&self) -> Router {
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &axum::extract::Request<_>| {
                let uri = request.uri().to_string();
                let request_id = Uuid::new_v4();
                tracing::info_span!(
                    "http_request",
                    %request_id,
                    method = %request.method(),
                    uri
                )
            })
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        status = %response.status(),
                        latency_ms = %latency.as_millis(),
                        "response"
                    );
                },
            );

        Router::new()
            .route("/health", get(health))
            .route("/{resource}", get(list_records).post(create_record))
            .route(
                "/{resource}/{id}",
                get(get_record).patch(update_record).delete(delete_record),
            )
            .layer(trace_layer)
            .with_state(self.store.clone())
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let addr: SocketAddr = format!("0.0.0.0:{}", self.config.port).parse()?;
        tracing::info!("starting mock apiato on {}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        serve(listener, self.router().into_make_service()).await?;
        Ok(())
    }

    /// Serves on an ephemeral loopback port; `config.port` is ignored.
    pub async fn start(self) -> anyhow::Result<RunningServer> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = self.router();
        let handle = tokio::spawn(async move {
            if let Err(e) = serve(listener, app.into_make_service()).await {
                tracing::error!(error = %e, "mock apiato stopped");
            }
        });
        Ok(RunningServer {
            addr,
            base_url: format!("http://{addr}"),
            handle,
        })
    }
}

async fn health() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

async fn list_records(
    State(store): State<MemoryStore>,
    Path(resource): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, AppError> {
    let query = parse_list_query(&params)?;
    let page = store.list(&resource, &query);
    Ok(Json(paginated(page)))
}

async fn get_record(
    State(store): State<MemoryStore>,
    Path((resource, id)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&resource, &id)?;
    let record = store
        .get(&resource, id)
        .ok_or_else(|| not_found(&resource, id))?;
    Ok(Json(json!({ "data": record })))
}

async fn create_record(
    State(store): State<MemoryStore>,
    Path(resource): Path<String>,
    Json(mut fields): Json<Record>,
) -> (StatusCode, Json<Record>) {
    fields.remove("id");
    let record = store.create(&resource, fields);
    (StatusCode::CREATED, Json(record))
}

async fn update_record(
    State(store): State<MemoryStore>,
    Path((resource, id)): Path<(String, String)>,
    Json(changes): Json<Record>,
) -> Result<Json<Record>, AppError> {
    let id = parse_id(&resource, &id)?;
    let record = store
        .update(&resource, id, changes)
        .ok_or_else(|| not_found(&resource, id))?;
    Ok(Json(record))
}

async fn delete_record(
    State(store): State<MemoryStore>,
    Path((resource, id)): Path<(String, String)>,
) -> Result<Json<Record>, AppError> {
    let id = parse_id(&resource, &id)?;
    let record = store
        .delete(&resource, id)
        .ok_or_else(|| not_found(&resource, id))?;
    Ok(Json(record))
}

fn not_found(resource: &str, id: i64) -> AppError {
    AppError::NotFound(format!("{resource} {id}"))
}

fn parse_id(resource: &str, raw: &str) -> Result<i64, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("{resource} {raw}")))
}

fn paginated(page: Page) -> Value {
    let count = page.records.len();
    let total_pages = page.total_pages();
    json!({
        "data": page.records,
        "meta": {
            "pagination": {
                "total": page.total,
                "count": count,
                "per_page": page.per_page,
                "current_page": page.current_page,
                "total_pages": total_pages,
            }
        }
    })
}

/// Values may arrive JSON-encoded (`"title"`, `10`) or bare (`title`).
fn decode(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn parse_count(key: &str, value: Value) -> Result<usize, AppError> {
    let n = match &value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    };
    n.and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| AppError::BadRequest(format!("`{key}` must be a non-negative integer")))
}

fn parse_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn parse_direction(value: Value) -> Result<Direction, AppError> {
    match parse_text(value).to_ascii_lowercase().as_str() {
        "asc" => Ok(Direction::Asc),
        "desc" => Ok(Direction::Desc),
        other => Err(AppError::BadRequest(format!(
            "`sortedBy` must be asc or desc, got {other}"
        ))),
    }
}

fn parse_ids(value: Value) -> Result<Vec<i64>, AppError> {
    let bad = || AppError::BadRequest("`in` must look like {\"id\":[...]}".into());
    let ids = value.get("id").and_then(Value::as_array).ok_or_else(bad)?;
    ids.iter()
        .map(|id| match id {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()
        .ok_or_else(bad)
}

fn parse_list_query(params: &HashMap<String, String>) -> Result<ListQuery, AppError> {
    let value = |key: &str| params.get(key).map(|raw| decode(raw));
    Ok(ListQuery {
        limit: value("limit").map(|v| parse_count("limit", v)).transpose()?,
        page: value("page").map(|v| parse_count("page", v)).transpose()?,
        order_by: value("orderBy").map(parse_text),
        direction: value("sortedBy").map(parse_direction).transpose()?,
        ids: value("in").map(parse_ids).transpose()?,
    })
}
