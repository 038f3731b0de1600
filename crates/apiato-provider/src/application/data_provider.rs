//! The Apiato dialect of the data provider contract.
//!
//! ```text
//! get_list     => GET    {api_url}/posts?limit=10&orderBy="title"&page=1&sortedBy="ASC"
//! get_one      => GET    {api_url}/posts/123
//! get_many     => GET    {api_url}/posts?in={"id":[1,2,3]}
//! update       => PATCH  {api_url}/posts/123
//! update_many  => PATCH  {api_url}/posts/{id}, once per id
//! create       => POST   {api_url}/posts
//! delete       => DELETE {api_url}/posts/123
//! delete_many  => DELETE {api_url}/posts/{id}, once per id
//! ```
//!
//! Apiato has no bulk update or bulk delete route, hence the per-id fan-out.

use std::sync::Arc;

use apiato_client::ReqwestTransport;
use apiato_types::domain::http::{HttpMethod, HttpRequest, TransportResponse};
use apiato_types::domain::params::*;
use apiato_types::domain::results::*;
use apiato_types::ports::data_provider::{DataProvider, DataProviderError};
use apiato_types::ports::transport::HttpTransport;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinSet;

use crate::application::query::Query;
use crate::config::Config;

/// Value of the `in` query parameter: `{"id":[...]}`.
#[derive(Serialize)]
struct IdFilter<'a> {
    id: &'a [Identifier],
}

pub struct ApiatoDataProvider<T: HttpTransport = ReqwestTransport> {
    api_url: String,
    transport: Arc<T>,
}

impl<T: HttpTransport> Clone for ApiatoDataProvider<T> {
    fn clone(&self) -> Self {
        Self {
            api_url: self.api_url.clone(),
            transport: Arc::clone(&self.transport),
        }
    }
}

impl ApiatoDataProvider<ReqwestTransport> {
    /// Provider over the default reqwest transport.
    pub fn new(api_url: &str) -> anyhow::Result<Self> {
        Ok(Self::with_transport(api_url, ReqwestTransport::new()?))
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let mut builder = ReqwestTransport::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.with_timeout(timeout);
        }
        Ok(Self::with_transport(&config.api_url, builder.build()?))
    }
}

impl<T: HttpTransport> ApiatoDataProvider<T> {
    pub fn with_transport(api_url: &str, transport: T) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            transport: Arc::new(transport),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn collection_url(&self, resource: &str) -> String {
        format!("{}/{}", self.api_url, resource)
    }

    fn record_url(&self, resource: &str, id: &Identifier) -> String {
        format!("{}/{}/{}", self.api_url, resource, id)
    }

    fn query_url(&self, resource: &str, query: &Query) -> String {
        format!("{}?{}", self.collection_url(resource), query.encode())
    }

    fn page_url(
        &self,
        resource: &str,
        pagination: &Pagination,
        sort: &Sort,
    ) -> Result<String, DataProviderError> {
        let query = Query::new()
            .json("limit", &pagination.per_page)?
            .json("page", &pagination.page)?
            .json("orderBy", &sort.field)?
            .json("sortedBy", &sort.order)?;
        Ok(self.query_url(resource, &query))
    }

    async fn send(
        &self,
        operation: &'static str,
        request: HttpRequest,
    ) -> Result<TransportResponse, DataProviderError> {
        tracing::debug!(
            operation,
            method = %request.method,
            url = %request.url,
            "dispatching"
        );
        Ok(self.transport.fetch(request).await?)
    }

    async fn fetch_page(
        &self,
        operation: &'static str,
        resource: &str,
        pagination: &Pagination,
        sort: &Sort,
    ) -> Result<GetListResult, DataProviderError> {
        let url = self.page_url(resource, pagination, sort)?;
        let mut res = self.send(operation, HttpRequest::get(url)).await?;
        let total = read_total(operation, &res.json)?;
        let data = take_array(operation, &mut res.json)?;
        Ok(GetListResult { data, total })
    }

    /// Sends every request at once and collects the `id` of each response in
    /// request order. The first failure wins; nothing partial is returned.
    async fn fan_out(
        &self,
        operation: &'static str,
        requests: Vec<HttpRequest>,
    ) -> Result<Vec<Identifier>, DataProviderError> {
        tracing::debug!(operation, batch = requests.len(), "fanning out");

        let mut tasks = JoinSet::new();
        for (index, request) in requests.into_iter().enumerate() {
            let transport = Arc::clone(&self.transport);
            tasks.spawn(async move { (index, transport.fetch(request).await) });
        }

        // Returning early drops the set, which aborts whatever is still in flight.
        let mut ids: Vec<Option<Identifier>> = vec![None; tasks.len()];
        while let Some(joined) = tasks.join_next().await {
            let (index, outcome) =
                joined.map_err(|e| DataProviderError::TaskFailed(e.to_string()))?;
            let res = outcome?;
            ids[index] = Some(read_id(operation, &res.json)?);
        }
        Ok(ids.into_iter().flatten().collect())
    }
}

#[async_trait]
impl<T: HttpTransport> DataProvider for ApiatoDataProvider<T> {
    async fn get_list(
        &self,
        resource: &str,
        params: GetListParams,
    ) -> Result<GetListResult, DataProviderError> {
        self.fetch_page("get_list", resource, &params.pagination, &params.sort)
            .await
    }

    async fn get_one(
        &self,
        resource: &str,
        params: GetOneParams,
    ) -> Result<GetOneResult, DataProviderError> {
        let url = self.record_url(resource, &params.id);
        let mut res = self.send("get_one", HttpRequest::get(url)).await?;
        let data = take_data("get_one", &mut res.json)?;
        Ok(RecordResult { data })
    }

    async fn get_many(
        &self,
        resource: &str,
        params: GetManyParams,
    ) -> Result<GetManyResult, DataProviderError> {
        let query = Query::new().json("in", &IdFilter { id: &params.ids })?;
        let url = self.query_url(resource, &query);
        let mut res = self.send("get_many", HttpRequest::get(url)).await?;
        let data = take_array("get_many", &mut res.json)?;
        Ok(GetManyResult { data })
    }

    async fn get_many_reference(
        &self,
        resource: &str,
        params: GetManyReferenceParams,
    ) -> Result<GetManyReferenceResult, DataProviderError> {
        tracing::trace!(target_field = %params.target, target_id = %params.id, "reference not forwarded");
        self.fetch_page(
            "get_many_reference",
            resource,
            &params.pagination,
            &params.sort,
        )
        .await
    }

    async fn update(
        &self,
        resource: &str,
        params: UpdateParams,
    ) -> Result<UpdateResult, DataProviderError> {
        let body = serde_json::to_string(&params.data)?;
        let request =
            HttpRequest::new(HttpMethod::Patch, self.record_url(resource, &params.id))
                .with_body(body);
        let res = self.send("update", request).await?;
        // the server's answer as-is; the submitted fields are not folded in
        Ok(RecordResult { data: res.json })
    }

    async fn update_many(
        &self,
        resource: &str,
        params: UpdateManyParams,
    ) -> Result<UpdateManyResult, DataProviderError> {
        let body = serde_json::to_string(&params.data)?;
        let requests = params
            .ids
            .iter()
            .map(|id| {
                HttpRequest::new(HttpMethod::Patch, self.record_url(resource, id))
                    .with_body(body.clone())
            })
            .collect();
        let data = self.fan_out("update_many", requests).await?;
        Ok(IdsResult { data })
    }

    async fn create(
        &self,
        resource: &str,
        params: CreateParams,
    ) -> Result<CreateResult, DataProviderError> {
        let body = serde_json::to_string(&params.data)?;
        let request =
            HttpRequest::new(HttpMethod::Post, self.collection_url(resource)).with_body(body);
        let res = self.send("create", request).await?;
        let id = read_id("create", &res.json)?;

        let mut record = params.data;
        record.insert("id".to_string(), id.to_json());
        Ok(RecordResult {
            data: Value::Object(record),
        })
    }

    async fn delete(
        &self,
        resource: &str,
        params: DeleteParams,
    ) -> Result<DeleteResult, DataProviderError> {
        let request = HttpRequest::new(HttpMethod::Delete, self.record_url(resource, &params.id));
        let res = self.send("delete", request).await?;
        Ok(RecordResult { data: res.json })
    }

    async fn delete_many(
        &self,
        resource: &str,
        params: DeleteManyParams,
    ) -> Result<DeleteManyResult, DataProviderError> {
        let requests = params
            .ids
            .iter()
            .map(|id| HttpRequest::new(HttpMethod::Delete, self.record_url(resource, id)))
            .collect();
        let data = self.fan_out("delete_many", requests).await?;
        Ok(IdsResult { data })
    }
}

fn malformed(operation: &'static str, reason: impl Into<String>) -> DataProviderError {
    DataProviderError::MalformedResponse {
        operation,
        reason: reason.into(),
    }
}

fn take_data(operation: &'static str, json: &mut Value) -> Result<Value, DataProviderError> {
    json.get_mut("data")
        .map(Value::take)
        .ok_or_else(|| malformed(operation, "missing `data`"))
}

fn take_array(operation: &'static str, json: &mut Value) -> Result<Vec<Value>, DataProviderError> {
    match take_data(operation, json)? {
        Value::Array(items) => Ok(items),
        other => Err(malformed(
            operation,
            format!("`data` is not an array: {other}"),
        )),
    }
}

fn read_total(operation: &'static str, json: &Value) -> Result<u64, DataProviderError> {
    let total = json
        .pointer("/meta/pagination/total")
        .ok_or_else(|| malformed(operation, "missing `meta.pagination.total`"))?;
    total.as_u64().ok_or_else(|| {
        malformed(
            operation,
            format!("`meta.pagination.total` is not a count: {total}"),
        )
    })
}

fn read_id(operation: &'static str, json: &Value) -> Result<Identifier, DataProviderError> {
    json.get("id")
        .and_then(Identifier::from_json)
        .ok_or_else(|| malformed(operation, "missing or invalid `id`"))
}
