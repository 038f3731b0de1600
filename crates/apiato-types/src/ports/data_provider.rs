use async_trait::async_trait;

use crate::domain::params::*;
use crate::domain::results::*;
use crate::ports::transport::TransportError;

#[derive(thiserror::Error, Debug)]
pub enum DataProviderError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("malformed {operation} response: {reason}")]
    MalformedResponse {
        operation: &'static str,
        reason: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("request task failed: {0}")]
    TaskFailed(String),
}

/// The data access contract an admin UI talks to: nine operations over
/// named resources.
#[async_trait]
pub trait DataProvider: Send + Sync {
    async fn get_list(
        &self,
        resource: &str,
        params: GetListParams,
    ) -> Result<GetListResult, DataProviderError>;

    async fn get_one(
        &self,
        resource: &str,
        params: GetOneParams,
    ) -> Result<GetOneResult, DataProviderError>;

    async fn get_many(
        &self,
        resource: &str,
        params: GetManyParams,
    ) -> Result<GetManyResult, DataProviderError>;

    async fn get_many_reference(
        &self,
        resource: &str,
        params: GetManyReferenceParams,
    ) -> Result<GetManyReferenceResult, DataProviderError>;

    async fn update(
        &self,
        resource: &str,
        params: UpdateParams,
    ) -> Result<UpdateResult, DataProviderError>;

    async fn update_many(
        &self,
        resource: &str,
        params: UpdateManyParams,
    ) -> Result<UpdateManyResult, DataProviderError>;

    async fn create(
        &self,
        resource: &str,
        params: CreateParams,
    ) -> Result<CreateResult, DataProviderError>;

    async fn delete(
        &self,
        resource: &str,
        params: DeleteParams,
    ) -> Result<DeleteResult, DataProviderError>;

    async fn delete_many(
        &self,
        resource: &str,
        params: DeleteManyParams,
    ) -> Result<DeleteManyResult, DataProviderError>;
}
