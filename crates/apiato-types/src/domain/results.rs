use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::params::Identifier;

/// A page of records plus the collection size reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetListResult {
    pub data: Vec<Value>,
    pub total: u64,
}

pub type GetManyReferenceResult = GetListResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetManyResult {
    pub data: Vec<Value>,
}

/// Single-record envelope shared by get-one, create, update and delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordResult {
    pub data: Value,
}

pub type GetOneResult = RecordResult;
pub type CreateResult = RecordResult;
pub type UpdateResult = RecordResult;
pub type DeleteResult = RecordResult;

/// Ids echoed back by a fan-out write, in the order they were requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdsResult {
    pub data: Vec<Identifier>,
}

pub type UpdateManyResult = IdsResult;
pub type DeleteManyResult = IdsResult;
