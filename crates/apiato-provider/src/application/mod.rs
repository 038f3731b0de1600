pub mod data_provider;
pub mod query;
