//! apiato-provider: data provider operations mapped onto an Apiato REST API

pub mod application;
pub mod config;

pub use apiato_types::{domain, ports};
pub use application::data_provider::ApiatoDataProvider;
