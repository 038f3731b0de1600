//! apiato-types: value types and ports shared by the Apiato data provider crates

pub mod domain;
pub mod ports;
