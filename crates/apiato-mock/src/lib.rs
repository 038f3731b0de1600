//! apiato-mock: an in-process Apiato-style REST API and a scripted transport,
//! for exercising the data provider without a real backend.

pub mod config;
pub mod errors;
pub mod inbound;
pub mod memory;
pub mod recording;

pub use inbound::http::{HttpServer, HttpServerConfig, RunningServer};
pub use memory::MemoryStore;
