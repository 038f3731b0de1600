mod server;

pub use server::{HttpServer, HttpServerConfig, RunningServer};
