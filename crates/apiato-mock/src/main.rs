use apiato_mock::config::Config;
use apiato_mock::{HttpServer, HttpServerConfig, MemoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for SERVER_PORT when present.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let config = Config::from_env()?;
    let server = HttpServer::new(
        MemoryStore::new(),
        HttpServerConfig {
            port: config.server_port,
        },
    );
    server.run().await
}
