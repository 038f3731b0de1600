use apiato_cli::{run, Cli};
use apiato_provider::config::Config;
use apiato_provider::ApiatoDataProvider;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for APIATO_API_URL / APIATO_TIMEOUT_MS when present.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string()))
        .with_writer(std::io::stderr)
        .init();

    let config = cli.apply(Config::from_env()?);
    let provider = ApiatoDataProvider::from_config(&config)?;

    let result = run(&provider, cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
