use apiato_cli::{run, Cli};
use apiato_mock::{HttpServer, HttpServerConfig, MemoryStore, RunningServer};
use apiato_provider::ports::data_provider::DataProviderError;
use apiato_provider::ports::transport::TransportError;
use apiato_provider::ApiatoDataProvider;
use clap::Parser;
use serde_json::{json, Value};

async fn start() -> RunningServer {
    HttpServer::new(
        MemoryStore::new(),
        HttpServerConfig {
            port: "0".into(),
        },
    )
    .start()
    .await
    .expect("start mock apiato")
}

async fn apiato(
    provider: &ApiatoDataProvider,
    args: &[&str],
) -> Result<Value, DataProviderError> {
    let cli = Cli::try_parse_from(std::iter::once("apiato").chain(args.iter().copied()))
        .expect("valid arguments");
    run(provider, cli.command).await
}

#[tokio::test]
async fn commands_round_trip_through_the_mock() {
    let server = start().await;
    let provider = ApiatoDataProvider::new(&server.base_url).unwrap();

    for title in ["b", "a", "c"] {
        let data = format!(r#"{{"title":"{title}"}}"#);
        let out = apiato(&provider, &["create", "posts", "--data", &data])
            .await
            .unwrap();
        assert_eq!(out["data"]["title"], title);
        assert!(out["data"]["id"].is_i64());
    }

    let listed = apiato(
        &provider,
        &["list", "posts", "--sort", "title", "--order", "DESC", "--per-page", "2"],
    )
    .await
    .unwrap();
    assert_eq!(listed["total"], 3);
    assert_eq!(listed["data"][0]["title"], "c");
    assert_eq!(listed["data"][1]["title"], "b");

    let related = apiato(
        &provider,
        &[
            "get-many-reference", "posts", "--target", "author_id", "--id", "1", "--page", "2",
            "--per-page", "2", "--sort", "title",
        ],
    )
    .await
    .unwrap();
    assert_eq!(related["data"], json!([listed["data"][0].clone()]));

    let many = apiato(&provider, &["get-many", "posts", "1", "3"]).await.unwrap();
    assert_eq!(many["data"].as_array().map(Vec::len), Some(2));

    let updated = apiato(&provider, &["update", "posts", "2", "--data", r#"{"title":"z"}"#])
        .await
        .unwrap();
    assert_eq!(updated["data"]["title"], "z");

    let bulk = apiato(
        &provider,
        &["update-many", "posts", "1", "2", "--data", r#"{"draft":false}"#],
    )
    .await
    .unwrap();
    assert_eq!(bulk, json!({ "data": [1, 2] }));

    let one = apiato(&provider, &["get", "posts", "1"]).await.unwrap();
    assert_eq!(one["data"]["draft"], false);

    let deleted = apiato(&provider, &["delete", "posts", "3"]).await.unwrap();
    assert_eq!(deleted["data"]["title"], "c");

    let removed = apiato(&provider, &["delete-many", "posts", "1", "2"]).await.unwrap();
    assert_eq!(removed, json!({ "data": [1, 2] }));
}

#[tokio::test]
async fn missing_record_surfaces_the_status() {
    let server = start().await;
    let provider = ApiatoDataProvider::new(&server.base_url).unwrap();

    let err = apiato(&provider, &["get", "posts", "42"]).await.unwrap_err();
    assert!(matches!(
        err,
        DataProviderError::Transport(TransportError::Status { status: 404, .. })
    ));
}
