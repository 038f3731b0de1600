use apiato_mock::{HttpServer, HttpServerConfig, MemoryStore};
use serde_json::{json, Value};

async fn start() -> apiato_mock::RunningServer {
    let server = HttpServer::new(
        MemoryStore::new(),
        HttpServerConfig {
            port: "0".into(),
        },
    );
    server.start().await.expect("start mock server")
}

#[tokio::test]
async fn create_list_update_delete_over_http() {
    let server = start().await;
    let addr = &server.base_url;
    let client = reqwest::Client::new();

    for title in ["b", "a", "c"] {
        let res = client
            .post(format!("{addr}/posts"))
            .json(&json!({ "title": title }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::CREATED);
        let created: Value = res.json().await.unwrap();
        assert!(created["id"].is_i64());
        assert_eq!(created["title"], title);
    }

    let list: Value = client
        .get(format!(
            "{addr}/posts?limit=2&orderBy=%22title%22&page=1&sortedBy=%22ASC%22"
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let titles: Vec<_> = list["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["a", "b"]);
    assert_eq!(list["meta"]["pagination"]["total"], 3);
    assert_eq!(list["meta"]["pagination"]["total_pages"], 2);

    let fetched: Value = client
        .get(format!("{addr}/posts/1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["data"]["title"], "b");

    let res = client
        .patch(format!("{addr}/posts/1"))
        .json(&json!({ "title": "bb" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["id"], 1);
    assert_eq!(updated["title"], "bb");

    let res = client
        .delete(format!("{addr}/posts/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let deleted: Value = res.json().await.unwrap();
    assert_eq!(deleted["id"], 1);
}

#[tokio::test]
async fn in_filter_selects_ids() {
    let server = start().await;
    let addr = &server.base_url;
    let client = reqwest::Client::new();
    for n in 0..4 {
        client
            .post(format!("{addr}/tags"))
            .json(&json!({ "n": n }))
            .send()
            .await
            .unwrap();
    }

    let res: Value = client
        .get(format!("{addr}/tags?in=%7B%22id%22%3A%5B2%2C4%5D%7D"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let ids: Vec<_> = res["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![2, 4]);
}

#[tokio::test]
async fn bad_request_and_not_found_paths() {
    let server = start().await;
    let addr = &server.base_url;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{addr}/posts?limit=lots"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("limit"));

    let res = client
        .get(format!("{addr}/posts/999"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);

    let res = client
        .delete(format!("{addr}/posts/not-a-number"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);

    let health: Value = client
        .get(format!("{addr}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
}
