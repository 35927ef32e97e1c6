//! Presentation API over a real listener.

use serde_json::{json, Value};
use tokio::net::TcpListener;
use token_exchange::http::ApiServer;

mod common;
use common::{harness, Harness, MockProvider, ALICE, EXTERNAL_TOKEN};

async fn serve(h: &Harness) -> (String, tokio::sync::broadcast::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (trigger, shutdown) = tokio::sync::broadcast::channel(1);
    tokio::spawn(ApiServer::new(h.engine.clone()).run(listener, shutdown));
    (format!("http://{}", addr), trigger)
}

#[tokio::test]
async fn test_full_exchange_over_http() {
    let mock = MockProvider::new();
    mock.set_balance(EXTERNAL_TOKEN, ALICE, "1");
    let h = harness(mock.clone());
    let (base, _trigger) = serve(&h).await;
    let client = reqwest::Client::new();

    let res = client.post(format!("{}/connect", base)).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["session"]["status"], "connected");
    h.balances.refresh(ALICE).await;

    let res = client
        .post(format!("{}/intent", base))
        .json(&json!({ "direction": "external_to_internal", "amount": "0.01" }))
        .send()
        .await
        .unwrap();
    let quote: Value = res.json().await.unwrap();
    assert_eq!(quote["output"], "1000");
    assert_eq!(quote["executable"], true);

    let status: Value = client
        .get(format!("{}/status", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["phase"], "quoting");
    assert_eq!(status["balances"]["external"], "1.0000");
    assert_eq!(status["rate"], "0.01 EDU = 1000 MyTokens");
    assert_eq!(status["account_short"], "0xf39F...2266");

    let res = client.post(format!("{}/execute", base)).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let tx: Value = res.json().await.unwrap();
    assert_eq!(tx["phase"], "confirmed");

    let id = tx["id"].as_str().unwrap();
    let res = client
        .get(format!("{}/transactions/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let fetched: Value = res.json().await.unwrap();
    assert_eq!(fetched["tx_hash_swap"], tx["tx_hash_swap"]);
}

#[tokio::test]
async fn test_guard_failure_body() {
    let h = harness(MockProvider::new());
    let (base, _trigger) = serve(&h).await;
    let client = reqwest::Client::new();

    let res = client.post(format!("{}/execute", base)).send().await.unwrap();
    assert_eq!(res.status(), 401);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["kind"], "not_connected");
    assert_eq!(body["engine_initiated"], false);
    assert!(body["message"].as_str().unwrap().contains("not connected"));
}

#[tokio::test]
async fn test_unknown_transaction_is_404() {
    let h = harness(MockProvider::new());
    let (base, _trigger) = serve(&h).await;

    let res = reqwest::get(format!(
        "{}/transactions/00000000-0000-0000-0000-000000000000",
        base
    ))
    .await
    .unwrap();
    assert_eq!(res.status(), 404);
}

#[tokio::test]
async fn test_server_stops_on_shutdown() {
    let h = harness(MockProvider::new());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let (trigger, shutdown) = tokio::sync::broadcast::channel(1);
    let server = tokio::spawn(ApiServer::new(h.engine.clone()).run(listener, shutdown));

    trigger.send(()).unwrap();
    let result = tokio::time::timeout(std::time::Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}
