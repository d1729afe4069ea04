mod helpers;

use airbnb_insights::config::MlServiceConfig;
use airbnb_insights::services::{DashboardService, PricePredictorClient};
use airbnb_insights::warehouse::memory::WarehouseOp;
use airbnb_insights::warehouse::InMemoryWarehouse;
use airbnb_insights::websocket::DashboardSocketServer;
use futures_util::{SinkExt, StreamExt};
use helpers::*;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server(
    warehouse: Arc<InMemoryWarehouse>,
    predictor: Option<Arc<PricePredictorClient>>,
) -> Client {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = DashboardSocketServer::new(Arc::new(DashboardService::new(warehouse)), predictor);
    tokio::spawn(server.serve(listener));

    let (mut client, _) = connect_async(format!("ws://{}", addr)).await.unwrap();
    let welcome = next_json(&mut client).await;
    assert_eq!(welcome["type"], "connected");
    assert!(welcome["client_id"].is_string());
    client
}

async fn next_json(client: &mut Client) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for server message")
            .expect("connection closed")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn send(client: &mut Client, value: Value) {
    client.send(Message::Text(value.to_string())).await.unwrap();
}

#[tokio::test]
async fn test_load_pushes_loading_then_ready() {
    let mut client = start_server(sample_fixture().warehouse(), None).await;

    send(&mut client, json!({"type": "load", "view": "priceLocation"})).await;

    let loading = next_json(&mut client).await;
    assert_eq!(loading["type"], "view_state");
    assert_eq!(loading["view"], "priceLocation");
    assert_eq!(loading["state"]["status"], "loading");

    let ready = next_json(&mut client).await;
    assert_eq!(ready["state"]["status"], "ready");
    assert_eq!(ready["state"]["data"]["neighbourhoodPrices"][0]["avgPrice"], 200);
    assert_eq!(ready["state"]["fingerprint"].as_str().unwrap().len(), 64);
    assert!(ready.get("warning").is_none());
}

#[tokio::test]
async fn test_load_of_settled_view_replies_current_state() {
    let mut client = start_server(sample_fixture().warehouse(), None).await;

    send(&mut client, json!({"type": "load", "view": "hostListing"})).await;
    next_json(&mut client).await; // loading
    let first = next_json(&mut client).await;
    assert_eq!(first["state"]["status"], "ready");

    // no new fetch: a single reply with the settled state
    send(&mut client, json!({"type": "load", "view": "hostListing"})).await;
    let again = next_json(&mut client).await;
    assert_eq!(again["state"], first["state"]);

    // reload is the only way back to loading
    send(&mut client, json!({"type": "reload", "view": "hostListing"})).await;
    assert_eq!(next_json(&mut client).await["state"]["status"], "loading");
    let reloaded = next_json(&mut client).await;
    assert_eq!(reloaded["state"]["fingerprint"], first["state"]["fingerprint"]);
}

#[tokio::test]
async fn test_unavailable_view_is_errored_until_reload() {
    let warehouse = sample_fixture().warehouse();
    warehouse.fail(WarehouseOp::ScanFacts);
    let mut client = start_server(warehouse.clone(), None).await;

    send(&mut client, json!({"type": "load", "view": "reviewTrends"})).await;
    next_json(&mut client).await; // loading
    let errored = next_json(&mut client).await;
    assert_eq!(errored["state"]["status"], "errored");
    assert_eq!(errored["state"]["error"]["kind"], "data_unavailable");
    assert_eq!(errored["state"]["error"]["view"], "reviewTrends");

    warehouse.recover(WarehouseOp::ScanFacts);
    send(&mut client, json!({"type": "load", "view": "reviewTrends"})).await;
    assert_eq!(next_json(&mut client).await["state"]["status"], "errored");

    send(&mut client, json!({"type": "reload", "view": "reviewTrends"})).await;
    next_json(&mut client).await; // loading
    assert_eq!(next_json(&mut client).await["state"]["status"], "ready");
}

#[tokio::test]
async fn test_general_stats_fallback_is_ready_with_warning() {
    let warehouse = sample_fixture().warehouse();
    warehouse.fail(WarehouseOp::ScanFacts);
    let mut client = start_server(warehouse, None).await;

    send(&mut client, json!({"type": "load", "view": "generalStats"})).await;
    next_json(&mut client).await; // loading
    let ready = next_json(&mut client).await;
    assert_eq!(ready["state"]["status"], "ready");
    assert_eq!(ready["state"]["data"]["fallback"], true);
    assert_eq!(ready["state"]["degraded"], json!(["generalStats"]));
    assert_eq!(ready["warning"]["kind"], "partial_failure");
}

#[tokio::test]
async fn test_invalid_message_gets_error_reply() {
    let mut client = start_server(sample_fixture().warehouse(), None).await;

    send(&mut client, json!({"type": "load", "view": "unknownView"})).await;
    let reply = next_json(&mut client).await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["message"], "Invalid message format");
}

#[tokio::test]
async fn test_predict_without_service_configured() {
    let mut client = start_server(sample_fixture().warehouse(), None).await;

    send(
        &mut client,
        json!({
            "type": "predict",
            "request_id": "r1",
            "input": prediction_input(),
        }),
    )
    .await;
    let reply = next_json(&mut client).await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["request_id"], "r1");
}

#[tokio::test]
async fn test_predict_forwards_to_price_service() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/predict")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "predicted_price": 187.5,
                "model_used": "ensemble",
                "confidence_level": "high",
                "individual_predictions": {"xgboost": 190.0, "lightgbm": 185.0},
                "timestamp": "2024-06-15T12:00:00",
                "api_version": "1.0.0"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let predictor = PricePredictorClient::new(&MlServiceConfig {
        url: server.url(),
        timeout_secs: 5,
    })
    .unwrap();
    let mut client = start_server(sample_fixture().warehouse(), Some(Arc::new(predictor))).await;

    send(
        &mut client,
        json!({
            "type": "predict",
            "request_id": "r2",
            "input": prediction_input(),
        }),
    )
    .await;
    let reply = next_json(&mut client).await;
    assert_eq!(reply["type"], "prediction");
    assert_eq!(reply["request_id"], "r2");
    assert_eq!(reply["prediction"]["predicted_price"], 187.5);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_server_keeps_accepting_after_bad_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let dashboard = Arc::new(DashboardService::new(sample_fixture().warehouse()));
    tokio::spawn(DashboardSocketServer::new(dashboard, None).serve(listener));

    // plain TCP peer that never completes the websocket handshake
    {
        use tokio::io::AsyncWriteExt;
        let mut raw = TcpStream::connect(addr).await.unwrap();
        raw.write_all(b"not a websocket\r\n\r\n").await.unwrap();
    }

    let (mut client, _) = tokio::time::timeout(
        Duration::from_secs(5),
        connect_async(format!("ws://{}", addr)),
    )
    .await
    .expect("server stopped accepting")
    .unwrap();
    assert_eq!(next_json(&mut client).await["type"], "connected");
}

fn prediction_input() -> Value {
    json!({
        "neighbourhood_group": "Manhattan",
        "neighbourhood": "Upper West Side",
        "room_type": "Entire home/apt",
        "latitude": 40.7736,
        "longitude": -73.9566,
        "minimum_nights": 3,
        "availability_365": 200,
        "number_of_reviews": 50,
        "calculated_host_listings_count": 1
    })
}
