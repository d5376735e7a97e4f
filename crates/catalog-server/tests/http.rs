use catalog_server::{AppConfig, AppState, build_app};
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

async fn start_server() -> (String, tokio::sync::oneshot::Sender<()>, JoinHandle<()>) {
    let cfg = AppConfig::default();
    let state = AppState::from_config(&cfg).await.expect("build state");
    let app = build_app(state, &cfg);

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    (format!("http://{addr}"), tx, server)
}

fn guitar() -> Value {
    json!({ "name": "Guitar", "description": "Six strings", "price": 129900 })
}

fn review(rating: i64) -> Value {
    json!({
        "first_name": "Ada",
        "last_name": "Lovelace",
        "review": "Sounds great",
        "rating": rating,
    })
}

/// Asserts a 400 with a JSON `{"error": ...}` body and returns the message.
async fn bad_request_message(resp: reqwest::Response) -> String {
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("application/json"), "{content_type}");
    let body: Value = resp.json().await.unwrap();
    body["error"].as_str().expect("error field").to_string()
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let (base, shutdown_tx, handle) = start_server().await;

    let resp = reqwest::get(format!("{base}/healthz")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn product_and_review_lifecycle() {
    let (base, shutdown_tx, handle) = start_server().await;
    let client = reqwest::Client::new();

    // Create product
    let resp = client
        .post(format!("{base}/products"))
        .json(&guitar())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(resp.headers()["location"], "/products/1");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["id"], 1);

    // Fresh product has rating 0
    let resp = client.get(format!("{base}/products/1")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["name"], "Guitar");
    assert_eq!(body["rating"], 0.0);

    // Add two reviews
    for (rating, expected_id) in [(4, 1), (5, 2)] {
        let resp = client
            .post(format!("{base}/products/1/reviews"))
            .json(&review(rating))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(
            resp.headers()["location"],
            format!("/products/1/reviews/{expected_id}").as_str()
        );
    }

    // Rating reflects the writes
    let body: Value = client
        .get(format!("{base}/products/1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["rating"], 4.5);

    // Paged review list
    let resp = client
        .get(format!("{base}/products/1/reviews?offset=1&limit=10"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let reviews: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0]["rating"], 5);

    // Update then read a review
    let resp = client
        .put(format!("{base}/products/1/reviews/2"))
        .json(&review(1))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = client
        .get(format!("{base}/products/1/reviews/2"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["rating"], 1);

    // Delete review, then it is gone
    let resp = client
        .delete(format!("{base}/products/1/reviews/2"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let resp = client
        .get(format!("{base}/products/1/reviews/2"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // Delete product
    let resp = client
        .delete(format!("{base}/products/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let resp = client.get(format!("{base}/products/1")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("not found"));

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn invalid_input_is_rejected() {
    let (base, shutdown_tx, handle) = start_server().await;
    let client = reqwest::Client::new();

    // Non-positive price
    let resp = client
        .post(format!("{base}/products"))
        .json(&json!({ "name": "Guitar", "description": "Six strings", "price": 0 }))
        .send()
        .await
        .unwrap();
    assert!(bad_request_message(resp).await.contains("price"));

    // Malformed body
    let resp = client
        .post(format!("{base}/products"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert!(!bad_request_message(resp).await.is_empty());

    client
        .post(format!("{base}/products"))
        .json(&guitar())
        .send()
        .await
        .unwrap();

    // Rating out of range
    let resp = client
        .post(format!("{base}/products/1/reviews"))
        .json(&review(6))
        .send()
        .await
        .unwrap();
    assert!(bad_request_message(resp).await.contains("rating"));

    // Non-positive identifier
    let resp = client.get(format!("{base}/products/0")).send().await.unwrap();
    assert!(bad_request_message(resp).await.contains("positive"));

    // Non-numeric identifiers
    let resp = client.get(format!("{base}/products/abc")).send().await.unwrap();
    assert!(bad_request_message(resp).await.contains("abc"));
    let resp = client
        .delete(format!("{base}/products/1/reviews/xyz"))
        .send()
        .await
        .unwrap();
    assert!(bad_request_message(resp).await.contains("xyz"));

    // Bad paging parameters
    let resp = client
        .get(format!("{base}/products?limit=abc"))
        .send()
        .await
        .unwrap();
    assert!(bad_request_message(resp).await.contains("limit"));
    let resp = client
        .get(format!("{base}/products/1/reviews?offset=-1"))
        .send()
        .await
        .unwrap();
    assert!(bad_request_message(resp).await.contains("offset"));

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn writes_to_missing_entities_return_not_found() {
    let (base, shutdown_tx, handle) = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .put(format!("{base}/products/7"))
        .json(&guitar())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = client
        .post(format!("{base}/products/7/reviews"))
        .json(&review(3))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = client
        .delete(format!("{base}/products/7/reviews/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}
