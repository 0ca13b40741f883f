use std::sync::Arc;

use review_intake::intake::{InvocationResponse, ReviewIntake};
use review_intake::sentiment::lexicon::LexiconScorer;
use review_intake::server::{build_rocket, AppState};
use review_intake::storage::SqliteRecordStore;
use rocket::http::{ContentType, Status};
use rocket::local::asynchronous::Client;
use serde_json::Value;
use sqlx::{Row, SqlitePool};

async fn setup() -> (Client, SqlitePool) {
    setup_with(|state| state).await
}

async fn setup_with(configure: impl FnOnce(AppState) -> AppState) -> (Client, SqlitePool) {
    let pool = common::init_db_pool(":memory:").await.expect("init pool");
    let store = SqliteRecordStore::new(pool.clone(), "reviews").expect("store");
    store.ensure_schema().await.expect("ensure schema");

    let intake = Arc::new(ReviewIntake::new(
        Arc::new(LexiconScorer::new()),
        Arc::new(store),
    ));
    let state = configure(AppState::new(intake, "reviews", "lexicon"));
    let client = Client::tracked(build_rocket(state, None))
        .await
        .expect("valid rocket instance");
    (client, pool)
}

async fn row_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM reviews")
        .fetch_one(pool)
        .await
        .expect("count rows")
}

#[tokio::test]
async fn test_health() {
    let (client, _pool) = setup().await;
    let response = client.get("/health").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.into_string().await.as_deref(), Some("OK"));
}

#[tokio::test]
async fn test_status_reports_wiring() {
    let (client, _pool) = setup().await;
    let response = client.get("/api/v1/status").dispatch().await;
    assert_eq!(response.status(), Status::Ok);

    let body: Value = response.into_json().await.expect("json body");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store_table"], "reviews");
    assert_eq!(body["scorer"], "lexicon");
    assert_eq!(body["notifications_enabled"], false);
}

#[tokio::test]
async fn test_submit_review_persists_row() {
    let (client, pool) = setup().await;

    let response = client
        .post("/api/v1/reviews")
        .header(ContentType::JSON)
        .body(r#"{"user_name": "Bob", "review": "Terrible, broken, waste of money."}"#)
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.content_type(), Some(ContentType::JSON));
    let body: Value = response.into_json().await.expect("json body");
    assert_eq!(body["message"], "Review processed");
    assert_eq!(body["user_name"], "Bob");
    assert_eq!(body["sentiment"], "Negative");

    let row = sqlx::query("SELECT user_name, review, sentiment, polarity_score FROM reviews")
        .fetch_one(&pool)
        .await
        .expect("stored row");
    assert_eq!(row.get::<String, _>("user_name"), "Bob");
    assert_eq!(row.get::<String, _>("review"), "Terrible, broken, waste of money.");
    assert_eq!(row.get::<String, _>("sentiment"), "Negative");
    let stored: f64 = row
        .get::<String, _>("polarity_score")
        .parse()
        .expect("polarity stored as number text");
    assert!(stored < -0.1);
}

#[tokio::test]
async fn test_submit_malformed_review_is_opaque_500() {
    let (client, pool) = setup().await;

    let response = client
        .post("/api/v1/reviews")
        .header(ContentType::JSON)
        .body("{\"review\": ")
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::InternalServerError);
    assert_eq!(
        response.into_string().await.as_deref(),
        Some("\"Internal Server Error\"")
    );
    assert_eq!(row_count(&pool).await, 0);
}

#[tokio::test]
async fn test_invoke_gateway_event() {
    let (client, pool) = setup().await;

    let event = serde_json::json!({
        "body": "{\"user_name\": \"Alice\", \"review\": \"This product is absolutely wonderful and amazing!\"}"
    });
    let response = client
        .post("/invoke")
        .header(ContentType::JSON)
        .body(event.to_string())
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    let envelope: InvocationResponse = response.into_json().await.expect("envelope");
    assert_eq!(envelope.status_code, 200);
    let body: Value = serde_json::from_str(&envelope.body).expect("body json");
    assert_eq!(body["sentiment"], "Positive");
    assert_eq!(body["polarity_score"], 0.8);
    assert_eq!(row_count(&pool).await, 1);
}

#[tokio::test]
async fn test_invoke_with_invalid_event_json() {
    let (client, pool) = setup().await;

    let response = client
        .post("/invoke")
        .header(ContentType::JSON)
        .body("not json at all")
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    let envelope: InvocationResponse = response.into_json().await.expect("envelope");
    assert_eq!(envelope.status_code, 500);
    assert_eq!(envelope.body, "\"Internal Server Error\"");
    assert_eq!(row_count(&pool).await, 0);
}

fn long_review() -> String {
    serde_json::json!({"user_name": "Long", "review": "great ".repeat(2000)}).to_string()
}

#[tokio::test]
async fn test_submit_review_larger_than_rocket_string_limit() {
    let (client, pool) = setup().await;
    let body = long_review();
    assert!(body.len() > 8 * 1024);

    let response = client
        .post("/api/v1/reviews")
        .header(ContentType::JSON)
        .body(body)
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.expect("json body");
    assert_eq!(body["user_name"], "Long");
    assert_eq!(body["sentiment"], "Positive");
    assert_eq!(row_count(&pool).await, 1);
}

#[tokio::test]
async fn test_invoke_with_large_event_returns_envelope() {
    let (client, pool) = setup().await;
    let event = serde_json::json!({ "body": long_review() });

    let response = client
        .post("/invoke")
        .header(ContentType::JSON)
        .body(event.to_string())
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    let envelope: InvocationResponse = response.into_json().await.expect("envelope");
    assert_eq!(envelope.status_code, 200);
    let body: Value = serde_json::from_str(&envelope.body).expect("body json");
    assert_eq!(body["sentiment"], "Positive");
    assert_eq!(row_count(&pool).await, 1);
}

#[tokio::test]
async fn test_body_over_configured_limit_gets_failure_envelope() {
    let (client, pool) = setup_with(|state| state.with_body_limit(1024)).await;

    let response = client
        .post("/invoke")
        .header(ContentType::JSON)
        .body(serde_json::json!({ "body": long_review() }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let envelope: InvocationResponse = response.into_json().await.expect("envelope");
    assert_eq!(envelope.status_code, 500);
    assert_eq!(envelope.body, "\"Internal Server Error\"");

    let response = client
        .post("/api/v1/reviews")
        .header(ContentType::JSON)
        .body(long_review())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::InternalServerError);
    assert_eq!(
        response.into_string().await.as_deref(),
        Some("\"Internal Server Error\"")
    );
    assert_eq!(row_count(&pool).await, 0);
}

#[tokio::test]
async fn test_invoke_with_non_utf8_body_returns_envelope() {
    let (client, pool) = setup().await;

    let response = client
        .post("/invoke")
        .header(ContentType::JSON)
        .body(&[0x7b, 0xff, 0xfe, 0x7d][..])
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    let envelope: InvocationResponse = response.into_json().await.expect("envelope");
    assert_eq!(envelope.status_code, 500);
    assert_eq!(envelope.body, "\"Internal Server Error\"");
    assert_eq!(row_count(&pool).await, 0);
}
