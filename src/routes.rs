use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{
    health, method_not_allowed, notify, payment_details, preflight, transactions, webhook,
    CORS_MAX_AGE_SECS,
};
use crate::state::AppState;
use crate::utils::http::REQUEST_ID_HEADER;

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-admin-key"),
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .max_age(Duration::from_secs(CORS_MAX_AGE_SECS))
}

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/telegram-notify",
            post(notify::telegram_notify)
                .options(preflight)
                .fallback(method_not_allowed)
                .layer(DefaultBodyLimit::max(notify::MAX_NOTIFY_BODY_BYTES)),
        )
        .route(
            "/telegram-webhook",
            post(webhook::telegram_webhook)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .route(
            "/transactions",
            get(transactions::list_transactions)
                .post(transactions::create_transaction)
                .put(transactions::update_transaction)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .route(
            "/payment-details",
            get(payment_details::get_payment_details)
                .post(payment_details::create_payment_detail)
                .put(payment_details::update_payment_detail)
                .delete(payment_details::delete_payment_detail)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .with_state(state)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use base64::Engine as _;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::test_config;
    use crate::db::database::Database;
    use crate::testing::{BotCall, RecordingBot};

    async fn app_with_bot(bot: RecordingBot) -> (Router, Arc<RecordingBot>, Database) {
        let db = Database::init("sqlite::memory:").await.unwrap();
        let bot = Arc::new(bot);
        let state = AppState::new(test_config(), db.clone(), bot.clone());
        (create_routes(state), bot, db)
    }

    async fn test_app() -> (Router, Arc<RecordingBot>, Database) {
        app_with_bot(RecordingBot::default()).await
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn webhook_ping_is_acknowledged_without_side_effects() {
        let (app, bot, db) = test_app().await;
        let response = app
            .oneshot(json_request(Method::POST, "/telegram-webhook", json!({})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await, json!({ "ok": true }));
        assert!(bot.calls().is_empty());
        assert!(db.list_transactions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn approval_round_trip_through_the_router() {
        let (app, bot, db) = test_app().await;

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/transactions",
                json!({ "amount": "100", "currency": "CNY" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = read_json(response).await;
        assert_eq!(created["status"], "pending");
        let transaction_id = created["id"].as_i64().unwrap();

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/telegram-webhook",
                json!({
                    "callback_query": {
                        "id": "cb1",
                        "data": format!("approve_{transaction_id}"),
                        "message": { "chat": { "id": 555 }, "message_id": 9 },
                    }
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let stored = db.get_transaction(transaction_id).await.unwrap().unwrap();
        assert_eq!(stored.status.as_str(), "completed");
        assert_eq!(bot.calls().len(), 3);

        // A second press on a settled transaction must not flip it.
        app.oneshot(json_request(
            Method::POST,
            "/telegram-webhook",
            json!({
                "callback_query": {
                    "id": "cb2",
                    "data": format!("reject_{transaction_id}"),
                    "message": { "chat": { "id": 555 }, "message_id": 9 },
                }
            }),
        ))
        .await
        .unwrap();
        let stored = db.get_transaction(transaction_id).await.unwrap().unwrap();
        assert_eq!(stored.status.as_str(), "completed");
    }

    #[tokio::test]
    async fn malformed_callback_returns_bad_request() {
        let (app, bot, _db) = test_app().await;
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/telegram-webhook",
                json!({
                    "callback_query": {
                        "id": "cb1",
                        "data": "approve",
                        "message": { "chat": { "id": 555 }, "message_id": 9 },
                    }
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(bot.calls().is_empty());
    }

    #[tokio::test]
    async fn notify_without_image_is_bad_request() {
        let (app, bot, _db) = test_app().await;
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/telegram-notify",
                json!({ "amount": "100" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            read_json(response).await,
            json!({ "error": "Image is required" })
        );
        assert!(bot.calls().is_empty());
    }

    #[tokio::test]
    async fn notify_success_reports_delivery() {
        let (app, bot, _db) = test_app().await;
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/telegram-notify",
                json!({
                    "image": "data:image/jpeg;base64,/9j/4AAQSkZJRgABAQ==",
                    "amount": "100",
                    "type": "payment_proof",
                    "transaction_id": "42",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["success"], true);
        assert!(matches!(bot.calls().as_slice(), [BotCall::SendPhoto { .. }]));
    }

    #[tokio::test]
    async fn notify_relays_screenshots_larger_than_two_megabytes() {
        let (app, bot, _db) = test_app().await;
        let mut photo = vec![0xFF, 0xD8, 0xFF, 0xE0];
        photo.resize(2_000_000, 0x42);
        let encoded = base64::engine::general_purpose::STANDARD.encode(&photo);

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/telegram-notify",
                json!({
                    "image": format!("data:image/jpeg;base64,{encoded}"),
                    "type": "payment_proof",
                    "transaction_id": "42",
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let calls = bot.calls();
        let [BotCall::SendPhoto { photo: sent, .. }] = calls.as_slice() else {
            panic!("expected one photo, got {} calls", calls.len());
        };
        assert_eq!(sent.len(), 2_000_000);
    }

    #[tokio::test]
    async fn notify_delivery_failure_echoes_telegram_description() {
        let (app, bot, _db) =
            app_with_bot(RecordingBot::failing("Bad Request: chat not found")).await;
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/telegram-notify",
                json!({
                    "image": "/9j/4AAQSkZJRgABAQ==",
                    "chat_id": "-100123",
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            read_json(response).await,
            json!({
                "error": "Failed to send to Telegram",
                "details": "Bad Request: chat not found",
            })
        );
        assert_eq!(bot.calls().len(), 1);
    }

    #[tokio::test]
    async fn unsupported_methods_get_405() {
        let (app, _bot, _db) = test_app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/telegram-notify")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            read_json(response).await,
            json!({ "error": "Method not allowed" })
        );
    }

    #[tokio::test]
    async fn options_answers_with_cors_headers() {
        let (app, _bot, _db) = test_app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/telegram-webhook")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
        assert_eq!(response.headers()[header::ACCESS_CONTROL_MAX_AGE], "86400");
    }

    #[tokio::test]
    async fn payment_detail_lifecycle() {
        let (app, _bot, _db) = test_app().await;

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/payment-details",
                json!({ "recipient_name": "Li Wei", "account_number": "6222 0000" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let detail_id = read_json(response).await["id"].as_i64().unwrap();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/payment-details?id={detail_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["recipient_name"], "Li Wei");

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri(format!("/payment-details?id={detail_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/payment-details?id={detail_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn manual_status_update_on_missing_transaction_is_404() {
        let (app, _bot, _db) = test_app().await;
        let response = app
            .oneshot(json_request(
                Method::PUT,
                "/transactions",
                json!({ "id": 404, "status": "completed" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            read_json(response).await,
            json!({ "error": "Transaction not found" })
        );
    }
}
