//! Task categorization endpoint

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use todo_core::task::Category;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CategorizeResponse {
    pub category: Category,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Pull a string `text` field out of a JSON body
fn request_text(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    value.get("text")?.as_str().map(str::to_string)
}

/// POST /categorize-task - Suggest a category for a task's text
async fn categorize_task(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CategorizeResponse>, (StatusCode, Json<ErrorResponse>)> {
    let Some(text) = request_text(&body) else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Invalid request. 'text' field is required.".to_string(),
            }),
        ));
    };

    let category = state.rules().categorize(&text);
    debug!("Categorized {} chars as {}", text.chars().count(), category);

    Ok(Json(CategorizeResponse { category }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/categorize-task", post(categorize_task))
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, SocketAddr};

    use axum::{
        body::{to_bytes, Body},
        extract::ConnectInfo,
        http::{header, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::routes::app;
    use crate::state::AppState;

    fn categorize_request(body: impl Into<Body>, peer: &str) -> Request<Body> {
        let ip: IpAddr = peer.parse().unwrap();
        Request::builder()
            .method("POST")
            .uri("/categorize-task")
            .header(header::CONTENT_TYPE, "application/json")
            .extension(ConnectInfo(SocketAddr::new(ip, 40_000)))
            .body(body.into())
            .unwrap()
    }

    fn forwarded_for(mut request: Request<Body>, client: &str) -> Request<Body> {
        request
            .headers_mut()
            .insert("x-forwarded-for", client.parse().unwrap());
        request
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn returns_keyword_category() {
        let app = app(AppState::new(false, false));
        let cases = [
            ("Email the client about the deadline", "Work"),
            ("Pick up groceries", "Personal"),
            ("Call the plumber immediately", "Urgent"),
            ("File tax return", "Finance"),
            ("Study for the exam", "Learning"),
            ("Water the plants", "General"),
        ];

        for (text, expected) in cases {
            let (status, payload) =
                send(&app, categorize_request(json!({ "text": text }).to_string(), "1.1.1.1")).await;
            assert_eq!(status, StatusCode::OK, "{}", text);
            assert_eq!(payload["category"], expected, "{}", text);
        }
    }

    #[tokio::test]
    async fn rejects_missing_text() {
        let app = app(AppState::new(false, false));
        let bodies = [
            json!({}).to_string(),
            json!({ "title": "Gym" }).to_string(),
            json!({ "text": 42 }).to_string(),
            "not json".to_string(),
            String::new(),
        ];

        for body in bodies {
            let (status, payload) = send(&app, categorize_request(body.clone(), "1.1.1.1")).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
            assert_eq!(payload["error"], "Invalid request. 'text' field is required.");
        }
    }

    #[tokio::test]
    async fn eleventh_request_in_a_minute_is_rejected() {
        let app = app(AppState::new(true, false));
        let body = json!({ "text": "read a book" }).to_string();

        for _ in 0..10 {
            let (status, _) = send(&app, categorize_request(body.clone(), "2.2.2.2")).await;
            assert_eq!(status, StatusCode::OK);
        }

        let response = app
            .clone()
            .oneshot(categorize_request(body.clone(), "2.2.2.2"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let retry_after: u64 = response.headers()[header::RETRY_AFTER]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!((1..=60).contains(&retry_after));

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(payload["error"], "rate limit exceeded");
        assert_eq!(payload["retryAfterSeconds"], retry_after);
        assert_eq!(payload["limit"], 10);
        assert_eq!(payload["windowSeconds"], 60);

        // Another client still gets through
        let (status, payload) = send(&app, categorize_request(body, "3.3.3.3")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["category"], "Learning");
    }

    #[tokio::test]
    async fn rotating_forwarded_header_does_not_reset_the_limit() {
        let app = app(AppState::new(true, false));
        let body = json!({ "text": "read a book" }).to_string();

        for i in 0..10 {
            let request = forwarded_for(
                categorize_request(body.clone(), "4.4.4.4"),
                &format!("10.0.0.{}", i),
            );
            let (status, _) = send(&app, request).await;
            assert_eq!(status, StatusCode::OK);
        }

        let request = forwarded_for(categorize_request(body, "4.4.4.4"), "10.0.0.99");
        let (status, payload) = send(&app, request).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(payload["limit"], 10);
    }

    #[tokio::test]
    async fn forwarded_header_identifies_clients_when_trusted() {
        let app = app(AppState::new(true, true));
        let body = json!({ "text": "read a book" }).to_string();

        // Every request comes through the same proxy
        for _ in 0..10 {
            let request = forwarded_for(categorize_request(body.clone(), "5.5.5.5"), "7.7.7.7");
            let (status, _) = send(&app, request).await;
            assert_eq!(status, StatusCode::OK);
        }

        let request = forwarded_for(categorize_request(body.clone(), "5.5.5.5"), "7.7.7.7");
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

        let request = forwarded_for(
            categorize_request(body, "5.5.5.5"),
            "8.8.8.8, 5.5.5.5",
        );
        let (status, payload) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["category"], "Learning");
    }
}
