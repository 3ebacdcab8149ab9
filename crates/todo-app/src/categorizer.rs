//! Category suggestions for new tasks
//!
//! The remote service is best effort: whatever happens on the wire, a
//! suggestion always comes back, falling back to local keyword rules.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use todo_core::task::Category;
use todo_core::KeywordRules;

use crate::error::Result;

/// Shown when the categorization service cannot be reached
pub const SERVICE_UNREACHABLE: &str =
    "Could not connect to the categorization service. Using default category.";

/// A category plus an optional message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub category: Category,
    pub notice: Option<String>,
}

impl Suggestion {
    pub fn quiet(category: Category) -> Self {
        Self {
            category,
            notice: None,
        }
    }
}

#[async_trait]
pub trait Categorizer: Send + Sync {
    /// Suggest a category for `text`; never fails
    async fn suggest(&self, text: &str) -> Suggestion;
}

/// Local keyword rules only
pub struct KeywordCategorizer {
    rules: KeywordRules,
}

impl KeywordCategorizer {
    pub fn new(rules: KeywordRules) -> Self {
        Self { rules }
    }
}

impl Default for KeywordCategorizer {
    fn default() -> Self {
        Self::new(KeywordRules::offline())
    }
}

#[async_trait]
impl Categorizer for KeywordCategorizer {
    async fn suggest(&self, text: &str) -> Suggestion {
        Suggestion::quiet(self.rules.categorize(text))
    }
}

#[derive(Serialize)]
struct CategorizeRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct CategorizeResponse {
    category: String,
}

/// Client for `POST /categorize-task`
pub struct HttpCategorizer {
    client: reqwest::Client,
    endpoint: String,
    fallback: KeywordRules,
}

impl HttpCategorizer {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/categorize-task", base_url.trim_end_matches('/')),
            fallback: KeywordRules::offline(),
        })
    }

    fn fallback(&self, text: &str, notice: Option<&str>) -> Suggestion {
        Suggestion {
            category: self.fallback.categorize(text),
            notice: notice.map(str::to_string),
        }
    }
}

#[async_trait]
impl Categorizer for HttpCategorizer {
    async fn suggest(&self, text: &str) -> Suggestion {
        let resp = match self
            .client
            .post(&self.endpoint)
            .json(&CategorizeRequest { text })
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                error!("Error calling categorization API: {}", e);
                return self.fallback(text, Some(SERVICE_UNREACHABLE));
            }
        };

        if !resp.status().is_success() {
            warn!(
                "Categorization API returned HTTP {}, using fallback",
                resp.status()
            );
            return self.fallback(text, None);
        }

        match resp.json::<CategorizeResponse>().await {
            Ok(body) => match body.category.parse::<Category>() {
                Ok(category) => {
                    debug!("Categorization API suggested {}", category);
                    Suggestion::quiet(category)
                }
                Err(e) => {
                    warn!("{}, using fallback", e);
                    self.fallback(text, None)
                }
            },
            Err(e) => {
                warn!("Unreadable categorization response: {}, using fallback", e);
                self.fallback(text, None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn spawn_server(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn categorizer(url: &str) -> HttpCategorizer {
        HttpCategorizer::new(url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn uses_service_label() {
        let router = Router::new().route(
            "/categorize-task",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["text"], "Pay rent");
                Json(json!({ "category": "Finance" }))
            }),
        );
        let url = spawn_server(router).await;

        let suggestion = categorizer(&url).suggest("Pay rent").await;
        assert_eq!(suggestion, Suggestion::quiet(Category::Finance));
    }

    #[tokio::test]
    async fn server_error_falls_back_quietly() {
        let router = Router::new().route(
            "/categorize-task",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let url = spawn_server(router).await;

        let suggestion = categorizer(&url).suggest("buy milk").await;
        assert_eq!(suggestion, Suggestion::quiet(Category::Personal));
    }

    #[tokio::test]
    async fn unknown_label_falls_back_quietly() {
        let router = Router::new().route(
            "/categorize-task",
            post(|| async { Json(json!({ "category": "Chores" })) }),
        );
        let url = spawn_server(router).await;

        let suggestion = categorizer(&url).suggest("vacuum the stairs").await;
        assert_eq!(suggestion, Suggestion::quiet(Category::General));
    }

    #[tokio::test]
    async fn unreachable_service_sets_notice() {
        // Grab a free port and close it again
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let suggestion = categorizer(&format!("http://{}", addr))
            .suggest("Team meeting")
            .await;
        assert_eq!(suggestion.category, Category::Work);
        assert_eq!(suggestion.notice.as_deref(), Some(SERVICE_UNREACHABLE));
    }

    #[tokio::test]
    async fn keyword_categorizer_is_offline() {
        let suggestion = KeywordCategorizer::default().suggest("ASAP: call mom").await;
        assert_eq!(suggestion, Suggestion::quiet(Category::Urgent));
    }
}
