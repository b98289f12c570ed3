//! Tavily web search tool.

use super::Tool;
use crate::config::Settings;
use crate::error::{CoraError, Result};
use crate::openai::http_client;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument};

/// Name the search tool is advertised under.
pub const TAVILY_TOOL_NAME: &str = "tavily_search_results_json";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Web search through the Tavily API.
pub struct TavilySearch {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    max_results: u32,
    search_depth: String,
}

impl TavilySearch {
    /// Create the tool, reading `TAVILY_API_KEY` from the environment.
    ///
    /// A missing key is reported when the tool is first called.
    pub fn new(api_url: &str, max_results: u32, search_depth: &str) -> Result<Self> {
        Ok(Self {
            client: http_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
            api_url: api_url.to_string(),
            api_key: std::env::var("TAVILY_API_KEY").ok().filter(|k| !k.is_empty()),
            max_results,
            search_depth: search_depth.to_string(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            &settings.search.api_url,
            settings.search.max_results,
            &settings.search.search_depth,
        )
    }

    /// Use an explicit API key instead of the environment.
    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }

    /// Run a search and return the trimmed results.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| CoraError::Config("TAVILY_API_KEY not set".to_string()))?;

        let request = SearchRequest {
            api_key,
            query,
            max_results: self.max_results,
            search_depth: &self.search_depth,
        };

        let response = self.client.post(&self.api_url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CoraError::Tool(format!("Tavily search failed ({}): {}", status, body)));
        }

        let body: SearchResponse = response.json().await?;
        debug!("Tavily returned {} results", body.results.len());

        Ok(body
            .results
            .into_iter()
            .filter(|hit| !hit.url.trim().is_empty())
            .collect())
    }
}

#[async_trait]
impl Tool for TavilySearch {
    fn name(&self) -> &str {
        TAVILY_TOOL_NAME
    }

    fn description(&self) -> &str {
        "A search engine optimized for comprehensive, accurate, and trusted results. \
         Useful for when you need to answer questions about current events. \
         Input should be a search query."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "search query to look up"
                }
            },
            "required": ["query"]
        })
    }

    async fn call(&self, args: &Value) -> Result<Value> {
        let query = args
            .get("query")
            .and_then(Value::as_str)
            .or_else(|| args.as_str())
            .ok_or_else(|| CoraError::Tool("Missing 'query' argument".to_string()))?;

        let hits = self.search(query).await?;
        Ok(serde_json::to_value(hits)?)
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: u32,
    search_depth: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

/// One web search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use std::sync::{Arc, Mutex};

    /// Serve a canned search reply and keep the last request body.
    async fn fake_tavily(status: StatusCode, reply: Value) -> (String, Arc<Mutex<Option<Value>>>) {
        let captured = Arc::new(Mutex::new(None));
        let sink = captured.clone();
        let app = Router::new().route(
            "/search",
            post(move |Json(body): Json<Value>| {
                let sink = sink.clone();
                let reply = reply.clone();
                async move {
                    *sink.lock().unwrap() = Some(body);
                    (status, Json(reply))
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/search", addr), captured)
    }

    #[tokio::test]
    async fn test_search_sends_settings_and_drops_hits_without_url() {
        let (url, captured) = fake_tavily(
            StatusCode::OK,
            json!({
                "query": "rust 2024 edition",
                "results": [
                    {"title": "Rust 2024", "url": "https://blog.rust-lang.org/2025/02/20/Rust-1.85.0.html", "content": "Edition released", "score": 0.91},
                    {"title": "No link", "url": "  ", "content": "dropped"}
                ]
            }),
        )
        .await;
        let tool = TavilySearch::new(&url, 3, "advanced").unwrap().with_api_key("tvly-test");

        let output = tool.call(&json!({"query": "rust 2024 edition"})).await.unwrap();

        let hits: Vec<SearchHit> = serde_json::from_value(output).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Rust 2024");
        assert_eq!(hits[0].score, Some(0.91));

        let body = captured.lock().unwrap().clone().unwrap();
        assert_eq!(
            body,
            json!({
                "api_key": "tvly-test",
                "query": "rust 2024 edition",
                "max_results": 3,
                "search_depth": "advanced"
            })
        );
    }

    #[tokio::test]
    async fn test_search_http_error_is_tool_error() {
        let (url, _) = fake_tavily(StatusCode::UNAUTHORIZED, json!({"detail": {"error": "Unauthorized: missing or invalid API key."}})).await;
        let tool = TavilySearch::new(&url, 5, "basic").unwrap().with_api_key("bad");

        let err = tool.search("anything").await.unwrap_err();
        match err {
            CoraError::Tool(message) => {
                assert!(message.contains("401"));
                assert!(message.contains("invalid API key"));
            }
            other => panic!("expected tool error, got {:?}", other),
        }
    }

    #[test]
    fn test_response_parsing_tolerates_extra_fields() {
        let body: SearchResponse = serde_json::from_value(json!({
            "query": "rust",
            "response_time": 0.4,
            "results": [
                {"title": "Rust", "url": "https://www.rust-lang.org", "content": "A language", "score": 0.98, "raw_content": null}
            ]
        }))
        .unwrap();

        assert_eq!(body.results.len(), 1);
        assert_eq!(body.results[0].score, Some(0.98));
    }

    #[tokio::test]
    async fn test_call_requires_query() {
        let tool = TavilySearch::new("http://127.0.0.1:9/search", 5, "basic")
            .unwrap()
            .with_api_key("test");
        let err = tool.call(&json!({"q": "nope"})).await.unwrap_err();
        assert!(matches!(err, CoraError::Tool(_)));
    }

    #[tokio::test]
    async fn test_missing_key_is_config_error() {
        let mut tool = TavilySearch::new("http://127.0.0.1:9/search", 5, "basic").unwrap();
        tool.api_key = None;
        let err = tool.search("rust").await.unwrap_err();
        assert!(matches!(err, CoraError::Config(_)));
    }
}
