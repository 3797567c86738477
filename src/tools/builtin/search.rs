//! Web search tool backed by a stub API.
//!
//! The backend returns canned results derived from the query. It exists to
//! exercise the search interface shape (validation, domain filtering, limit,
//! timeout) without any real network integration.

use std::time::Duration;

use async_trait::async_trait;

use crate::models::{SearchHit, SearchQuery, SearchResponse};
use crate::tools::tool::{parse_params, Tool, ToolError, ToolOutput};
use crate::validate::validate_search;

/// Stub search backend. Replace with a real API client for production use.
#[derive(Debug, Default)]
pub struct MockSearchApi;

impl MockSearchApi {
    pub fn new() -> Self {
        Self
    }

    /// Produce canned hits for a query, filtered and truncated.
    pub async fn search(&self, query: &SearchQuery) -> Vec<SearchHit> {
        let text = query.text.trim();
        let mut hits = vec![
            SearchHit {
                title: format!("Example Result for '{text}'"),
                url: "https://example.com/result1".to_string(),
                snippet: format!("Mock search result demonstrating the pattern for '{text}'."),
                domain: "example.com".to_string(),
                relevance_score: Some(0.95),
            },
            SearchHit {
                title: format!("Tutorial: {text}"),
                url: "https://docs.example.com/tutorial".to_string(),
                snippet: format!("Learn about {text} in this tutorial. Example content."),
                domain: "docs.example.com".to_string(),
                relevance_score: Some(0.87),
            },
            SearchHit {
                title: format!("Best Practices for {text}"),
                url: "https://blog.example.com/best-practices".to_string(),
                snippet: format!("Guidelines for {text}. Mock content."),
                domain: "blog.example.com".to_string(),
                relevance_score: Some(0.82),
            },
        ];

        if !query.domains.is_empty() {
            let filters: Vec<String> = query.domains.iter().map(|d| d.to_lowercase()).collect();
            hits.retain(|hit| filters.iter().any(|f| hit.domain.contains(f)));
        }

        hits.truncate(query.limit as usize);
        hits
    }

    pub fn health_check(&self) -> bool {
        true
    }
}

/// Web search tool wrapping the stub backend.
pub struct SearchTool {
    api: MockSearchApi,
    timeout: Duration,
}

impl SearchTool {
    pub fn new(timeout: Duration) -> Self {
        Self {
            api: MockSearchApi::new(),
            timeout,
        }
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search_web"
    }

    fn description(&self) -> &str {
        "Search the web with optional domain filtering. Stub backend returning \
         canned results; for demonstrating the search interface shape."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "minLength": 1,
                    "maxLength": 1000,
                    "description": "Search query text"
                },
                "domains": {
                    "type": "array",
                    "items": { "type": "string" },
                    "maxItems": 10,
                    "description": "Optional domain filters"
                },
                "limit": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": 100,
                    "default": 10,
                    "description": "Maximum number of results"
                },
                "language": {
                    "type": "string",
                    "default": "en",
                    "description": "Search language code (2-5 characters)"
                }
            },
            "required": ["text"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let start = std::time::Instant::now();
        let mut query: SearchQuery = parse_params(params)?;

        validate_search(&query).into_result()?;
        query.domains = query.domains.iter().map(|d| d.to_lowercase()).collect();

        // The backend is the one cancellable external edge; everything else
        // completes in bounded time.
        let results = tokio::time::timeout(self.timeout, self.api.search(&query))
            .await
            .map_err(|_| ToolError::Timeout(self.timeout))?;

        tracing::info!(text = %query.text, found = results.len(), "search completed");

        let response = SearchResponse {
            query: query.text.clone(),
            total_found: results.len(),
            results,
        };
        ToolOutput::from_serialize(&response, start.elapsed())
    }

    async fn health_check(&self) -> bool {
        self.api.health_check()
    }
}
