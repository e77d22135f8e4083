//! Web search through the Brave Search API

use async_trait::async_trait;
use serde::Deserialize;

use super::{http_client, unavailable, WebSearch};
use crate::config::WebSearchConfig;
use crate::error::{GatewayError, Result};
use crate::types::{SafeSearch, WebResult, MAX_WEB_RESULTS};

pub struct BraveWebSearch {
    client: reqwest::Client,
    config: WebSearchConfig,
}

#[derive(Debug, Default, Deserialize)]
struct BraveResponse {
    #[serde(default)]
    web: BraveResults,
}

#[derive(Debug, Default, Deserialize)]
struct BraveResults {
    #[serde(default)]
    results: Vec<WebResult>,
}

impl BraveWebSearch {
    pub fn new(config: WebSearchConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config.timeout)?,
            config,
        })
    }
}

#[async_trait]
impl WebSearch for BraveWebSearch {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        safety: SafeSearch,
    ) -> Result<Vec<WebResult>> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            GatewayError::CollaboratorUnavailable(
                "Web search is not configured (set BRAVE_API_KEY)".to_string(),
            )
        })?;
        let count = limit.clamp(1, MAX_WEB_RESULTS);

        let url = format!("{}/web/search", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .header("X-Subscription-Token", api_key)
            .query(&[
                ("q", query.to_string()),
                ("count", count.to_string()),
                ("safesearch", safety.as_str().to_string()),
            ])
            .send()
            .await
            .map_err(|e| unavailable("Web search", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::CollaboratorUnavailable(format!(
                "Web search API error {}: {}",
                status, text
            )));
        }

        let parsed: BraveResponse = response
            .json()
            .await
            .map_err(|e| unavailable("Web search", e))?;
        let mut results = parsed.web.results;
        results.truncate(count);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_api_key_is_unavailable() {
        let search = BraveWebSearch::new(WebSearchConfig::default()).unwrap();
        let err = search
            .search("rust", 5, SafeSearch::Moderate)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::CollaboratorUnavailable(_)));
    }

    #[test]
    fn test_response_parsing() {
        let parsed: BraveResponse = serde_json::from_value(serde_json::json!({
            "query": {"original": "rust"},
            "web": {"results": [
                {"title": "Rust", "url": "https://www.rust-lang.org", "description": "A language", "age": "1d"},
                {"title": "Docs", "url": "https://doc.rust-lang.org"}
            ]}
        }))
        .unwrap();
        assert_eq!(parsed.web.results.len(), 2);
        assert_eq!(parsed.web.results[1].description, "");

        let empty: BraveResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.web.results.is_empty());
    }
}
