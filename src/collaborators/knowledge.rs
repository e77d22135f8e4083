//! Knowledge-base search over a Qdrant collection
//!
//! The query is embedded through an OpenAI-compatible `/embeddings` endpoint
//! (LM Studio by default), L2-normalized to match how the vault was indexed,
//! and sent to Qdrant's point search.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{http_client, unavailable, KnowledgeBase};
use crate::config::KnowledgeBaseConfig;
use crate::error::{GatewayError, Result};
use crate::types::{rank_hits, KnowledgeHit};

pub struct QdrantKnowledgeBase {
    client: reqwest::Client,
    config: KnowledgeBaseConfig,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<ScoredPoint>,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    score: f32,
    #[serde(default)]
    payload: ChunkPayload,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    source: String,
    #[serde(default)]
    chunk_index: u32,
    #[serde(default)]
    text: String,
}

impl QdrantKnowledgeBase {
    pub fn new(config: KnowledgeBaseConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config.timeout)?,
            config,
        })
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let url = format!(
            "{}/embeddings",
            self.config.embedding_base_url.trim_end_matches('/')
        );
        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.embedding_api_key),
            )
            .json(&json!({
                "input": [query],
                "model": self.config.embedding_model,
            }))
            .send()
            .await
            .map_err(|e| unavailable("Embedding", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::CollaboratorUnavailable(format!(
                "Embedding API error {}: {}",
                status, text
            )));
        }

        let data: Value = response.json().await.map_err(|e| unavailable("Embedding", e))?;
        let embedding: Vec<f32> = data["data"][0]["embedding"]
            .as_array()
            .ok_or_else(|| {
                GatewayError::CollaboratorUnavailable(
                    "Embedding API returned no embedding".to_string(),
                )
            })?
            .iter()
            .filter_map(|v| v.as_f64().map(|f| f as f32))
            .collect();

        Ok(l2_normalize(embedding))
    }
}

/// Scale a vector to unit length; the zero vector is returned unchanged
pub fn l2_normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
    vector
}

/// Qdrant search body, with a `tags` match-any filter when tags are given
fn search_body(vector: &[f32], limit: usize, tags: Option<&[String]>) -> Value {
    let mut body = json!({
        "vector": vector,
        "limit": limit,
        "with_payload": true,
    });
    if let Some(tags) = tags.filter(|t| !t.is_empty()) {
        body["filter"] = json!({
            "must": [{"key": "tags", "match": {"any": tags}}]
        });
    }
    body
}

#[async_trait]
impl KnowledgeBase for QdrantKnowledgeBase {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        tags: Option<&[String]>,
    ) -> Result<Vec<KnowledgeHit>> {
        let vector = self.embed_query(query).await?;

        let url = format!(
            "{}/collections/{}/points/search",
            self.config.qdrant_url.trim_end_matches('/'),
            self.config.collection
        );
        let mut request = self.client.post(&url).json(&search_body(&vector, limit, tags));
        if let Some(key) = &self.config.qdrant_api_key {
            request = request.header("api-key", key);
        }

        let response = request.send().await.map_err(|e| unavailable("Qdrant", e))?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::CollaboratorUnavailable(format!(
                "Qdrant search error {}: {}",
                status, text
            )));
        }

        let parsed: SearchResponse = response.json().await.map_err(|e| unavailable("Qdrant", e))?;
        let mut hits: Vec<KnowledgeHit> = parsed
            .result
            .into_iter()
            .map(|point| KnowledgeHit {
                score: point.score,
                source_path: point.payload.source,
                chunk_index: point.payload.chunk_index,
                text: point.payload.text,
            })
            .collect();
        rank_hits(&mut hits);
        hits.truncate(limit);

        tracing::debug!("Knowledge base returned {} hits for {:?}", hits.len(), query);
        Ok(hits)
    }
}
