use crate::config::MeshConfig;
use crate::error::MeshError;
use crate::payload::{
    endpoint, extract_hits, extract_stored_ids, is_error_status, parse_body, AddMemoriesRequest,
    Hit, MemoryRecord, QueryMemoriesRequest, MEMORIES_PATH, QUERY_PATH,
};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use secrecy::ExposeSecret;
use tracing::{debug, warn};

/// Async Memory Mesh client. One HTTP request per call, no retries.
#[derive(Debug, Clone)]
pub struct MeshClient {
    config: MeshConfig,
    client: Client,
}

impl MeshClient {
    /// `base_url` of `None` means [`crate::DEFAULT_BASE_URL`].
    pub fn new(api_key: impl Into<String>, base_url: Option<String>) -> Result<Self, MeshError> {
        let mut config = MeshConfig::new(api_key);
        if let Some(url) = base_url {
            config = config.with_base_url(url);
        }
        Self::from_config(config)
    }

    pub fn from_config(config: MeshConfig) -> Result<Self, MeshError> {
        let mut builder = Client::builder();
        if let Some(t) = config.timeout() {
            builder = builder.timeout(t);
        }
        let client = builder.build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &MeshConfig {
        &self.config
    }

    /// Submit records; returns whatever `stored_ids` the server reports.
    ///
    /// The id count is not checked against `memories.len()`.
    pub async fn add_memories(&self, memories: &[MemoryRecord]) -> Result<Vec<String>, MeshError> {
        let url = endpoint(self.config.base_url(), MEMORIES_PATH);
        debug!(count = memories.len(), "POST {}", MEMORIES_PATH);

        let body = serde_json::to_vec(&AddMemoriesRequest { memories })?;
        let req = self
            .client
            .post(url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body);

        let raw = self.execute(req, MEMORIES_PATH).await?;
        let ids = extract_stored_ids(raw)?;
        debug!(stored = ids.len(), "memories stored");
        Ok(ids)
    }

    pub async fn query_memories(&self, request: &QueryMemoriesRequest) -> Result<Vec<Hit>, MeshError> {
        let url = endpoint(self.config.base_url(), QUERY_PATH);
        let params = request.query_params()?;
        debug!(
            limit = request.limit,
            filtered = params.len() > 2,
            "GET {}",
            QUERY_PATH
        );

        let req = self.client.get(url).query(&params);
        let raw = self.execute(req, QUERY_PATH).await?;
        let hits = extract_hits(raw)?;
        debug!(hits = hits.len(), "query answered");
        Ok(hits)
    }

    /// Query with the default limit and no filters.
    pub async fn query(&self, query: &str) -> Result<Vec<Hit>, MeshError> {
        self.query_memories(&QueryMemoriesRequest::new(query)).await
    }

    async fn execute(&self, req: RequestBuilder, path: &str) -> Result<serde_json::Value, MeshError> {
        let resp = req
            .bearer_auth(self.config.api_key().expose_secret())
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await?;
        if is_error_status(status) {
            warn!(%status, path, "memory mesh returned error status");
            return Err(MeshError::Http { status, body: text });
        }
        parse_body(&text)
    }
}
