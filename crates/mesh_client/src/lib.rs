//! memory_mesh
//!
//! Client SDK for the Memory Mesh HTTP API.
//! Transport + JSON field extraction ONLY.
//! No retries. No caching. No local filtering or ranking.
//!
//! Two endpoints are wrapped:
//!   POST /api/v1/mesh/memories        -> stored_ids
//!   GET  /api/v1/mesh/memories/query  -> hits
//!
//! ```rust,no_run
//! use memory_mesh::{MeshClient, QueryMemoriesRequest};
//!
//! # async fn demo() -> Result<(), memory_mesh::MeshError> {
//! let client = MeshClient::new("mm_live_key", None)?;
//! let hits = client
//!     .query_memories(&QueryMemoriesRequest::new("standup notes").with_limit(5))
//!     .await?;
//! println!("{} hits", hits.len());
//! # Ok(())
//! # }
//! ```

pub mod blocking;
pub mod client;
pub mod config;
pub mod error;
pub mod payload;

pub use client::MeshClient;
pub use config::{MeshConfig, DEFAULT_BASE_URL, ENV_API_KEY, ENV_BASE_URL, ENV_TIMEOUT_MS};
pub use error::MeshError;
pub use payload::{
    AddMemoriesRequest, Filters, Hit, MemoryRecord, QueryMemoriesRequest, DEFAULT_QUERY_LIMIT,
};
