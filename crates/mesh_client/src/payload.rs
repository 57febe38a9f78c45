use crate::error::MeshError;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};

// Memory Mesh API:
// POST /api/v1/mesh/memories         { memories: [..] }        -> { stored_ids?: [..] }
// GET  /api/v1/mesh/memories/query   ?q=&limit=&filters=<json> -> { hits?: [..] }

/// Opaque record submitted for storage. No fields are required client-side.
pub type MemoryRecord = Map<String, Value>;
/// Server-side filter object, sent as one JSON-encoded query parameter.
pub type Filters = Map<String, Value>;
/// Opaque query result.
pub type Hit = Map<String, Value>;

pub const DEFAULT_QUERY_LIMIT: u32 = 10;

pub(crate) const MEMORIES_PATH: &str = "/api/v1/mesh/memories";
pub(crate) const QUERY_PATH: &str = "/api/v1/mesh/memories/query";

#[derive(Debug, Clone, Serialize)]
pub struct AddMemoriesRequest<'a> {
    pub memories: &'a [MemoryRecord],
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryMemoriesRequest {
    pub query: String,
    /// Advisory; enforced by the server only.
    pub limit: u32,
    pub filters: Option<Filters>,
}

impl QueryMemoriesRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: DEFAULT_QUERY_LIMIT,
            filters: None,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_filters(mut self, filters: Filters) -> Self {
        self.filters = Some(filters);
        self
    }

    /// `q`, `limit`, and `filters` only when non-empty.
    ///
    /// `filters` is JSON-encoded first and the resulting string becomes a single
    /// parameter value, so it is URL-encoded a second time on the wire. The
    /// server expects exactly this shape.
    pub(crate) fn query_params(&self) -> Result<Vec<(&'static str, String)>, MeshError> {
        let mut params = vec![("q", self.query.clone()), ("limit", self.limit.to_string())];
        if let Some(f) = self.filters.as_ref().filter(|f| !f.is_empty()) {
            params.push(("filters", serde_json::to_string(f)?));
        }
        Ok(params)
    }
}

pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

pub(crate) fn is_error_status(status: StatusCode) -> bool {
    status.is_client_error() || status.is_server_error()
}

pub(crate) fn parse_body(body: &str) -> Result<Value, MeshError> {
    Ok(serde_json::from_str(body)?)
}

/// `stored_ids` from an add response. Absent or null yields empty.
/// Non-string ids are coerced to their compact JSON text.
pub(crate) fn extract_stored_ids(raw: Value) -> Result<Vec<String>, MeshError> {
    let ids = take_array(raw, "stored_ids")?.unwrap_or_default();
    Ok(ids
        .into_iter()
        .map(|v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .collect())
}

/// `hits` from a query response, in server order. Absent or null yields empty.
pub(crate) fn extract_hits(raw: Value) -> Result<Vec<Hit>, MeshError> {
    let items = take_array(raw, "hits")?.unwrap_or_default();
    items
        .into_iter()
        .enumerate()
        .map(|(i, v)| match v {
            Value::Object(o) => Ok(o),
            other => Err(MeshError::InvalidResponse(format!(
                "hits[{i}] is {}, expected an object",
                json_kind(&other)
            ))),
        })
        .collect()
}

fn take_array(raw: Value, field: &str) -> Result<Option<Vec<Value>>, MeshError> {
    let mut obj = match raw {
        Value::Object(o) => o,
        other => {
            return Err(MeshError::InvalidResponse(format!(
                "response body is {}, expected an object",
                json_kind(&other)
            )))
        }
    };
    match obj.remove(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(a)) => Ok(Some(a)),
        Some(other) => Err(MeshError::InvalidResponse(format!(
            "`{field}` is {}, expected an array",
            json_kind(&other)
        ))),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
