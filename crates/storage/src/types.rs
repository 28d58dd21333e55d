//! Wire DTOs for the Supabase Storage object API.

use serde::{Deserialize, Serialize};

/// Body of `POST /storage/v1/object/list/{bucket}`.
#[derive(Debug, Clone, Serialize)]
pub struct ListRequest {
    pub prefix: String,
    pub search: String,
    pub limit: u32,
    pub offset: u32,
}

/// Body of `DELETE /storage/v1/object/{bucket}`.
#[derive(Debug, Clone, Serialize)]
pub struct RemoveRequest {
    pub prefixes: Vec<String>,
}

/// One entry of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl ObjectInfo {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            updated_at: None,
            metadata: None,
        }
    }
}
