use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Code,
    Image,
    Document,
}

/// Metadata record for an uploaded file. Content bytes live on disk under
/// the storage root; `path` is relative to it and is never reused, the
/// generated `name` is timestamp-prefixed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(rename = "_id")]
    pub file_id: String,
    pub name: String,
    pub path: String,
    pub size: u64,
    pub extension: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub project_id: String,
    pub organization_id: String,
    pub created_by: String,
    pub is_deleted: bool,
    pub created_at: chrono::DateTime<Utc>,
}
