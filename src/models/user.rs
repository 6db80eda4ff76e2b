use serde::{Deserialize, Serialize};

/// A user account. `projects` and `chat_groups` are denormalized
/// back-references maintained by the lifecycle coordinator with
/// set semantics, never by handlers directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub organization_id: Option<String>,
    #[serde(default)]
    pub projects: Vec<String>,
    #[serde(default)]
    pub chat_groups: Vec<String>,
}
