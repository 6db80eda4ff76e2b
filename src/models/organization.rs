use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    #[serde(rename = "_id")]
    pub organization_id: String,
    pub name: String,
    pub email: Option<String>,
    pub website: Option<String>,
    pub created_at: chrono::DateTime<Utc>,
}
