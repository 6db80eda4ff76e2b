use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "_id")]
    pub message_id: String,
    pub chat_group_id: String,
    pub sender_id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub msg_type: String,
    pub attachments: Option<Vec<String>>,
    pub created_at: chrono::DateTime<Utc>,
}
