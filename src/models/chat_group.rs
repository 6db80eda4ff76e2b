use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Admin,
    Member,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantEntry {
    pub user_id: String,
    pub role: ParticipantRole,
    pub invited_by: String,
    pub status: String,
}

impl ParticipantEntry {
    pub fn active(user_id: &str, role: ParticipantRole, invited_by: &str) -> Self {
        ParticipantEntry {
            user_id: user_id.to_string(),
            role,
            invited_by: invited_by.to_string(),
            status: "active".to_string(),
        }
    }
}

/// Collaboration chat group derived from a project's team roster.
/// At most one exists per project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatGroup {
    #[serde(rename = "_id")]
    pub chat_group_id: String,
    pub name: String,
    pub description: Option<String>,
    pub organization_id: String,
    pub project_id: String,
    pub participants: Vec<ParticipantEntry>,
    pub created_by: String,
    pub is_public: bool,
    pub created_at: chrono::DateTime<Utc>,
}

impl ChatGroup {
    pub fn participant_ids(&self) -> Vec<String> {
        self.participants.iter().map(|p| p.user_id.clone()).collect()
    }
}
