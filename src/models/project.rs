use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::chat_group::ParticipantRole;

/// Role of a user within a project team. Parsed from loose request strings
/// with default-substitution so an absent or unrecognized role never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TeamRole {
    Admin,
    #[serde(rename = "Project Manager")]
    ProjectManager,
    #[serde(rename = "Team Member")]
    TeamMember,
    #[default]
    Developer,
}

impl TeamRole {
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("Admin") => TeamRole::Admin,
            Some("Project Manager") => TeamRole::ProjectManager,
            Some("Team Member") => TeamRole::TeamMember,
            _ => TeamRole::Developer,
        }
    }

    /// Mapping used when deriving chat-group participants from the roster.
    pub fn participant_role(self) -> ParticipantRole {
        match self {
            TeamRole::Admin => ParticipantRole::Admin,
            _ => ParticipantRole::Member,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Active,
    Archived,
    Completed,
}

/// One entry of a project's team roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMemberEntry {
    pub user_id: String,
    pub role: TeamRole,
    pub added_by: String,
    pub status: String,
}

impl TeamMemberEntry {
    pub fn new(user_id: &str, role: TeamRole, added_by: &str) -> Self {
        TeamMemberEntry {
            user_id: user_id.to_string(),
            role,
            added_by: added_by.to_string(),
            status: "active".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    #[serde(rename = "_id")]
    pub project_id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub organization_id: String,
    pub created_by: String,
    pub team_members: Vec<TeamMemberEntry>,
    pub files: Vec<String>,
    pub tasks: Vec<String>,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

impl Project {
    pub fn has_member(&self, user_id: &str) -> bool {
        self.team_members.iter().any(|m| m.user_id == user_id)
    }

    pub fn member_ids(&self) -> Vec<String> {
        self.team_members.iter().map(|m| m.user_id.clone()).collect()
    }
}
