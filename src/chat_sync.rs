use std::collections::HashSet;

use chrono::Utc;
use log::debug;
use uuid::Uuid;

use crate::entity_store::EntityStore;
use crate::error::{AppError, Result};
use crate::models::{ChatGroup, ParticipantEntry, Project};

/// Creates the single chat group derived from a freshly created project:
/// participants are the team roster with roles mapped, visibility private,
/// creator = project creator.
pub async fn create_project_chat_group<S: EntityStore>(
    store: &S,
    tx: &mut S::Tx,
    project: &Project,
) -> Result<ChatGroup> {
    let group = ChatGroup {
        chat_group_id: Uuid::new_v4().to_string(),
        name: format!("Project: {}", project.name),
        description: Some(format!("Chat group for project {}", project.name)),
        organization_id: project.organization_id.clone(),
        project_id: project.project_id.clone(),
        participants: project
            .team_members
            .iter()
            .map(|m| ParticipantEntry::active(&m.user_id, m.role.participant_role(), &project.created_by))
            .collect(),
        created_by: project.created_by.clone(),
        is_public: false,
        created_at: Utc::now(),
    };
    store.insert_chat_group(tx, &group).await?;
    Ok(group)
}

/// Reconciles a project's chat-group participant list with its current team
/// roster inside an open atomic unit.
///
/// Full set-diff, not an incremental patch: roster members missing from the
/// group are appended (role mapped, invited by the project creator),
/// participants no longer on the roster are dropped. Correct no matter how
/// many roster changes accumulated, and idempotent: a second run with an
/// unchanged roster writes nothing.
///
/// Returns `None` when the project has no chat group (legacy data).
pub async fn sync_chat_group<S: EntityStore>(
    store: &S,
    tx: &mut S::Tx,
    project_id: &str,
) -> Result<Option<ChatGroup>> {
    let Some(mut group) = store.find_chat_group_by_project(tx, project_id).await? else {
        debug!("No chat group for project {}, nothing to sync", project_id);
        return Ok(None);
    };

    let project = store
        .find_project(tx, project_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Project {} not found", project_id)))?;

    let participant_ids: HashSet<String> =
        group.participants.iter().map(|p| p.user_id.clone()).collect();
    let roster_ids: HashSet<String> =
        project.team_members.iter().map(|m| m.user_id.clone()).collect();

    let additions: Vec<ParticipantEntry> = project
        .team_members
        .iter()
        .filter(|m| !participant_ids.contains(&m.user_id))
        .map(|m| ParticipantEntry::active(&m.user_id, m.role.participant_role(), &project.created_by))
        .collect();

    let before = group.participants.len();
    group.participants.retain(|p| roster_ids.contains(&p.user_id));
    let removed = before - group.participants.len();
    let added = additions.len();
    group.participants.extend(additions);

    if added > 0 || removed > 0 {
        store
            .set_chat_participants(tx, &group.chat_group_id, &group.participants)
            .await?;
        debug!(
            "Synced chat group {} for project {}: +{} -{}",
            group.chat_group_id, project_id, added, removed
        );
    }

    Ok(Some(group))
}

pub async fn delete_project_chat_group<S: EntityStore>(
    store: &S,
    tx: &mut S::Tx,
    project_id: &str,
) -> Result<()> {
    store.delete_chat_group_by_project(tx, project_id).await
}
