use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chat_sync;
use crate::emitter::{NotificationEmitter, ProjectEvent, PROJECT_EVENTS_TOPIC};
use crate::entity_store::EntityStore;
use crate::error::{AppError, Result};
use crate::file_ingest::{self, FileStorage, FileUpload};
use crate::models::{ChatGroup, Project, ProjectStatus, TeamMemberEntry, TeamRole};

#[derive(Debug, Clone, Deserialize)]
pub struct TeamMemberInput {
    pub user_id: String,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectInput {
    pub name: String,
    pub description: Option<String>,
    pub organization_id: String,
    #[serde(default)]
    pub team_members: Vec<TeamMemberInput>,
    #[serde(default)]
    pub files: Vec<FileUpload>,
}

#[derive(Debug, Serialize)]
pub struct CreatedProject {
    pub project: Project,
    pub chat_group: ChatGroup,
}

#[derive(Debug, Serialize)]
pub struct BatchAddOutcome {
    pub added: Vec<String>,
    pub skipped: Vec<String>,
    pub project: Project,
}

/// Orchestrates every multi-entity write: project creation and deletion plus
/// all roster mutations. Each operation runs as one atomic unit (roster and
/// project mutation first, then user back-references, then chat-group
/// reconciliation) and either commits everything or leaves no trace.
/// Notifications go out strictly after commit and are best-effort.
pub struct ProjectLifecycle<S: EntityStore> {
    store: Arc<S>,
    storage: Arc<dyn FileStorage>,
    emitter: Arc<dyn NotificationEmitter>,
}

impl<S: EntityStore> ProjectLifecycle<S> {
    pub fn new(
        store: Arc<S>,
        storage: Arc<dyn FileStorage>,
        emitter: Arc<dyn NotificationEmitter>,
    ) -> Self {
        ProjectLifecycle { store, storage, emitter }
    }

    pub async fn create_project(
        &self,
        creator: &str,
        input: CreateProjectInput,
    ) -> Result<CreatedProject> {
        if input.name.trim().is_empty() {
            return Err(AppError::Validation("Project name is required".to_string()));
        }
        // Reject bad uploads before any write happens.
        for upload in &input.files {
            if upload.name.trim().is_empty() {
                return Err(AppError::Validation(
                    "Every uploaded file needs a name".to_string(),
                ));
            }
            if upload.content.is_empty() {
                return Err(AppError::Validation(format!(
                    "Uploaded file {} has no content",
                    upload.name
                )));
            }
        }

        let mut tx = self.store.begin().await?;
        let mut written_paths: Vec<String> = Vec::new();
        let result = self
            .create_project_in_tx(&mut tx, creator, &input, &mut written_paths)
            .await;

        match result {
            Ok(created) => match self.store.commit(&mut tx).await {
                Ok(()) => {
                    for member in &created.project.team_members {
                        self.emitter.publish(
                            PROJECT_EVENTS_TOPIC,
                            ProjectEvent::UserAdded {
                                project_id: created.project.project_id.clone(),
                                user_id: member.user_id.clone(),
                            },
                        );
                    }
                    info!(
                        "Created project {} with {} members and {} files",
                        created.project.project_id,
                        created.project.team_members.len(),
                        created.project.files.len()
                    );
                    Ok(created)
                }
                Err(e) => {
                    file_ingest::remove_artifacts(self.storage.as_ref(), &written_paths);
                    Err(e)
                }
            },
            Err(e) => {
                self.rollback(&mut tx).await;
                // Disk writes are outside the store's rollback; undo them here.
                file_ingest::remove_artifacts(self.storage.as_ref(), &written_paths);
                Err(e)
            }
        }
    }

    async fn create_project_in_tx(
        &self,
        tx: &mut S::Tx,
        creator: &str,
        input: &CreateProjectInput,
        written_paths: &mut Vec<String>,
    ) -> Result<CreatedProject> {
        let project_id = Uuid::new_v4().to_string();

        let mut file_ids = Vec::new();
        for upload in &input.files {
            let record = file_ingest::ingest(
                self.store.as_ref(),
                tx,
                self.storage.as_ref(),
                creator,
                upload,
                &project_id,
                &input.organization_id,
            )
            .await?;
            written_paths.push(record.path.clone());
            file_ids.push(record.file_id);
        }

        // Roster user ids must be unique; the first entry wins.
        let mut roster: Vec<TeamMemberEntry> = Vec::new();
        for member in &input.team_members {
            if roster.iter().any(|e| e.user_id == member.user_id) {
                continue;
            }
            roster.push(TeamMemberEntry::new(
                &member.user_id,
                TeamRole::parse_or_default(member.role.as_deref()),
                creator,
            ));
        }

        let now = Utc::now();
        let project = Project {
            project_id,
            name: input.name.trim().to_string(),
            description: input.description.clone(),
            status: ProjectStatus::Active,
            organization_id: input.organization_id.clone(),
            created_by: creator.to_string(),
            team_members: roster,
            files: file_ids,
            tasks: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.store.insert_project(tx, &project).await?;

        let chat_group = chat_sync::create_project_chat_group(self.store.as_ref(), tx, &project).await?;

        for member in &project.team_members {
            self.store
                .add_user_back_refs(
                    tx,
                    &member.user_id,
                    Some(&project.project_id),
                    Some(&chat_group.chat_group_id),
                )
                .await?;
        }

        Ok(CreatedProject { project, chat_group })
    }

    pub async fn delete_project(&self, project_id: &str) -> Result<()> {
        let mut tx = self.store.begin().await?;
        match self.delete_project_in_tx(&mut tx, project_id).await {
            Ok(artifact_paths) => {
                self.store.commit(&mut tx).await?;
                // On-disk cleanup is best-effort and never blocks deletion.
                file_ingest::remove_artifacts(self.storage.as_ref(), &artifact_paths);
                info!("Deleted project {}", project_id);
                Ok(())
            }
            Err(e) => {
                self.rollback(&mut tx).await;
                Err(e)
            }
        }
    }

    async fn delete_project_in_tx(&self, tx: &mut S::Tx, project_id: &str) -> Result<Vec<String>> {
        let project = self
            .store
            .find_project(tx, project_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Project {} not found", project_id)))?;

        let files = self.store.find_files_by_project(tx, project_id).await?;
        let chat_group = self.store.find_chat_group_by_project(tx, project_id).await?;
        let chat_group_id = chat_group.map(|g| g.chat_group_id);

        if chat_group_id.is_some() {
            chat_sync::delete_project_chat_group(self.store.as_ref(), tx, project_id).await?;
        }

        for member in &project.team_members {
            self.store
                .pull_user_back_refs(
                    tx,
                    &member.user_id,
                    Some(project_id),
                    chat_group_id.as_deref(),
                )
                .await?;
        }

        self.store.delete_files_by_project(tx, project_id).await?;
        self.store.delete_project(tx, project_id).await?;

        Ok(files.into_iter().map(|f| f.path).collect())
    }

    /// Adds a single user to the roster. Shares the same atomic-unit
    /// contract as the batch path: roster entry, back-references, and
    /// chat-group reconciliation commit or roll back together.
    pub async fn add_user_to_project(
        &self,
        project_id: &str,
        user_id: &str,
        role: Option<&str>,
        added_by: &str,
    ) -> Result<Project> {
        let mut tx = self.store.begin().await?;
        match self
            .add_user_in_tx(&mut tx, project_id, user_id, role, added_by)
            .await
        {
            Ok(project) => {
                self.store.commit(&mut tx).await?;
                self.emitter.publish(
                    PROJECT_EVENTS_TOPIC,
                    ProjectEvent::UserAdded {
                        project_id: project_id.to_string(),
                        user_id: user_id.to_string(),
                    },
                );
                Ok(project)
            }
            Err(e) => {
                self.rollback(&mut tx).await;
                Err(e)
            }
        }
    }

    async fn add_user_in_tx(
        &self,
        tx: &mut S::Tx,
        project_id: &str,
        user_id: &str,
        role: Option<&str>,
        added_by: &str,
    ) -> Result<Project> {
        let project = self
            .store
            .find_project(tx, project_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Project {} not found", project_id)))?;
        if project.has_member(user_id) {
            return Err(AppError::Conflict(format!(
                "User {} is already a member of project {}",
                user_id, project_id
            )));
        }

        let entry = TeamMemberEntry::new(user_id, TeamRole::parse_or_default(role), added_by);
        self.store.push_team_member(tx, project_id, &entry).await?;

        let chat_group = self.store.find_chat_group_by_project(tx, project_id).await?;
        self.store
            .add_user_back_refs(
                tx,
                user_id,
                Some(project_id),
                chat_group.as_ref().map(|g| g.chat_group_id.as_str()),
            )
            .await?;

        chat_sync::sync_chat_group(self.store.as_ref(), tx, project_id).await?;

        self.store
            .find_project(tx, project_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Project {} not found", project_id)))
    }

    /// Batch variant: already-present users are skipped, not errors; an
    /// all-duplicate batch fails with BadRequest before any mutation.
    pub async fn add_multiple_users_to_project(
        &self,
        project_id: &str,
        users: Vec<TeamMemberInput>,
        added_by: &str,
    ) -> Result<BatchAddOutcome> {
        let mut tx = self.store.begin().await?;
        match self
            .add_multiple_in_tx(&mut tx, project_id, users, added_by)
            .await
        {
            Ok(outcome) => {
                self.store.commit(&mut tx).await?;
                for user_id in &outcome.added {
                    self.emitter.publish(
                        PROJECT_EVENTS_TOPIC,
                        ProjectEvent::UserAdded {
                            project_id: project_id.to_string(),
                            user_id: user_id.clone(),
                        },
                    );
                }
                Ok(outcome)
            }
            Err(e) => {
                self.rollback(&mut tx).await;
                Err(e)
            }
        }
    }

    async fn add_multiple_in_tx(
        &self,
        tx: &mut S::Tx,
        project_id: &str,
        users: Vec<TeamMemberInput>,
        added_by: &str,
    ) -> Result<BatchAddOutcome> {
        let project = self
            .store
            .find_project(tx, project_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Project {} not found", project_id)))?;

        let mut present: HashSet<String> = project.member_ids().into_iter().collect();
        let mut new_members: Vec<TeamMemberInput> = Vec::new();
        let mut skipped: Vec<String> = Vec::new();
        for user in users {
            if present.contains(&user.user_id) {
                skipped.push(user.user_id);
            } else {
                present.insert(user.user_id.clone());
                new_members.push(user);
            }
        }

        if new_members.is_empty() {
            return Err(AppError::BadRequest(
                "All provided users are already project members".to_string(),
            ));
        }

        let mut added: Vec<String> = Vec::new();
        for member in &new_members {
            let entry = TeamMemberEntry::new(
                &member.user_id,
                TeamRole::parse_or_default(member.role.as_deref()),
                added_by,
            );
            self.store.push_team_member(tx, project_id, &entry).await?;
            added.push(member.user_id.clone());
        }

        let chat_group = self.store.find_chat_group_by_project(tx, project_id).await?;
        for user_id in &added {
            self.store
                .add_user_back_refs(
                    tx,
                    user_id,
                    Some(project_id),
                    chat_group.as_ref().map(|g| g.chat_group_id.as_str()),
                )
                .await?;
        }

        chat_sync::sync_chat_group(self.store.as_ref(), tx, project_id).await?;

        let project = self
            .store
            .find_project(tx, project_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Project {} not found", project_id)))?;
        Ok(BatchAddOutcome { added, skipped, project })
    }

    pub async fn remove_user_from_project(
        &self,
        project_id: &str,
        user_id: &str,
    ) -> Result<Project> {
        let mut tx = self.store.begin().await?;
        match self.remove_user_in_tx(&mut tx, project_id, user_id).await {
            Ok(project) => {
                self.store.commit(&mut tx).await?;
                self.emitter.publish(
                    PROJECT_EVENTS_TOPIC,
                    ProjectEvent::UserRemoved {
                        project_id: project_id.to_string(),
                        user_id: user_id.to_string(),
                    },
                );
                Ok(project)
            }
            Err(e) => {
                self.rollback(&mut tx).await;
                Err(e)
            }
        }
    }

    async fn remove_user_in_tx(
        &self,
        tx: &mut S::Tx,
        project_id: &str,
        user_id: &str,
    ) -> Result<Project> {
        let project = self
            .store
            .find_project(tx, project_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Project {} not found", project_id)))?;
        if !project.has_member(user_id) {
            return Err(AppError::NotFound(format!(
                "User {} is not a member of project {}",
                user_id, project_id
            )));
        }

        self.store.pull_team_member(tx, project_id, user_id).await?;

        let chat_group = self.store.find_chat_group_by_project(tx, project_id).await?;
        self.store
            .pull_user_back_refs(
                tx,
                user_id,
                Some(project_id),
                chat_group.as_ref().map(|g| g.chat_group_id.as_str()),
            )
            .await?;

        chat_sync::sync_chat_group(self.store.as_ref(), tx, project_id).await?;

        self.store
            .find_project(tx, project_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Project {} not found", project_id)))
    }

    async fn rollback(&self, tx: &mut S::Tx) {
        if let Err(e) = self.store.abort(tx).await {
            warn!("Transaction rollback failed: {}", e);
        }
    }
}
