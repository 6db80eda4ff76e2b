//! Shared test doubles: an in-memory entity store with staged, all-or-nothing
//! transactions, a recording notification emitter, and an in-memory file
//! storage that can be told to fail.

// Each test binary uses a different subset of the helpers.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use projecthub::emitter::{NotificationEmitter, ProjectEvent};
use projecthub::entity_store::EntityStore;
use projecthub::error::{AppError, Result};
use projecthub::file_ingest::FileStorage;
use projecthub::models::{ChatGroup, FileRecord, ParticipantEntry, Project, TeamMemberEntry, User};
use projecthub::project_lifecycle::ProjectLifecycle;

#[derive(Debug, Clone, Default)]
pub struct Collections {
    pub projects: HashMap<String, Project>,
    pub users: HashMap<String, User>,
    pub chat_groups: HashMap<String, ChatGroup>,
    pub files: HashMap<String, FileRecord>,
}

/// Staged transaction: all writes go to a clone of the committed state;
/// commit swaps the clone in, abort simply drops it.
pub struct MemTx {
    staged: Collections,
}

#[derive(Default)]
pub struct MemStore {
    committed: Mutex<Collections>,
    pub participant_writes: AtomicUsize,
}

impl MemStore {
    pub fn seed_user(&self, user_id: &str) {
        let user = User {
            user_id: user_id.to_string(),
            username: format!("user-{}", user_id),
            email: format!("{}@example.com", user_id),
            password: "hash".to_string(),
            organization_id: Some("org-1".to_string()),
            projects: Vec::new(),
            chat_groups: Vec::new(),
        };
        self.committed.lock().unwrap().users.insert(user.user_id.clone(), user);
    }

    pub fn get_user(&self, user_id: &str) -> Option<User> {
        self.committed.lock().unwrap().users.get(user_id).cloned()
    }

    pub fn get_project(&self, project_id: &str) -> Option<Project> {
        self.committed.lock().unwrap().projects.get(project_id).cloned()
    }

    pub fn chat_group_for(&self, project_id: &str) -> Option<ChatGroup> {
        self.committed
            .lock()
            .unwrap()
            .chat_groups
            .values()
            .find(|g| g.project_id == project_id)
            .cloned()
    }

    pub fn chat_group_count(&self, project_id: &str) -> usize {
        self.committed
            .lock()
            .unwrap()
            .chat_groups
            .values()
            .filter(|g| g.project_id == project_id)
            .count()
    }

    pub fn project_count(&self) -> usize {
        self.committed.lock().unwrap().projects.len()
    }

    pub fn file_count(&self) -> usize {
        self.committed.lock().unwrap().files.len()
    }
}

#[async_trait]
impl EntityStore for MemStore {
    type Tx = MemTx;

    async fn begin(&self) -> Result<MemTx> {
        Ok(MemTx { staged: self.committed.lock().unwrap().clone() })
    }

    async fn commit(&self, tx: &mut MemTx) -> Result<()> {
        *self.committed.lock().unwrap() = tx.staged.clone();
        Ok(())
    }

    async fn abort(&self, _tx: &mut MemTx) -> Result<()> {
        Ok(())
    }

    async fn find_project(&self, tx: &mut MemTx, project_id: &str) -> Result<Option<Project>> {
        Ok(tx.staged.projects.get(project_id).cloned())
    }

    async fn insert_project(&self, tx: &mut MemTx, project: &Project) -> Result<()> {
        tx.staged.projects.insert(project.project_id.clone(), project.clone());
        Ok(())
    }

    async fn push_team_member(
        &self,
        tx: &mut MemTx,
        project_id: &str,
        entry: &TeamMemberEntry,
    ) -> Result<()> {
        if let Some(project) = tx.staged.projects.get_mut(project_id) {
            project.team_members.push(entry.clone());
        }
        Ok(())
    }

    async fn pull_team_member(&self, tx: &mut MemTx, project_id: &str, user_id: &str) -> Result<()> {
        if let Some(project) = tx.staged.projects.get_mut(project_id) {
            project.team_members.retain(|m| m.user_id != user_id);
        }
        Ok(())
    }

    async fn delete_project(&self, tx: &mut MemTx, project_id: &str) -> Result<()> {
        tx.staged.projects.remove(project_id);
        Ok(())
    }

    async fn add_user_back_refs(
        &self,
        tx: &mut MemTx,
        user_id: &str,
        project_id: Option<&str>,
        chat_group_id: Option<&str>,
    ) -> Result<()> {
        if let Some(user) = tx.staged.users.get_mut(user_id) {
            if let Some(pid) = project_id {
                if !user.projects.iter().any(|p| p == pid) {
                    user.projects.push(pid.to_string());
                }
            }
            if let Some(cid) = chat_group_id {
                if !user.chat_groups.iter().any(|c| c == cid) {
                    user.chat_groups.push(cid.to_string());
                }
            }
        }
        Ok(())
    }

    async fn pull_user_back_refs(
        &self,
        tx: &mut MemTx,
        user_id: &str,
        project_id: Option<&str>,
        chat_group_id: Option<&str>,
    ) -> Result<()> {
        if let Some(user) = tx.staged.users.get_mut(user_id) {
            if let Some(pid) = project_id {
                user.projects.retain(|p| p != pid);
            }
            if let Some(cid) = chat_group_id {
                user.chat_groups.retain(|c| c != cid);
            }
        }
        Ok(())
    }

    async fn find_chat_group_by_project(
        &self,
        tx: &mut MemTx,
        project_id: &str,
    ) -> Result<Option<ChatGroup>> {
        Ok(tx
            .staged
            .chat_groups
            .values()
            .find(|g| g.project_id == project_id)
            .cloned())
    }

    async fn insert_chat_group(&self, tx: &mut MemTx, group: &ChatGroup) -> Result<()> {
        tx.staged.chat_groups.insert(group.chat_group_id.clone(), group.clone());
        Ok(())
    }

    async fn set_chat_participants(
        &self,
        tx: &mut MemTx,
        chat_group_id: &str,
        participants: &[ParticipantEntry],
    ) -> Result<()> {
        self.participant_writes.fetch_add(1, Ordering::SeqCst);
        if let Some(group) = tx.staged.chat_groups.get_mut(chat_group_id) {
            group.participants = participants.to_vec();
        }
        Ok(())
    }

    async fn delete_chat_group_by_project(&self, tx: &mut MemTx, project_id: &str) -> Result<()> {
        tx.staged.chat_groups.retain(|_, g| g.project_id != project_id);
        Ok(())
    }

    async fn insert_file(&self, tx: &mut MemTx, file: &FileRecord) -> Result<()> {
        tx.staged.files.insert(file.file_id.clone(), file.clone());
        Ok(())
    }

    async fn find_files_by_project(
        &self,
        tx: &mut MemTx,
        project_id: &str,
    ) -> Result<Vec<FileRecord>> {
        Ok(tx
            .staged
            .files
            .values()
            .filter(|f| f.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn delete_files_by_project(&self, tx: &mut MemTx, project_id: &str) -> Result<()> {
        tx.staged.files.retain(|_, f| f.project_id != project_id);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingEmitter {
    events: Mutex<Vec<(String, ProjectEvent)>>,
}

impl RecordingEmitter {
    pub fn take(&self) -> Vec<(String, ProjectEvent)> {
        std::mem::take(&mut self.events.lock().unwrap())
    }
}

impl NotificationEmitter for RecordingEmitter {
    fn publish(&self, topic: &str, event: ProjectEvent) {
        self.events.lock().unwrap().push((topic.to_string(), event));
    }
}

#[derive(Default)]
pub struct MemStorage {
    files: Mutex<HashMap<String, Vec<u8>>>,
    fail_on_suffix: Mutex<Option<String>>,
}

impl MemStorage {
    pub fn fail_writes_ending_with(&self, suffix: &str) {
        *self.fail_on_suffix.lock().unwrap() = Some(suffix.to_string());
    }

    pub fn stored_paths(&self) -> Vec<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }
}

impl FileStorage for MemStorage {
    fn write(&self, path: &str, bytes: &[u8]) -> Result<u64> {
        if let Some(suffix) = self.fail_on_suffix.lock().unwrap().as_deref() {
            if path.ends_with(suffix) {
                return Err(AppError::Storage(format!("write refused for {}", path)));
            }
        }
        self.files.lock().unwrap().insert(path.to_string(), bytes.to_vec());
        Ok(bytes.len() as u64)
    }

    fn delete(&self, path: &str) -> Result<()> {
        self.files
            .lock()
            .unwrap()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| AppError::Storage(format!("no such file {}", path)))
    }

    fn rename(&self, old_path: &str, new_path: &str) -> Result<()> {
        let mut files = self.files.lock().unwrap();
        let bytes = files
            .remove(old_path)
            .ok_or_else(|| AppError::Storage(format!("no such file {}", old_path)))?;
        files.insert(new_path.to_string(), bytes);
        Ok(())
    }
}

pub struct Harness {
    pub store: Arc<MemStore>,
    pub storage: Arc<MemStorage>,
    pub emitter: Arc<RecordingEmitter>,
    pub lifecycle: ProjectLifecycle<MemStore>,
}

pub fn harness() -> Harness {
    let store = Arc::new(MemStore::default());
    let storage = Arc::new(MemStorage::default());
    let emitter = Arc::new(RecordingEmitter::default());
    let lifecycle = ProjectLifecycle::new(store.clone(), storage.clone(), emitter.clone());
    Harness { store, storage, emitter, lifecycle }
}
