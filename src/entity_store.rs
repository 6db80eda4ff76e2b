use async_trait::async_trait;
use chrono::Utc;
use log::info;
use mongodb::bson::{doc, to_bson};
use mongodb::{options::ClientOptions, Client, ClientSession, Collection, Database};

use crate::error::{AppError, Result};
use crate::models::{ChatGroup, FileRecord, ParticipantEntry, Project, TeamMemberEntry};

/// Persistence operations the lifecycle coordinator and the membership
/// reconciler need. Every write takes an open atomic unit (`Tx`); reads
/// taking a `Tx` observe that unit's own uncommitted writes.
///
/// The production implementation is [`MongoStore`]; tests run the same
/// coordinator code against an in-memory store with staged transactions.
#[async_trait]
pub trait EntityStore: Send + Sync {
    type Tx: Send;

    async fn begin(&self) -> Result<Self::Tx>;
    async fn commit(&self, tx: &mut Self::Tx) -> Result<()>;
    async fn abort(&self, tx: &mut Self::Tx) -> Result<()>;

    async fn find_project(&self, tx: &mut Self::Tx, project_id: &str) -> Result<Option<Project>>;
    async fn insert_project(&self, tx: &mut Self::Tx, project: &Project) -> Result<()>;
    async fn push_team_member(
        &self,
        tx: &mut Self::Tx,
        project_id: &str,
        entry: &TeamMemberEntry,
    ) -> Result<()>;
    async fn pull_team_member(
        &self,
        tx: &mut Self::Tx,
        project_id: &str,
        user_id: &str,
    ) -> Result<()>;
    async fn delete_project(&self, tx: &mut Self::Tx, project_id: &str) -> Result<()>;

    async fn add_user_back_refs(
        &self,
        tx: &mut Self::Tx,
        user_id: &str,
        project_id: Option<&str>,
        chat_group_id: Option<&str>,
    ) -> Result<()>;
    async fn pull_user_back_refs(
        &self,
        tx: &mut Self::Tx,
        user_id: &str,
        project_id: Option<&str>,
        chat_group_id: Option<&str>,
    ) -> Result<()>;

    async fn find_chat_group_by_project(
        &self,
        tx: &mut Self::Tx,
        project_id: &str,
    ) -> Result<Option<ChatGroup>>;
    async fn insert_chat_group(&self, tx: &mut Self::Tx, group: &ChatGroup) -> Result<()>;
    async fn set_chat_participants(
        &self,
        tx: &mut Self::Tx,
        chat_group_id: &str,
        participants: &[ParticipantEntry],
    ) -> Result<()>;
    async fn delete_chat_group_by_project(
        &self,
        tx: &mut Self::Tx,
        project_id: &str,
    ) -> Result<()>;

    async fn insert_file(&self, tx: &mut Self::Tx, file: &FileRecord) -> Result<()>;
    async fn find_files_by_project(
        &self,
        tx: &mut Self::Tx,
        project_id: &str,
    ) -> Result<Vec<FileRecord>>;
    async fn delete_files_by_project(&self, tx: &mut Self::Tx, project_id: &str) -> Result<()>;
}

pub struct MongoStore {
    pub client: Client,
    pub db: Database,
}

impl MongoStore {
    /// Explicit connection lifecycle: construct at startup, pass around as
    /// an injected dependency, shut down on exit.
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self> {
        let options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(options)?;
        let db = client.database(db_name);
        info!("Connected to MongoDB database {}", db_name);
        Ok(MongoStore { client, db })
    }

    pub async fn shutdown(self) {
        self.client.shutdown().await;
        info!("MongoDB connection closed");
    }

    pub fn projects(&self) -> Collection<Project> {
        self.db.collection("projects")
    }

    pub fn users(&self) -> Collection<crate::models::User> {
        self.db.collection("users")
    }

    pub fn chat_groups(&self) -> Collection<ChatGroup> {
        self.db.collection("chat_groups")
    }

    pub fn files(&self) -> Collection<FileRecord> {
        self.db.collection("files")
    }
}

#[async_trait]
impl EntityStore for MongoStore {
    type Tx = ClientSession;

    async fn begin(&self) -> Result<ClientSession> {
        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;
        Ok(session)
    }

    async fn commit(&self, tx: &mut ClientSession) -> Result<()> {
        tx.commit_transaction()
            .await
            .map_err(|e| AppError::TransactionAbort(e.to_string()))
    }

    async fn abort(&self, tx: &mut ClientSession) -> Result<()> {
        tx.abort_transaction().await?;
        Ok(())
    }

    async fn find_project(&self, tx: &mut ClientSession, project_id: &str) -> Result<Option<Project>> {
        Ok(self
            .projects()
            .find_one(doc! { "_id": project_id })
            .session(&mut *tx)
            .await?)
    }

    async fn insert_project(&self, tx: &mut ClientSession, project: &Project) -> Result<()> {
        self.projects().insert_one(project).session(&mut *tx).await?;
        Ok(())
    }

    async fn push_team_member(
        &self,
        tx: &mut ClientSession,
        project_id: &str,
        entry: &TeamMemberEntry,
    ) -> Result<()> {
        self.projects()
            .update_one(
                doc! { "_id": project_id },
                doc! {
                    "$push": { "team_members": to_bson(entry)? },
                    "$set": { "updated_at": to_bson(&Utc::now())? },
                },
            )
            .session(&mut *tx)
            .await?;
        Ok(())
    }

    async fn pull_team_member(
        &self,
        tx: &mut ClientSession,
        project_id: &str,
        user_id: &str,
    ) -> Result<()> {
        self.projects()
            .update_one(
                doc! { "_id": project_id },
                doc! {
                    "$pull": { "team_members": { "user_id": user_id } },
                    "$set": { "updated_at": to_bson(&Utc::now())? },
                },
            )
            .session(&mut *tx)
            .await?;
        Ok(())
    }

    async fn delete_project(&self, tx: &mut ClientSession, project_id: &str) -> Result<()> {
        self.projects()
            .delete_one(doc! { "_id": project_id })
            .session(&mut *tx)
            .await?;
        Ok(())
    }

    async fn add_user_back_refs(
        &self,
        tx: &mut ClientSession,
        user_id: &str,
        project_id: Option<&str>,
        chat_group_id: Option<&str>,
    ) -> Result<()> {
        let mut refs = doc! {};
        if let Some(pid) = project_id {
            refs.insert("projects", pid);
        }
        if let Some(cid) = chat_group_id {
            refs.insert("chat_groups", cid);
        }
        if refs.is_empty() {
            return Ok(());
        }
        self.users()
            .update_one(doc! { "_id": user_id }, doc! { "$addToSet": refs })
            .session(&mut *tx)
            .await?;
        Ok(())
    }

    async fn pull_user_back_refs(
        &self,
        tx: &mut ClientSession,
        user_id: &str,
        project_id: Option<&str>,
        chat_group_id: Option<&str>,
    ) -> Result<()> {
        let mut refs = doc! {};
        if let Some(pid) = project_id {
            refs.insert("projects", pid);
        }
        if let Some(cid) = chat_group_id {
            refs.insert("chat_groups", cid);
        }
        if refs.is_empty() {
            return Ok(());
        }
        self.users()
            .update_one(doc! { "_id": user_id }, doc! { "$pull": refs })
            .session(&mut *tx)
            .await?;
        Ok(())
    }

    async fn find_chat_group_by_project(
        &self,
        tx: &mut ClientSession,
        project_id: &str,
    ) -> Result<Option<ChatGroup>> {
        Ok(self
            .chat_groups()
            .find_one(doc! { "project_id": project_id })
            .session(&mut *tx)
            .await?)
    }

    async fn insert_chat_group(&self, tx: &mut ClientSession, group: &ChatGroup) -> Result<()> {
        self.chat_groups().insert_one(group).session(&mut *tx).await?;
        Ok(())
    }

    async fn set_chat_participants(
        &self,
        tx: &mut ClientSession,
        chat_group_id: &str,
        participants: &[ParticipantEntry],
    ) -> Result<()> {
        self.chat_groups()
            .update_one(
                doc! { "_id": chat_group_id },
                doc! { "$set": { "participants": to_bson(participants)? } },
            )
            .session(&mut *tx)
            .await?;
        Ok(())
    }

    async fn delete_chat_group_by_project(
        &self,
        tx: &mut ClientSession,
        project_id: &str,
    ) -> Result<()> {
        self.chat_groups()
            .delete_one(doc! { "project_id": project_id })
            .session(&mut *tx)
            .await?;
        Ok(())
    }

    async fn insert_file(&self, tx: &mut ClientSession, file: &FileRecord) -> Result<()> {
        self.files().insert_one(file).session(&mut *tx).await?;
        Ok(())
    }

    async fn find_files_by_project(
        &self,
        tx: &mut ClientSession,
        project_id: &str,
    ) -> Result<Vec<FileRecord>> {
        let mut cursor = self
            .files()
            .find(doc! { "project_id": project_id })
            .session(&mut *tx)
            .await?;
        let mut files = Vec::new();
        while let Some(file) = cursor.next(tx).await {
            files.push(file?);
        }
        Ok(files)
    }

    async fn delete_files_by_project(&self, tx: &mut ClientSession, project_id: &str) -> Result<()> {
        self.files()
            .delete_many(doc! { "project_id": project_id })
            .session(&mut *tx)
            .await?;
        Ok(())
    }
}
