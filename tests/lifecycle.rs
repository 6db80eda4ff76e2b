mod common;

use projecthub::emitter::{ProjectEvent, PROJECT_EVENTS_TOPIC};
use projecthub::error::AppError;
use projecthub::models::{ParticipantRole, TeamRole};
use projecthub::project_lifecycle::{CreateProjectInput, TeamMemberInput};

use common::harness;

fn member(user_id: &str, role: Option<&str>) -> TeamMemberInput {
    TeamMemberInput { user_id: user_id.to_string(), role: role.map(str::to_string) }
}

fn input(name: &str, members: Vec<TeamMemberInput>) -> CreateProjectInput {
    CreateProjectInput {
        name: name.to_string(),
        description: None,
        organization_id: "org-1".to_string(),
        team_members: members,
        files: Vec::new(),
    }
}

fn participant_role(
    group: &projecthub::models::ChatGroup,
    user_id: &str,
) -> Option<ParticipantRole> {
    group.participants.iter().find(|p| p.user_id == user_id).map(|p| p.role)
}

#[tokio::test]
async fn create_project_derives_chat_group_and_back_refs() {
    let h = harness();
    h.store.seed_user("u1");
    h.store.seed_user("u2");

    let created = h
        .lifecycle
        .create_project(
            "u1",
            input("Alpha", vec![member("u1", Some("Admin")), member("u2", Some("Developer"))]),
        )
        .await
        .unwrap();

    let project_id = created.project.project_id.clone();
    assert_eq!(created.project.name, "Alpha");
    assert_eq!(created.project.team_members.len(), 2);
    assert_eq!(created.project.team_members[0].role, TeamRole::Admin);

    // Exactly one chat group, participants mirror the roster with roles mapped.
    assert_eq!(h.store.chat_group_count(&project_id), 1);
    let group = h.store.chat_group_for(&project_id).unwrap();
    assert_eq!(group.name, "Project: Alpha");
    assert!(!group.is_public);
    assert_eq!(group.participants.len(), 2);
    assert_eq!(participant_role(&group, "u1"), Some(ParticipantRole::Admin));
    assert_eq!(participant_role(&group, "u2"), Some(ParticipantRole::Member));

    // Both back-reference sets are maintained for every member.
    for uid in ["u1", "u2"] {
        let user = h.store.get_user(uid).unwrap();
        assert_eq!(user.projects, vec![project_id.clone()]);
        assert_eq!(user.chat_groups, vec![group.chat_group_id.clone()]);
    }

    let events = h.emitter.take();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|(topic, _)| topic == PROJECT_EVENTS_TOPIC));
    assert!(events.iter().any(|(_, e)| matches!(
        e,
        ProjectEvent::UserAdded { user_id, .. } if user_id == "u2"
    )));
}

#[tokio::test]
async fn create_project_stores_uploaded_files() {
    let h = harness();
    h.store.seed_user("u1");

    let mut input = input("With files", vec![member("u1", Some("Admin"))]);
    input.files = vec![projecthub::file_ingest::FileUpload {
        name: "main.rs".to_string(),
        content: "data:text/plain;base64,aGVsbG8=".to_string(),
    }];

    let created = h.lifecycle.create_project("u1", input).await.unwrap();
    assert_eq!(created.project.files.len(), 1);
    assert_eq!(h.store.file_count(), 1);

    let paths = h.storage.stored_paths();
    assert_eq!(paths.len(), 1);
    assert!(paths[0].starts_with(&format!("{}/", created.project.project_id)));
    assert!(paths[0].ends_with("main.rs"));
}

#[tokio::test]
async fn create_project_requires_name() {
    let h = harness();
    let err = h.lifecycle.create_project("u1", input("   ", vec![])).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(h.store.project_count(), 0);
}

#[tokio::test]
async fn create_project_rejects_unnamed_upload_without_side_effects() {
    let h = harness();
    h.store.seed_user("u1");

    let mut input = input("Alpha", vec![member("u1", None)]);
    input.files = vec![projecthub::file_ingest::FileUpload {
        name: "  ".to_string(),
        content: "aGVsbG8=".to_string(),
    }];

    let err = h.lifecycle.create_project("u1", input).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    assert_eq!(h.store.project_count(), 0);
    assert_eq!(h.store.file_count(), 0);
    assert!(h.storage.stored_paths().is_empty());
    assert!(h.store.get_user("u1").unwrap().projects.is_empty());
    assert!(h.emitter.take().is_empty());
}

#[tokio::test]
async fn create_project_rolls_back_when_a_later_write_fails() {
    let h = harness();
    h.store.seed_user("u1");
    h.storage.fail_writes_ending_with("b.txt");

    let mut input = input("Alpha", vec![member("u1", Some("Admin"))]);
    input.files = vec![
        projecthub::file_ingest::FileUpload {
            name: "a.txt".to_string(),
            content: "aGVsbG8=".to_string(),
        },
        projecthub::file_ingest::FileUpload {
            name: "b.txt".to_string(),
            content: "aGVsbG8=".to_string(),
        },
    ];

    let err = h.lifecycle.create_project("u1", input).await.unwrap_err();
    assert!(matches!(err, AppError::Storage(_)));

    // Nothing persisted, and the already-written first file was cleaned up.
    assert_eq!(h.store.project_count(), 0);
    assert_eq!(h.store.file_count(), 0);
    assert!(h.storage.stored_paths().is_empty());
    assert!(h.emitter.take().is_empty());
}

#[tokio::test]
async fn duplicate_roster_entries_collapse_to_one() {
    let h = harness();
    h.store.seed_user("u1");

    let created = h
        .lifecycle
        .create_project(
            "u1",
            input("Alpha", vec![member("u1", Some("Admin")), member("u1", Some("Developer"))]),
        )
        .await
        .unwrap();

    assert_eq!(created.project.team_members.len(), 1);
    // First entry wins.
    assert_eq!(created.project.team_members[0].role, TeamRole::Admin);
    assert_eq!(created.chat_group.participants.len(), 1);
}

#[tokio::test]
async fn add_user_syncs_chat_and_back_refs() {
    let h = harness();
    h.store.seed_user("u1");
    h.store.seed_user("u3");

    let created = h
        .lifecycle
        .create_project("u1", input("Alpha", vec![member("u1", Some("Admin"))]))
        .await
        .unwrap();
    let project_id = created.project.project_id.clone();
    h.emitter.take();

    let project = h
        .lifecycle
        .add_user_to_project(&project_id, "u3", None, "u1")
        .await
        .unwrap();

    assert!(project.has_member("u3"));
    // Absent role defaults to Developer, which maps to a plain member.
    let group = h.store.chat_group_for(&project_id).unwrap();
    assert_eq!(participant_role(&group, "u3"), Some(ParticipantRole::Member));

    let u3 = h.store.get_user("u3").unwrap();
    assert_eq!(u3.projects, vec![project_id.clone()]);
    assert_eq!(u3.chat_groups, vec![group.chat_group_id]);

    let events = h.emitter.take();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].1,
        ProjectEvent::UserAdded { project_id, user_id: "u3".to_string() }
    );
}

#[tokio::test]
async fn add_user_twice_is_a_conflict() {
    let h = harness();
    h.store.seed_user("u1");
    h.store.seed_user("u2");

    let created = h
        .lifecycle
        .create_project("u1", input("Alpha", vec![member("u1", None), member("u2", None)]))
        .await
        .unwrap();
    h.emitter.take();

    let err = h
        .lifecycle
        .add_user_to_project(&created.project.project_id, "u2", None, "u1")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // Failed operation leaves everything untouched and announces nothing.
    let project = h.store.get_project(&created.project.project_id).unwrap();
    assert_eq!(project.team_members.len(), 2);
    assert!(h.emitter.take().is_empty());
}

#[tokio::test]
async fn add_user_to_missing_project_is_not_found() {
    let h = harness();
    let err = h
        .lifecycle
        .add_user_to_project("nope", "u1", None, "u1")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn batch_add_skips_existing_members() {
    let h = harness();
    for uid in ["u1", "u2", "u3"] {
        h.store.seed_user(uid);
    }

    let created = h
        .lifecycle
        .create_project("u1", input("Alpha", vec![member("u1", Some("Admin")), member("u2", None)]))
        .await
        .unwrap();
    let project_id = created.project.project_id.clone();
    h.emitter.take();

    let outcome = h
        .lifecycle
        .add_multiple_users_to_project(
            &project_id,
            vec![member("u2", None), member("u3", Some("Team Member"))],
            "u1",
        )
        .await
        .unwrap();

    assert_eq!(outcome.added, vec!["u3".to_string()]);
    assert_eq!(outcome.skipped, vec!["u2".to_string()]);
    assert_eq!(outcome.project.team_members.len(), 3);

    let group = h.store.chat_group_for(&project_id).unwrap();
    assert_eq!(group.participants.len(), 3);
    assert_eq!(participant_role(&group, "u3"), Some(ParticipantRole::Member));

    // Only the actually-added user is announced.
    let events = h.emitter.take();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].1,
        ProjectEvent::UserAdded { project_id, user_id: "u3".to_string() }
    );
}

#[tokio::test]
async fn batch_add_of_only_duplicates_is_rejected_without_mutation() {
    let h = harness();
    h.store.seed_user("u1");
    h.store.seed_user("u2");

    let created = h
        .lifecycle
        .create_project("u1", input("Alpha", vec![member("u1", None), member("u2", None)]))
        .await
        .unwrap();
    h.emitter.take();
    let writes_before = h.store.participant_writes.load(std::sync::atomic::Ordering::SeqCst);

    let err = h
        .lifecycle
        .add_multiple_users_to_project(
            &created.project.project_id,
            vec![member("u1", None), member("u2", None)],
            "u1",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let project = h.store.get_project(&created.project.project_id).unwrap();
    assert_eq!(project.team_members.len(), 2);
    assert_eq!(
        h.store.participant_writes.load(std::sync::atomic::Ordering::SeqCst),
        writes_before
    );
    assert!(h.emitter.take().is_empty());
}

#[tokio::test]
async fn remove_user_syncs_chat_and_pulls_back_refs() {
    let h = harness();
    h.store.seed_user("u1");
    h.store.seed_user("u2");

    let created = h
        .lifecycle
        .create_project(
            "u1",
            input("Alpha", vec![member("u1", Some("Admin")), member("u2", Some("Developer"))]),
        )
        .await
        .unwrap();
    let project_id = created.project.project_id.clone();
    h.emitter.take();

    let project = h
        .lifecycle
        .remove_user_from_project(&project_id, "u2")
        .await
        .unwrap();
    assert!(!project.has_member("u2"));

    let group = h.store.chat_group_for(&project_id).unwrap();
    assert_eq!(group.participant_ids(), vec!["u1".to_string()]);

    let u2 = h.store.get_user("u2").unwrap();
    assert!(u2.projects.is_empty());
    assert!(u2.chat_groups.is_empty());

    let events = h.emitter.take();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].1,
        ProjectEvent::UserRemoved { project_id, user_id: "u2".to_string() }
    );
}

#[tokio::test]
async fn remove_non_member_is_not_found() {
    let h = harness();
    h.store.seed_user("u1");

    let created = h
        .lifecycle
        .create_project("u1", input("Alpha", vec![member("u1", None)]))
        .await
        .unwrap();
    h.emitter.take();

    let err = h
        .lifecycle
        .remove_user_from_project(&created.project.project_id, "ghost")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(h.emitter.take().is_empty());
}

#[tokio::test]
async fn delete_project_cleans_every_derived_record() {
    let h = harness();
    for uid in ["u1", "u2", "u3"] {
        h.store.seed_user(uid);
    }

    let mut input = input(
        "Alpha",
        vec![member("u1", Some("Admin")), member("u2", None), member("u3", None)],
    );
    input.files = vec![projecthub::file_ingest::FileUpload {
        name: "notes.txt".to_string(),
        content: "aGVsbG8=".to_string(),
    }];
    let created = h.lifecycle.create_project("u1", input).await.unwrap();
    let project_id = created.project.project_id.clone();
    h.emitter.take();

    h.lifecycle.delete_project(&project_id).await.unwrap();

    assert!(h.store.get_project(&project_id).is_none());
    assert_eq!(h.store.chat_group_count(&project_id), 0);
    assert_eq!(h.store.file_count(), 0);
    assert!(h.storage.stored_paths().is_empty());
    for uid in ["u1", "u2", "u3"] {
        let user = h.store.get_user(uid).unwrap();
        assert!(user.projects.is_empty());
        assert!(user.chat_groups.is_empty());
    }
    // Deletion announces nothing.
    assert!(h.emitter.take().is_empty());
}

#[tokio::test]
async fn delete_missing_project_is_not_found() {
    let h = harness();
    let err = h.lifecycle.delete_project("nope").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

/// End-to-end roster churn: create, remove, batch add. The chat group tracks
/// the roster through every step.
#[tokio::test]
async fn roster_churn_keeps_chat_group_in_lockstep() {
    let h = harness();
    for uid in ["u1", "u2", "u3"] {
        h.store.seed_user(uid);
    }

    let created = h
        .lifecycle
        .create_project(
            "u1",
            input("Alpha", vec![member("u1", Some("Admin")), member("u2", Some("Developer"))]),
        )
        .await
        .unwrap();
    let project_id = created.project.project_id.clone();

    h.lifecycle.remove_user_from_project(&project_id, "u2").await.unwrap();
    let group = h.store.chat_group_for(&project_id).unwrap();
    assert_eq!(group.participant_ids(), vec!["u1".to_string()]);

    h.lifecycle
        .add_multiple_users_to_project(&project_id, vec![member("u3", Some("Team Member"))], "u1")
        .await
        .unwrap();

    let group = h.store.chat_group_for(&project_id).unwrap();
    let mut ids = group.participant_ids();
    ids.sort();
    assert_eq!(ids, vec!["u1".to_string(), "u3".to_string()]);
    assert_eq!(participant_role(&group, "u1"), Some(ParticipantRole::Admin));
    assert_eq!(participant_role(&group, "u3"), Some(ParticipantRole::Member));
}
