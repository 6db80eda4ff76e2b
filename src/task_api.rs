use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use chrono::Utc;
use futures_util::StreamExt;
use mongodb::bson::{doc, to_bson};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::{AppError, Result};
use crate::models::{Task, TaskPriority, TaskStatus};

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub project_id: String,
    pub name: String,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub assigned_to: Vec<String>,
    pub start_date: Option<chrono::DateTime<Utc>>,
    pub due_date: Option<chrono::DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Vec<String>>,
    pub due_date: Option<chrono::DateTime<Utc>>,
}

fn current_user(req: &HttpRequest) -> Result<String> {
    req.extensions()
        .get::<String>()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()))
}

/// POST /tasks/create
pub async fn create_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    task_info: web::Json<CreateTaskRequest>,
) -> Result<HttpResponse> {
    let creator = current_user(&req)?;
    if task_info.name.trim().is_empty() {
        return Err(AppError::Validation("Task name is required".to_string()));
    }

    let project = data
        .store
        .projects()
        .find_one(doc! { "_id": &task_info.project_id })
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

    let now = Utc::now();
    let new_task = Task {
        task_id: Uuid::new_v4().to_string(),
        name: task_info.name.trim().to_string(),
        description: task_info.description.clone(),
        status: TaskStatus::Pending,
        priority: task_info.priority.unwrap_or_default(),
        created_by: creator,
        assigned_to: task_info.assigned_to.clone(),
        project_id: project.project_id.clone(),
        organization_id: project.organization_id.clone(),
        start_date: task_info.start_date,
        due_date: task_info.due_date,
        created_at: now,
        updated_at: now,
    };

    let tasks_coll = data.store.db.collection::<Task>("tasks");
    tasks_coll.insert_one(&new_task).await?;
    data.store
        .projects()
        .update_one(
            doc! { "_id": &project.project_id },
            doc! { "$addToSet": { "tasks": &new_task.task_id } },
        )
        .await?;

    Ok(HttpResponse::Created().json(new_task))
}

/// GET /tasks/project/{id}
pub async fn get_tasks_by_project(
    data: web::Data<AppState>,
    project_id: web::Path<String>,
) -> Result<HttpResponse> {
    let tasks_coll = data.store.db.collection::<Task>("tasks");
    let mut cursor = tasks_coll.find(doc! { "project_id": &*project_id }).await?;
    let mut tasks: Vec<Task> = Vec::new();
    while let Some(task) = cursor.next().await {
        tasks.push(task?);
    }
    Ok(HttpResponse::Ok().json(tasks))
}

/// PUT /tasks/update/{id}
pub async fn update_task(
    data: web::Data<AppState>,
    task_id: web::Path<String>,
    update: web::Json<UpdateTaskRequest>,
) -> Result<HttpResponse> {
    let mut set_doc = doc! {};
    if let Some(name) = &update.name {
        set_doc.insert("name", name.clone());
    }
    if let Some(description) = &update.description {
        set_doc.insert("description", description.clone());
    }
    if let Some(status) = &update.status {
        set_doc.insert("status", to_bson(status)?);
    }
    if let Some(priority) = &update.priority {
        set_doc.insert("priority", to_bson(priority)?);
    }
    if let Some(assigned_to) = &update.assigned_to {
        set_doc.insert("assigned_to", assigned_to.clone());
    }
    if let Some(due_date) = &update.due_date {
        set_doc.insert("due_date", to_bson(due_date)?);
    }
    if set_doc.is_empty() {
        return Err(AppError::BadRequest("No fields to update".to_string()));
    }
    set_doc.insert("updated_at", to_bson(&Utc::now())?);

    let tasks_coll = data.store.db.collection::<Task>("tasks");
    let result = tasks_coll
        .update_one(doc! { "_id": &*task_id }, doc! { "$set": set_doc })
        .await?;
    if result.matched_count == 0 {
        return Err(AppError::NotFound("Task not found".to_string()));
    }
    Ok(HttpResponse::Ok().json(json!({ "message": "Task updated successfully" })))
}

/// DELETE /tasks/delete/{id}
pub async fn delete_task(
    data: web::Data<AppState>,
    task_id: web::Path<String>,
) -> Result<HttpResponse> {
    let tasks_coll = data.store.db.collection::<Task>("tasks");
    let task = tasks_coll
        .find_one(doc! { "_id": &*task_id })
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))?;

    tasks_coll.delete_one(doc! { "_id": &*task_id }).await?;
    data.store
        .projects()
        .update_one(
            doc! { "_id": &task.project_id },
            doc! { "$pull": { "tasks": &task.task_id } },
        )
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Task deleted successfully" })))
}
