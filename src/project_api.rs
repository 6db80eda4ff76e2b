use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use futures_util::StreamExt;
use log::debug;
use mongodb::bson::{doc, to_bson};
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::error::{AppError, Result};
use crate::models::{Project, ProjectStatus};
use crate::project_lifecycle::{CreateProjectInput, TeamMemberInput};

#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
}

#[derive(Debug, Deserialize)]
pub struct AddUserRequest {
    pub user_id: String,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddMultipleUsersRequest {
    pub users: Vec<TeamMemberInput>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveUserRequest {
    pub user_id: String,
}

fn current_user(req: &HttpRequest) -> Result<String> {
    req.extensions()
        .get::<String>()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()))
}

/// POST /projects/create
pub async fn create_project(
    req: HttpRequest,
    data: web::Data<AppState>,
    input: web::Json<CreateProjectInput>,
) -> Result<HttpResponse> {
    let creator = current_user(&req)?;
    debug!("create_project requested by {}", creator);
    let created = data.lifecycle.create_project(&creator, input.into_inner()).await?;
    Ok(HttpResponse::Created().json(created))
}

/// GET /projects/{id}
pub async fn get_project(
    data: web::Data<AppState>,
    project_id: web::Path<String>,
) -> Result<HttpResponse> {
    let project = data
        .store
        .projects()
        .find_one(doc! { "_id": &*project_id })
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
    Ok(HttpResponse::Ok().json(project))
}

/// GET /projects/organization/{id}
pub async fn get_projects_by_organization(
    data: web::Data<AppState>,
    organization_id: web::Path<String>,
) -> Result<HttpResponse> {
    let mut cursor = data
        .store
        .projects()
        .find(doc! { "organization_id": &*organization_id })
        .await?;
    let mut projects: Vec<Project> = Vec::new();
    while let Some(project) = cursor.next().await {
        projects.push(project?);
    }
    Ok(HttpResponse::Ok().json(projects))
}

/// GET /projects, the projects whose roster contains the authenticated user.
pub async fn get_projects_for_user(
    req: HttpRequest,
    data: web::Data<AppState>,
) -> Result<HttpResponse> {
    let user_id = current_user(&req)?;
    let mut cursor = data
        .store
        .projects()
        .find(doc! { "team_members.user_id": &user_id })
        .await?;
    let mut projects: Vec<Project> = Vec::new();
    while let Some(project) = cursor.next().await {
        projects.push(project?);
    }
    Ok(HttpResponse::Ok().json(projects))
}

/// PUT /projects/update/{id}
pub async fn update_project(
    data: web::Data<AppState>,
    project_id: web::Path<String>,
    update: web::Json<UpdateProjectRequest>,
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
    if set_doc.is_empty() {
        return Err(AppError::BadRequest("No fields to update".to_string()));
    }
    set_doc.insert("updated_at", to_bson(&chrono::Utc::now())?);

    let result = data
        .store
        .projects()
        .update_one(doc! { "_id": &*project_id }, doc! { "$set": set_doc })
        .await?;
    if result.matched_count == 0 {
        return Err(AppError::NotFound("Project not found".to_string()));
    }
    Ok(HttpResponse::Ok().json(json!({ "message": "Project updated successfully" })))
}

/// DELETE /projects/delete/{id}
pub async fn delete_project(
    data: web::Data<AppState>,
    project_id: web::Path<String>,
) -> Result<HttpResponse> {
    data.lifecycle.delete_project(&project_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Project deleted successfully" })))
}

/// POST /projects/add_user/{id}
pub async fn add_user_to_project(
    req: HttpRequest,
    data: web::Data<AppState>,
    project_id: web::Path<String>,
    payload: web::Json<AddUserRequest>,
) -> Result<HttpResponse> {
    let added_by = current_user(&req)?;
    let project = data
        .lifecycle
        .add_user_to_project(&project_id, &payload.user_id, payload.role.as_deref(), &added_by)
        .await?;
    Ok(HttpResponse::Ok().json(project))
}

/// POST /projects/add_multiple_users/{id}
pub async fn add_multiple_users_to_project(
    req: HttpRequest,
    data: web::Data<AppState>,
    project_id: web::Path<String>,
    payload: web::Json<AddMultipleUsersRequest>,
) -> Result<HttpResponse> {
    let added_by = current_user(&req)?;
    let outcome = data
        .lifecycle
        .add_multiple_users_to_project(&project_id, payload.into_inner().users, &added_by)
        .await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// POST /projects/remove_user/{id}
pub async fn remove_user_from_project(
    data: web::Data<AppState>,
    project_id: web::Path<String>,
    payload: web::Json<RemoveUserRequest>,
) -> Result<HttpResponse> {
    let project = data
        .lifecycle
        .remove_user_from_project(&project_id, &payload.user_id)
        .await?;
    Ok(HttpResponse::Ok().json(project))
}
