use actix_web::{web, HttpResponse};
use mongodb::bson::doc;
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::error::{AppError, Result};
use crate::models::User;

/// Public view of a user; never exposes the password hash.
#[derive(Debug, Serialize)]
pub struct UserView {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub organization_id: Option<String>,
    pub projects: Vec<String>,
    pub chat_groups: Vec<String>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        UserView {
            user_id: user.user_id,
            username: user.username,
            email: user.email,
            organization_id: user.organization_id,
            projects: user.projects,
            chat_groups: user.chat_groups,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FindUserQuery {
    pub email: String,
}

/// GET /users/find_user_email?email=...
pub async fn find_user_by_email(
    data: web::Data<AppState>,
    query: web::Query<FindUserQuery>,
) -> Result<HttpResponse> {
    let user = data
        .store
        .users()
        .find_one(doc! { "email": &query.email })
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(HttpResponse::Ok().json(UserView::from(user)))
}

/// GET /users/get/{id}
pub async fn get_user_by_id(
    data: web::Data<AppState>,
    user_id: web::Path<String>,
) -> Result<HttpResponse> {
    let user = data
        .store
        .users()
        .find_one(doc! { "_id": &*user_id })
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(HttpResponse::Ok().json(UserView::from(user)))
}
