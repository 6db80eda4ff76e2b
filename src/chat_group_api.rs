use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use chrono::Utc;
use futures_util::StreamExt;
use mongodb::bson::doc;
use serde::Deserialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::{AppError, Result};
use crate::models::{ChatGroup, Message};

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
    pub attachments: Option<Vec<String>>,
}

fn current_user(req: &HttpRequest) -> Result<String> {
    req.extensions()
        .get::<String>()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()))
}

/// GET /chat_groups/project/{id}
pub async fn get_project_chat_group(
    data: web::Data<AppState>,
    project_id: web::Path<String>,
) -> Result<HttpResponse> {
    let group = data
        .store
        .chat_groups()
        .find_one(doc! { "project_id": &*project_id })
        .await?
        .ok_or_else(|| AppError::NotFound("Chat group not found".to_string()))?;
    Ok(HttpResponse::Ok().json(group))
}

/// GET /chat_groups/user/{id}, the groups the user participates in.
pub async fn get_user_chat_groups(
    req: HttpRequest,
    data: web::Data<AppState>,
    user_id: web::Path<String>,
) -> Result<HttpResponse> {
    let current = current_user(&req)?;
    if current != *user_id {
        return Err(AppError::Unauthorized(
            "Cannot access other user's chat groups".to_string(),
        ));
    }
    let mut cursor = data
        .store
        .chat_groups()
        .find(doc! { "participants.user_id": &current })
        .await?;
    let mut groups: Vec<ChatGroup> = Vec::new();
    while let Some(group) = cursor.next().await {
        groups.push(group?);
    }
    Ok(HttpResponse::Ok().json(groups))
}

async fn ensure_participant(
    data: &AppState,
    chat_group_id: &str,
    user_id: &str,
) -> Result<()> {
    data.store
        .chat_groups()
        .find_one(doc! { "_id": chat_group_id, "participants.user_id": user_id })
        .await?
        .ok_or_else(|| AppError::Unauthorized("Not a participant of this chat group".to_string()))?;
    Ok(())
}

/// GET /chat_groups/{id}/messages
pub async fn get_messages(
    req: HttpRequest,
    data: web::Data<AppState>,
    chat_group_id: web::Path<String>,
) -> Result<HttpResponse> {
    let current = current_user(&req)?;
    ensure_participant(&data, &chat_group_id, &current).await?;

    let messages_coll = data.store.db.collection::<Message>("messages");
    let mut cursor = messages_coll
        .find(doc! { "chat_group_id": &*chat_group_id })
        .await?;
    let mut messages: Vec<Message> = Vec::new();
    while let Some(message) = cursor.next().await {
        messages.push(message?);
    }
    Ok(HttpResponse::Ok().json(messages))
}

/// POST /chat_groups/{id}/messages
pub async fn create_message(
    req: HttpRequest,
    data: web::Data<AppState>,
    chat_group_id: web::Path<String>,
    msg_info: web::Json<SendMessageRequest>,
) -> Result<HttpResponse> {
    let current = current_user(&req)?;
    ensure_participant(&data, &chat_group_id, &current).await?;

    let new_message = Message {
        message_id: Uuid::new_v4().to_string(),
        chat_group_id: chat_group_id.into_inner(),
        sender_id: current,
        content: msg_info.content.clone(),
        msg_type: "text".to_string(),
        attachments: msg_info.attachments.clone(),
        created_at: Utc::now(),
    };
    let messages_coll = data.store.db.collection::<Message>("messages");
    messages_coll.insert_one(&new_message).await?;
    Ok(HttpResponse::Created().json(new_message))
}
