use actix_web::{web, HttpResponse};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::doc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::{AppError, Result};
use crate::models::User;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

#[derive(Deserialize)]
pub struct SignupInfo {
    pub username: String,
    pub email: String,
    pub password: String,
    pub organization_id: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginInfo {
    pub email: String,
    pub password: String,
}

pub fn create_jwt(user_id: &str, secret: &str) -> Result<String> {
    let expiration = Utc::now() + Duration::hours(24);
    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration.timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref()))
        .map_err(|e| AppError::Internal(format!("Token creation failed: {}", e)))
}

pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

// POST /auth/signup
pub async fn signup(
    data: web::Data<AppState>,
    signup_info: web::Json<SignupInfo>,
) -> Result<HttpResponse> {
    let users = data.store.users();

    if users
        .find_one(doc! { "email": &signup_info.email })
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Email is already registered".to_string()));
    }

    let hashed_password = hash(&signup_info.password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

    let new_user = User {
        user_id: Uuid::new_v4().to_string(),
        username: signup_info.username.clone(),
        email: signup_info.email.clone(),
        password: hashed_password,
        organization_id: signup_info.organization_id.clone(),
        projects: Vec::new(),
        chat_groups: Vec::new(),
    };
    users.insert_one(&new_user).await?;

    Ok(HttpResponse::Created().json(json!({
        "user_id": new_user.user_id,
        "username": new_user.username,
        "email": new_user.email,
    })))
}

// POST /auth/login
pub async fn login(
    data: web::Data<AppState>,
    login_info: web::Json<LoginInfo>,
) -> Result<HttpResponse> {
    let users = data.store.users();
    let user = users
        .find_one(doc! { "email": &login_info.email })
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

    if !verify(&login_info.password, &user.password).unwrap_or(false) {
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    let token = create_jwt(&user.user_id, &data.config.jwt_secret)?;
    Ok(HttpResponse::Ok().json(json!({ "token": token, "user_id": user.user_id })))
}
