//! Registration, login, roles and the bearer-token extractor.

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts, Path, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;
use validator::Validate;

use super::AppState;
use crate::domain::aggregates::Role;
use crate::services::{Claims, IdentityService};
use crate::{EcommerceError, Result};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/roles", get(list_roles).post(create_role))
        .route("/api/roles/:id", delete(delete_role))
}

/// Claims of a request carrying a valid `Authorization: Bearer` token.
pub struct AuthUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    IdentityService: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = EcommerceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let token = parts.headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or_else(|| {
                warn!("Missing or invalid authorization header");
                EcommerceError::Unauthorized
            })?;
        IdentityService::from_ref(state).verify_token(token.trim()).map(AuthUser)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 256))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub name: String,
}

async fn register(State(s): State<AppState>, Json(req): Json<RegisterRequest>) -> Result<(StatusCode, Json<serde_json::Value>)> {
    req.validate()?;
    let user = s.identity.register(&req.username, &req.email, &req.password).await?;
    Ok((StatusCode::CREATED, Json(json!({ "result": "User created successfully", "userId": user.id }))))
}

async fn login(State(s): State<AppState>, Json(req): Json<LoginRequest>) -> Result<Json<serde_json::Value>> {
    let user = s.identity.check_credentials(&req.username, &req.password).await?.ok_or_else(|| {
        warn!(username = %req.username, "Login rejected");
        EcommerceError::Unauthorized
    })?;
    let token = s.identity.issue_token(&user)?;
    Ok(Json(json!({ "token": token, "userId": user.id })))
}

async fn list_roles(State(s): State<AppState>) -> Result<Json<Vec<Role>>> {
    Ok(Json(s.identity.list_roles().await?))
}

async fn create_role(State(s): State<AppState>, Json(req): Json<RoleRequest>) -> Result<(StatusCode, Json<Role>)> {
    Ok((StatusCode::CREATED, Json(s.identity.create_role(&req.name).await?)))
}

async fn delete_role(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    s.identity.delete_role(id).await?;
    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use crate::api::testing::{app, send};
    use crate::repositories::MemoryStore;
    use axum::http::StatusCode;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_register_login_and_bad_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(Arc::new(MemoryStore::new()), dir.path());
        let register = json!({ "username": "kemi", "email": "kemi@example.com", "password": "pa55word" });

        let (status, _) = send(&app, "POST", "/api/auth/register", Some(register.clone()), None).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = send(&app, "POST", "/api/auth/register", Some(register), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let (status, _) = send(&app, "POST", "/api/auth/register", Some(json!({ "username": "x", "email": "not-an-email", "password": "pa55word" })), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, "POST", "/api/auth/login", Some(json!({ "username": "kemi", "password": "pa55word" })), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["token"].as_str().is_some());
        let (status, _) = send(&app, "POST", "/api/auth/login", Some(json!({ "username": "kemi", "password": "nope" })), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = send(&app, "GET", "/api/orders/mine", None, Some("garbage")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_role_management() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(Arc::new(MemoryStore::new()), dir.path());
        let (status, role) = send(&app, "POST", "/api/roles", Some(json!({ "name": "Admin" })), None).await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, roles) = send(&app, "GET", "/api/roles", None, None).await;
        assert_eq!(roles.as_array().unwrap().len(), 1);

        let uri = format!("/api/roles/{}", role["id"].as_str().unwrap());
        let (status, _) = send(&app, "DELETE", &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, "DELETE", &uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
