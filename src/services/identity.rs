//! Accounts, credentials, bearer tokens and roles.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::domain::aggregates::user::SEED_ROLES;
use crate::domain::aggregates::{Role, User};
use crate::repositories::{RoleRepository, UserRepository};
use crate::{EcommerceError, Entity, Result};

pub const MIN_PASSWORD_LEN: usize = 6;

/// JWT claims carried by bearer tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    pub aud: String,
}

#[derive(Clone)]
pub struct IdentityService {
    users: Arc<dyn UserRepository>,
    roles: Arc<dyn RoleRepository>,
    jwt: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl IdentityService {
    pub fn new(users: Arc<dyn UserRepository>, roles: Arc<dyn RoleRepository>, jwt: JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(jwt.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt.secret.as_bytes()),
            users, roles, jwt,
        }
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(EcommerceError::invalid("username is required"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(EcommerceError::invalid(format!("password must be at least {MIN_PASSWORD_LEN} characters")));
        }
        let password = password.to_string();
        let password_hash = on_blocking_pool(move || hash_password(&password)).await?;
        let user = User::new(username, email.trim(), password_hash);
        self.users.insert(&user).await?;
        info!(user_id = %user.id, username, "User registered");
        Ok(user)
    }

    /// The user when `password` matches, `None` otherwise.
    pub async fn check_credentials(&self, username: &str, password: &str) -> Result<Option<User>> {
        let Some(user) = self.users.find_by_username(username.trim()).await? else {
            debug!(username, "Unknown username");
            return Ok(None);
        };
        let (stored, candidate) = (user.password_hash.clone(), password.to_string());
        let matches = on_blocking_pool(move || verify_password(&stored, &candidate)).await?;
        Ok(matches.then_some(user))
    }

    /// Issues a bearer token when the credentials are valid.
    pub async fn login(&self, username: &str, password: &str) -> Result<Option<String>> {
        match self.check_credentials(username, password).await? {
            Some(user) => self.issue_token(&user).map(Some),
            None => {
                warn!(username, "Login rejected");
                Ok(None)
            }
        }
    }

    pub async fn exists(&self, user_id: &str) -> Result<bool> {
        self.users.exists(user_id).await
    }

    pub fn issue_token(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            name: user.username.clone(),
            roles: user.roles.clone(),
            exp: (now + Duration::seconds(self.jwt.ttl_secs)).timestamp(),
            iat: now.timestamp(),
            iss: self.jwt.issuer.clone(),
            aud: self.jwt.audience.clone(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| EcommerceError::storage(format!("token signing failed: {e}")))
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.jwt.issuer]);
        validation.set_audience(&[&self.jwt.audience]);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "Rejected bearer token");
                EcommerceError::Unauthorized
            })
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>> {
        self.roles.list_roles().await
    }

    pub async fn create_role(&self, name: &str) -> Result<Role> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EcommerceError::invalid("role name must be provided"));
        }
        let role = Role::new(name);
        self.roles.insert_role(&role).await?;
        info!(role = name, "Role created");
        Ok(role)
    }

    pub async fn delete_role(&self, id: Uuid) -> Result<()> {
        if !self.roles.delete_role(id).await? {
            return Err(EcommerceError::NotFound(Entity::Role));
        }
        Ok(())
    }

    /// Creates the built-in roles that are missing.
    pub async fn seed_roles(&self) -> Result<()> {
        let existing = self.roles.list_roles().await?;
        for name in SEED_ROLES {
            if existing.iter().any(|r| r.name == name) { continue; }
            match self.roles.insert_role(&Role::new(name)).await {
                Ok(()) | Err(EcommerceError::Conflict(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// Argon2 is CPU-bound and must not run on the async workers.
async fn on_blocking_pool<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| EcommerceError::storage(format!("password task failed: {e}")))?
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| EcommerceError::storage(format!("password hashing failed: {e}")))
}

fn verify_password(stored: &str, candidate: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| EcommerceError::storage(format!("stored password hash is invalid: {e}")))?;
    Ok(Argon2::default().verify_password(candidate.as_bytes(), &parsed).is_ok())
}
