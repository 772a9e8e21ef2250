use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::{
    dto::{AuthResponse, LoginRequest, RegisterRequest},
    jwt::JwtKeys,
    password::Hasher,
};
use crate::{
    config::AppConfig,
    error::{AppError, Result},
    users::{
        repo::UserRepository,
        repo_types::{NewUser, User},
    },
};

/// Registration and login: store lookup, password hashing, token issuance.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    hasher: Hasher,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, config: &AppConfig) -> anyhow::Result<Self> {
        Ok(Self::from_parts(
            users,
            Hasher::new(&config.hashing)?,
            JwtKeys::new(&config.jwt),
        ))
    }

    pub fn from_parts(users: Arc<dyn UserRepository>, hasher: Hasher, keys: JwtKeys) -> Self {
        Self {
            users,
            hasher,
            keys,
        }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    /// The record is not rolled back if token issuance fails after the insert.
    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse> {
        req.validate()?;

        if self.users.find_by_email(&req.email).await?.is_some() {
            warn!("email already registered");
            return Err(AppError::DuplicateUser);
        }

        let password_hash = self.hasher.hash(&req.password)?;
        let user_id = self
            .users
            .insert(NewUser {
                name: req.name.clone(),
                email: req.email.clone(),
                password_hash,
                address: req.address.clone(),
                city: req.city.clone(),
            })
            .await?;

        let token = self.keys.issue_default(&req.email)?;

        info!(%user_id, "user registered");
        Ok(AuthResponse {
            token,
            name: req.name,
            email: req.email,
            address: req.address,
            city: req.city,
        })
    }

    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn authenticate(&self, req: LoginRequest) -> Result<AuthResponse> {
        req.validate()?;

        let Some(user) = self.users.find_by_email(&req.email).await? else {
            warn!("login unknown email");
            return Err(AppError::UserNotFound);
        };

        if !self.hasher.verify(&req.password, &user.password_hash)? {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AppError::InvalidCredentials);
        }

        let token = self.keys.issue_default(&user.email)?;
        info!(user_id = %user.id, "user logged in");
        Ok(into_response(token, user))
    }
}

fn into_response(token: String, user: User) -> AuthResponse {
    AuthResponse {
        token,
        name: user.name,
        email: user.email,
        address: user.address,
        city: user.city,
    }
}
