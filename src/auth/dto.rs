use serde::{Deserialize, Serialize};

use crate::error::{require, Result};
use crate::users::repo_types::User;

/// Request body for `POST /signup`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<()> {
        require("name", &self.name)?;
        require("email", &self.email)?;
        require("password", &self.password)
    }
}

/// Request body for `POST /login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<()> {
        require("email", &self.email)?;
        require("password", &self.password)
    }
}

/// Response returned after signup or login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub name: String,
    pub email: String,
    pub address: String,
    pub city: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub name: String,
    pub email: String,
    pub address: String,
    pub city: String,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            name: u.name,
            email: u.email,
            address: u.address,
            city: u.city,
        }
    }
}
