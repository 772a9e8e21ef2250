use serde::{Deserialize, Serialize};

use crate::auth::dto::PublicUser;

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub total_users: usize,
    pub users: Vec<PublicUser>,
}

#[derive(Debug, Serialize)]
pub struct UserCountResponse {
    pub total_users: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNameRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
