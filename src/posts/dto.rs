use serde::{Deserialize, Serialize};

use super::repo::{NewPost, Post};
use crate::error::{require, Result};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub name: String,
    pub email: String,
    pub post_text: String,
    pub address: String,
    pub city: String,
}

impl CreatePostRequest {
    pub fn validate(&self) -> Result<()> {
        require("name", &self.name)?;
        require("email", &self.email)?;
        require("postText", &self.post_text)
    }
}

impl From<CreatePostRequest> for NewPost {
    fn from(r: CreatePostRequest) -> Self {
        Self {
            name: r.name,
            email: r.email,
            post_text: r.post_text,
            address: r.address,
            city: r.city,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub post_text: String,
    pub address: String,
    pub city: String,
}

impl From<Post> for PostResponse {
    fn from(p: Post) -> Self {
        Self {
            id: p.id.to_string(),
            name: p.name,
            email: p.email,
            post_text: p.post_text,
            address: p.address,
            city: p.city,
        }
    }
}
