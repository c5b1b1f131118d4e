/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Signup, login, logout, token check
/// - `users`: Current user profile and avatar
/// - `tasks`: Task CRUD
/// - `task_groups`: Groups and task membership

pub mod auth;
pub mod health;
pub mod task_groups;
pub mod tasks;
pub mod users;

use serde::{Deserialize, Serialize};

/// Body of responses that only carry a message
#[derive(Debug, Serialize, Deserialize)]
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
