//! Request and response bodies of the Sensay API.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct CreateUserRequest<'a> {
    pub id: &'a str,
}

/// A provisioned Sensay user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensayUser {
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub content: &'a str,
}

/// A replica's answer to one message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletion {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub content: String,
}
