//! Session attribute keys and the identity carried by a logged-in session

use serde::{Deserialize, Serialize};

use super::user::Role;

pub const KEY_USER_ID: &str = "user_id";
pub const KEY_USERNAME: &str = "username";
pub const KEY_USER_ROLE: &str = "user_role";
pub const KEY_LOGGED_IN: &str = "logged_in";
pub const KEY_CSRF_TOKEN: &str = "csrf_token";
pub const KEY_FLASH_PREFIX: &str = "flash_message";

/// Flash keys used by the handlers
pub const FLASH_ERROR: &str = "error";
pub const FLASH_SUCCESS: &str = "success";
pub const FLASH_INFO: &str = "info";
pub const FLASH_REDIRECT: &str = "redirect";

pub fn flash_key(key: &str) -> String {
    format!("{}_{}", KEY_FLASH_PREFIX, key)
}

/// Who is behind a logged-in session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: i32,
    pub username: String,
    pub role: Role,
}
