//! Users repository

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{
    error::{AppError, AppResult},
    models::user::{Role, User},
};

#[derive(Clone, Default)]
pub struct UsersRepository {
    table: Arc<RwLock<UserTable>>,
}

impl UsersRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, UserTable> {
        self.table.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, UserTable> {
        self.table.write().await
    }
}

/// Users in registration order
#[derive(Debug)]
pub struct UserTable {
    rows: Vec<User>,
    next_id: i32,
}

impl Default for UserTable {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            next_id: 1,
        }
    }
}

impl UserTable {
    pub fn get(&self, id: i32) -> AppResult<&User> {
        self.rows
            .iter()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    pub fn find_by_username(&self, username: &str) -> Option<&User> {
        let wanted = username.to_lowercase();
        self.rows.iter().find(|u| u.username.to_lowercase() == wanted)
    }

    pub fn find_by_email(&self, email: &str) -> Option<&User> {
        let wanted = email.to_lowercase();
        self.rows.iter().find(|u| u.email.to_lowercase() == wanted)
    }

    pub fn list(&self) -> &[User] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a user. Uniqueness is the caller's check, made under the same guard.
    pub fn insert(
        &mut self,
        username: String,
        email: String,
        password_hash: String,
        role: Role,
        created_at: DateTime<Utc>,
    ) -> User {
        let user = User {
            id: self.next_id,
            username,
            email,
            password_hash,
            role,
            created_at,
        };
        self.next_id += 1;
        self.rows.push(user.clone());
        user
    }

    pub fn set_role(&mut self, id: i32, role: Role) -> AppResult<User> {
        let user = self
            .rows
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;
        user.role = role;
        Ok(user.clone())
    }
}
