//! User directory service

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::{
    clock::Clock,
    error::{AppError, AppResult},
    models::user::{CreateUser, Role, User},
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    clock: Arc<dyn Clock>,
}

impl UsersService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Create a user. Username and email are unique ignoring case.
    pub async fn register(&self, user: CreateUser) -> AppResult<User> {
        let username = user.username.trim().to_string();
        let email = user.email.trim().to_string();

        if username.is_empty() || email.is_empty() || user.password.is_empty() {
            return Err(AppError::Validation(
                "Username, email and password are required".to_string(),
            ));
        }

        let password_hash = self.hash_password(&user.password)?;

        let mut users = self.repository.users.write().await;
        if users.find_by_username(&username).is_some() {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }
        if users.find_by_email(&email).is_some() {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }

        let created = users.insert(username, email, password_hash, user.role, self.clock.now());
        tracing::info!("Registered user {} (id={}, role={})", created.username, created.id, created.role);
        Ok(created)
    }

    /// Check a username/password pair. Every failure reads the same.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<User> {
        let invalid = || AppError::Authentication("Invalid username or password".to_string());

        let user = self
            .repository
            .users
            .read()
            .await
            .find_by_username(username.trim())
            .cloned()
            .ok_or_else(invalid)?;

        if !self.verify_password(&user, password)? {
            tracing::warn!("Failed login attempt for {}", user.username);
            return Err(invalid());
        }

        Ok(user)
    }

    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    /// Get user by ID
    pub async fn get(&self, id: i32) -> AppResult<User> {
        self.repository.users.read().await.get(id).cloned()
    }

    /// All users in registration order
    pub async fn list(&self) -> Vec<User> {
        self.repository.users.read().await.list().to_vec()
    }

    pub async fn count(&self) -> usize {
        self.repository.users.read().await.len()
    }

    /// Change a user's role. Whether the acting admin may do so is the caller's check.
    pub async fn update_role(&self, id: i32, role: Role) -> AppResult<User> {
        let user = self.repository.users.write().await.set_role(id, role)?;
        tracing::info!("User {} (id={}) is now {}", user.username, user.id, role);
        Ok(user)
    }
}
