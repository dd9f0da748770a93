//! User service for business logic operations.
//!
//! Sits between handlers and the repository: plaintext passwords are hashed
//! here, and partial updates are merged over the stored record.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::{AppError, AppResult};
use crate::models::{NewUser, User, UserChanges, UserSummary};
use crate::repositories::UserRepository;
use crate::utils::password::hash_password;

/// User service for handling user-related business logic.
///
/// Cloning is cheap; clones share the same repository.
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    /// Creates a user, storing an Argon2id hash instead of the plaintext password.
    pub async fn create_user(
        &self,
        ctx: &CancellationToken,
        mut new_user: NewUser,
    ) -> AppResult<User> {
        new_user.password = hash_password(&new_user.password)?;

        let user = self.repo.create(ctx, new_user).await?;
        tracing::info!(user_id = user.id, "User created");
        Ok(user)
    }

    /// Gets a user by id, including soft-deleted users.
    pub async fn get_user(&self, ctx: &CancellationToken, id: i32) -> AppResult<User> {
        self.repo.get_by_id(ctx, id).await
    }

    /// Applies `changes` to an active user.
    ///
    /// Soft-deleted users are reported as `NotFound`. An empty change set
    /// still rewrites the row and advances `updated_at`.
    pub async fn update_user(
        &self,
        ctx: &CancellationToken,
        id: i32,
        mut changes: UserChanges,
    ) -> AppResult<User> {
        let mut user = self.repo.get_by_id(ctx, id).await?;
        if user.is_deleted() {
            return Err(AppError::user_not_found(id));
        }

        if let Some(password) = changes.password.as_deref() {
            changes.password = Some(hash_password(password)?);
        }
        user.apply(changes);

        let user = self.repo.update(ctx, &user).await?;
        tracing::info!(user_id = user.id, "User updated");
        Ok(user)
    }

    /// Soft-deletes a user.
    pub async fn delete_user(&self, ctx: &CancellationToken, id: i32) -> AppResult<()> {
        self.repo.delete(ctx, id).await?;
        tracing::info!(user_id = id, "User deleted");
        Ok(())
    }

    /// Lists active users ordered by id.
    pub async fn list_users(
        &self,
        ctx: &CancellationToken,
        limit: u32,
        offset: u32,
    ) -> AppResult<Vec<UserSummary>> {
        self.repo.list(ctx, limit, offset).await
    }
}
