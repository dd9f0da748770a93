//! Repository layer for data access operations.
//!
//! [`UserRepository`] is the storage contract; [`PgUserRepository`] runs it
//! against PostgreSQL and [`InMemoryUserRepository`] keeps records in process.

mod memory_user_repo;
mod pg_user_repo;

pub use memory_user_repo::InMemoryUserRepository;
pub use pg_user_repo::PgUserRepository;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::AppResult;
use crate::models::{NewUser, User, UserSummary};

/// Storage operations for users.
///
/// Every call performs exactly one storage statement and observes `ctx`:
/// once the token is cancelled the call returns `AppError::Cancelled`
/// without side effects still pending.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persists a new user and returns the stored record, including its
    /// generated id and timestamps.
    async fn create(&self, ctx: &CancellationToken, new_user: NewUser) -> AppResult<User>;

    /// Fetches a user by id. Soft-deleted users are returned with
    /// `deleted_at` set.
    ///
    /// Returns `AppError::NotFound` when no row has this id.
    async fn get_by_id(&self, ctx: &CancellationToken, id: i32) -> AppResult<User>;

    /// Overwrites username, email and password of the row with `user.id` and
    /// stamps `updated_at`. `created_at` and `deleted_at` are left untouched.
    async fn update(&self, ctx: &CancellationToken, user: &User) -> AppResult<User>;

    /// Marks the user as deleted by setting `deleted_at`.
    async fn delete(&self, ctx: &CancellationToken, id: i32) -> AppResult<()>;

    /// Active users ordered by id, skipping `offset` and returning at most
    /// `limit` entries.
    async fn list(
        &self,
        ctx: &CancellationToken,
        limit: u32,
        offset: u32,
    ) -> AppResult<Vec<UserSummary>>;
}
