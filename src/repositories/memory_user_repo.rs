//! Process-local user repository.
//!
//! Mirrors the PostgreSQL repository's semantics, including unique
//! username/email constraints, so it can stand in for it in tests and in
//! `serve --in-memory`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use jiff::Timestamp;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::db::run_cancellable;
use crate::error::{AppError, AppResult};
use crate::models::{NewUser, User, UserSummary};
use crate::repositories::UserRepository;

/// Entity name reported in constraint errors, matching the table name.
const ENTITY: &str = "users";

#[derive(Debug, Default)]
struct Store {
    users: BTreeMap<i32, User>,
    last_id: i32,
}

impl Store {
    /// Rejects `username`/`email` already taken by a row other than `except_id`.
    fn check_unique(&self, username: &str, email: &str, except_id: Option<i32>) -> AppResult<()> {
        for user in self.users.values() {
            if Some(user.id) == except_id {
                continue;
            }
            if user.username == username {
                return Err(duplicate("username", username));
            }
            if user.email == email {
                return Err(duplicate("email", email));
            }
        }
        Ok(())
    }
}

fn duplicate(field: &str, value: &str) -> AppError {
    AppError::Duplicate {
        entity: ENTITY.to_string(),
        field: field.to_string(),
        value: value.to_string(),
    }
}

/// User repository keeping every record in memory.
///
/// Clones share the same store.
#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, ctx: &CancellationToken, new_user: NewUser) -> AppResult<User> {
        run_cancellable(ctx, "insert user", async {
            let mut store = self.store.write().await;
            store.check_unique(&new_user.username, &new_user.email, None)?;

            store.last_id += 1;
            let now = Timestamp::now();
            let user = User {
                id: store.last_id,
                username: new_user.username,
                email: new_user.email,
                password: new_user.password,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            };
            store.users.insert(user.id, user.clone());

            Ok(user)
        })
        .await
    }

    async fn get_by_id(&self, ctx: &CancellationToken, id: i32) -> AppResult<User> {
        run_cancellable(ctx, "select user", async {
            self.store
                .read()
                .await
                .users
                .get(&id)
                .cloned()
                .ok_or_else(|| AppError::user_not_found(id))
        })
        .await
    }

    async fn update(&self, ctx: &CancellationToken, user: &User) -> AppResult<User> {
        run_cancellable(ctx, "update user", async {
            let mut store = self.store.write().await;
            if !store.users.contains_key(&user.id) {
                return Err(AppError::user_not_found(user.id));
            }
            store.check_unique(&user.username, &user.email, Some(user.id))?;

            let stored = store
                .users
                .get_mut(&user.id)
                .ok_or_else(|| AppError::user_not_found(user.id))?;

            stored.username = user.username.clone();
            stored.email = user.email.clone();
            stored.password = user.password.clone();
            // Strictly later than the previous stamp, even within one clock tick
            let now = Timestamp::now();
            stored.updated_at = if now > stored.updated_at {
                now
            } else {
                stored
                    .updated_at
                    .checked_add(jiff::SignedDuration::from_nanos(1))
                    .map_err(anyhow::Error::from)?
            };

            Ok(stored.clone())
        })
        .await
    }

    async fn delete(&self, ctx: &CancellationToken, id: i32) -> AppResult<()> {
        run_cancellable(ctx, "soft delete user", async {
            let mut store = self.store.write().await;
            let stored = store
                .users
                .get_mut(&id)
                .ok_or_else(|| AppError::user_not_found(id))?;

            stored.deleted_at = Some(Timestamp::now());
            Ok(())
        })
        .await
    }

    async fn list(
        &self,
        ctx: &CancellationToken,
        limit: u32,
        offset: u32,
    ) -> AppResult<Vec<UserSummary>> {
        run_cancellable(ctx, "list users", async {
            let store = self.store.read().await;
            Ok(store
                .users
                .values()
                .filter(|user| !user.is_deleted())
                .skip(offset as usize)
                .take(limit as usize)
                .cloned()
                .map(UserSummary::from)
                .collect())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn new_user(username: &str, email: &str, password: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    async fn seeded(count: usize) -> (InMemoryUserRepository, Vec<User>) {
        let repo = InMemoryUserRepository::new();
        let ctx = CancellationToken::new();
        let mut created = Vec::with_capacity(count);
        for i in 0..count {
            created.push(
                repo.create(&ctx, new_user(&format!("user{i}"), &format!("u{i}@x.com"), "p"))
                    .await
                    .unwrap(),
            );
        }
        (repo, created)
    }

    #[tokio::test]
    async fn test_create_then_get_round_trip() {
        let repo = InMemoryUserRepository::new();
        let ctx = CancellationToken::new();

        let created = repo
            .create(&ctx, new_user("alice", "a@x.com", "p"))
            .await
            .unwrap();
        let fetched = repo.get_by_id(&ctx, created.id).await.unwrap();

        assert_eq!(fetched.username, "alice");
        assert_eq!(fetched.email, "a@x.com");
        assert_eq!(fetched.password, "p");
        assert!(fetched.deleted_at.is_none());
        assert_eq!(fetched.created_at, fetched.updated_at);
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_ids_are_assigned_sequentially() {
        let (_, users) = seeded(3).await;
        let ids: Vec<i32> = users.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_update_only_email_keeps_other_fields() {
        let (repo, users) = seeded(1).await;
        let ctx = CancellationToken::new();
        let original = users[0].clone();

        let mut changed = original.clone();
        changed.email = "new@x.com".to_string();
        let updated = repo.update(&ctx, &changed).await.unwrap();

        assert_eq!(updated.id, original.id);
        assert_eq!(updated.email, "new@x.com");
        assert_eq!(updated.username, original.username);
        assert_eq!(updated.password, original.password);
        assert_eq!(updated.created_at, original.created_at);
        assert!(updated.updated_at > original.updated_at);
        assert_eq!(repo.get_by_id(&ctx, original.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_update_ignores_caller_timestamps() {
        let (repo, users) = seeded(1).await;
        let ctx = CancellationToken::new();

        let mut changed = users[0].clone();
        changed.created_at = Timestamp::UNIX_EPOCH;
        changed.deleted_at = Some(Timestamp::UNIX_EPOCH);
        let updated = repo.update(&ctx, &changed).await.unwrap();

        assert_eq!(updated.created_at, users[0].created_at);
        assert!(updated.deleted_at.is_none());
    }

    #[tokio::test]
    async fn test_soft_delete_hides_from_list_only() {
        let (repo, users) = seeded(2).await;
        let ctx = CancellationToken::new();

        repo.delete(&ctx, users[0].id).await.unwrap();

        let deleted = repo.get_by_id(&ctx, users[0].id).await.unwrap();
        assert!(deleted.deleted_at.is_some());
        assert_eq!(deleted.username, users[0].username);

        let listed = repo.list(&ctx, 10, 0).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, users[1].id);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let (repo, users) = seeded(1).await;
        let ctx = CancellationToken::new();

        assert!(repo.get_by_id(&ctx, 99).await.unwrap_err().is_not_found());
        assert!(repo.delete(&ctx, 99).await.unwrap_err().is_not_found());

        let mut ghost = users[0].clone();
        ghost.id = 99;
        ghost.username = "ghost".to_string();
        ghost.email = "ghost@x.com".to_string();
        assert!(repo.update(&ctx, &ghost).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_update_unknown_id_with_taken_username_is_not_found() {
        let (repo, users) = seeded(2).await;
        let ctx = CancellationToken::new();

        let mut ghost = users[1].clone();
        ghost.id = 99;
        ghost.username = users[0].username.clone();
        ghost.email = users[0].email.clone();

        let err = repo.update(&ctx, &ghost).await.unwrap_err();
        assert!(err.is_not_found(), "unexpected error: {err:?}");
        assert_eq!(repo.list(&ctx, 10, 0).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unique_username_and_email() {
        let (repo, users) = seeded(2).await;
        let ctx = CancellationToken::new();

        let err = repo
            .create(&ctx, new_user("user0", "fresh@x.com", "p"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Duplicate { field, .. } if field == "username"));

        let mut clash = users[1].clone();
        clash.email = users[0].email.clone();
        let err = repo.update(&ctx, &clash).await.unwrap_err();
        assert!(matches!(err, AppError::Duplicate { field, .. } if field == "email"));

        // Re-saving a row with its own values is not a conflict
        repo.update(&ctx, &users[0]).await.unwrap();
    }

    #[tokio::test]
    async fn test_hostile_username_stored_verbatim() {
        let (repo, users) = seeded(1).await;
        let ctx = CancellationToken::new();
        let hostile = "\"; DROP TABLE users;\"";

        let created = repo
            .create(&ctx, new_user(hostile, "h@x.com", "p"))
            .await
            .unwrap();

        assert_eq!(repo.get_by_id(&ctx, created.id).await.unwrap().username, hostile);
        assert_eq!(repo.get_by_id(&ctx, users[0].id).await.unwrap(), users[0]);
    }

    #[tokio::test]
    async fn test_cancelled_token_performs_no_write() {
        let (repo, users) = seeded(1).await;
        let live = CancellationToken::new();
        let cancelled = CancellationToken::new();
        cancelled.cancel();

        let err = repo
            .create(&cancelled, new_user("late", "late@x.com", "p"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Cancelled { .. }));

        let err = repo.delete(&cancelled, users[0].id).await.unwrap_err();
        assert!(matches!(err, AppError::Cancelled { .. }));

        assert_eq!(repo.list(&live, 10, 0).await.unwrap().len(), 1);
        assert!(repo.get_by_id(&live, users[0].id).await.unwrap().deleted_at.is_none());
    }

    #[tokio::test]
    async fn test_list_excludes_password() {
        let (repo, _) = seeded(1).await;
        let listed = repo.list(&CancellationToken::new(), 1, 0).await.unwrap();
        let json = serde_json::to_value(&listed[0]).unwrap();
        assert!(json.get("password").is_none());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// N users: list(k, 0) has min(k, N) entries, list(k, N) is empty,
        /// and pages come back in ascending id order.
        #[test]
        fn prop_pagination_bounds(n in 0usize..20, k in 0u32..25) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                let (repo, _) = seeded(n).await;
                let ctx = CancellationToken::new();

                let first = repo.list(&ctx, k, 0).await.unwrap();
                prop_assert_eq!(first.len(), (k as usize).min(n));
                prop_assert!(first.windows(2).all(|w| w[0].id < w[1].id));

                let past_end = repo.list(&ctx, k, n as u32).await.unwrap();
                prop_assert!(past_end.is_empty());
                Ok(())
            })?;
        }
    }
}
