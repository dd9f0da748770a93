//! PostgreSQL user repository.
//!
//! Statements are built with diesel's query DSL, so every caller-supplied
//! value is sent as a bind parameter, and executed through diesel_async.

use async_trait::async_trait;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::query_builder::QueryFragment;
use diesel::result::Error as DieselError;
use diesel_async::methods::{ExecuteDsl, LoadQuery};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use jiff::Timestamp;
use jiff_diesel::ToDiesel;
use tokio_util::sync::CancellationToken;

use crate::db::{AsyncDbPool, CancelOnDrop, run_cancellable};
use crate::error::{AppError, AppResult, DatabaseErrorConverter};
use crate::models::{NewUser, User, UserSummary};
use crate::repositories::UserRepository;
use crate::schema::users;

const LOG_TARGET: &str = "userbase::repositories";

/// Full row as read from the `users` table.
#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(Pg))]
struct UserRow {
    id: i32,
    username: String,
    email: String,
    password: String,
    created_at: jiff_diesel::Timestamp,
    updated_at: jiff_diesel::Timestamp,
    deleted_at: Option<jiff_diesel::Timestamp>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            password: row.password,
            created_at: row.created_at.to_jiff(),
            updated_at: row.updated_at.to_jiff(),
            deleted_at: row.deleted_at.map(|ts| ts.to_jiff()),
        }
    }
}

/// Listing projection; the password column is never selected.
#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(Pg))]
struct UserSummaryRow {
    id: i32,
    username: String,
    email: String,
    created_at: jiff_diesel::Timestamp,
    updated_at: jiff_diesel::Timestamp,
}

impl From<UserSummaryRow> for UserSummary {
    fn from(row: UserSummaryRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            created_at: row.created_at.to_jiff(),
            updated_at: row.updated_at.to_jiff(),
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
struct NewUserRow<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
    created_at: jiff_diesel::Timestamp,
    updated_at: jiff_diesel::Timestamp,
}

impl<'a> NewUserRow<'a> {
    fn new(new_user: &'a NewUser, now: Timestamp) -> Self {
        Self {
            username: &new_user.username,
            email: &new_user.email,
            password: &new_user.password,
            created_at: now.to_diesel(),
            updated_at: now.to_diesel(),
        }
    }
}

/// `INSERT ... RETURNING` the stored row.
fn insert_query<'a>(
    row: &'a NewUserRow<'a>,
) -> impl LoadQuery<'a, AsyncPgConnection, UserRow> + QueryFragment<Pg> + 'a {
    diesel::insert_into(users::table)
        .values(row)
        .returning(UserRow::as_returning())
}

fn select_by_id_query(
    user_id: i32,
) -> impl LoadQuery<'static, AsyncPgConnection, UserRow> + QueryFragment<Pg> {
    users::table
        .filter(users::id.eq(user_id))
        .select(UserRow::as_select())
        .limit(1)
}

/// Overwrites the mutable columns and stamps `updated_at` with `now`.
fn update_query<'a>(
    user: &'a User,
    now: Timestamp,
) -> impl LoadQuery<'a, AsyncPgConnection, UserRow> + QueryFragment<Pg> + 'a {
    diesel::update(users::table.filter(users::id.eq(user.id)))
        .set((
            users::username.eq(&user.username),
            users::email.eq(&user.email),
            users::password.eq(&user.password),
            users::updated_at.eq(now.to_diesel()),
        ))
        .returning(UserRow::as_returning())
}

fn soft_delete_query(
    user_id: i32,
    now: Timestamp,
) -> impl ExecuteDsl<AsyncPgConnection> + QueryFragment<Pg> {
    diesel::update(users::table.filter(users::id.eq(user_id)))
        .set(users::deleted_at.eq(Some(now.to_diesel())))
}

/// Live users in id order; the password column is never selected.
fn list_query(
    limit: u32,
    offset: u32,
) -> impl LoadQuery<'static, AsyncPgConnection, UserSummaryRow> + QueryFragment<Pg> {
    users::table
        .filter(users::deleted_at.is_null())
        .order(users::id.asc())
        .limit(i64::from(limit))
        .offset(i64::from(offset))
        .select(UserSummaryRow::as_select())
}

/// Logs the statement text and its binds at debug level.
fn log_statement<Q>(operation: &str, query: &Q)
where
    Q: QueryFragment<Pg>,
{
    tracing::debug!(
        target: LOG_TARGET,
        operation,
        sql = %diesel::debug_query::<Pg, _>(query),
        "Executing statement"
    );
}

/// Maps a diesel error for a statement addressing a single user id.
fn user_error(operation: &'static str, user_id: i32) -> impl FnOnce(DieselError) -> AppError {
    move |error| match error {
        DieselError::NotFound => AppError::user_not_found(user_id),
        other => DatabaseErrorConverter::convert_diesel_error(other, operation),
    }
}

/// User repository backed by a PostgreSQL connection pool.
///
/// Since `AsyncDbPool` (bb8::Pool) internally uses `Arc`, cloning is cheap.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: AsyncDbPool,
}

impl PgUserRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, ctx: &CancellationToken, new_user: NewUser) -> AppResult<User> {
        const OPERATION: &str = "insert user";

        run_cancellable(ctx, OPERATION, async {
            let mut conn = self.pool.get().await?;

            let row = NewUserRow::new(&new_user, Timestamp::now());
            let query = insert_query(&row);
            log_statement(OPERATION, &query);

            let guard = CancelOnDrop::new(OPERATION, &conn);
            let result = query.get_result::<UserRow>(&mut *conn).await;
            guard.disarm();

            result
                .map(User::from)
                .map_err(|e| DatabaseErrorConverter::convert_diesel_error(e, OPERATION))
        })
        .await
    }

    async fn get_by_id(&self, ctx: &CancellationToken, user_id: i32) -> AppResult<User> {
        const OPERATION: &str = "select user";

        run_cancellable(ctx, OPERATION, async {
            let mut conn = self.pool.get().await?;

            let query = select_by_id_query(user_id);
            log_statement(OPERATION, &query);

            let guard = CancelOnDrop::new(OPERATION, &conn);
            let result = query.get_result::<UserRow>(&mut *conn).await;
            guard.disarm();

            result
                .map(User::from)
                .map_err(user_error(OPERATION, user_id))
        })
        .await
    }

    async fn update(&self, ctx: &CancellationToken, user: &User) -> AppResult<User> {
        const OPERATION: &str = "update user";

        run_cancellable(ctx, OPERATION, async {
            let mut conn = self.pool.get().await?;

            let query = update_query(user, Timestamp::now());
            log_statement(OPERATION, &query);

            let guard = CancelOnDrop::new(OPERATION, &conn);
            let result = query.get_result::<UserRow>(&mut *conn).await;
            guard.disarm();

            // RETURNING yields no row when the id is unknown
            result
                .map(User::from)
                .map_err(user_error(OPERATION, user.id))
        })
        .await
    }

    async fn delete(&self, ctx: &CancellationToken, user_id: i32) -> AppResult<()> {
        const OPERATION: &str = "soft delete user";

        run_cancellable(ctx, OPERATION, async {
            let mut conn = self.pool.get().await?;

            let query = soft_delete_query(user_id, Timestamp::now());
            log_statement(OPERATION, &query);

            let guard = CancelOnDrop::new(OPERATION, &conn);
            let result = query.execute(&mut *conn).await;
            guard.disarm();

            let affected = result.map_err(user_error(OPERATION, user_id))?;
            if affected == 0 {
                return Err(AppError::user_not_found(user_id));
            }
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
        const OPERATION: &str = "list users";

        run_cancellable(ctx, OPERATION, async {
            let mut conn = self.pool.get().await?;

            let query = list_query(limit, offset);
            log_statement(OPERATION, &query);

            let guard = CancelOnDrop::new(OPERATION, &conn);
            let result = query.load::<UserSummaryRow>(&mut *conn).await;
            guard.disarm();

            let rows =
                result.map_err(|e| DatabaseErrorConverter::convert_diesel_error(e, OPERATION))?;
            Ok(rows.into_iter().map(UserSummary::from).collect())
        })
        .await
    }
}
