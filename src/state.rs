//! Application state for Axum web framework.
//!
//! Contains shared services and resources that are accessible
//! across all request handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::repositories::UserRepository;
use crate::services::Services;

/// Application state containing all shared services and resources.
///
/// Cloning is cheap since services share their repository through `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// All business logic services
    pub services: Services,
    /// Deadline applied to every request
    pub request_timeout: Duration,
}

impl AppState {
    /// Creates the application state on top of a user repository.
    ///
    /// # Example
    /// ```ignore
    /// let pool = establish_async_connection_pool(&settings.database).await?;
    /// let state = AppState::new(Arc::new(PgUserRepository::new(pool)), Duration::from_secs(30));
    /// ```
    pub fn new(users: Arc<dyn UserRepository>, request_timeout: Duration) -> Self {
        Self {
            services: Services::new(users),
            request_timeout,
        }
    }
}
