//! Service layer for business logic operations.
//!
//! Services encapsulate business logic and coordinate between
//! repositories and handlers.

mod user_service;

pub use user_service::UserService;

use std::sync::Arc;

use crate::repositories::UserRepository;

/// Aggregates all services for convenient access.
///
/// This struct is designed to be used as Axum application state.
/// Cloning is cheap since repositories are shared through `Arc`.
#[derive(Clone)]
pub struct Services {
    pub users: UserService,
}

impl Services {
    /// Creates the services on top of the given user repository.
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self {
            users: UserService::new(users),
        }
    }
}
