//! Database connection pool module.
//!
//! Provides async PostgreSQL connection pooling using diesel_async with bb8,
//! plus the helper every repository call uses to honor request cancellation.

mod cancel;
mod pool;

pub use cancel::{CancelOnDrop, run_cancellable};
pub use pool::{AsyncDbPool, establish_async_connection_pool};
