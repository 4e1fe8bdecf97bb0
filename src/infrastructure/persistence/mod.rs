//! Persistence implementations

pub mod memory;
#[cfg(feature = "postgres")]
pub mod database;
#[cfg(feature = "postgres")]
pub mod friendship_repository;
#[cfg(feature = "postgres")]
pub mod thread_repository;
#[cfg(feature = "postgres")]
pub mod user_repository;

pub use memory::MemoryStore;

#[cfg(feature = "postgres")]
pub use database::{create_pool, run_migrations, DatabaseConfig};
#[cfg(feature = "postgres")]
pub use friendship_repository::PgFriendshipRepository;
#[cfg(feature = "postgres")]
pub use thread_repository::PgThreadRepository;
#[cfg(feature = "postgres")]
pub use user_repository::PgUserRepository;
