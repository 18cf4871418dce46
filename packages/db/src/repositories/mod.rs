//! Repository implementations for database operations.

mod nav_repo;

pub use nav_repo::NavRepository;
