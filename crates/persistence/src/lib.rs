//! Persistence layer for the application template.
//!
//! This crate contains:
//! - Database connection management and the PostgreSQL unit of work
//! - Entity definitions (database row mappings)
//! - Repository implementations scoped to a transaction
//! - An in-memory unit-of-work backend for development and tests

pub mod db;
pub mod entities;
pub mod memory;
pub mod metrics;
pub mod repositories;

pub use db::{create_pool, DatabaseConfig, PgUnitOfWork, PgUnitOfWorkFactory};
pub use memory::MemoryStore;
