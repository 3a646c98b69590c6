//! Domain layer for the application template.
//!
//! This crate contains:
//! - Domain models (users, tokens, configuration, permissions, sessions)
//! - Interfaces of the collaborators services depend on (unit of work,
//!   cache provider, email provider)

pub mod models;
pub mod services;
