//! Shared utilities for the application template.
//!
//! This crate provides small building blocks used by the other crates:
//! - Password hashing with Argon2id
//! - Formatting and parsing of single-use user tokens
//! - Construction of links embedded in transactional emails

pub mod links;
pub mod password;
pub mod token;
