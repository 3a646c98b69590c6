//! HTTP route handlers.

pub mod account;
pub mod admin;
pub mod contact;
pub mod health;
pub mod permissions;
pub mod users;
