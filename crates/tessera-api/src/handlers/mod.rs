//! HTTP handlers for tessera-api.

pub mod catalog;
pub mod content;
pub mod health;
