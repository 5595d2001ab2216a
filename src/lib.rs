//! coursedesk - course management API
//!
//! This is the library interface for coursedesk: the document store, the
//! authentication core, course operations and the HTTP API built on them.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod courses;
pub mod error;
pub mod store;

pub use config::Config;
pub use error::Error;
