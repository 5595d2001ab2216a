//! HTTP API server

pub mod courses;
pub mod routes;
pub mod server;

pub use server::*;
