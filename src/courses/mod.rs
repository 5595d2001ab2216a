//! Courses, enrollment and meeting links

pub mod models;
pub mod service;

pub use models::*;
