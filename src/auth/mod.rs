//! Authentication and authorization

pub mod credentials;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;

pub use credentials::CredentialStore;
pub use jwt::{Claims, TokenService};
pub use middleware::{extract_bearer_token, require_auth, role_guard, AuthUser};
pub use models::{User, UserRecord, UserRole, UserSummary, UserUpdate};
