//! Document store for users and courses
//!
//! Every mutation is a single atomic document update: enrolling a student,
//! appending a meeting link or merging a partial update never spans more
//! than one write. Two backends implement [`Store`]: [`MemoryStore`] keeps
//! documents in process and [`PostgresStore`] keeps them as `jsonb` rows.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{User, UserRecord, UserUpdate};
use crate::config::DatabaseConfig;
use crate::courses::{Course, CourseFilter, CourseUpdate, MeetingLink};
use crate::error::Result;

/// Outcome of a student self-enrollment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enrollment {
    Enrolled,
    AlreadyEnrolled,
    CourseNotFound,
}

pub(crate) const DUPLICATE_EMAIL: &str = "Email already registered";
pub(crate) const DUPLICATE_USERNAME: &str = "Username already taken";
pub(crate) const DUPLICATE_COURSE_CODE: &str = "Course code already exists";

#[async_trait]
pub trait Store: Send + Sync {
    /// Persist a new user. Fails with a validation error when the email or
    /// username is taken.
    async fn insert_user(&self, record: UserRecord) -> Result<User>;

    async fn get_user(&self, id: Uuid) -> Result<Option<UserRecord>>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>>;

    /// All users in creation order
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Users with the given ids; unknown ids are skipped
    async fn users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>>;

    async fn update_user(&self, id: Uuid, update: &UserUpdate) -> Result<Option<User>>;

    async fn delete_user(&self, id: Uuid) -> Result<bool>;

    /// Persist a new course. Fails with a validation error when the course
    /// code is taken.
    async fn insert_course(&self, course: Course) -> Result<Course>;

    /// Matching courses, newest first
    async fn find_courses(&self, filter: &CourseFilter) -> Result<Vec<Course>>;

    async fn find_course(&self, filter: &CourseFilter) -> Result<Option<Course>> {
        Ok(self.find_courses(filter).await?.into_iter().next())
    }

    async fn update_course(
        &self,
        filter: &CourseFilter,
        update: &CourseUpdate,
    ) -> Result<Option<Course>>;

    /// Union `students` into the matching course, without duplicates
    async fn add_students(&self, filter: &CourseFilter, students: &[Uuid])
        -> Result<Option<Course>>;

    async fn remove_student(&self, filter: &CourseFilter, student: Uuid)
        -> Result<Option<Course>>;

    /// Append `student` unless already enrolled
    async fn enroll_student(&self, course_id: Uuid, student: Uuid) -> Result<Enrollment>;

    async fn push_meeting_link(
        &self,
        filter: &CourseFilter,
        link: MeetingLink,
    ) -> Result<Option<Course>>;

    async fn pull_meeting_link(&self, filter: &CourseFilter, link_id: Uuid)
        -> Result<Option<Course>>;
}

pub type SharedStore = Arc<dyn Store>;

/// Open the store named by the configuration
pub async fn connect(config: &DatabaseConfig) -> Result<SharedStore> {
    match &config.url {
        Some(url) => {
            let store = PostgresStore::connect(url).await?;
            tracing::info!("Using PostgreSQL document store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("No database.url configured, data will not survive a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
