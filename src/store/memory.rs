//! In-process document store

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Enrollment, Store, DUPLICATE_COURSE_CODE, DUPLICATE_EMAIL, DUPLICATE_USERNAME};
use crate::auth::{User, UserRecord, UserUpdate};
use crate::courses::{Course, CourseFilter, CourseUpdate, MeetingLink};
use crate::error::{Error, Result};

/// Documents held in maps behind async locks. Each operation takes the
/// write lock once, which makes check-then-write sequences atomic.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, UserRecord>>,
    courses: RwLock<HashMap<Uuid, Course>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }

    async fn modify_course<F>(&self, filter: &CourseFilter, f: F) -> Result<Option<Course>>
    where
        F: FnOnce(&mut Course) + Send,
    {
        let mut courses = self.courses.write().await;
        let Some(course) = courses.values_mut().find(|c| filter.matches(c)) else {
            return Ok(None);
        };
        f(course);
        Ok(Some(course.clone()))
    }
}

fn check_unique(
    users: &HashMap<Uuid, UserRecord>,
    skip: Option<Uuid>,
    username: Option<&str>,
    email: Option<&str>,
) -> Result<()> {
    for record in users.values().filter(|r| Some(r.user.id) != skip) {
        if email == Some(record.user.email.as_str()) {
            return Err(Error::Validation(DUPLICATE_EMAIL.to_string()));
        }
        if username == Some(record.user.username.as_str()) {
            return Err(Error::Validation(DUPLICATE_USERNAME.to_string()));
        }
    }
    Ok(())
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, record: UserRecord) -> Result<User> {
        let mut users = self.users.write().await;
        check_unique(
            &users,
            None,
            Some(&record.user.username),
            Some(&record.user.email),
        )?;
        let user = record.user.clone();
        users.insert(user.id, record);
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<UserRecord>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|r| r.user.email == email)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self
            .users
            .read()
            .await
            .values()
            .map(|r| r.user.clone())
            .collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .filter(|r| ids.contains(&r.user.id))
            .map(|r| r.user.clone())
            .collect())
    }

    async fn update_user(&self, id: Uuid, update: &UserUpdate) -> Result<Option<User>> {
        let mut users = self.users.write().await;
        if !users.contains_key(&id) {
            return Ok(None);
        }
        check_unique(
            &users,
            Some(id),
            update.username.as_deref(),
            update.email.as_deref(),
        )?;
        Ok(users.get_mut(&id).map(|record| {
            update.apply(&mut record.user);
            record.user.clone()
        }))
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool> {
        Ok(self.users.write().await.remove(&id).is_some())
    }

    async fn insert_course(&self, course: Course) -> Result<Course> {
        let mut courses = self.courses.write().await;
        if courses.values().any(|c| c.course_code == course.course_code) {
            return Err(Error::Validation(DUPLICATE_COURSE_CODE.to_string()));
        }
        courses.insert(course.id, course.clone());
        Ok(course)
    }

    async fn find_courses(&self, filter: &CourseFilter) -> Result<Vec<Course>> {
        let mut found: Vec<Course> = self
            .courses
            .read()
            .await
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn update_course(
        &self,
        filter: &CourseFilter,
        update: &CourseUpdate,
    ) -> Result<Option<Course>> {
        self.modify_course(filter, |course| update.apply(course)).await
    }

    async fn add_students(
        &self,
        filter: &CourseFilter,
        students: &[Uuid],
    ) -> Result<Option<Course>> {
        self.modify_course(filter, |course| course.add_students(students))
            .await
    }

    async fn remove_student(
        &self,
        filter: &CourseFilter,
        student: Uuid,
    ) -> Result<Option<Course>> {
        self.modify_course(filter, |course| course.students.retain(|s| *s != student))
            .await
    }

    async fn enroll_student(&self, course_id: Uuid, student: Uuid) -> Result<Enrollment> {
        let mut courses = self.courses.write().await;
        let Some(course) = courses.get_mut(&course_id) else {
            return Ok(Enrollment::CourseNotFound);
        };
        if course.has_student(student) {
            return Ok(Enrollment::AlreadyEnrolled);
        }
        course.students.push(student);
        Ok(Enrollment::Enrolled)
    }

    async fn push_meeting_link(
        &self,
        filter: &CourseFilter,
        link: MeetingLink,
    ) -> Result<Option<Course>> {
        self.modify_course(filter, |course| course.zoom_links.push(link))
            .await
    }

    async fn pull_meeting_link(
        &self,
        filter: &CourseFilter,
        link_id: Uuid,
    ) -> Result<Option<Course>> {
        self.modify_course(filter, |course| {
            course.zoom_links.retain(|l| l.id != link_id)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::UserRole;
    use crate::courses::NewCourse;

    fn record(username: &str, email: &str, role: UserRole) -> UserRecord {
        UserRecord {
            user: User::new(username.into(), email.into(), role),
            password_hash: "hash".into(),
        }
    }

    fn course(code: &str, teacher: Uuid) -> Course {
        Course::new(
            NewCourse {
                course_name: "Course".into(),
                course_code: code.into(),
                description: "desc".into(),
            },
            teacher,
        )
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryStore::new();
        store
            .insert_user(record("alice", "a@example.com", UserRole::Student))
            .await
            .unwrap();

        let err = store
            .insert_user(record("alice2", "a@example.com", UserRole::Student))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(msg) if msg == DUPLICATE_EMAIL));
        assert_eq!(store.user_count().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let store = MemoryStore::new();
        store
            .insert_user(record("alice", "a@example.com", UserRole::Student))
            .await
            .unwrap();

        let err = store
            .insert_user(record("alice", "b@example.com", UserRole::Student))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(msg) if msg == DUPLICATE_USERNAME));
    }

    #[tokio::test]
    async fn test_update_user_checks_other_users_only() {
        let store = MemoryStore::new();
        let alice = store
            .insert_user(record("alice", "a@example.com", UserRole::Student))
            .await
            .unwrap();
        store
            .insert_user(record("bob", "b@example.com", UserRole::Student))
            .await
            .unwrap();

        // Re-submitting one's own email is fine
        let same = UserUpdate {
            email: Some("a@example.com".into()),
            ..Default::default()
        };
        assert!(store.update_user(alice.id, &same).await.unwrap().is_some());

        let taken = UserUpdate {
            email: Some("b@example.com".into()),
            ..Default::default()
        };
        assert!(store.update_user(alice.id, &taken).await.is_err());

        assert!(store
            .update_user(Uuid::new_v4(), &same)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_enroll_twice_is_idempotent() {
        let store = MemoryStore::new();
        let created = store.insert_course(course("C1", Uuid::new_v4())).await.unwrap();
        let student = Uuid::new_v4();

        assert_eq!(
            store.enroll_student(created.id, student).await.unwrap(),
            Enrollment::Enrolled
        );
        assert_eq!(
            store.enroll_student(created.id, student).await.unwrap(),
            Enrollment::AlreadyEnrolled
        );
        let stored = store
            .find_course(&CourseFilter::by_id(created.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.students, vec![student]);

        assert_eq!(
            store.enroll_student(Uuid::new_v4(), student).await.unwrap(),
            Enrollment::CourseNotFound
        );
    }

    #[tokio::test]
    async fn test_course_code_unique() {
        let store = MemoryStore::new();
        store.insert_course(course("C1", Uuid::new_v4())).await.unwrap();
        let err = store
            .insert_course(course("C1", Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(msg) if msg == DUPLICATE_COURSE_CODE));
    }

    #[tokio::test]
    async fn test_owner_scoped_updates() {
        let store = MemoryStore::new();
        let teacher = Uuid::new_v4();
        let created = store.insert_course(course("C1", teacher)).await.unwrap();
        let student = Uuid::new_v4();

        let stranger = CourseFilter::owned(created.id, Uuid::new_v4());
        assert!(store
            .add_students(&stranger, &[student])
            .await
            .unwrap()
            .is_none());

        let owner = CourseFilter::owned(created.id, teacher);
        let updated = store
            .add_students(&owner, &[student, student])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.students, vec![student]);

        let updated = store.remove_student(&owner, student).await.unwrap().unwrap();
        assert!(updated.students.is_empty());
    }

    #[tokio::test]
    async fn test_find_courses_newest_first() {
        let store = MemoryStore::new();
        let teacher = Uuid::new_v4();
        let mut older = course("OLD", teacher);
        older.created_at -= chrono::Duration::hours(1);
        store.insert_course(older).await.unwrap();
        store.insert_course(course("NEW", teacher)).await.unwrap();

        let found = store
            .find_courses(&CourseFilter::taught_by(teacher))
            .await
            .unwrap();
        let codes: Vec<_> = found.iter().map(|c| c.course_code.as_str()).collect();
        assert_eq!(codes, vec!["NEW", "OLD"]);
    }
}
