//! Course and enrollment operations

use std::collections::HashMap;
use uuid::Uuid;

use super::models::{
    Course, CourseFilter, CourseUpdate, MeetingLink, NewCourse, StudentCourseView,
    TeacherCourseView,
};
use crate::auth::{User, UserRole, UserSummary};
use crate::error::{Error, Result};
use crate::store::{Enrollment, Store};

const COURSE_NOT_FOUND: &str = "Course not found";

fn course_not_found() -> Error {
    Error::NotFound(COURSE_NOT_FOUND.to_string())
}

/// Load user summaries for the given ids
async fn summaries(store: &dyn Store, ids: &[Uuid]) -> Result<HashMap<Uuid, UserSummary>> {
    Ok(store
        .users_by_ids(ids)
        .await?
        .iter()
        .map(|u| (u.id, UserSummary::from(u)))
        .collect())
}

async fn with_students(store: &dyn Store, courses: Vec<Course>) -> Result<Vec<TeacherCourseView>> {
    let mut ids: Vec<Uuid> = courses.iter().flat_map(|c| c.students.iter().copied()).collect();
    ids.sort_unstable();
    ids.dedup();
    let users = summaries(store, &ids).await?;
    Ok(courses.into_iter().map(|c| c.with_students(&users)).collect())
}

async fn with_teachers(store: &dyn Store, courses: Vec<Course>) -> Result<Vec<StudentCourseView>> {
    let mut ids: Vec<Uuid> = courses.iter().map(|c| c.teacher).collect();
    ids.sort_unstable();
    ids.dedup();
    let users = summaries(store, &ids).await?;
    Ok(courses.into_iter().map(|c| c.with_teacher(&users)).collect())
}

fn single<T>(views: Vec<T>) -> Result<T> {
    views.into_iter().next().ok_or_else(course_not_found)
}

// Teacher operations

pub async fn create_course(store: &dyn Store, teacher: &User, new: NewCourse) -> Result<Course> {
    let course = store.insert_course(Course::new(new, teacher.id)).await?;
    tracing::info!("Teacher {} created course {} ({})", teacher.id, course.id, course.course_code);
    Ok(course)
}

/// The teacher's courses, newest first, with students populated
pub async fn teacher_courses(store: &dyn Store, teacher: &User) -> Result<Vec<TeacherCourseView>> {
    let courses = store.find_courses(&CourseFilter::taught_by(teacher.id)).await?;
    with_students(store, courses).await
}

pub async fn teacher_course(
    store: &dyn Store,
    teacher: &User,
    course_id: Uuid,
) -> Result<TeacherCourseView> {
    let course = store
        .find_course(&CourseFilter::owned(course_id, teacher.id))
        .await?
        .ok_or_else(course_not_found)?;
    single(with_students(store, vec![course]).await?)
}

pub async fn update_course(
    store: &dyn Store,
    teacher: &User,
    course_id: Uuid,
    update: CourseUpdate,
) -> Result<Course> {
    let update = update.validate()?;
    store
        .update_course(&CourseFilter::owned(course_id, teacher.id), &update)
        .await?
        .ok_or_else(course_not_found)
}

/// Add students to a course the teacher owns. Every id must name an
/// existing student account.
pub async fn add_students(
    store: &dyn Store,
    teacher: &User,
    course_id: Uuid,
    student_ids: &[Uuid],
) -> Result<TeacherCourseView> {
    let filter = CourseFilter::owned(course_id, teacher.id);
    if store.find_course(&filter).await?.is_none() {
        return Err(course_not_found());
    }

    let students = store
        .users_by_ids(student_ids)
        .await?
        .into_iter()
        .filter(|u| u.role == UserRole::Student)
        .count();
    if students != student_ids.len() {
        return Err(Error::Validation("Invalid student IDs provided".to_string()));
    }

    let course = store
        .add_students(&filter, student_ids)
        .await?
        .ok_or_else(course_not_found)?;
    single(with_students(store, vec![course]).await?)
}

pub async fn remove_student(
    store: &dyn Store,
    teacher: &User,
    course_id: Uuid,
    student_id: Uuid,
) -> Result<()> {
    store
        .remove_student(&CourseFilter::owned(course_id, teacher.id), student_id)
        .await?
        .ok_or_else(course_not_found)?;
    Ok(())
}

pub async fn add_meeting_link(
    store: &dyn Store,
    teacher: &User,
    course_id: Uuid,
    link: MeetingLink,
) -> Result<Course> {
    store
        .push_meeting_link(&CourseFilter::owned(course_id, teacher.id), link)
        .await?
        .ok_or_else(course_not_found)
}

pub async fn remove_meeting_link(
    store: &dyn Store,
    teacher: &User,
    course_id: Uuid,
    link_id: Uuid,
) -> Result<()> {
    store
        .pull_meeting_link(&CourseFilter::owned(course_id, teacher.id), link_id)
        .await?
        .ok_or_else(course_not_found)?;
    Ok(())
}

// Student operations

pub async fn student_courses(store: &dyn Store, student: &User) -> Result<Vec<StudentCourseView>> {
    let courses = store.find_courses(&CourseFilter::enrolled(student.id)).await?;
    with_teachers(store, courses).await
}

pub async fn student_course(
    store: &dyn Store,
    student: &User,
    course_id: Uuid,
) -> Result<StudentCourseView> {
    let course = store
        .find_course(&CourseFilter::enrolled(student.id).with_id(course_id))
        .await?
        .ok_or_else(course_not_found)?;
    single(with_teachers(store, vec![course]).await?)
}

/// Active courses the student has not joined yet
pub async fn available_courses(
    store: &dyn Store,
    student: &User,
) -> Result<Vec<StudentCourseView>> {
    let courses = store.find_courses(&CourseFilter::available_to(student.id)).await?;
    with_teachers(store, courses).await
}

pub async fn enroll(store: &dyn Store, student: &User, course_id: Uuid) -> Result<()> {
    match store.enroll_student(course_id, student.id).await? {
        Enrollment::Enrolled => {
            tracing::info!("Student {} enrolled in course {}", student.id, course_id);
            Ok(())
        }
        Enrollment::AlreadyEnrolled => Err(Error::Validation(
            "Already enrolled in this course".to_string(),
        )),
        Enrollment::CourseNotFound => Err(course_not_found()),
    }
}
