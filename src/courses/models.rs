//! Course documents and request payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::auth::UserSummary;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CourseStatus {
    #[default]
    Active,
    Inactive,
}

impl fmt::Display for CourseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CourseStatus::Active => write!(f, "active"),
            CourseStatus::Inactive => write!(f, "inactive"),
        }
    }
}

/// A scheduled online meeting attached to a course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingLink {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub topic: String,
    pub link: String,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Course document.
///
/// `T` is the teacher reference and `S` the student reference. Stored
/// documents use ids for both; responses swap one of them for
/// [`UserSummary`] entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course<T = Uuid, S = Uuid> {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub course_name: String,
    pub course_code: String,
    pub description: String,
    pub teacher: T,
    #[serde(default)]
    pub students: Vec<S>,
    #[serde(default)]
    pub zoom_links: Vec<MeetingLink>,
    #[serde(default)]
    pub status: CourseStatus,
    pub created_at: DateTime<Utc>,
}

/// Course as shown to its teacher
pub type TeacherCourseView = Course<Uuid, UserSummary>;

/// Course as shown to a student; the teacher may have been deleted
pub type StudentCourseView = Course<Option<UserSummary>, Uuid>;

impl Course {
    pub fn new(new: NewCourse, teacher: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            course_name: new.course_name,
            course_code: new.course_code,
            description: new.description,
            teacher,
            students: Vec::new(),
            zoom_links: Vec::new(),
            status: CourseStatus::Active,
            created_at: Utc::now(),
        }
    }

    pub fn has_student(&self, student: Uuid) -> bool {
        self.students.contains(&student)
    }

    /// Append ids not already present, keeping first-seen order
    pub fn add_students(&mut self, ids: &[Uuid]) {
        for id in ids {
            if !self.students.contains(id) {
                self.students.push(*id);
            }
        }
    }

    /// Replace student ids with summaries, dropping users that no longer exist
    pub fn with_students(self, users: &HashMap<Uuid, UserSummary>) -> TeacherCourseView {
        let students = self
            .students
            .iter()
            .filter_map(|id| users.get(id).cloned())
            .collect();
        Course {
            id: self.id,
            course_name: self.course_name,
            course_code: self.course_code,
            description: self.description,
            teacher: self.teacher,
            students,
            zoom_links: self.zoom_links,
            status: self.status,
            created_at: self.created_at,
        }
    }

    /// Replace the teacher id with a summary
    pub fn with_teacher(self, users: &HashMap<Uuid, UserSummary>) -> StudentCourseView {
        let teacher = users.get(&self.teacher).cloned();
        Course {
            id: self.id,
            course_name: self.course_name,
            course_code: self.course_code,
            description: self.description,
            teacher,
            students: self.students,
            zoom_links: self.zoom_links,
            status: self.status,
            created_at: self.created_at,
        }
    }
}

/// Validated input for a new course
#[derive(Debug, Clone)]
pub struct NewCourse {
    pub course_name: String,
    pub course_code: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseRequest {
    #[serde(default)]
    pub course_name: String,
    #[serde(default)]
    pub course_code: String,
    #[serde(default)]
    pub description: String,
}

impl TryFrom<CreateCourseRequest> for NewCourse {
    type Error = Error;

    fn try_from(req: CreateCourseRequest) -> Result<Self> {
        Ok(NewCourse {
            course_name: required("courseName", &req.course_name)?,
            course_code: required("courseCode", &req.course_code)?,
            description: required("description", &req.description)?,
        })
    }
}

/// Partial course update; serialises to the fields being changed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CourseStatus>,
}

impl CourseUpdate {
    /// Trim text fields and reject blanks
    pub fn validate(mut self) -> Result<Self> {
        if let Some(name) = &self.course_name {
            self.course_name = Some(required("courseName", name)?);
        }
        if let Some(description) = &self.description {
            self.description = Some(required("description", description)?);
        }
        Ok(self)
    }

    pub fn apply<T, S>(&self, course: &mut Course<T, S>) {
        if let Some(name) = &self.course_name {
            course.course_name = name.clone();
        }
        if let Some(description) = &self.description {
            course.description = description.clone();
        }
        if let Some(status) = self.status {
            course.status = status;
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddStudentsRequest {
    #[serde(default)]
    pub student_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct AddMeetingLinkRequest {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub link: String,
    pub date: Option<DateTime<Utc>>,
}

impl TryFrom<AddMeetingLinkRequest> for MeetingLink {
    type Error = Error;

    fn try_from(req: AddMeetingLinkRequest) -> Result<Self> {
        let date = req
            .date
            .ok_or_else(|| Error::Validation("date is required".to_string()))?;
        Ok(MeetingLink {
            id: Uuid::new_v4(),
            topic: required("topic", &req.topic)?,
            link: required("link", &req.link)?,
            date,
            created_at: Utc::now(),
        })
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::Validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

/// Selects course documents. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct CourseFilter {
    pub id: Option<Uuid>,
    pub teacher: Option<Uuid>,
    pub student: Option<Uuid>,
    pub not_student: Option<Uuid>,
    pub status: Option<CourseStatus>,
}

impl CourseFilter {
    pub fn by_id(id: Uuid) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }

    /// A course owned by `teacher`
    pub fn owned(id: Uuid, teacher: Uuid) -> Self {
        Self {
            id: Some(id),
            teacher: Some(teacher),
            ..Default::default()
        }
    }

    pub fn taught_by(teacher: Uuid) -> Self {
        Self {
            teacher: Some(teacher),
            ..Default::default()
        }
    }

    pub fn enrolled(student: Uuid) -> Self {
        Self {
            student: Some(student),
            ..Default::default()
        }
    }

    /// Active courses the student has not joined
    pub fn available_to(student: Uuid) -> Self {
        Self {
            not_student: Some(student),
            status: Some(CourseStatus::Active),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn matches(&self, course: &Course) -> bool {
        self.id.map_or(true, |id| course.id == id)
            && self.teacher.map_or(true, |t| course.teacher == t)
            && self.student.map_or(true, |s| course.has_student(s))
            && self.not_student.map_or(true, |s| !course.has_student(s))
            && self.status.map_or(true, |s| course.status == s)
    }
}
