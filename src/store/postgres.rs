//! PostgreSQL-backed document store
//!
//! Users and courses are stored as `jsonb` documents, one row each. Lookups
//! use expression indexes on the document fields and every mutation is a
//! single `UPDATE ... RETURNING doc` statement.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Row};
use uuid::Uuid;

use super::{Enrollment, Store, DUPLICATE_COURSE_CODE, DUPLICATE_EMAIL, DUPLICATE_USERNAME};
use crate::auth::{User, UserRecord, UserUpdate};
use crate::courses::{Course, CourseFilter, CourseUpdate, MeetingLink};
use crate::error::{Error, Result};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY,
    created_at TIMESTAMPTZ NOT NULL,
    doc JSONB NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS users_email_key ON users ((doc->>'email'));
CREATE UNIQUE INDEX IF NOT EXISTS users_username_key ON users ((doc->>'username'));

CREATE TABLE IF NOT EXISTS courses (
    id UUID PRIMARY KEY,
    created_at TIMESTAMPTZ NOT NULL,
    doc JSONB NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS courses_code_key ON courses ((doc->>'courseCode'));
CREATE INDEX IF NOT EXISTS courses_teacher_idx ON courses ((doc->>'teacher'));
CREATE INDEX IF NOT EXISTS courses_students_idx ON courses USING GIN ((doc->'students'));
"#;

const STUDENTS: &str = "COALESCE(doc->'students', '[]'::jsonb)";
const LINKS: &str = "COALESCE(doc->'zoomLinks', '[]'::jsonb)";

pub struct PostgresStore {
    client: Client,
}

impl PostgresStore {
    /// Connect and create tables and indexes if missing
    pub async fn connect(url: &str) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(url, NoTls).await?;

        // Spawn the connection handler
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("PostgreSQL connection error: {}", e);
            }
        });

        client.batch_execute(SCHEMA).await?;
        tracing::debug!("Document store schema ready");

        Ok(Self { client })
    }

    async fn update_course_doc(
        &self,
        filter: &CourseFilter,
        set_doc: &str,
        mut params: Params,
    ) -> Result<Option<Course>> {
        let condition = course_condition(filter, &mut params);
        let sql = format!(
            "UPDATE courses SET doc = {} WHERE {} RETURNING doc",
            set_doc, condition
        );
        let row = self.client.query_opt(&sql, &params.as_refs()).await?;
        row.map(|r| from_row(&r)).transpose()
    }
}

/// Positional query parameters built up alongside the SQL text
#[derive(Default)]
struct Params(Vec<Box<dyn ToSql + Sync + Send>>);

impl Params {
    /// Add a value and return its placeholder
    fn push<T: ToSql + Sync + Send + 'static>(&mut self, value: T) -> String {
        self.0.push(Box::new(value));
        format!("${}", self.0.len())
    }

    fn as_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.0
            .iter()
            .map(|p| {
                let param: &(dyn ToSql + Sync) = &**p;
                param
            })
            .collect()
    }
}

fn course_condition(filter: &CourseFilter, params: &mut Params) -> String {
    let mut clauses = vec!["TRUE".to_string()];
    if let Some(id) = filter.id {
        clauses.push(format!("id = {}", params.push(id)));
    }
    if let Some(teacher) = filter.teacher {
        clauses.push(format!("doc->>'teacher' = {}", params.push(teacher.to_string())));
    }
    if let Some(student) = filter.student {
        clauses.push(format!(
            "{} ? {}::text",
            STUDENTS,
            params.push(student.to_string())
        ));
    }
    if let Some(student) = filter.not_student {
        clauses.push(format!(
            "NOT ({} ? {}::text)",
            STUDENTS,
            params.push(student.to_string())
        ));
    }
    if let Some(status) = filter.status {
        clauses.push(format!("doc->>'status' = {}", params.push(status.to_string())));
    }
    clauses.join(" AND ")
}

fn from_row<T: DeserializeOwned>(row: &Row) -> Result<T> {
    let doc: serde_json::Value = row.try_get("doc")?;
    Ok(serde_json::from_value(doc)?)
}

fn map_unique_violation(err: tokio_postgres::Error) -> Error {
    if let Some(db) = err.as_db_error() {
        if db.code() == &SqlState::UNIQUE_VIOLATION {
            let message = match db.constraint() {
                Some("users_email_key") => DUPLICATE_EMAIL,
                Some("users_username_key") => DUPLICATE_USERNAME,
                Some("courses_code_key") => DUPLICATE_COURSE_CODE,
                _ => "Duplicate value",
            };
            return Error::Validation(message.to_string());
        }
    }
    Error::Database(err)
}

#[async_trait]
impl Store for PostgresStore {
    async fn insert_user(&self, record: UserRecord) -> Result<User> {
        let doc = serde_json::to_value(&record)?;
        self.client
            .execute(
                "INSERT INTO users (id, created_at, doc) VALUES ($1, $2, $3)",
                &[&record.user.id, &record.user.created_at, &doc],
            )
            .await
            .map_err(map_unique_violation)?;
        Ok(record.user)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<UserRecord>> {
        let row = self
            .client
            .query_opt("SELECT doc FROM users WHERE id = $1", &[&id])
            .await?;
        row.map(|r| from_row(&r)).transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let row = self
            .client
            .query_opt("SELECT doc FROM users WHERE doc->>'email' = $1", &[&email])
            .await?;
        row.map(|r| from_row(&r)).transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows = self
            .client
            .query("SELECT doc FROM users ORDER BY created_at", &[])
            .await?;
        rows.iter().map(from_row).collect()
    }

    async fn users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = ids.to_vec();
        let rows = self
            .client
            .query("SELECT doc FROM users WHERE id = ANY($1)", &[&ids])
            .await?;
        rows.iter().map(from_row).collect()
    }

    async fn update_user(&self, id: Uuid, update: &UserUpdate) -> Result<Option<User>> {
        let patch = serde_json::to_value(update)?;
        let row = self
            .client
            .query_opt(
                "UPDATE users SET doc = doc || $2::jsonb WHERE id = $1 RETURNING doc",
                &[&id, &patch],
            )
            .await
            .map_err(map_unique_violation)?;
        row.map(|r| from_row(&r)).transpose()
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool> {
        let deleted = self
            .client
            .execute("DELETE FROM users WHERE id = $1", &[&id])
            .await?;
        Ok(deleted > 0)
    }

    async fn insert_course(&self, course: Course) -> Result<Course> {
        let doc = serde_json::to_value(&course)?;
        self.client
            .execute(
                "INSERT INTO courses (id, created_at, doc) VALUES ($1, $2, $3)",
                &[&course.id, &course.created_at, &doc],
            )
            .await
            .map_err(map_unique_violation)?;
        Ok(course)
    }

    async fn find_courses(&self, filter: &CourseFilter) -> Result<Vec<Course>> {
        let mut params = Params::default();
        let condition = course_condition(filter, &mut params);
        let sql = format!(
            "SELECT doc FROM courses WHERE {} ORDER BY created_at DESC",
            condition
        );
        let rows = self.client.query(&sql, &params.as_refs()).await?;
        rows.iter().map(from_row).collect()
    }

    async fn find_course(&self, filter: &CourseFilter) -> Result<Option<Course>> {
        let mut params = Params::default();
        let condition = course_condition(filter, &mut params);
        let sql = format!(
            "SELECT doc FROM courses WHERE {} ORDER BY created_at DESC LIMIT 1",
            condition
        );
        let row = self.client.query_opt(&sql, &params.as_refs()).await?;
        row.map(|r| from_row(&r)).transpose()
    }

    async fn update_course(
        &self,
        filter: &CourseFilter,
        update: &CourseUpdate,
    ) -> Result<Option<Course>> {
        let mut params = Params::default();
        let patch = params.push(serde_json::to_value(update)?);
        self.update_course_doc(filter, &format!("doc || {}::jsonb", patch), params)
            .await
    }

    async fn add_students(
        &self,
        filter: &CourseFilter,
        students: &[Uuid],
    ) -> Result<Option<Course>> {
        let mut params = Params::default();
        let ids = params.push(serde_json::to_value(students)?);
        let set_doc = format!(
            "jsonb_set(doc, '{{students}}', (\
                SELECT COALESCE(jsonb_agg(e ORDER BY ord), '[]'::jsonb) FROM (\
                    SELECT e, MIN(ord) AS ord \
                    FROM jsonb_array_elements({} || {}::jsonb) WITH ORDINALITY AS t(e, ord) \
                    GROUP BY e\
                ) dedup\
            ))",
            STUDENTS, ids
        );
        self.update_course_doc(filter, &set_doc, params).await
    }

    async fn remove_student(
        &self,
        filter: &CourseFilter,
        student: Uuid,
    ) -> Result<Option<Course>> {
        let mut params = Params::default();
        let id = params.push(student.to_string());
        let set_doc = format!("jsonb_set(doc, '{{students}}', {} - {}::text)", STUDENTS, id);
        self.update_course_doc(filter, &set_doc, params).await
    }

    async fn enroll_student(&self, course_id: Uuid, student: Uuid) -> Result<Enrollment> {
        let student = student.to_string();
        let sql = format!(
            "UPDATE courses SET doc = jsonb_set(doc, '{{students}}', {s} || jsonb_build_array($2::text)) \
             WHERE id = $1 AND NOT ({s} ? $2::text) RETURNING id",
            s = STUDENTS
        );
        let updated = self
            .client
            .query_opt(&sql, &[&course_id, &student])
            .await?;
        if updated.is_some() {
            return Ok(Enrollment::Enrolled);
        }

        let exists = self
            .client
            .query_opt("SELECT 1 FROM courses WHERE id = $1", &[&course_id])
            .await?;
        Ok(match exists {
            Some(_) => Enrollment::AlreadyEnrolled,
            None => Enrollment::CourseNotFound,
        })
    }

    async fn push_meeting_link(
        &self,
        filter: &CourseFilter,
        link: MeetingLink,
    ) -> Result<Option<Course>> {
        let mut params = Params::default();
        let link = params.push(serde_json::to_value(&link)?);
        let set_doc = format!(
            "jsonb_set(doc, '{{zoomLinks}}', {} || jsonb_build_array({}::jsonb))",
            LINKS, link
        );
        self.update_course_doc(filter, &set_doc, params).await
    }

    async fn pull_meeting_link(
        &self,
        filter: &CourseFilter,
        link_id: Uuid,
    ) -> Result<Option<Course>> {
        let mut params = Params::default();
        let id = params.push(link_id.to_string());
        let set_doc = format!(
            "jsonb_set(doc, '{{zoomLinks}}', (\
                SELECT COALESCE(jsonb_agg(l ORDER BY ord), '[]'::jsonb) \
                FROM jsonb_array_elements({}) WITH ORDINALITY AS t(l, ord) \
                WHERE l->>'_id' <> {}::text\
            ))",
            LINKS, id
        );
        self.update_course_doc(filter, &set_doc, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_numbers_placeholders_in_order() {
        let mut params = Params::default();
        let _ = params.push("patch".to_string());
        let filter = CourseFilter {
            id: Some(Uuid::new_v4()),
            teacher: Some(Uuid::new_v4()),
            ..Default::default()
        };
        let condition = course_condition(&filter, &mut params);
        assert_eq!(condition, "TRUE AND id = $2 AND doc->>'teacher' = $3");
        assert_eq!(params.as_refs().len(), 3);
    }

    #[test]
    fn test_available_condition() {
        let mut params = Params::default();
        let condition = course_condition(&CourseFilter::available_to(Uuid::new_v4()), &mut params);
        assert!(condition.contains("NOT (COALESCE(doc->'students', '[]'::jsonb) ? $1::text)"));
        assert!(condition.contains("doc->>'status' = $2"));
    }

    #[test]
    fn test_empty_filter_matches_all() {
        let mut params = Params::default();
        assert_eq!(course_condition(&CourseFilter::default(), &mut params), "TRUE");
    }
}
