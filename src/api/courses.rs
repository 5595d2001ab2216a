//! API route handlers for courses and enrollment

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use super::routes::{parse_id, MessageResponse};
use super::server::SharedState;
use crate::auth::AuthUser;
use crate::courses::{
    service, AddMeetingLinkRequest, AddStudentsRequest, Course, CourseUpdate,
    CreateCourseRequest, MeetingLink, NewCourse, StudentCourseView, TeacherCourseView,
};
use crate::error::Result;

type JsonPayload<T> = std::result::Result<Json<T>, JsonRejection>;

// Teacher routes

pub async fn create_course(
    State(state): State<SharedState>,
    AuthUser(teacher): AuthUser,
    payload: JsonPayload<CreateCourseRequest>,
) -> Result<(StatusCode, Json<Course>)> {
    let Json(req) = payload?;
    let new = NewCourse::try_from(req)?;
    let course = service::create_course(state.store.as_ref(), &teacher, new).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

pub async fn list_teacher_courses(
    State(state): State<SharedState>,
    AuthUser(teacher): AuthUser,
) -> Result<Json<Vec<TeacherCourseView>>> {
    Ok(Json(
        service::teacher_courses(state.store.as_ref(), &teacher).await?,
    ))
}

pub async fn get_teacher_course(
    State(state): State<SharedState>,
    AuthUser(teacher): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<TeacherCourseView>> {
    let course = service::teacher_course(state.store.as_ref(), &teacher, parse_id(&id)?).await?;
    Ok(Json(course))
}

pub async fn update_course(
    State(state): State<SharedState>,
    AuthUser(teacher): AuthUser,
    Path(id): Path<String>,
    payload: JsonPayload<CourseUpdate>,
) -> Result<Json<Course>> {
    let id = parse_id(&id)?;
    let Json(update) = payload?;
    let course = service::update_course(state.store.as_ref(), &teacher, id, update).await?;
    Ok(Json(course))
}

pub async fn add_students(
    State(state): State<SharedState>,
    AuthUser(teacher): AuthUser,
    Path(id): Path<String>,
    payload: JsonPayload<AddStudentsRequest>,
) -> Result<Json<TeacherCourseView>> {
    let id = parse_id(&id)?;
    let Json(req) = payload?;
    let course =
        service::add_students(state.store.as_ref(), &teacher, id, &req.student_ids).await?;
    Ok(Json(course))
}

pub async fn remove_student(
    State(state): State<SharedState>,
    AuthUser(teacher): AuthUser,
    Path((course_id, student_id)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    service::remove_student(
        state.store.as_ref(),
        &teacher,
        parse_id(&course_id)?,
        parse_id(&student_id)?,
    )
    .await?;
    Ok(MessageResponse::new("Student removed from course"))
}

pub async fn add_meeting_link(
    State(state): State<SharedState>,
    AuthUser(teacher): AuthUser,
    Path(course_id): Path<String>,
    payload: JsonPayload<AddMeetingLinkRequest>,
) -> Result<(StatusCode, Json<Course>)> {
    let course_id = parse_id(&course_id)?;
    let Json(req) = payload?;
    let link = MeetingLink::try_from(req)?;
    let course =
        service::add_meeting_link(state.store.as_ref(), &teacher, course_id, link).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

pub async fn remove_meeting_link(
    State(state): State<SharedState>,
    AuthUser(teacher): AuthUser,
    Path((course_id, link_id)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    service::remove_meeting_link(
        state.store.as_ref(),
        &teacher,
        parse_id(&course_id)?,
        parse_id(&link_id)?,
    )
    .await?;
    Ok(MessageResponse::new("Zoom link removed successfully"))
}

// Student routes

pub async fn list_student_courses(
    State(state): State<SharedState>,
    AuthUser(student): AuthUser,
) -> Result<Json<Vec<StudentCourseView>>> {
    Ok(Json(
        service::student_courses(state.store.as_ref(), &student).await?,
    ))
}

pub async fn get_student_course(
    State(state): State<SharedState>,
    AuthUser(student): AuthUser,
    Path(course_id): Path<String>,
) -> Result<Json<StudentCourseView>> {
    let course =
        service::student_course(state.store.as_ref(), &student, parse_id(&course_id)?).await?;
    Ok(Json(course))
}

pub async fn list_available_courses(
    State(state): State<SharedState>,
    AuthUser(student): AuthUser,
) -> Result<Json<Vec<StudentCourseView>>> {
    Ok(Json(
        service::available_courses(state.store.as_ref(), &student).await?,
    ))
}

pub async fn enroll(
    State(state): State<SharedState>,
    AuthUser(student): AuthUser,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse> {
    service::enroll(state.store.as_ref(), &student, parse_id(&course_id)?).await?;
    Ok(MessageResponse::new("Successfully enrolled in course"))
}
