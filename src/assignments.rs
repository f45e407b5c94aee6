//! Assignment endpoints. Access is gated before any rows are read: a
//! teacher sees only owned courses, a student only enrolled ones.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::{
    Assignment, Completion, CompletionStats, Course, Id, NewAssignment, Role,
};
use crate::repo::Repo;
use crate::routes::{resolve_caller, AppState, Caller};

/// Assignment as a student sees it: their own completion attached.
#[derive(Debug, Serialize, ToSchema)]
pub struct StudentAssignmentRow {
    pub assignment: Assignment,
    pub course_nombre: String,
    pub course_codigo: String,
    pub completion: Option<Completion>,
}

/// Assignment as its teacher sees it: aggregate completion stats.
#[derive(Debug, Serialize, ToSchema)]
pub struct TeacherAssignmentRow {
    pub assignment: Assignment,
    pub course_nombre: String,
    pub course_codigo: String,
    pub stats: CompletionStats,
}

async fn teacher_rows(
    data: &AppState,
    caller: &Caller,
    courses: &[Course],
) -> Result<Vec<TeacherAssignmentRow>, ApiError> {
    let mut rows = Vec::new();
    for course in courses {
        for assignment in data.repo.assignments_by_course(&caller.info, course.id).await? {
            let stats = data.repo.completion_stats(&caller.info, assignment.id).await?;
            rows.push(TeacherAssignmentRow {
                assignment,
                course_nombre: course.nombre.clone(),
                course_codigo: course.codigo.clone(),
                stats,
            });
        }
    }
    Ok(rows)
}

async fn student_rows(
    data: &AppState,
    caller: &Caller,
    courses: &[Course],
) -> Result<Vec<StudentAssignmentRow>, ApiError> {
    let mut rows = Vec::new();
    for course in courses {
        for assignment in data.repo.assignments_by_course(&caller.info, course.id).await? {
            let completion = data
                .repo
                .completion_for(&caller.info, assignment.id, caller.user.id)
                .await?;
            rows.push(StudentAssignmentRow {
                assignment,
                course_nombre: course.nombre.clone(),
                course_codigo: course.codigo.clone(),
                completion,
            });
        }
    }
    Ok(rows)
}

#[utoipa::path(
    get,
    path = "/api/assignments",
    responses(
        (status = 200, description = "Assignments across the caller's courses, shaped by role"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "No user row for this email")
    )
)]
pub async fn list_my_assignments(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let caller = resolve_caller(&data, &auth.0).await?;
    match caller.user.rol {
        Role::Profesor => {
            let courses = data.repo.courses_by_teacher(&caller.info, caller.user.id).await?;
            let rows = teacher_rows(&data, &caller, &courses).await?;
            let total = rows.len();
            Ok(HttpResponse::Ok().json(json!({
                "assignments": rows,
                "userRole": caller.user.rol,
                "total": total,
            })))
        }
        _ => {
            let courses = data.repo.courses_by_student(&caller.info, caller.user.id).await?;
            let rows = student_rows(&data, &caller, &courses).await?;
            let total = rows.len();
            Ok(HttpResponse::Ok().json(json!({
                "assignments": rows,
                "userRole": caller.user.rol,
                "total": total,
            })))
        }
    }
}

/// Ownership (teacher) or enrollment (student) is checked before a single
/// assignment row is read.
async fn course_gate(data: &AppState, caller: &Caller, curso_id: Id) -> Result<Course, ApiError> {
    let course = data
        .repo
        .course_by_id(&caller.info, curso_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    let allowed = match caller.user.rol {
        Role::Profesor => course.profesor_id == caller.user.id,
        _ => data.repo.is_enrolled(&caller.info, caller.user.id, curso_id).await?,
    };
    if !allowed {
        return Err(ApiError::Forbidden);
    }
    Ok(course)
}

#[utoipa::path(
    get,
    path = "/api/courses/{course_id}/assignments",
    responses(
        (status = 200, description = "Active assignments of the course, shaped by role"),
        (status = 403, description = "Caller neither owns nor is enrolled in the course"),
        (status = 404, description = "No such course in the caller's tenant")
    )
)]
pub async fn list_course_assignments(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    let caller = resolve_caller(&data, &auth.0).await?;
    let course = course_gate(&data, &caller, path.into_inner()).await?;
    let courses = std::slice::from_ref(&course);
    let (assignments, total) = match caller.user.rol {
        Role::Profesor => {
            let rows = teacher_rows(&data, &caller, courses).await?;
            let total = rows.len();
            (serde_json::to_value(rows).map_err(|_| ApiError::Internal)?, total)
        }
        _ => {
            let rows = student_rows(&data, &caller, courses).await?;
            let total = rows.len();
            (serde_json::to_value(rows).map_err(|_| ApiError::Internal)?, total)
        }
    };
    Ok(HttpResponse::Ok().json(json!({
        "assignments": assignments,
        "userRole": caller.user.rol,
        "total": total,
    })))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAssignmentRequest {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<chrono::DateTime<chrono::Utc>>,
    pub points: Option<i32>,
    pub assignment_type: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/courses/{course_id}/assignments",
    request_body = CreateAssignmentRequest,
    responses(
        (status = 200, description = "Assignment created with its generated id"),
        (status = 400, description = "Empty title or non-positive course id"),
        (status = 403, description = "Caller is not the teacher of this course"),
        (status = 404, description = "No such course in the caller's tenant")
    )
)]
pub async fn create_assignment(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    body: web::Json<CreateAssignmentRequest>,
) -> Result<HttpResponse, ApiError> {
    let caller = resolve_caller(&data, &auth.0).await?;
    if caller.user.rol != Role::Profesor {
        return Err(ApiError::Forbidden);
    }
    let curso_id = path.into_inner();
    if curso_id <= 0 {
        return Err(ApiError::BadRequest);
    }
    let body = body.into_inner();
    if body.title.trim().is_empty() {
        return Err(ApiError::BadRequest);
    }
    let course = data
        .repo
        .course_by_id(&caller.info, curso_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    if course.profesor_id != caller.user.id {
        return Err(ApiError::Forbidden);
    }
    let assignment_id = data
        .repo
        .create_assignment(
            &caller.info,
            NewAssignment {
                title: body.title,
                description: body.description,
                due_date: body.due_date,
                points: body.points,
                assignment_type: body.assignment_type,
                curso_id,
            },
            caller.user.id,
        )
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "assignmentId": assignment_id,
        "message": "Tarea creada exitosamente",
    })))
}

#[utoipa::path(
    get,
    path = "/api/my-courses",
    responses(
        (status = 200, description = "Courses the caller teaches or is enrolled in"),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn list_my_courses(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let caller = resolve_caller(&data, &auth.0).await?;
    let cursos = match caller.user.rol {
        Role::Profesor => data.repo.courses_by_teacher(&caller.info, caller.user.id).await?,
        _ => data.repo.courses_by_student(&caller.info, caller.user.id).await?,
    };
    Ok(HttpResponse::Ok().json(json!({
        "cursos": cursos,
        "userRole": caller.user.rol,
    })))
}
