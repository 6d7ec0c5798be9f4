use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, PaginatableRepository, ResourceTyped, check_access,
        entity::{Student, StudentCreate},
    },
    web::{
        AppState, RequestContext, UserRole, WebError, WebResult,
        error::ErrorResponse,
        middlewares,
        routes::{PaginationQuery, ensure_school_admin, find_or_not_found},
    },
};

const READERS: &[UserRole] = &[
    UserRole::SuperAdmin,
    UserRole::ProgramCoordinator,
    UserRole::SchoolAdmin,
];

const WRITERS: &[UserRole] = &[UserRole::SuperAdmin, UserRole::SchoolAdmin];

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", post(students_create_handler))
        .route("/page", get(students_list_handler))
        .route(
            "/{id}",
            get(students_get_handler)
                .put(students_update_handler)
                .delete(students_delete_handler),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

fn validate(payload: &StudentCreate) -> WebResult<()> {
    let rt = Student::get_resource_type();
    if payload.first_name.trim().is_empty() || payload.last_name.trim().is_empty() {
        return Err(WebError::resource_bad_request(rt, "first and last name are required"));
    }
    if payload.gr_number.trim().is_empty() {
        return Err(WebError::resource_bad_request(rt, "GR number is required"));
    }
    if !payload.school_email.contains('@') {
        return Err(WebError::resource_bad_request(rt, "school email is invalid"));
    }
    if payload.enrollment_date < payload.date_of_birth {
        return Err(WebError::resource_bad_request(
            rt,
            "enrollment date precedes date of birth",
        ));
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/v1/students/",
    request_body = StudentCreate,
    description = "Enrolls a student and assigns a unique skill lab registration id",
    responses(
        (status = 200, description = "Student created", body = Student),
        (status = 400, description = "Invalid student data", body = ErrorResponse),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 409, description = "GR number or school email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "students",
    security(
        ("cookie" = [])
    )
)]
async fn students_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<StudentCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = Student::get_resource_type();
    user.require_role(WRITERS, rt.clone())?;
    validate(&payload)?;
    ensure_school_admin(state.pool(), user, payload.school_id, rt.clone()).await?;

    let created = Student::create(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::database(rt, e))?;

    tracing::info!("student {} enrolled", created.skill_lab_reg_id());
    Ok((StatusCode::OK, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/v1/students/page",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Returns requested page", body = crate::model::Page<Student>),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "students",
    security(
        ("cookie" = [])
    )
)]
async fn students_list_handler(
    ctx: RequestContext,
    Query(page): Query<PaginationQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require_role(READERS, Student::get_resource_type())?;

    let students = Student::page(state.pool(), user, page.limit(), page.offset())
        .await
        .map_err(|e| WebError::database(Student::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(students)))
}

#[utoipa::path(
    get,
    path = "/api/v1/students/{id}",
    params(
        ("id" = Uuid, Path, description = "ID of the student")
    ),
    responses(
        (status = 200, description = "Student found", body = Student),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 404, description = "Student not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "students",
    security(
        ("cookie" = [])
    )
)]
async fn students_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = Student::get_resource_type();
    user.require_role(READERS, rt.clone())?;

    let found = find_or_not_found::<Student, StudentCreate>(state.pool(), user, id).await?;
    if user.user_role() == UserRole::SchoolAdmin {
        check_access(state.pool(), user, &found, Some(user.user_id()))
            .await
            .map_err(|e| WebError::database(rt, e))?;
    }

    Ok((StatusCode::OK, Json(found)))
}

#[utoipa::path(
    put,
    path = "/api/v1/students/{id}",
    request_body = StudentCreate,
    description = "Updates a student. Its generated identifier never changes",
    params(
        ("id" = Uuid, Path, description = "ID of the student")
    ),
    responses(
        (status = 200, description = "Student updated", body = Student),
        (status = 400, description = "Invalid student data", body = ErrorResponse),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 404, description = "Student not found", body = ErrorResponse),
        (status = 409, description = "GR number or school email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "students",
    security(
        ("cookie" = [])
    )
)]
async fn students_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StudentCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = Student::get_resource_type();
    user.require_role(WRITERS, rt.clone())?;
    validate(&payload)?;

    let found = find_or_not_found::<Student, StudentCreate>(state.pool(), user, id).await?;
    check_access(state.pool(), user, &found, Some(user.user_id()))
        .await
        .map_err(|e| WebError::database(rt.clone(), e))?;
    ensure_school_admin(state.pool(), user, payload.school_id, rt.clone()).await?;

    let updated = found
        .update(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::database(rt, e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/students/{id}",
    params(
        ("id" = Uuid, Path, description = "ID of the student")
    ),
    responses(
        (status = 200, description = "Student deleted"),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 404, description = "Student not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "students",
    security(
        ("cookie" = [])
    )
)]
async fn students_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = Student::get_resource_type();
    user.require_role(WRITERS, rt.clone())?;

    let found = find_or_not_found::<Student, StudentCreate>(state.pool(), user, id).await?;
    check_access(state.pool(), user, &found, Some(user.user_id()))
        .await
        .map_err(|e| WebError::database(rt.clone(), e))?;

    found
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::database(rt, e))?;

    Ok(StatusCode::OK)
}
