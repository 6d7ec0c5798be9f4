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
        entity::{Teacher, TeacherCreate},
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
        .route("/", post(teachers_create_handler))
        .route("/page", get(teachers_list_handler))
        .route(
            "/{id}",
            get(teachers_get_handler)
                .put(teachers_update_handler)
                .delete(teachers_delete_handler),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

fn validate(payload: &TeacherCreate) -> WebResult<()> {
    let rt = Teacher::get_resource_type();
    if payload.full_name.trim().is_empty() {
        return Err(WebError::resource_bad_request(rt, "full name is required"));
    }
    if !payload.official_email.contains('@') {
        return Err(WebError::resource_bad_request(rt, "official email is invalid"));
    }
    if payload.mobile_number.trim().is_empty() {
        return Err(WebError::resource_bad_request(rt, "mobile number is required"));
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/v1/teachers/",
    request_body = TeacherCreate,
    description = "Registers a thinking coach and assigns a unique employee id",
    responses(
        (status = 200, description = "Teacher created", body = Teacher),
        (status = 400, description = "Invalid teacher data", body = ErrorResponse),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 409, description = "Official email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "teachers",
    security(
        ("cookie" = [])
    )
)]
async fn teachers_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<TeacherCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = Teacher::get_resource_type();
    user.require_role(WRITERS, rt.clone())?;
    validate(&payload)?;
    ensure_school_admin(state.pool(), user, payload.school_id, rt.clone()).await?;

    let created = Teacher::create(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::database(rt, e))?;

    tracing::info!("teacher {} registered", created.employee_id());
    Ok((StatusCode::OK, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/v1/teachers/page",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Returns requested page", body = crate::model::Page<Teacher>),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "teachers",
    security(
        ("cookie" = [])
    )
)]
async fn teachers_list_handler(
    ctx: RequestContext,
    Query(page): Query<PaginationQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require_role(READERS, Teacher::get_resource_type())?;

    let teachers = Teacher::page(state.pool(), user, page.limit(), page.offset())
        .await
        .map_err(|e| WebError::database(Teacher::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(teachers)))
}

#[utoipa::path(
    get,
    path = "/api/v1/teachers/{id}",
    params(
        ("id" = Uuid, Path, description = "ID of the teacher")
    ),
    responses(
        (status = 200, description = "Teacher found", body = Teacher),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 404, description = "Teacher not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "teachers",
    security(
        ("cookie" = [])
    )
)]
async fn teachers_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = Teacher::get_resource_type();
    user.require_role(READERS, rt.clone())?;

    let found = find_or_not_found::<Teacher, TeacherCreate>(state.pool(), user, id).await?;
    if user.user_role() == UserRole::SchoolAdmin {
        check_access(state.pool(), user, &found, Some(user.user_id()))
            .await
            .map_err(|e| WebError::database(rt, e))?;
    }

    Ok((StatusCode::OK, Json(found)))
}

#[utoipa::path(
    put,
    path = "/api/v1/teachers/{id}",
    request_body = TeacherCreate,
    description = "Updates a teacher. Its generated identifier never changes",
    params(
        ("id" = Uuid, Path, description = "ID of the teacher")
    ),
    responses(
        (status = 200, description = "Teacher updated", body = Teacher),
        (status = 400, description = "Invalid teacher data", body = ErrorResponse),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 404, description = "Teacher not found", body = ErrorResponse),
        (status = 409, description = "Official email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "teachers",
    security(
        ("cookie" = [])
    )
)]
async fn teachers_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TeacherCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = Teacher::get_resource_type();
    user.require_role(WRITERS, rt.clone())?;
    validate(&payload)?;

    let found = find_or_not_found::<Teacher, TeacherCreate>(state.pool(), user, id).await?;
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
    path = "/api/v1/teachers/{id}",
    params(
        ("id" = Uuid, Path, description = "ID of the teacher")
    ),
    responses(
        (status = 200, description = "Teacher deleted"),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 404, description = "Teacher not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "teachers",
    security(
        ("cookie" = [])
    )
)]
async fn teachers_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = Teacher::get_resource_type();
    user.require_role(WRITERS, rt.clone())?;

    let found = find_or_not_found::<Teacher, TeacherCreate>(state.pool(), user, id).await?;
    check_access(state.pool(), user, &found, Some(user.user_id()))
        .await
        .map_err(|e| WebError::database(rt.clone(), e))?;

    found
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::database(rt, e))?;

    Ok(StatusCode::OK)
}
