use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, PaginatableRepository, ResourceTyped, check_access,
        entity::{Parent, ParentCreate, Student, StudentCreate},
    },
    web::{
        AppState, RequestContext, UserRole, WebError, WebResult,
        dto::parents::{ParentDetailResponse, StudentLinkBody},
        error::ErrorResponse,
        middlewares,
        routes::{PaginationQuery, ensure_school_admin, find_or_not_found},
    },
};

const READERS: &[UserRole] = &[UserRole::SuperAdmin, UserRole::SchoolAdmin];

const WRITERS: &[UserRole] = &[UserRole::SuperAdmin, UserRole::SchoolAdmin];

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", post(parents_create_handler))
        .route("/page", get(parents_list_handler))
        .route(
            "/{id}",
            get(parents_get_handler)
                .put(parents_update_handler)
                .delete(parents_delete_handler),
        )
        .route("/{id}/students", post(parents_link_student_handler))
        .route(
            "/{id}/students/{student_id}",
            delete(parents_unlink_student_handler),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

fn validate(payload: &ParentCreate) -> WebResult<()> {
    let rt = Parent::get_resource_type();
    if payload.full_name.trim().is_empty() {
        return Err(WebError::resource_bad_request(rt, "full name is required"));
    }
    if !payload.email.contains('@') {
        return Err(WebError::resource_bad_request(rt, "email is invalid"));
    }
    if payload.mobile_number.trim().is_empty() {
        return Err(WebError::resource_bad_request(rt, "mobile number is required"));
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/v1/parents/",
    request_body = ParentCreate,
    description = "Registers a parent and assigns a unique parent id",
    responses(
        (status = 200, description = "Parent created", body = Parent),
        (status = 400, description = "Invalid parent data", body = ErrorResponse),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "parents",
    security(
        ("cookie" = [])
    )
)]
async fn parents_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<ParentCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = Parent::get_resource_type();
    user.require_role(WRITERS, rt.clone())?;
    validate(&payload)?;
    ensure_school_admin(state.pool(), user, payload.school_id, rt.clone()).await?;

    let created = Parent::create(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::database(rt, e))?;

    tracing::info!("parent {} registered", created.parent_id());
    Ok((StatusCode::OK, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/v1/parents/page",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Returns requested page", body = crate::model::Page<Parent>),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "parents",
    security(
        ("cookie" = [])
    )
)]
async fn parents_list_handler(
    ctx: RequestContext,
    Query(page): Query<PaginationQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require_role(READERS, Parent::get_resource_type())?;

    let parents = Parent::page(state.pool(), user, page.limit(), page.offset())
        .await
        .map_err(|e| WebError::database(Parent::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(parents)))
}

#[utoipa::path(
    get,
    path = "/api/v1/parents/{id}",
    params(
        ("id" = Uuid, Path, description = "ID of the parent")
    ),
    responses(
        (status = 200, description = "Parent found with linked students", body = ParentDetailResponse),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 404, description = "Parent not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "parents",
    security(
        ("cookie" = [])
    )
)]
async fn parents_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = Parent::get_resource_type();
    user.require_role(READERS, rt.clone())?;

    let found = find_or_not_found::<Parent, ParentCreate>(state.pool(), user, id).await?;
    if user.user_role() == UserRole::SchoolAdmin {
        check_access(state.pool(), user, &found, Some(user.user_id()))
            .await
            .map_err(|e| WebError::database(rt.clone(), e))?;
    }

    let students = found
        .students(state.pool())
        .await
        .map_err(|e| WebError::database(rt, e))?;

    Ok((StatusCode::OK, Json(ParentDetailResponse::new(found, students))))
}

#[utoipa::path(
    put,
    path = "/api/v1/parents/{id}",
    request_body = ParentCreate,
    description = "Updates a parent. Its generated identifier never changes",
    params(
        ("id" = Uuid, Path, description = "ID of the parent")
    ),
    responses(
        (status = 200, description = "Parent updated", body = Parent),
        (status = 400, description = "Invalid parent data", body = ErrorResponse),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 404, description = "Parent not found", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "parents",
    security(
        ("cookie" = [])
    )
)]
async fn parents_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ParentCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = Parent::get_resource_type();
    user.require_role(WRITERS, rt.clone())?;
    validate(&payload)?;

    let found = find_or_not_found::<Parent, ParentCreate>(state.pool(), user, id).await?;
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
    path = "/api/v1/parents/{id}",
    params(
        ("id" = Uuid, Path, description = "ID of the parent")
    ),
    responses(
        (status = 200, description = "Parent deleted"),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 404, description = "Parent not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "parents",
    security(
        ("cookie" = [])
    )
)]
async fn parents_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = Parent::get_resource_type();
    user.require_role(WRITERS, rt.clone())?;

    let found = find_or_not_found::<Parent, ParentCreate>(state.pool(), user, id).await?;
    check_access(state.pool(), user, &found, Some(user.user_id()))
        .await
        .map_err(|e| WebError::database(rt.clone(), e))?;

    found
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::database(rt, e))?;

    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/api/v1/parents/{id}/students",
    request_body = StudentLinkBody,
    description = "Links a student to the parent. Both must belong to a school you administer",
    params(
        ("id" = Uuid, Path, description = "ID of the parent")
    ),
    responses(
        (status = 200, description = "Parent with linked students", body = ParentDetailResponse),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 404, description = "Parent or student not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "parents",
    security(
        ("cookie" = [])
    )
)]
async fn parents_link_student_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StudentLinkBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = Parent::get_resource_type();
    user.require_role(WRITERS, rt.clone())?;

    let parent = find_or_not_found::<Parent, ParentCreate>(state.pool(), user, id).await?;
    check_access(state.pool(), user, &parent, Some(user.user_id()))
        .await
        .map_err(|e| WebError::database(rt.clone(), e))?;

    let student =
        find_or_not_found::<Student, StudentCreate>(state.pool(), user, payload.student_id)
            .await?;
    check_access(state.pool(), user, &student, Some(user.user_id()))
        .await
        .map_err(|e| WebError::database(Student::get_resource_type(), e))?;

    parent
        .link_student(state.pool(), student.id())
        .await
        .map_err(|e| WebError::database(rt.clone(), e))?;
    let students = parent
        .students(state.pool())
        .await
        .map_err(|e| WebError::database(rt, e))?;

    Ok((StatusCode::OK, Json(ParentDetailResponse::new(parent, students))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/parents/{id}/students/{student_id}",
    params(
        ("id" = Uuid, Path, description = "ID of the parent"),
        ("student_id" = Uuid, Path, description = "ID of the linked student")
    ),
    responses(
        (status = 200, description = "Student unlinked"),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 404, description = "Parent not found or student not linked", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "parents",
    security(
        ("cookie" = [])
    )
)]
async fn parents_unlink_student_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path((id, student_id)): Path<(Uuid, Uuid)>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = Parent::get_resource_type();
    user.require_role(WRITERS, rt.clone())?;

    let parent = find_or_not_found::<Parent, ParentCreate>(state.pool(), user, id).await?;
    check_access(state.pool(), user, &parent, Some(user.user_id()))
        .await
        .map_err(|e| WebError::database(rt.clone(), e))?;

    let unlinked = parent
        .unlink_student(state.pool(), student_id)
        .await
        .map_err(|e| WebError::database(rt, e))?;
    if !unlinked {
        return Err(WebError::resource_not_found(Student::get_resource_type()));
    }

    Ok(StatusCode::OK)
}
