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
        entity::{SchoolClass, SchoolClassCreate},
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
        .route("/", post(classes_create_handler))
        .route("/page", get(classes_list_handler))
        .route(
            "/{id}",
            get(classes_get_handler)
                .put(classes_update_handler)
                .delete(classes_delete_handler),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

fn validate(payload: &SchoolClassCreate) -> WebResult<()> {
    let rt = SchoolClass::get_resource_type();
    if !payload.grade_is_valid() {
        return Err(WebError::resource_bad_request(rt, "grade must be 1 to 12"));
    }
    if payload.division.trim().is_empty() {
        return Err(WebError::resource_bad_request(rt, "division is required"));
    }
    if payload.academic_year.trim().is_empty() {
        return Err(WebError::resource_bad_request(rt, "academic year is required"));
    }
    if !payload.total_sessions_is_valid() {
        return Err(WebError::resource_bad_request(
            rt,
            "total sessions must be 1 to 100",
        ));
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/v1/classes/",
    request_body = SchoolClassCreate,
    description = "Creates a class and assigns it a unique class code",
    responses(
        (status = 200, description = "Class created", body = SchoolClass),
        (status = 400, description = "Invalid class data", body = ErrorResponse),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 409, description = "Class already exists for this year", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "classes",
    security(
        ("cookie" = [])
    )
)]
async fn classes_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<SchoolClassCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = SchoolClass::get_resource_type();
    user.require_role(WRITERS, rt.clone())?;
    validate(&payload)?;
    ensure_school_admin(state.pool(), user, Some(payload.school_id), rt.clone()).await?;

    let created = SchoolClass::create(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::database(rt, e))?;

    tracing::info!("class {} created", created.class_code());
    Ok((StatusCode::OK, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/v1/classes/page",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Returns requested page", body = crate::model::Page<SchoolClass>),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "classes",
    security(
        ("cookie" = [])
    )
)]
async fn classes_list_handler(
    ctx: RequestContext,
    Query(page): Query<PaginationQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require_role(READERS, SchoolClass::get_resource_type())?;

    let classes = SchoolClass::page(state.pool(), user, page.limit(), page.offset())
        .await
        .map_err(|e| WebError::database(SchoolClass::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(classes)))
}

#[utoipa::path(
    get,
    path = "/api/v1/classes/{id}",
    params(
        ("id" = Uuid, Path, description = "ID of the class")
    ),
    responses(
        (status = 200, description = "Class found", body = SchoolClass),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 404, description = "Class not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "classes",
    security(
        ("cookie" = [])
    )
)]
async fn classes_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = SchoolClass::get_resource_type();
    user.require_role(READERS, rt.clone())?;

    let found = find_or_not_found::<SchoolClass, SchoolClassCreate>(state.pool(), user, id).await?;
    if user.user_role() == UserRole::SchoolAdmin {
        check_access(state.pool(), user, &found, Some(user.user_id()))
            .await
            .map_err(|e| WebError::database(rt, e))?;
    }

    Ok((StatusCode::OK, Json(found)))
}

#[utoipa::path(
    put,
    path = "/api/v1/classes/{id}",
    request_body = SchoolClassCreate,
    description = "Updates a class. The class code never changes",
    params(
        ("id" = Uuid, Path, description = "ID of the class")
    ),
    responses(
        (status = 200, description = "Class updated", body = SchoolClass),
        (status = 400, description = "Invalid class data", body = ErrorResponse),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 404, description = "Class not found", body = ErrorResponse),
        (status = 409, description = "Class already exists for this year", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "classes",
    security(
        ("cookie" = [])
    )
)]
async fn classes_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SchoolClassCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = SchoolClass::get_resource_type();
    user.require_role(WRITERS, rt.clone())?;
    validate(&payload)?;

    let found = find_or_not_found::<SchoolClass, SchoolClassCreate>(state.pool(), user, id).await?;
    check_access(state.pool(), user, &found, Some(user.user_id()))
        .await
        .map_err(|e| WebError::database(rt.clone(), e))?;
    ensure_school_admin(state.pool(), user, Some(payload.school_id), rt.clone()).await?;

    let updated = found
        .update(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::database(rt, e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/classes/{id}",
    params(
        ("id" = Uuid, Path, description = "ID of the class")
    ),
    responses(
        (status = 200, description = "Class deleted"),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 404, description = "Class not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "classes",
    security(
        ("cookie" = [])
    )
)]
async fn classes_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = SchoolClass::get_resource_type();
    user.require_role(WRITERS, rt.clone())?;

    let found = find_or_not_found::<SchoolClass, SchoolClassCreate>(state.pool(), user, id).await?;
    check_access(state.pool(), user, &found, Some(user.user_id()))
        .await
        .map_err(|e| WebError::database(rt.clone(), e))?;

    found
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::database(rt, e))?;

    Ok(StatusCode::OK)
}
