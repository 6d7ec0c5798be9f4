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
        entity::{Coordinator, CoordinatorCreate},
    },
    web::{
        AppState, RequestContext, UserRole, WebError, WebResult,
        error::ErrorResponse,
        middlewares,
        routes::{PaginationQuery, find_or_not_found},
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", post(coordinators_create_handler))
        .route("/page", get(coordinators_list_handler))
        .route(
            "/{id}",
            get(coordinators_get_handler)
                .put(coordinators_update_handler)
                .delete(coordinators_delete_handler),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

fn validate(payload: &CoordinatorCreate) -> WebResult<()> {
    let rt = Coordinator::get_resource_type();
    if payload.full_name.trim().is_empty() {
        return Err(WebError::resource_bad_request(rt, "full name is required"));
    }
    if !payload.official_email.contains('@') {
        return Err(WebError::resource_bad_request(rt, "official email is invalid"));
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/v1/coordinators/",
    request_body = CoordinatorCreate,
    description = "Registers a program coordinator and assigns a unique employee id. Super admin only",
    responses(
        (status = 200, description = "Coordinator created", body = Coordinator),
        (status = 400, description = "Invalid coordinator data", body = ErrorResponse),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 409, description = "Official email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "coordinators",
    security(
        ("cookie" = [])
    )
)]
async fn coordinators_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<CoordinatorCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = Coordinator::get_resource_type();
    user.require_role(&[UserRole::SuperAdmin], rt.clone())?;
    validate(&payload)?;

    let created = Coordinator::create(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::database(rt, e))?;

    tracing::info!("coordinator {} registered", created.employee_id());
    Ok((StatusCode::OK, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/v1/coordinators/page",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Returns requested page", body = crate::model::Page<Coordinator>),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "coordinators",
    security(
        ("cookie" = [])
    )
)]
async fn coordinators_list_handler(
    ctx: RequestContext,
    Query(page): Query<PaginationQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require_role(&[UserRole::SuperAdmin], Coordinator::get_resource_type())?;

    let coordinators = Coordinator::page(state.pool(), user, page.limit(), page.offset())
        .await
        .map_err(|e| WebError::database(Coordinator::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(coordinators)))
}

#[utoipa::path(
    get,
    path = "/api/v1/coordinators/{id}",
    description = "Coordinators may read their own profile",
    params(
        ("id" = Uuid, Path, description = "ID of the coordinator")
    ),
    responses(
        (status = 200, description = "Coordinator found", body = Coordinator),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 404, description = "Coordinator not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "coordinators",
    security(
        ("cookie" = [])
    )
)]
async fn coordinators_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = Coordinator::get_resource_type();

    let found = find_or_not_found::<Coordinator, CoordinatorCreate>(state.pool(), user, id).await?;
    check_access(state.pool(), user, &found, Some(user.user_id()))
        .await
        .map_err(|e| WebError::database(rt, e))?;

    Ok((StatusCode::OK, Json(found)))
}

#[utoipa::path(
    put,
    path = "/api/v1/coordinators/{id}",
    request_body = CoordinatorCreate,
    params(
        ("id" = Uuid, Path, description = "ID of the coordinator")
    ),
    responses(
        (status = 200, description = "Coordinator updated", body = Coordinator),
        (status = 400, description = "Invalid coordinator data", body = ErrorResponse),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 404, description = "Coordinator not found", body = ErrorResponse),
        (status = 409, description = "Official email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "coordinators",
    security(
        ("cookie" = [])
    )
)]
async fn coordinators_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CoordinatorCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = Coordinator::get_resource_type();
    user.require_role(&[UserRole::SuperAdmin], rt.clone())?;
    validate(&payload)?;

    let found = find_or_not_found::<Coordinator, CoordinatorCreate>(state.pool(), user, id).await?;
    let updated = found
        .update(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::database(rt, e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/coordinators/{id}",
    params(
        ("id" = Uuid, Path, description = "ID of the coordinator")
    ),
    responses(
        (status = 200, description = "Coordinator deleted"),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 404, description = "Coordinator not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "coordinators",
    security(
        ("cookie" = [])
    )
)]
async fn coordinators_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = Coordinator::get_resource_type();
    user.require_role(&[UserRole::SuperAdmin], rt.clone())?;

    let found = find_or_not_found::<Coordinator, CoordinatorCreate>(state.pool(), user, id).await?;
    found
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::database(rt, e))?;

    Ok(StatusCode::OK)
}
