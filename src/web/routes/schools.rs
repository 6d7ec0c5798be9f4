use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, PaginatableRepository, ResourceTyped, check_access,
        entity::{School, SchoolCreate},
    },
    web::{
        AppState, RequestContext, UserRole, WebError, WebResult,
        error::ErrorResponse,
        middlewares,
        routes::{PaginationQuery, find_or_not_found},
    },
};

const READERS: &[UserRole] = &[
    UserRole::SuperAdmin,
    UserRole::ProgramCoordinator,
    UserRole::SchoolAdmin,
];

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SchoolSearchQuery {
    /// Part of the school name or code
    q: String,
    #[serde(default = "default_search_limit")]
    limit: i64,
}

fn default_search_limit() -> i64 {
    10
}

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", post(schools_create_handler))
        .route("/page", get(schools_list_handler))
        .route("/search", get(schools_search_handler))
        .route(
            "/{id}",
            get(schools_get_handler)
                .put(schools_update_handler)
                .delete(schools_delete_handler),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/v1/schools/",
    request_body = SchoolCreate,
    description = "Registers a school. Super admin only",
    responses(
        (status = 200, description = "School created", body = School),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 409, description = "School code already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "schools",
    security(
        ("cookie" = [])
    )
)]
async fn schools_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<SchoolCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = School::get_resource_type();
    user.require_role(&[UserRole::SuperAdmin], rt.clone())?;

    if payload.school_name.trim().is_empty() || payload.school_code.trim().is_empty() {
        return Err(WebError::resource_bad_request(
            rt,
            "school name and code are required",
        ));
    }

    let created = School::create(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::database(rt, e))?;

    tracing::info!("school {} registered", created.school_code());
    Ok((StatusCode::OK, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/v1/schools/page",
    params(PaginationQuery),
    description = "Lists schools. School admins only see the schools they administer",
    responses(
        (status = 200, description = "Returns requested page", body = crate::model::Page<School>),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "schools",
    security(
        ("cookie" = [])
    )
)]
async fn schools_list_handler(
    ctx: RequestContext,
    Query(page): Query<PaginationQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require_role(READERS, School::get_resource_type())?;

    let schools = School::page(state.pool(), user, page.limit(), page.offset())
        .await
        .map_err(|e| WebError::database(School::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(schools)))
}

#[utoipa::path(
    get,
    path = "/api/v1/schools/search",
    params(SchoolSearchQuery),
    responses(
        (status = 200, description = "Matching schools", body = Vec<School>),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "schools",
    security(
        ("cookie" = [])
    )
)]
async fn schools_search_handler(
    ctx: RequestContext,
    Query(query): Query<SchoolSearchQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require_role(READERS, School::get_resource_type())?;

    let limit = query.limit.clamp(1, super::MAX_PAGE_SIZE);
    let schools = School::search(state.pool(), user, &query.q, limit)
        .await
        .map_err(|e| WebError::database(School::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(schools)))
}

#[utoipa::path(
    get,
    path = "/api/v1/schools/{id}",
    params(
        ("id" = Uuid, Path, description = "ID of the school")
    ),
    responses(
        (status = 200, description = "School found", body = School),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 404, description = "School not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "schools",
    security(
        ("cookie" = [])
    )
)]
async fn schools_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = School::get_resource_type();
    user.require_role(READERS, rt.clone())?;

    let found = find_or_not_found::<School, SchoolCreate>(state.pool(), user, id).await?;
    if user.user_role() == UserRole::SchoolAdmin {
        check_access(state.pool(), user, &found, Some(user.user_id()))
            .await
            .map_err(|e| WebError::database(rt, e))?;
    }

    Ok((StatusCode::OK, Json(found)))
}

#[utoipa::path(
    put,
    path = "/api/v1/schools/{id}",
    request_body = SchoolCreate,
    description = "Updates a school. School admins may edit their own school but not reassign it",
    params(
        ("id" = Uuid, Path, description = "ID of the school")
    ),
    responses(
        (status = 200, description = "School updated", body = School),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 404, description = "School not found", body = ErrorResponse),
        (status = 409, description = "School code already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "schools",
    security(
        ("cookie" = [])
    )
)]
async fn schools_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(mut payload): Json<SchoolCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = School::get_resource_type();
    user.require_role(&[UserRole::SuperAdmin, UserRole::SchoolAdmin], rt.clone())?;

    let found = find_or_not_found::<School, SchoolCreate>(state.pool(), user, id).await?;
    check_access(state.pool(), user, &found, Some(user.user_id()))
        .await
        .map_err(|e| WebError::database(rt.clone(), e))?;

    if !user.is_super_admin() {
        payload.school_admin_id = found.school_admin_id();
    }

    let updated = found
        .update(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::database(rt, e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/schools/{id}",
    description = "Deletes a school with its classes. Super admin only",
    params(
        ("id" = Uuid, Path, description = "ID of the school")
    ),
    responses(
        (status = 200, description = "School deleted"),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 404, description = "School not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "schools",
    security(
        ("cookie" = [])
    )
)]
async fn schools_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = School::get_resource_type();
    user.require_role(&[UserRole::SuperAdmin], rt.clone())?;

    let found = find_or_not_found::<School, SchoolCreate>(state.pool(), user, id).await?;
    found
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::database(rt, e))?;

    Ok(StatusCode::OK)
}
