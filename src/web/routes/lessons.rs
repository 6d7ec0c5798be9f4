use axum::Json;
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::routing::{post, put};
use axum::{Router, extract::State, middleware, response::IntoResponse, routing::get};
use uuid::Uuid;

use crate::model::entity::{Lesson, LessonCreate, LessonResource, LessonResourceCreate};
use crate::model::{CrudRepository, PaginatableRepository, ResourceTyped};
use crate::utils::uploads::{resolve_upload, upload_size};
use crate::web::dto::lessons::{
    LessonDetailResponse, LessonResponse, ResourceAttachBody, ResourceUpdateBody,
};
use crate::web::error::ErrorResponse;
use crate::web::routes::{PaginationQuery, find_or_not_found};
use crate::web::{
    AppState, AuthenticatedUser, RequestContext, UserRole, WebError, WebResult, middlewares,
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", post(lessons_create_handler))
        .route("/page", get(lessons_list_handler))
        .route(
            "/{id}",
            get(lessons_get_handler)
                .put(lessons_update_handler)
                .delete(lessons_delete_handler),
        )
        .route("/{id}/view", post(lessons_view_handler))
        .route("/{id}/complete", post(lessons_complete_handler))
        .route(
            "/{id}/resources",
            get(lessons_resources_handler).post(lessons_attach_handler),
        )
        .route(
            "/{id}/resources/{resource_id}",
            put(lessons_resource_update_handler).delete(lessons_detach_handler),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

/// Unpublished lessons are reported missing to non-staff.
async fn find_visible(state: &AppState, user: &AuthenticatedUser, id: Uuid) -> WebResult<Lesson> {
    let lesson = find_or_not_found::<Lesson, LessonCreate>(state.pool(), user, id).await?;
    if !lesson.is_visible_to(user) {
        return Err(WebError::resource_not_found(Lesson::get_resource_type()));
    }
    Ok(lesson)
}

fn validate(payload: &LessonCreate) -> WebResult<()> {
    if payload.title.trim().is_empty() {
        return Err(WebError::resource_bad_request(
            Lesson::get_resource_type(),
            "title is required",
        ));
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/v1/lessons/",
    request_body = LessonCreate,
    description = "Creates a lesson. Its primary content type is derived from the content",
    responses(
        (status = 200, description = "Lesson created", body = LessonResponse),
        (status = 400, description = "Invalid lesson data", body = ErrorResponse),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    security(
        ("cookie" = [])
    ),
    tag = "lessons"
)]
async fn lessons_create_handler(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(payload): Json<LessonCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = Lesson::get_resource_type();
    user.require_role(&[UserRole::SuperAdmin], rt.clone())?;
    validate(&payload)?;

    let created = Lesson::create(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::database(rt, e))?;

    Ok((StatusCode::OK, Json(LessonResponse::from(created))))
}

#[utoipa::path(
    get,
    path = "/api/v1/lessons/page",
    params(PaginationQuery),
    description = "Lists lessons, newest first. Only published ones for non-staff",
    responses(
        (status = 200, description = "Returns requested page", body = crate::model::Page<LessonResponse>),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    security(
        ("cookie" = [])
    ),
    tag = "lessons"
)]
async fn lessons_list_handler(
    State(state): State<AppState>,
    Query(page): Query<PaginationQuery>,
    ctx: RequestContext,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let lessons = Lesson::page(state.pool(), user, page.limit(), page.offset())
        .await
        .map_err(|e| WebError::database(Lesson::get_resource_type(), e))?
        .map(LessonResponse::from);

    Ok((StatusCode::OK, Json(lessons)))
}

#[utoipa::path(
    get,
    path = "/api/v1/lessons/{lesson_id}",
    description = "Fetch comprehensive info about lesson including its content and attachments",
    params(
        ("lesson_id" = Uuid, Path, description = "ID of the lesson to get")
    ),
    responses(
        (status = 200, description = "Lesson found", body = LessonDetailResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    security(
        ("cookie" = [])
    ),
    tag = "lessons"
)]
async fn lessons_get_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ctx: RequestContext,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let lesson = find_visible(&state, user, id).await?;
    let resources = LessonResource::all_by_lesson(state.pool(), id)
        .await
        .map_err(|e| WebError::database(LessonResource::get_resource_type(), e))?;

    Ok((
        StatusCode::OK,
        Json(LessonDetailResponse::new(lesson, resources)),
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/lessons/{lesson_id}",
    request_body = LessonCreate,
    description = "Replaces lesson content and re-derives its primary content type",
    params(
        ("lesson_id" = Uuid, Path, description = "ID of the lesson to update")
    ),
    responses(
        (status = 200, description = "Lesson updated", body = LessonResponse),
        (status = 400, description = "Invalid lesson data", body = ErrorResponse),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    security(
        ("cookie" = [])
    ),
    tag = "lessons"
)]
async fn lessons_update_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ctx: RequestContext,
    Json(payload): Json<LessonCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = Lesson::get_resource_type();
    user.require_role(&[UserRole::SuperAdmin], rt.clone())?;
    validate(&payload)?;

    let lesson = find_or_not_found::<Lesson, LessonCreate>(state.pool(), user, id).await?;
    let updated = lesson
        .update(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::database(rt, e))?;

    Ok((StatusCode::OK, Json(LessonResponse::from(updated))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/lessons/{lesson_id}",
    params(
        ("lesson_id" = Uuid, Path, description = "ID of the lesson to delete")
    ),
    responses(
        (status = 200, description = "Lesson deleted"),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    security(
        ("cookie" = [])
    ),
    tag = "lessons"
)]
async fn lessons_delete_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ctx: RequestContext,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = Lesson::get_resource_type();
    user.require_role(&[UserRole::SuperAdmin], rt.clone())?;

    let lesson = find_or_not_found::<Lesson, LessonCreate>(state.pool(), user, id).await?;
    lesson
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::database(rt, e))?;

    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/api/v1/lessons/{lesson_id}/view",
    description = "Counts a view of the lesson",
    params(
        ("lesson_id" = Uuid, Path, description = "ID of the viewed lesson")
    ),
    responses(
        (status = 200, description = "View counted", body = LessonResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    security(
        ("cookie" = [])
    ),
    tag = "lessons"
)]
async fn lessons_view_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ctx: RequestContext,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let mut lesson = find_visible(&state, user, id).await?;
    lesson
        .record_view(state.pool())
        .await
        .map_err(|e| WebError::database(Lesson::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(LessonResponse::from(lesson))))
}

#[utoipa::path(
    post,
    path = "/api/v1/lessons/{lesson_id}/complete",
    description = "Counts a completion of the lesson",
    params(
        ("lesson_id" = Uuid, Path, description = "ID of the completed lesson")
    ),
    responses(
        (status = 200, description = "Completion counted", body = LessonResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    security(
        ("cookie" = [])
    ),
    tag = "lessons"
)]
async fn lessons_complete_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ctx: RequestContext,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let mut lesson = find_visible(&state, user, id).await?;
    lesson
        .record_completion(state.pool())
        .await
        .map_err(|e| WebError::database(Lesson::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(LessonResponse::from(lesson))))
}

#[utoipa::path(
    get,
    path = "/api/v1/lessons/{lesson_id}/resources",
    params(
        ("lesson_id" = Uuid, Path, description = "ID of the lesson")
    ),
    responses(
        (status = 200, description = "Attached files", body = Vec<LessonResource>),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    security(
        ("cookie" = [])
    ),
    tag = "lessons"
)]
async fn lessons_resources_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ctx: RequestContext,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    find_visible(&state, user, id).await?;
    let resources = LessonResource::all_by_lesson(state.pool(), id)
        .await
        .map_err(|e| WebError::database(LessonResource::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(resources)))
}

#[utoipa::path(
    post,
    path = "/api/v1/lessons/{lesson_id}/resources",
    request_body = ResourceAttachBody,
    description = "Attaches an uploaded file to the lesson. The lesson is reclassified",
    params(
        ("lesson_id" = Uuid, Path, description = "ID of the lesson")
    ),
    responses(
        (status = 200, description = "File attached", body = LessonResource),
        (status = 400, description = "Invalid file path", body = ErrorResponse),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    security(
        ("cookie" = [])
    ),
    tag = "lessons"
)]
async fn lessons_attach_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ctx: RequestContext,
    Json(payload): Json<ResourceAttachBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = LessonResource::get_resource_type();
    user.require_role(&[UserRole::SuperAdmin], rt.clone())?;
    find_or_not_found::<Lesson, LessonCreate>(state.pool(), user, id).await?;

    if resolve_upload(state.uploads_dir(), &payload.file_path).is_none() {
        return Err(WebError::resource_bad_request(
            rt,
            "file path must be relative to the uploads directory",
        ));
    }
    let file_size = upload_size(state.uploads_dir(), &payload.file_path)
        .and_then(|size| i64::try_from(size).ok())
        .unwrap_or_default();

    let title = match payload.title.trim() {
        "" => payload.file_path.clone(),
        title => title.to_string(),
    };

    let created = LessonResource::create(
        state.pool(),
        user,
        LessonResourceCreate {
            lesson_id: id,
            title,
            file_path: payload.file_path,
            file_size,
        },
    )
    .await
    .map_err(|e| WebError::database(rt, e))?;

    Ok((StatusCode::OK, Json(created)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/lessons/{lesson_id}/resources/{resource_id}",
    description = "Detaches a file from the lesson. The lesson is reclassified",
    params(
        ("lesson_id" = Uuid, Path, description = "ID of the lesson"),
        ("resource_id" = Uuid, Path, description = "ID of the attached file")
    ),
    responses(
        (status = 200, description = "File detached"),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 404, description = "Lesson or file not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    security(
        ("cookie" = [])
    ),
    tag = "lessons"
)]
async fn lessons_detach_handler(
    State(state): State<AppState>,
    Path((id, resource_id)): Path<(Uuid, Uuid)>,
    ctx: RequestContext,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = LessonResource::get_resource_type();
    user.require_role(&[UserRole::SuperAdmin], rt.clone())?;

    let resource =
        find_or_not_found::<LessonResource, LessonResourceCreate>(state.pool(), user, resource_id)
            .await?;
    if resource.lesson_id() != id {
        return Err(WebError::resource_not_found(rt));
    }

    resource
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::database(rt, e))?;

    Ok(StatusCode::OK)
}

#[utoipa::path(
    put,
    path = "/api/v1/lessons/{lesson_id}/resources/{resource_id}",
    request_body = ResourceUpdateBody,
    description = "Renames an attached file or moves it to another lesson. Both lessons are reclassified",
    params(
        ("lesson_id" = Uuid, Path, description = "ID of the lesson the file is attached to"),
        ("resource_id" = Uuid, Path, description = "ID of the attached file")
    ),
    responses(
        (status = 200, description = "File updated", body = LessonResource),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 404, description = "Lesson or file not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    security(
        ("cookie" = [])
    ),
    tag = "lessons"
)]
async fn lessons_resource_update_handler(
    State(state): State<AppState>,
    Path((id, resource_id)): Path<(Uuid, Uuid)>,
    ctx: RequestContext,
    Json(payload): Json<ResourceUpdateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = LessonResource::get_resource_type();
    user.require_role(&[UserRole::SuperAdmin], rt.clone())?;

    let resource =
        find_or_not_found::<LessonResource, LessonResourceCreate>(state.pool(), user, resource_id)
            .await?;
    if resource.lesson_id() != id {
        return Err(WebError::resource_not_found(rt));
    }

    let target = match payload.lesson_id {
        Some(target) => find_or_not_found::<Lesson, LessonCreate>(state.pool(), user, target)
            .await?
            .id(),
        None => id,
    };
    let title = match payload.title.trim() {
        "" => resource.title().to_string(),
        title => title.to_string(),
    };

    let data = LessonResourceCreate {
        lesson_id: target,
        title,
        file_path: resource.file_path().to_string(),
        file_size: resource.file_size(),
    };
    let updated = resource
        .update(state.pool(), user, data)
        .await
        .map_err(|e| WebError::database(rt, e))?;

    Ok((StatusCode::OK, Json(updated)))
}
