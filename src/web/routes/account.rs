use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use tower_cookies::{Cookie, Cookies, cookie::SameSite};
use uuid::Uuid;

use crate::{
    Config,
    auth::{self, MIN_PASSWORD_LEN, UserClaims, hash_password, verify_password},
    model::{
        CrudRepository, PaginatableRepository, ResourceTyped, check_access,
        entity::{
            Lesson, Parent, School, SchoolClass, Student, Teacher, UserEntity,
            UserEntityCreateUpdate,
        },
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, UserRole, WebError, WebResult,
        dto::account::{
            DashboardResponse, PasswordChangeBody, SigninBody, SigninResponse, UserCreateBody,
            UserUpdateBody,
        },
        error::ErrorResponse,
        middlewares::{self, AUTH_TOKEN},
        routes::{PaginationQuery, find_or_not_found},
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    let protected = Router::new()
        .route("/me", get(account_me_handler))
        .route("/password", post(account_password_handler))
        .route("/dashboard", get(account_dashboard_handler))
        .route("/users", post(account_create_user_handler))
        .route("/page", get(account_list_handler))
        .route(
            "/{id}",
            put(account_update_handler).delete(account_delete_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ));

    Router::new()
        .route("/signin", post(account_signin_handler))
        .route("/signout", post(account_signout_handler))
        .merge(protected)
        .with_state(state)
}

async fn set_session_cookie(cookies: &Cookies, user_id: Uuid) -> WebResult<()> {
    let key = Config::get_or_init(false).await.app().jwt();
    let token = auth::generate_token(UserClaims::session(user_id), key)
        .map_err(|e| WebError::server_crypt_error(e.into()))?;

    let mut cookie = Cookie::new(AUTH_TOKEN, token);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_http_only(true);
    cookie.set_path("/");
    cookies.add(cookie);
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/v1/account/signin",
    description = "Authorizes user in the system under the requested role",
    request_body = SigninBody,
    responses(
        (status = 200, description = "User signed in", body = SigninResponse),
        (status = 401, description = "Credentials invalid", body = ErrorResponse),
        (status = 403, description = "Account has a different role", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "account",
)]
async fn account_signin_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<SigninBody>,
) -> WebResult<impl IntoResponse> {
    let admin = AuthenticatedUser::admin();
    let found = UserEntity::find_by_username(state.pool(), &admin, &payload.username)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?
        .ok_or_else(WebError::auth_invalid_credentials)?;

    let is_verified =
        verify_password(found.hash(), &payload.password).map_err(WebError::server_crypt_error)?;

    if !is_verified {
        return Err(WebError::auth_invalid_credentials());
    }

    let role = found.role();
    if role != payload.role {
        tracing::debug!("{} tried to sign in as {}", found.username(), payload.role);
        return Err(WebError::auth_role_mismatch(payload.role.as_str()));
    }

    set_session_cookie(&cookies, found.id()).await?;

    Ok((
        StatusCode::OK,
        Json(SigninResponse {
            user: found,
            redirect: role.dashboard_path(),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/account/signout",
    description = "Drops the session cookie",
    responses(
        (status = 200, description = "Signed out"),
    ),
    tag = "account",
)]
async fn account_signout_handler(cookies: Cookies) -> impl IntoResponse {
    let mut cookie = Cookie::new(AUTH_TOKEN, "");
    cookie.set_path("/");
    cookies.remove(cookie);
    StatusCode::OK
}

#[utoipa::path(
    get,
    path = "/api/v1/account/me",
    responses(
        (status = 200, description = "Currently signed in user", body = UserEntity),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
    ),
    tag = "account",
    security(
        ("cookie" = [])
    )
)]
async fn account_me_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found =
        find_or_not_found::<UserEntity, UserEntityCreateUpdate>(state.pool(), user, user.user_id())
            .await?;

    Ok((StatusCode::OK, Json(found)))
}

#[utoipa::path(
    post,
    path = "/api/v1/account/password",
    request_body = PasswordChangeBody,
    description = "Changes the password of the signed in user",
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Current password wrong or new password rejected", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "account",
    security(
        ("cookie" = [])
    )
)]
async fn account_password_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<PasswordChangeBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = UserEntity::get_resource_type();
    let mut found =
        find_or_not_found::<UserEntity, UserEntityCreateUpdate>(state.pool(), user, user.user_id())
            .await?;

    let is_verified = verify_password(found.hash(), &payload.current_password)
        .map_err(WebError::server_crypt_error)?;
    if !is_verified {
        return Err(WebError::resource_bad_request(
            rt,
            "current password is incorrect",
        ));
    }

    payload
        .validate()
        .map_err(|reason| WebError::resource_bad_request(rt.clone(), reason))?;

    let hash = hash_password(&payload.new_password).map_err(WebError::server_crypt_error)?;
    found
        .set_password_hash(state.pool(), hash)
        .await
        .map_err(|e| WebError::database(rt, e))?;

    tracing::info!("password changed for {}", found.username());
    Ok(StatusCode::OK)
}

#[utoipa::path(
    get,
    path = "/api/v1/account/dashboard",
    description = "Headline counts visible to the signed in role",
    responses(
        (status = 200, description = "Dashboard counts", body = DashboardResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "account",
    security(
        ("cookie" = [])
    )
)]
async fn account_dashboard_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let mm = state.pool();

    let lessons = Lesson::count(mm, user)
        .await
        .map_err(|e| WebError::database(Lesson::get_resource_type(), e))?;

    let mut dashboard = DashboardResponse {
        role: Some(user.user_role()),
        lessons,
        ..Default::default()
    };

    if matches!(
        user.user_role(),
        UserRole::SuperAdmin | UserRole::ProgramCoordinator | UserRole::SchoolAdmin
    ) {
        dashboard.schools = Some(
            School::count(mm, user)
                .await
                .map_err(|e| WebError::database(School::get_resource_type(), e))?,
        );
        dashboard.classes = Some(
            SchoolClass::count(mm, user)
                .await
                .map_err(|e| WebError::database(SchoolClass::get_resource_type(), e))?,
        );
        dashboard.students = Some(
            Student::count(mm, user)
                .await
                .map_err(|e| WebError::database(Student::get_resource_type(), e))?,
        );
        dashboard.teachers = Some(
            Teacher::count(mm, user)
                .await
                .map_err(|e| WebError::database(Teacher::get_resource_type(), e))?,
        );
    }

    if matches!(user.user_role(), UserRole::SuperAdmin | UserRole::SchoolAdmin) {
        dashboard.parents = Some(
            Parent::count(mm, user)
                .await
                .map_err(|e| WebError::database(Parent::get_resource_type(), e))?,
        );
    }

    Ok((StatusCode::OK, Json(dashboard)))
}

#[utoipa::path(
    post,
    path = "/api/v1/account/users",
    request_body = UserCreateBody,
    description = "Creates an account with the given role. Super admin only",
    responses(
        (status = 200, description = "Account created", body = UserEntity),
        (status = 400, description = "Invalid username or password", body = ErrorResponse),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 409, description = "Username already taken", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "account",
    security(
        ("cookie" = [])
    )
)]
async fn account_create_user_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<UserCreateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = UserEntity::get_resource_type();
    user.require_role(&[UserRole::SuperAdmin], rt.clone())?;

    let username = payload.username.trim();
    if username.is_empty() {
        return Err(WebError::resource_bad_request(rt, "username is required"));
    }
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(WebError::resource_bad_request(
            rt,
            "password must be at least 8 characters long",
        ));
    }

    let hash = hash_password(&payload.password).map_err(WebError::server_crypt_error)?;
    let created = UserEntity::create(
        state.pool(),
        user,
        UserEntityCreateUpdate {
            username: username.to_string(),
            password_hash: hash,
            role: payload.role,
            email: payload.email,
        },
    )
    .await
    .map_err(|e| WebError::database(rt, e))?;

    tracing::info!("account {} created as {}", created.username(), payload.role);
    Ok((StatusCode::OK, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/v1/account/page",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Returns requested page", body = crate::model::Page<UserEntity>),
        (status = 403, description = "You're not an admin to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "account",
    security(
        ("cookie" = [])
    )
)]
async fn account_list_handler(
    ctx: RequestContext,
    Query(page): Query<PaginationQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require_role(&[UserRole::SuperAdmin], UserEntity::get_resource_type())?;

    let users = UserEntity::page(state.pool(), user, page.limit(), page.offset())
        .await
        .map_err(|e| WebError::database(UserEntity::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(users)))
}

#[utoipa::path(
    put,
    path = "/api/v1/account/{id}",
    request_body = UserUpdateBody,
    responses(
        (status = 200, description = "User updated successfully", body = UserEntity),
        (status = 400, description = "Username is empty", body = ErrorResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 403, description = "You doesn't have enough permissions to do this", body = ErrorResponse),
        (status = 409, description = "Username already taken", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "account",
    security(
        ("cookie" = [])
    )
)]
async fn account_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UserUpdateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = UserEntity::get_resource_type();

    let found = find_or_not_found::<UserEntity, UserEntityCreateUpdate>(state.pool(), user, id)
        .await?;
    check_access(state.pool(), user, &found, user.user_id())
        .await
        .map_err(|e| WebError::database(rt.clone(), e))?;

    let username = payload.username.trim();
    if username.is_empty() {
        return Err(WebError::resource_bad_request(rt, "username is required"));
    }

    let role = found.role();
    let payload = UserEntityCreateUpdate {
        username: username.to_string(),
        password_hash: String::new(), // not in use
        role,
        email: payload.email,
    };

    let updated = found
        .update(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::database(rt, e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/account/{id}",
    description = "Deletes specified user",
    responses(
        (status = 200, description = "User deleted successfully"),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "account",
    security(
        ("cookie" = [])
    )
)]
async fn account_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rt = UserEntity::get_resource_type();

    let found = find_or_not_found::<UserEntity, UserEntityCreateUpdate>(state.pool(), user, id)
        .await?;
    check_access(state.pool(), user, &found, user.user_id())
        .await
        .map_err(|e| WebError::database(rt.clone(), e))?;

    found
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::database(rt, e))?;

    Ok(StatusCode::OK)
}
