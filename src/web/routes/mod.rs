use crate::{
    Config,
    model::{CrudRepository, ModelManager, ResourceTyped, entity::School},
    web::{AppState, AuthenticatedUser, UserRole, WebError, WebResult, doc::ApiDoc},
};
use axum::Router;
use serde::Deserialize;
use tower_cookies::CookieManagerLayer;
use tower_http::{cors::CorsLayer, services::ServeDir};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

pub mod account;
pub mod classes;
pub mod coordinators;
pub mod lessons;
pub mod parents;
pub mod schools;
pub mod students;
pub mod teachers;

pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationQuery {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_limit() -> i64 {
    20
}

impl PaginationQuery {
    pub fn limit(&self) -> i64 {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        self.offset.max(0)
    }
}

pub fn build_app<S: Send + Sync + Clone + 'static>(
    state: AppState,
    config: &'static Config,
) -> Router<S> {
    let uploads = ServeDir::new(state.uploads_dir());
    let mut router = Router::new()
        .nest("/api/v1/account/", account::routes(state.clone()))
        .nest("/api/v1/schools/", schools::routes(state.clone()))
        .nest("/api/v1/classes/", classes::routes(state.clone()))
        .nest("/api/v1/students/", students::routes(state.clone()))
        .nest("/api/v1/teachers/", teachers::routes(state.clone()))
        .nest("/api/v1/coordinators/", coordinators::routes(state.clone()))
        .nest("/api/v1/parents/", parents::routes(state.clone()))
        .nest("/api/v1/lessons/", lessons::routes(state.clone()))
        .nest_service("/api/v1/static/", uploads)
        .layer(CookieManagerLayer::default())
        .layer(CorsLayer::very_permissive())
        .with_state(state);

    if config.app().docs() {
        let openapi = ApiDoc::openapi();

        router = router.merge(SwaggerUi::new("/api/v1/docs").url("/api-doc/openapi.json", openapi));
    }

    router
}

/// Loads a record or fails with 404.
pub(crate) async fn find_or_not_found<T, C>(
    mm: &ModelManager,
    user: &AuthenticatedUser,
    id: Uuid,
) -> WebResult<T>
where
    T: CrudRepository<T, C, Uuid> + ResourceTyped,
{
    T::find_by_id(mm, user, id)
        .await
        .map_err(|e| WebError::database(T::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(T::get_resource_type()))
}

/// Super admins pass; school admins only for schools they administer.
pub(crate) async fn ensure_school_admin(
    mm: &ModelManager,
    user: &AuthenticatedUser,
    school_id: Option<Uuid>,
    resource: crate::model::ResourceType,
) -> WebResult<()> {
    match user.user_role() {
        UserRole::SuperAdmin => Ok(()),
        UserRole::SchoolAdmin => {
            let Some(school_id) = school_id else {
                return Err(WebError::resource_forbidden(resource));
            };
            let school = School::find_by_id(mm, user, school_id)
                .await
                .map_err(|e| WebError::database(School::get_resource_type(), e))?
                .ok_or_else(|| {
                    WebError::resource_bad_request(resource.clone(), "school does not exist")
                })?;

            if school.school_admin_id() == Some(user.user_id()) {
                Ok(())
            } else {
                Err(WebError::resource_forbidden(resource))
            }
        }
        _ => Err(WebError::resource_forbidden(resource)),
    }
}
