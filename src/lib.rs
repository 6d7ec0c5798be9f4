use crate::auth::hash_password;
use crate::model::entity::{UserEntity, UserEntityCreateUpdate};
use crate::model::{CrudRepository, DbConnection, ModelManager};
use crate::utils::signal::shutdown_signal;
use crate::web::{AuthenticatedUser, UserRole};
use crate::{error::AppResult, web::AppState};
use axum::Router;
use tokio::net::TcpListener;

pub mod config;
pub use config::{Config, ConfigError, ConfigResult};

pub mod auth;
pub mod error;
pub mod ids;
pub mod lms;
pub mod model;
pub mod utils;
pub mod web;

static APPLICATION_NAME: &str = "skillab";

pub async fn build_server() -> AppResult<(AppState, Router)> {
    let use_local = cfg!(debug_assertions);
    let config = config::Config::get_or_init(use_local).await;

    let db = DbConnection::connect(config.app().database_uri())?;
    db.migrate().await?;

    build_server_with_pool(db).await
}

pub async fn build_server_with_pool(db: DbConnection) -> AppResult<(AppState, Router)> {
    let config = config::Config::get_or_init(cfg!(debug_assertions)).await;

    let mm = ModelManager::new(db).with_id_attempts(config.identifiers().max_attempts());
    bootstrap_super_admin(&mm, config).await?;

    let uploads = utils::uploads::uploads_dir(config.app().uploads_dir())?;
    let state = AppState::new(mm, uploads);
    let app = web::routes::build_app(state.clone(), config);
    Ok((state, app))
}

/// Creates the configured super admin when the platform has none yet.
pub async fn bootstrap_super_admin(mm: &ModelManager, config: &Config) -> AppResult<()> {
    let existing = UserEntity::count_by_role(mm, UserRole::SuperAdmin).await?;
    if existing > 0 {
        return Ok(());
    }

    let Some(password) = config.app().admin_password() else {
        tracing::warn!("no super admin exists and `admin_password` is not configured");
        return Ok(());
    };

    let admin = AuthenticatedUser::admin();
    let username = config.app().admin_username();
    if UserEntity::find_by_username(mm, &admin, username)
        .await?
        .is_some()
    {
        tracing::warn!("`{}` exists but is not a super admin, skipping bootstrap", username);
        return Ok(());
    }

    let data = UserEntityCreateUpdate {
        username: username.to_string(),
        password_hash: hash_password(password).map_err(model::DatabaseError::from)?,
        role: UserRole::SuperAdmin,
        email: None,
    };
    UserEntity::create(mm, &admin, data).await?;

    tracing::info!("super admin `{}` created", username);
    Ok(())
}

#[tracing::instrument]
pub async fn setup_workers() -> AppResult<()> {
    let (_, app) = build_server().await?;
    let config = Config::get_or_init(cfg!(debug_assertions)).await;
    let listener = TcpListener::bind(config.host().bindto()).await?;

    tracing::info!("axum is starting at: {}", config.host().bindto());
    let axum_handle = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

    axum_handle.await?;
    Ok(())
}

fn setup_trace() {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

    // load .env file for RUST_LOG etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .with(ErrorLayer::default())
        .init();

    tracing::debug!("tracing initialized.");
}

#[tracing::instrument]
pub async fn run() -> AppResult<()> {
    setup_trace();
    setup_workers().await?;
    Ok(())
}
