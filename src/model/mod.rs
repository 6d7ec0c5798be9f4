mod access;
pub use access::{HasOwner, SchoolScoped, check_access};

mod database;
pub use database::DbConnection;

pub mod entity;

mod error;
pub use error::{DatabaseError, DatabaseResult};

mod repo;
pub use repo::{CrudRepository, Page, PaginatableRepository, ResourceType, ResourceTyped};

use sqlx::PgPool;

use crate::ids::DEFAULT_MAX_ATTEMPTS;

#[derive(Debug, Clone)]
pub struct ModelManager {
    database: DbConnection,
    id_attempts: u32,
}

impl ModelManager {
    pub fn new(conn: DbConnection) -> Self {
        Self {
            database: conn,
            id_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// How many identifiers to try before giving up on a unique collision.
    pub fn with_id_attempts(mut self, attempts: u32) -> Self {
        self.id_attempts = attempts.max(1);
        self
    }

    pub fn executor(&self) -> &PgPool {
        self.database.pool()
    }

    pub fn id_attempts(&self) -> u32 {
        self.id_attempts
    }
}
