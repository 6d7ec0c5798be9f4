use thiserror::Error;

pub type DatabaseResult<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("sqlx migrate error: {0}")]
    SqlxMigrateError(#[from] sqlx::migrate::MigrateError),
    #[error("sqlx error: {0}")]
    SqlxError(#[from] sqlx::Error),
    #[error("json error: {0}")]
    SerdeError(#[from] serde_json::Error),
    #[error("crypt error: {0}")]
    CryptError(#[from] crate::auth::CryptError),
    #[error("access to this resource is forbidden")]
    Forbidden,
    #[error("no free identifier for {constraint} after {attempts} attempts")]
    IdentifierExhausted {
        constraint: &'static str,
        attempts: u32,
    },
}

impl DatabaseError {
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::SqlxError(sqlx::Error::Database(e)) => e.is_unique_violation(),
            _ => false,
        }
    }

    pub fn is_unique_violation_on(&self, constraint: &str) -> bool {
        match self {
            Self::SqlxError(sqlx::Error::Database(e)) => {
                e.is_unique_violation() && e.constraint() == Some(constraint)
            }
            _ => false,
        }
    }

    pub fn is_foreign_key_violation(&self) -> bool {
        match self {
            Self::SqlxError(sqlx::Error::Database(e)) => e.is_foreign_key_violation(),
            _ => false,
        }
    }

    pub fn is_check_violation(&self) -> bool {
        match self {
            Self::SqlxError(sqlx::Error::Database(e)) => e.is_check_violation(),
            _ => false,
        }
    }
}
