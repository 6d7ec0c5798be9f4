use thiserror::Error;

pub type IdResult<T> = std::result::Result<T, IdError>;

#[derive(Debug, Error)]
pub enum IdError {
    #[error("identifier prefix must not be empty")]
    EmptyPrefix,
}
