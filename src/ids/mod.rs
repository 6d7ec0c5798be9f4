//! Human-readable identifiers for students, staff, parents and classes.

mod error;
pub use error::{IdError, IdResult};

mod generator;
pub use generator::{
    IdGenerator, IdentifierSpec, SuffixCharset, academic_start_year, current_year,
};

pub(crate) mod unique;
pub use unique::{DEFAULT_MAX_ATTEMPTS, with_unique_identifier};
