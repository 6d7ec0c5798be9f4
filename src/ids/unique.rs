use std::future::Future;

use crate::model::{DatabaseError, DatabaseResult};

use super::IdGenerator;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Runs `insert` with freshly generated identifiers until it stops failing
/// on `constraint`.
///
/// Only a unique violation on `constraint` triggers a retry. Every other
/// error, including violations of other unique columns, is returned as is.
pub async fn with_unique_identifier<G, F, Fut, T>(
    generator: &G,
    max_attempts: u32,
    constraint: &'static str,
    mut insert: F,
) -> DatabaseResult<T>
where
    G: IdGenerator + ?Sized,
    F: FnMut(String) -> Fut,
    Fut: Future<Output = DatabaseResult<T>>,
{
    let attempts = max_attempts.max(1);

    for attempt in 1..=attempts {
        let candidate = generator.generate_id();
        match insert(candidate.clone()).await {
            Err(e) if e.is_unique_violation_on(constraint) => {
                tracing::warn!(
                    "identifier {} collided on {} (attempt {}/{})",
                    candidate,
                    constraint,
                    attempt,
                    attempts
                );
            }
            other => return other,
        }
    }

    Err(DatabaseError::IdentifierExhausted {
        constraint,
        attempts,
    })
}

#[cfg(test)]
pub(crate) mod test {
    use std::borrow::Cow;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use sqlx::error::ErrorKind;

    use super::*;

    /// Hands out a fixed sequence of identifiers, then repeats the last one.
    pub struct SequenceGenerator {
        ids: Mutex<Vec<&'static str>>,
    }

    impl SequenceGenerator {
        pub fn new(mut ids: Vec<&'static str>) -> Self {
            ids.reverse();
            Self {
                ids: Mutex::new(ids),
            }
        }
    }

    impl IdGenerator for SequenceGenerator {
        fn generate_id(&self) -> String {
            let mut ids = self.ids.lock().unwrap();
            if ids.len() > 1 {
                ids.pop().unwrap().to_string()
            } else {
                ids.last().copied().unwrap_or_default().to_string()
            }
        }
    }

    #[derive(Debug)]
    pub struct FakeUniqueViolation(pub &'static str);

    impl std::fmt::Display for FakeUniqueViolation {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "duplicate key value violates unique constraint \"{}\"", self.0)
        }
    }

    impl std::error::Error for FakeUniqueViolation {}

    impl sqlx::error::DatabaseError for FakeUniqueViolation {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed("23505"))
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn constraint(&self) -> Option<&str> {
            Some(self.0)
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    pub fn unique_violation(constraint: &'static str) -> DatabaseError {
        DatabaseError::SqlxError(sqlx::Error::Database(Box::new(FakeUniqueViolation(
            constraint,
        ))))
    }

    #[tokio::test]
    async fn test_first_candidate_accepted() {
        let generator = SequenceGenerator::new(vec!["A1"]);
        let calls = AtomicU32::new(0);

        let id = with_unique_identifier(&generator, 5, "t_code_key", |candidate| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(candidate) }
        })
        .await
        .unwrap();

        assert_eq!(id, "A1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_until_free() {
        let generator = SequenceGenerator::new(vec!["TAKEN1", "TAKEN2", "FREE"]);
        let taken = ["TAKEN1", "TAKEN2"];

        let id = with_unique_identifier(&generator, 5, "t_code_key", |candidate| async move {
            if taken.contains(&candidate.as_str()) {
                Err(unique_violation("t_code_key"))
            } else {
                Ok(candidate)
            }
        })
        .await
        .unwrap();

        assert_eq!(id, "FREE");
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let generator = SequenceGenerator::new(vec!["SAME"]);
        let calls = AtomicU32::new(0);

        let result: DatabaseResult<String> =
            with_unique_identifier(&generator, 5, "t_code_key", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(unique_violation("t_code_key")) }
            })
            .await;

        assert!(matches!(
            result,
            Err(DatabaseError::IdentifierExhausted {
                constraint: "t_code_key",
                attempts: 5
            })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_other_constraint_is_not_retried() {
        let generator = SequenceGenerator::new(vec!["A", "B"]);
        let calls = AtomicU32::new(0);

        let result: DatabaseResult<String> =
            with_unique_identifier(&generator, 5, "t_code_key", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(unique_violation("t_email_key")) }
            })
            .await;

        assert!(result.unwrap_err().is_unique_violation_on("t_email_key"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_means_one() {
        let generator = SequenceGenerator::new(vec!["X"]);
        let result: DatabaseResult<String> =
            with_unique_identifier(&generator, 0, "t_code_key", |_| async {
                Err(unique_violation("t_code_key"))
            })
            .await;

        assert!(matches!(
            result,
            Err(DatabaseError::IdentifierExhausted { attempts: 1, .. })
        ));
    }
}
