use crate::ids::{IdentifierSpec, with_unique_identifier};
use crate::model::access::SchoolScoped;
use crate::model::repo::ResourceTyped;
use crate::model::{DatabaseError, ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use crate::{impl_paginatable_for, impl_school_owned_for};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use sqlx::prelude::Row;
use uuid::Uuid;

pub const CLASS_CODE_CONSTRAINT: &str = "classes_class_code_key";
pub const DEFAULT_TOTAL_SESSIONS: i32 = 48;

/// A grade/division of a school for one academic year.
#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct SchoolClass {
    id: Uuid,
    school_id: Uuid,
    grade: String,
    division: String,
    class_name: String,
    class_code: String,
    academic_year: String,
    thinking_coach_id: Option<Uuid>,
    total_sessions: i32,
    is_active: bool,
    student_visibility: bool,
    parent_visibility: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SchoolClassCreate {
    pub school_id: Uuid,
    pub grade: String,
    pub division: String,
    /// Defaults to `Std {grade}{DIVISION}`
    pub class_name: Option<String>,
    pub academic_year: String,
    pub thinking_coach_id: Option<Uuid>,
    pub total_sessions: Option<i32>,
    pub is_active: Option<bool>,
    pub student_visibility: Option<bool>,
    pub parent_visibility: Option<bool>,
}

impl SchoolClassCreate {
    pub fn resolved_class_name(&self) -> String {
        match self.class_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => default_class_name(&self.grade, &self.division),
        }
    }

    pub fn grade_is_valid(&self) -> bool {
        self.grade
            .trim()
            .parse::<u8>()
            .is_ok_and(|g| (1..=12).contains(&g))
    }

    pub fn total_sessions_is_valid(&self) -> bool {
        self.total_sessions.is_none_or(|s| (1..=100).contains(&s))
    }
}

pub fn default_class_name(grade: &str, division: &str) -> String {
    format!("Std {}{}", grade.trim(), division.trim().to_uppercase())
}

impl ResourceTyped for SchoolClass {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Class
    }
}

impl SchoolScoped for SchoolClass {
    fn school_id(&self) -> Option<Uuid> {
        Some(self.school_id)
    }
}

impl SchoolClass {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn class_code(&self) -> &str {
        &self.class_code
    }

    pub fn grade(&self) -> &str {
        &self.grade
    }

    pub fn division(&self) -> &str {
        &self.division
    }

    pub fn academic_year(&self) -> &str {
        &self.academic_year
    }

    pub fn total_sessions(&self) -> i32 {
        self.total_sessions
    }
}

#[async_trait]
impl CrudRepository<SchoolClass, SchoolClassCreate, Uuid> for SchoolClass {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: SchoolClassCreate,
    ) -> DatabaseResult<Self> {
        let id = Uuid::new_v4();
        let division = data.division.trim().to_uppercase();
        let class_name = data.resolved_class_name();
        let total_sessions = data.total_sessions.unwrap_or(DEFAULT_TOTAL_SESSIONS);
        let is_active = data.is_active.unwrap_or(true);
        let student_visibility = data.student_visibility.unwrap_or(true);
        let parent_visibility = data.parent_visibility.unwrap_or(false);

        let spec = IdentifierSpec::class_code(&data.academic_year, &data.grade, &division);
        let (data_ref, division_ref, class_name_ref) = (&data, &division, &class_name);

        let (class_code, created_at) = with_unique_identifier(
            &spec,
            mm.id_attempts(),
            CLASS_CODE_CONSTRAINT,
            move |class_code| async move {
                let row = sqlx::query(
                    r#"
                    INSERT INTO classes (id, school_id, grade, division, class_name, class_code,
                        academic_year, thinking_coach_id, total_sessions, is_active,
                        student_visibility, parent_visibility)
                    VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
                    RETURNING created_at
                    "#,
                )
                .bind(id)
                .bind(data_ref.school_id)
                .bind(data_ref.grade.trim())
                .bind(division_ref)
                .bind(class_name_ref)
                .bind(&class_code)
                .bind(&data_ref.academic_year)
                .bind(data_ref.thinking_coach_id)
                .bind(total_sessions)
                .bind(is_active)
                .bind(student_visibility)
                .bind(parent_visibility)
                .fetch_one(mm.executor())
                .await?;

                let created_at: DateTime<Utc> = row.try_get("created_at")?;
                Ok::<_, DatabaseError>((class_code, created_at))
            },
        )
        .await?;

        tracing::debug!("class {} created with code {}", id, class_code);

        Ok(SchoolClass {
            id,
            school_id: data.school_id,
            grade: data.grade.trim().to_string(),
            division,
            class_name,
            class_code,
            academic_year: data.academic_year,
            thinking_coach_id: data.thinking_coach_id,
            total_sessions,
            is_active,
            student_visibility,
            parent_visibility,
            created_at,
        })
    }

    /// The class code is immutable, everything else is replaced.
    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: SchoolClassCreate,
    ) -> DatabaseResult<Self> {
        let division = data.division.trim().to_uppercase();
        let class_name = data.resolved_class_name();
        let total_sessions = data.total_sessions.unwrap_or(self.total_sessions);
        let is_active = data.is_active.unwrap_or(self.is_active);
        let student_visibility = data.student_visibility.unwrap_or(self.student_visibility);
        let parent_visibility = data.parent_visibility.unwrap_or(self.parent_visibility);

        sqlx::query(
            r#"
            UPDATE classes SET school_id = $1, grade = $2, division = $3, class_name = $4,
                academic_year = $5, thinking_coach_id = $6, total_sessions = $7,
                is_active = $8, student_visibility = $9, parent_visibility = $10
            WHERE id = $11
            "#,
        )
        .bind(data.school_id)
        .bind(data.grade.trim())
        .bind(&division)
        .bind(&class_name)
        .bind(&data.academic_year)
        .bind(data.thinking_coach_id)
        .bind(total_sessions)
        .bind(is_active)
        .bind(student_visibility)
        .bind(parent_visibility)
        .bind(self.id)
        .execute(mm.executor())
        .await?;

        self.school_id = data.school_id;
        self.grade = data.grade.trim().to_string();
        self.division = division;
        self.class_name = class_name;
        self.academic_year = data.academic_year;
        self.thinking_coach_id = data.thinking_coach_id;
        self.total_sessions = total_sessions;
        self.is_active = is_active;
        self.student_visibility = student_visibility;
        self.parent_visibility = parent_visibility;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM classes WHERE id = $1")
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        Ok(())
    }

    async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM classes WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    async fn list(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            r#"
            SELECT c.* FROM classes c
            JOIN schools s ON s.id = c.school_id
            WHERE ($3::uuid IS NULL OR s.school_admin_id = $3)
            ORDER BY s.school_name, c.grade, c.division
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .bind(actor.school_scope())
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM classes c
            JOIN schools s ON s.id = c.school_id
            WHERE ($1::uuid IS NULL OR s.school_admin_id = $1)
            "#,
        )
        .bind(actor.school_scope())
        .fetch_one(mm.executor())
        .await?;

        Ok(result)
    }
}

impl_paginatable_for!(SchoolClass, SchoolClassCreate, Uuid);
impl_school_owned_for!(SchoolClass);

#[cfg(test)]
mod test {
    use super::*;

    fn create(grade: &str, division: &str, class_name: Option<&str>) -> SchoolClassCreate {
        SchoolClassCreate {
            school_id: Uuid::new_v4(),
            grade: grade.to_string(),
            division: division.to_string(),
            class_name: class_name.map(String::from),
            academic_year: String::from("2025-2026"),
            thinking_coach_id: None,
            total_sessions: None,
            is_active: None,
            student_visibility: None,
            parent_visibility: None,
        }
    }

    #[test]
    fn test_default_class_name() {
        assert_eq!(create("9", "a", None).resolved_class_name(), "Std 9A");
        assert_eq!(create("10", "B", Some("  ")).resolved_class_name(), "Std 10B");
        assert_eq!(create("10", "B", Some("Tigers")).resolved_class_name(), "Tigers");
    }

    #[test]
    fn test_grade_validation() {
        assert!(create("1", "A", None).grade_is_valid());
        assert!(create("12", "A", None).grade_is_valid());
        assert!(!create("0", "A", None).grade_is_valid());
        assert!(!create("13", "A", None).grade_is_valid());
        assert!(!create("IX", "A", None).grade_is_valid());
    }

    #[test]
    fn test_total_sessions_validation() {
        let mut c = create("9", "A", None);
        assert!(c.total_sessions_is_valid());
        c.total_sessions = Some(100);
        assert!(c.total_sessions_is_valid());
        c.total_sessions = Some(0);
        assert!(!c.total_sessions_is_valid());
        c.total_sessions = Some(101);
        assert!(!c.total_sessions_is_valid());
    }
}
