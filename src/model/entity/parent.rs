use crate::ids::{IdentifierSpec, with_unique_identifier};
use crate::model::access::SchoolScoped;
use crate::model::entity::Student;
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

pub const PARENT_ID_CONSTRAINT: &str = "parents_parent_id_key";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    #[default]
    Pending,
    Inactive,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Pending => "pending",
            Self::Inactive => "inactive",
        }
    }
}

impl From<&str> for AccountStatus {
    fn from(value: &str) -> Self {
        match value {
            "active" => Self::Active,
            "inactive" => Self::Inactive,
            _ => Self::Pending,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Parent {
    id: Uuid,
    user_id: Option<Uuid>,
    school_id: Option<Uuid>,
    parent_id: String,
    full_name: String,
    relation_to_student: String,
    mobile_number: String,
    email: String,
    account_status: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ParentCreate {
    pub user_id: Option<Uuid>,
    pub school_id: Option<Uuid>,
    pub full_name: String,
    /// `father`, `mother` or `guardian`
    pub relation_to_student: String,
    pub mobile_number: String,
    pub email: String,
    pub account_status: Option<AccountStatus>,
    pub is_active: Option<bool>,
}

impl ResourceTyped for Parent {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Parent
    }
}

impl SchoolScoped for Parent {
    fn school_id(&self) -> Option<Uuid> {
        self.school_id
    }
}

impl Parent {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn parent_id(&self) -> &str {
        &self.parent_id
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn account_status(&self) -> AccountStatus {
        AccountStatus::from(self.account_status.as_str())
    }
}

#[async_trait]
impl CrudRepository<Parent, ParentCreate, Uuid> for Parent {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: ParentCreate,
    ) -> DatabaseResult<Self> {
        let id = Uuid::new_v4();
        let account_status = data.account_status.unwrap_or_default();
        let is_active = data.is_active.unwrap_or(true);
        let spec = IdentifierSpec::parent();
        let data_ref = &data;

        let (parent_id, created_at) = with_unique_identifier(
            &spec,
            mm.id_attempts(),
            PARENT_ID_CONSTRAINT,
            move |parent_id| async move {
                let row = sqlx::query(
                    r#"
                    INSERT INTO parents (id, user_id, school_id, parent_id, full_name,
                        relation_to_student, mobile_number, email, account_status, is_active)
                    VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
                    RETURNING created_at
                    "#,
                )
                .bind(id)
                .bind(data_ref.user_id)
                .bind(data_ref.school_id)
                .bind(&parent_id)
                .bind(&data_ref.full_name)
                .bind(&data_ref.relation_to_student)
                .bind(&data_ref.mobile_number)
                .bind(&data_ref.email)
                .bind(account_status.as_str())
                .bind(is_active)
                .fetch_one(mm.executor())
                .await?;

                let created_at: DateTime<Utc> = row.try_get("created_at")?;
                Ok::<_, DatabaseError>((parent_id, created_at))
            },
        )
        .await?;

        Ok(Parent {
            id,
            user_id: data.user_id,
            school_id: data.school_id,
            parent_id,
            full_name: data.full_name,
            relation_to_student: data.relation_to_student,
            mobile_number: data.mobile_number,
            email: data.email,
            account_status: account_status.as_str().to_string(),
            is_active,
            created_at,
        })
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: ParentCreate,
    ) -> DatabaseResult<Self> {
        let account_status = data.account_status.unwrap_or(self.account_status());
        let is_active = data.is_active.unwrap_or(self.is_active);

        sqlx::query(
            r#"
            UPDATE parents SET user_id = $1, school_id = $2, full_name = $3,
                relation_to_student = $4, mobile_number = $5, email = $6, account_status = $7,
                is_active = $8
            WHERE id = $9
            "#,
        )
        .bind(data.user_id)
        .bind(data.school_id)
        .bind(&data.full_name)
        .bind(&data.relation_to_student)
        .bind(&data.mobile_number)
        .bind(&data.email)
        .bind(account_status.as_str())
        .bind(is_active)
        .bind(self.id)
        .execute(mm.executor())
        .await?;

        self.user_id = data.user_id;
        self.school_id = data.school_id;
        self.full_name = data.full_name;
        self.relation_to_student = data.relation_to_student;
        self.mobile_number = data.mobile_number;
        self.email = data.email;
        self.account_status = account_status.as_str().to_string();
        self.is_active = is_active;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM parents WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM parents WHERE id = $1")
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
            SELECT * FROM parents
            WHERE ($3::uuid IS NULL
                OR school_id IN (SELECT id FROM schools WHERE school_admin_id = $3))
            ORDER BY full_name
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
            SELECT COUNT(*) FROM parents
            WHERE ($1::uuid IS NULL
                OR school_id IN (SELECT id FROM schools WHERE school_admin_id = $1))
            "#,
        )
        .bind(actor.school_scope())
        .fetch_one(mm.executor())
        .await?;

        Ok(result)
    }
}

impl Parent {
    /// Links a child to the parent. Linking twice is a no-op.
    pub async fn link_student(&self, mm: &ModelManager, student_id: Uuid) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            INSERT INTO parent_students (parent_id, student_id) VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(self.id)
        .bind(student_id)
        .execute(mm.executor())
        .await?;
        Ok(())
    }

    /// Returns false when the student was not linked.
    pub async fn unlink_student(
        &self,
        mm: &ModelManager,
        student_id: Uuid,
    ) -> DatabaseResult<bool> {
        let result =
            sqlx::query("DELETE FROM parent_students WHERE parent_id = $1 AND student_id = $2")
                .bind(self.id)
                .bind(student_id)
                .execute(mm.executor())
                .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn students(&self, mm: &ModelManager) -> DatabaseResult<Vec<Student>> {
        let result = sqlx::query_as(
            r#"
            SELECT s.* FROM students s
            JOIN parent_students ps ON ps.student_id = s.id
            WHERE ps.parent_id = $1
            ORDER BY s.first_name, s.last_name
            "#,
        )
        .bind(self.id)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }
}

impl_paginatable_for!(Parent, ParentCreate, Uuid);
impl_school_owned_for!(Parent);
