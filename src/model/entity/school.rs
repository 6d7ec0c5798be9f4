use crate::impl_paginatable_for;
use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use sqlx::prelude::Row;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct School {
    id: Uuid,
    school_admin_id: Option<Uuid>,
    school_name: String,
    school_code: String,
    board: String,
    city: String,
    state: String,
    school_email: String,
    school_phone: String,
    principal_name: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SchoolCreate {
    pub school_admin_id: Option<Uuid>,
    pub school_name: String,
    /// UDISE code
    pub school_code: String,
    pub board: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub school_email: String,
    #[serde(default)]
    pub school_phone: String,
    #[serde(default)]
    pub principal_name: String,
    pub is_active: Option<bool>,
}

impl ResourceTyped for School {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::School
    }
}

impl School {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn school_admin_id(&self) -> Option<Uuid> {
        self.school_admin_id
    }

    pub fn school_name(&self) -> &str {
        &self.school_name
    }

    pub fn school_code(&self) -> &str {
        &self.school_code
    }

    pub fn board(&self) -> &str {
        &self.board
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn full_address(&self) -> String {
        [self.city.as_str(), self.state.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[async_trait]
impl CrudRepository<School, SchoolCreate, Uuid> for School {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: SchoolCreate,
    ) -> DatabaseResult<Self> {
        let is_active = data.is_active.unwrap_or(true);
        let result = sqlx::query(
            r#"
            INSERT INTO schools (id, school_admin_id, school_name, school_code, board, city,
                state, school_email, school_phone, principal_name, is_active)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
            RETURNING id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.school_admin_id)
        .bind(&data.school_name)
        .bind(&data.school_code)
        .bind(&data.board)
        .bind(&data.city)
        .bind(&data.state)
        .bind(&data.school_email)
        .bind(&data.school_phone)
        .bind(&data.principal_name)
        .bind(is_active)
        .fetch_one(mm.executor())
        .await?;

        Ok(School {
            id: result.try_get("id")?,
            school_admin_id: data.school_admin_id,
            school_name: data.school_name,
            school_code: data.school_code,
            board: data.board,
            city: data.city,
            state: data.state,
            school_email: data.school_email,
            school_phone: data.school_phone,
            principal_name: data.principal_name,
            is_active,
            created_at: result.try_get("created_at")?,
        })
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: SchoolCreate,
    ) -> DatabaseResult<Self> {
        let is_active = data.is_active.unwrap_or(self.is_active);
        sqlx::query(
            r#"
            UPDATE schools SET school_admin_id = $1, school_name = $2, school_code = $3,
                board = $4, city = $5, state = $6, school_email = $7, school_phone = $8,
                principal_name = $9, is_active = $10
            WHERE id = $11
            "#,
        )
        .bind(data.school_admin_id)
        .bind(&data.school_name)
        .bind(&data.school_code)
        .bind(&data.board)
        .bind(&data.city)
        .bind(&data.state)
        .bind(&data.school_email)
        .bind(&data.school_phone)
        .bind(&data.principal_name)
        .bind(is_active)
        .bind(self.id)
        .execute(mm.executor())
        .await?;

        self.school_admin_id = data.school_admin_id;
        self.school_name = data.school_name;
        self.school_code = data.school_code;
        self.board = data.board;
        self.city = data.city;
        self.state = data.state;
        self.school_email = data.school_email;
        self.school_phone = data.school_phone;
        self.principal_name = data.principal_name;
        self.is_active = is_active;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM schools WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM schools WHERE id = $1")
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
            SELECT * FROM schools
            WHERE ($3::uuid IS NULL OR school_admin_id = $3)
            ORDER BY school_name
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
            "SELECT COUNT(*) FROM schools WHERE ($1::uuid IS NULL OR school_admin_id = $1)",
        )
        .bind(actor.school_scope())
        .fetch_one(mm.executor())
        .await?;

        Ok(result)
    }
}

impl School {
    /// Name or code search, used by the school picker.
    pub async fn search(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        query: &str,
        limit: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let pattern = format!("%{}%", query.trim());
        let result = sqlx::query_as(
            r#"
            SELECT * FROM schools
            WHERE (school_name ILIKE $1 OR school_code ILIKE $1)
              AND ($3::uuid IS NULL OR school_admin_id = $3)
            ORDER BY school_name
            LIMIT $2
            "#,
        )
        .bind(&pattern)
        .bind(limit)
        .bind(actor.school_scope())
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }
}

impl_paginatable_for!(School, SchoolCreate, Uuid);

#[async_trait]
impl HasOwner for School {
    type OwnerId = Option<Uuid>;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.school_admin_id)
    }
}
