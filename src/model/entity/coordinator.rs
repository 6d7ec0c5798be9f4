use crate::ids::{IdentifierSpec, current_year, with_unique_identifier};
use crate::impl_paginatable_for;
use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{DatabaseError, ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use sqlx::prelude::Row;
use uuid::Uuid;

pub const COORDINATOR_EMPLOYEE_ID_CONSTRAINT: &str = "coordinators_employee_id_key";

/// Program coordinator profile. Coordinators work across schools.
#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Coordinator {
    id: Uuid,
    user_id: Option<Uuid>,
    employee_id: String,
    full_name: String,
    gender: String,
    designation: String,
    specialization: String,
    mobile_number: String,
    official_email: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CoordinatorCreate {
    pub user_id: Option<Uuid>,
    pub full_name: String,
    pub gender: String,
    pub designation: String,
    #[serde(default)]
    pub specialization: String,
    pub mobile_number: String,
    pub official_email: String,
    pub is_active: Option<bool>,
}

impl ResourceTyped for Coordinator {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Coordinator
    }
}

impl Coordinator {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn employee_id(&self) -> &str {
        &self.employee_id
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }
}

#[async_trait]
impl CrudRepository<Coordinator, CoordinatorCreate, Uuid> for Coordinator {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: CoordinatorCreate,
    ) -> DatabaseResult<Self> {
        let id = Uuid::new_v4();
        let is_active = data.is_active.unwrap_or(true);
        let spec = IdentifierSpec::employee(current_year());
        let data_ref = &data;

        let (employee_id, created_at) = with_unique_identifier(
            &spec,
            mm.id_attempts(),
            COORDINATOR_EMPLOYEE_ID_CONSTRAINT,
            move |employee_id| async move {
                let row = sqlx::query(
                    r#"
                    INSERT INTO coordinators (id, user_id, employee_id, full_name, gender,
                        designation, specialization, mobile_number, official_email, is_active)
                    VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
                    RETURNING created_at
                    "#,
                )
                .bind(id)
                .bind(data_ref.user_id)
                .bind(&employee_id)
                .bind(&data_ref.full_name)
                .bind(&data_ref.gender)
                .bind(&data_ref.designation)
                .bind(&data_ref.specialization)
                .bind(&data_ref.mobile_number)
                .bind(&data_ref.official_email)
                .bind(is_active)
                .fetch_one(mm.executor())
                .await?;

                let created_at: DateTime<Utc> = row.try_get("created_at")?;
                Ok::<_, DatabaseError>((employee_id, created_at))
            },
        )
        .await?;

        Ok(Coordinator {
            id,
            user_id: data.user_id,
            employee_id,
            full_name: data.full_name,
            gender: data.gender,
            designation: data.designation,
            specialization: data.specialization,
            mobile_number: data.mobile_number,
            official_email: data.official_email,
            is_active,
            created_at,
        })
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: CoordinatorCreate,
    ) -> DatabaseResult<Self> {
        let is_active = data.is_active.unwrap_or(self.is_active);
        sqlx::query(
            r#"
            UPDATE coordinators SET user_id = $1, full_name = $2, gender = $3, designation = $4,
                specialization = $5, mobile_number = $6, official_email = $7, is_active = $8
            WHERE id = $9
            "#,
        )
        .bind(data.user_id)
        .bind(&data.full_name)
        .bind(&data.gender)
        .bind(&data.designation)
        .bind(&data.specialization)
        .bind(&data.mobile_number)
        .bind(&data.official_email)
        .bind(is_active)
        .bind(self.id)
        .execute(mm.executor())
        .await?;

        self.user_id = data.user_id;
        self.full_name = data.full_name;
        self.gender = data.gender;
        self.designation = data.designation;
        self.specialization = data.specialization;
        self.mobile_number = data.mobile_number;
        self.official_email = data.official_email;
        self.is_active = is_active;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM coordinators WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM coordinators WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    async fn list(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let result =
            sqlx::query_as("SELECT * FROM coordinators ORDER BY full_name LIMIT $1 OFFSET $2")
                .bind(limit)
                .bind(offset)
                .fetch_all(mm.executor())
                .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM coordinators")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl_paginatable_for!(Coordinator, CoordinatorCreate, Uuid);

#[async_trait]
impl HasOwner for Coordinator {
    type OwnerId = Option<Uuid>;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.user_id)
    }
}
