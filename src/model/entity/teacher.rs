use crate::ids::{IdentifierSpec, current_year, with_unique_identifier};
use crate::model::access::SchoolScoped;
use crate::model::repo::ResourceTyped;
use crate::model::{DatabaseError, ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use crate::{impl_paginatable_for, impl_school_owned_for};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use sqlx::prelude::Row;
use uuid::Uuid;

pub const TEACHER_EMPLOYEE_ID_CONSTRAINT: &str = "teachers_employee_id_key";

/// A thinking coach employed by a school.
#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Teacher {
    id: Uuid,
    user_id: Option<Uuid>,
    school_id: Option<Uuid>,
    employee_id: String,
    full_name: String,
    gender: String,
    designation: String,
    qualification: String,
    mobile_number: String,
    official_email: String,
    joining_date: NaiveDate,
    employment_type: String,
    attendance_status: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct TeacherCreate {
    pub user_id: Option<Uuid>,
    pub school_id: Option<Uuid>,
    pub full_name: String,
    pub gender: String,
    pub designation: String,
    pub qualification: String,
    pub mobile_number: String,
    pub official_email: String,
    pub joining_date: NaiveDate,
    /// `full_time`, `part_time` or `contract`
    pub employment_type: String,
    pub attendance_status: Option<String>,
    pub is_active: Option<bool>,
}

impl ResourceTyped for Teacher {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Teacher
    }
}

impl SchoolScoped for Teacher {
    fn school_id(&self) -> Option<Uuid> {
        self.school_id
    }
}

impl Teacher {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn employee_id(&self) -> &str {
        &self.employee_id
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn official_email(&self) -> &str {
        &self.official_email
    }
}

#[async_trait]
impl CrudRepository<Teacher, TeacherCreate, Uuid> for Teacher {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: TeacherCreate,
    ) -> DatabaseResult<Self> {
        let id = Uuid::new_v4();
        let attendance_status = data
            .attendance_status
            .clone()
            .unwrap_or_else(|| String::from("present"));
        let is_active = data.is_active.unwrap_or(true);

        let spec = IdentifierSpec::employee(current_year());
        let (data_ref, status_ref) = (&data, &attendance_status);

        let (employee_id, created_at) = with_unique_identifier(
            &spec,
            mm.id_attempts(),
            TEACHER_EMPLOYEE_ID_CONSTRAINT,
            move |employee_id| async move {
                let row = sqlx::query(
                    r#"
                    INSERT INTO teachers (id, user_id, school_id, employee_id, full_name, gender,
                        designation, qualification, mobile_number, official_email, joining_date,
                        employment_type, attendance_status, is_active)
                    VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14)
                    RETURNING created_at
                    "#,
                )
                .bind(id)
                .bind(data_ref.user_id)
                .bind(data_ref.school_id)
                .bind(&employee_id)
                .bind(&data_ref.full_name)
                .bind(&data_ref.gender)
                .bind(&data_ref.designation)
                .bind(&data_ref.qualification)
                .bind(&data_ref.mobile_number)
                .bind(&data_ref.official_email)
                .bind(data_ref.joining_date)
                .bind(&data_ref.employment_type)
                .bind(status_ref)
                .bind(is_active)
                .fetch_one(mm.executor())
                .await?;

                let created_at: DateTime<Utc> = row.try_get("created_at")?;
                Ok::<_, DatabaseError>((employee_id, created_at))
            },
        )
        .await?;

        Ok(Teacher {
            id,
            user_id: data.user_id,
            school_id: data.school_id,
            employee_id,
            full_name: data.full_name,
            gender: data.gender,
            designation: data.designation,
            qualification: data.qualification,
            mobile_number: data.mobile_number,
            official_email: data.official_email,
            joining_date: data.joining_date,
            employment_type: data.employment_type,
            attendance_status,
            is_active,
            created_at,
        })
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: TeacherCreate,
    ) -> DatabaseResult<Self> {
        let attendance_status = data
            .attendance_status
            .unwrap_or_else(|| self.attendance_status.clone());
        let is_active = data.is_active.unwrap_or(self.is_active);

        sqlx::query(
            r#"
            UPDATE teachers SET user_id = $1, school_id = $2, full_name = $3, gender = $4,
                designation = $5, qualification = $6, mobile_number = $7, official_email = $8,
                joining_date = $9, employment_type = $10, attendance_status = $11, is_active = $12
            WHERE id = $13
            "#,
        )
        .bind(data.user_id)
        .bind(data.school_id)
        .bind(&data.full_name)
        .bind(&data.gender)
        .bind(&data.designation)
        .bind(&data.qualification)
        .bind(&data.mobile_number)
        .bind(&data.official_email)
        .bind(data.joining_date)
        .bind(&data.employment_type)
        .bind(&attendance_status)
        .bind(is_active)
        .bind(self.id)
        .execute(mm.executor())
        .await?;

        self.user_id = data.user_id;
        self.school_id = data.school_id;
        self.full_name = data.full_name;
        self.gender = data.gender;
        self.designation = data.designation;
        self.qualification = data.qualification;
        self.mobile_number = data.mobile_number;
        self.official_email = data.official_email;
        self.joining_date = data.joining_date;
        self.employment_type = data.employment_type;
        self.attendance_status = attendance_status;
        self.is_active = is_active;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM teachers WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM teachers WHERE id = $1")
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
            SELECT * FROM teachers
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
            SELECT COUNT(*) FROM teachers
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

impl_paginatable_for!(Teacher, TeacherCreate, Uuid);
impl_school_owned_for!(Teacher);
