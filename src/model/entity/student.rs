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

pub const SKILL_LAB_ID_CONSTRAINT: &str = "students_skill_lab_reg_id_key";

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Student {
    id: Uuid,
    user_id: Option<Uuid>,
    school_id: Option<Uuid>,
    skill_lab_reg_id: String,
    first_name: String,
    last_name: String,
    gender: String,
    date_of_birth: NaiveDate,
    student_class: String,
    division: String,
    roll_number: String,
    academic_year: String,
    gr_number: String,
    school_email: String,
    enrollment_date: NaiveDate,
    attendance_status: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct StudentCreate {
    pub user_id: Option<Uuid>,
    pub school_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub date_of_birth: NaiveDate,
    pub student_class: String,
    pub division: String,
    pub roll_number: String,
    pub academic_year: String,
    /// General register number, unique across the platform
    pub gr_number: String,
    pub school_email: String,
    pub enrollment_date: NaiveDate,
    pub attendance_status: Option<String>,
    pub is_active: Option<bool>,
}

impl ResourceTyped for Student {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Student
    }
}

impl SchoolScoped for Student {
    fn school_id(&self) -> Option<Uuid> {
        self.school_id
    }
}

impl Student {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn skill_lab_reg_id(&self) -> &str {
        &self.skill_lab_reg_id
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn school_email(&self) -> &str {
        &self.school_email
    }
}

#[async_trait]
impl CrudRepository<Student, StudentCreate, Uuid> for Student {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: StudentCreate,
    ) -> DatabaseResult<Self> {
        let id = Uuid::new_v4();
        let division = data.division.trim().to_uppercase();
        let attendance_status = data
            .attendance_status
            .clone()
            .unwrap_or_else(|| String::from("active"));
        let is_active = data.is_active.unwrap_or(true);

        let spec = IdentifierSpec::skill_lab(current_year());
        let (data_ref, division_ref, status_ref) = (&data, &division, &attendance_status);

        let (skill_lab_reg_id, created_at) = with_unique_identifier(
            &spec,
            mm.id_attempts(),
            SKILL_LAB_ID_CONSTRAINT,
            move |reg_id| async move {
                let row = sqlx::query(
                    r#"
                    INSERT INTO students (id, user_id, school_id, skill_lab_reg_id, first_name,
                        last_name, gender, date_of_birth, student_class, division, roll_number,
                        academic_year, gr_number, school_email, enrollment_date,
                        attendance_status, is_active)
                    VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17)
                    RETURNING created_at
                    "#,
                )
                .bind(id)
                .bind(data_ref.user_id)
                .bind(data_ref.school_id)
                .bind(&reg_id)
                .bind(&data_ref.first_name)
                .bind(&data_ref.last_name)
                .bind(&data_ref.gender)
                .bind(data_ref.date_of_birth)
                .bind(&data_ref.student_class)
                .bind(division_ref)
                .bind(&data_ref.roll_number)
                .bind(&data_ref.academic_year)
                .bind(&data_ref.gr_number)
                .bind(&data_ref.school_email)
                .bind(data_ref.enrollment_date)
                .bind(status_ref)
                .bind(is_active)
                .fetch_one(mm.executor())
                .await?;

                let created_at: DateTime<Utc> = row.try_get("created_at")?;
                Ok::<_, DatabaseError>((reg_id, created_at))
            },
        )
        .await?;

        tracing::debug!("student {} registered as {}", id, skill_lab_reg_id);

        Ok(Student {
            id,
            user_id: data.user_id,
            school_id: data.school_id,
            skill_lab_reg_id,
            first_name: data.first_name,
            last_name: data.last_name,
            gender: data.gender,
            date_of_birth: data.date_of_birth,
            student_class: data.student_class,
            division,
            roll_number: data.roll_number,
            academic_year: data.academic_year,
            gr_number: data.gr_number,
            school_email: data.school_email,
            enrollment_date: data.enrollment_date,
            attendance_status,
            is_active,
            created_at,
        })
    }

    /// The registration id is assigned once and never changes.
    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: StudentCreate,
    ) -> DatabaseResult<Self> {
        let division = data.division.trim().to_uppercase();
        let attendance_status = data
            .attendance_status
            .unwrap_or_else(|| self.attendance_status.clone());
        let is_active = data.is_active.unwrap_or(self.is_active);

        sqlx::query(
            r#"
            UPDATE students SET user_id = $1, school_id = $2, first_name = $3, last_name = $4,
                gender = $5, date_of_birth = $6, student_class = $7, division = $8,
                roll_number = $9, academic_year = $10, gr_number = $11, school_email = $12,
                enrollment_date = $13, attendance_status = $14, is_active = $15
            WHERE id = $16
            "#,
        )
        .bind(data.user_id)
        .bind(data.school_id)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(&data.gender)
        .bind(data.date_of_birth)
        .bind(&data.student_class)
        .bind(&division)
        .bind(&data.roll_number)
        .bind(&data.academic_year)
        .bind(&data.gr_number)
        .bind(&data.school_email)
        .bind(data.enrollment_date)
        .bind(&attendance_status)
        .bind(is_active)
        .bind(self.id)
        .execute(mm.executor())
        .await?;

        self.user_id = data.user_id;
        self.school_id = data.school_id;
        self.first_name = data.first_name;
        self.last_name = data.last_name;
        self.gender = data.gender;
        self.date_of_birth = data.date_of_birth;
        self.student_class = data.student_class;
        self.division = division;
        self.roll_number = data.roll_number;
        self.academic_year = data.academic_year;
        self.gr_number = data.gr_number;
        self.school_email = data.school_email;
        self.enrollment_date = data.enrollment_date;
        self.attendance_status = attendance_status;
        self.is_active = is_active;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM students WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM students WHERE id = $1")
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
            SELECT * FROM students
            WHERE ($3::uuid IS NULL
                OR school_id IN (SELECT id FROM schools WHERE school_admin_id = $3))
            ORDER BY last_name, first_name
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
            SELECT COUNT(*) FROM students
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

impl_paginatable_for!(Student, StudentCreate, Uuid);
impl_school_owned_for!(Student);
