use crate::impl_paginatable_for;
use crate::lms::ResourceKind;
use crate::model::entity::Lesson;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use sqlx::prelude::Row;
use uuid::Uuid;

/// A file attached to a lesson. The file itself lives in the uploads directory.
#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct LessonResource {
    id: Uuid,
    lesson_id: Uuid,
    title: String,
    file_path: String,
    resource_type: String,
    file_size: i64,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct LessonResourceCreate {
    pub lesson_id: Uuid,
    pub title: String,
    /// Path relative to the uploads directory
    pub file_path: String,
    #[serde(default)]
    pub file_size: i64,
}

impl ResourceTyped for LessonResource {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::LessonResource
    }
}

impl LessonResource {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn lesson_id(&self) -> Uuid {
        self.lesson_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn file_size(&self) -> i64 {
        self.file_size
    }

    pub fn resource_type(&self) -> ResourceKind {
        ResourceKind::from(self.resource_type.as_str())
    }
}

#[async_trait]
impl CrudRepository<LessonResource, LessonResourceCreate, Uuid> for LessonResource {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: LessonResourceCreate,
    ) -> DatabaseResult<Self> {
        let kind = ResourceKind::from_file_name(&data.file_path);

        // the lesson row lock orders attachments against lesson edits
        let mut tx = mm.executor().begin().await?;
        let lesson = Lesson::lock_for_update(&mut tx, data.lesson_id).await?;

        let result = sqlx::query(
            r#"
            INSERT INTO lesson_resources (id, lesson_id, title, file_path, resource_type, file_size)
            VALUES ($1,$2,$3,$4,$5,$6)
            RETURNING id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.lesson_id)
        .bind(&data.title)
        .bind(&data.file_path)
        .bind(kind.as_str())
        .bind(data.file_size)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(lesson) = lesson {
            Lesson::reclassify_locked(&mut tx, &lesson).await?;
        }
        tx.commit().await?;

        Ok(LessonResource {
            id: result.try_get("id")?,
            lesson_id: data.lesson_id,
            title: data.title,
            file_path: data.file_path,
            resource_type: kind.as_str().to_string(),
            file_size: data.file_size,
            created_at: result.try_get("created_at")?,
        })
    }

    /// Renames the attachment or moves it to another lesson. A move
    /// reclassifies both lessons.
    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: LessonResourceCreate,
    ) -> DatabaseResult<Self> {
        let kind = ResourceKind::from_file_name(&data.file_path);

        // lock in id order so two opposite moves cannot deadlock
        let mut affected = vec![self.lesson_id, data.lesson_id];
        affected.sort();
        affected.dedup();

        let mut tx = mm.executor().begin().await?;
        let mut locked = Vec::with_capacity(affected.len());
        for lesson_id in affected {
            if let Some(lesson) = Lesson::lock_for_update(&mut tx, lesson_id).await? {
                locked.push(lesson);
            }
        }

        sqlx::query(
            r#"
            UPDATE lesson_resources SET lesson_id = $1, title = $2, file_path = $3,
                resource_type = $4, file_size = $5
            WHERE id = $6
            "#,
        )
        .bind(data.lesson_id)
        .bind(&data.title)
        .bind(&data.file_path)
        .bind(kind.as_str())
        .bind(data.file_size)
        .bind(self.id)
        .execute(&mut *tx)
        .await?;

        for lesson in &locked {
            Lesson::reclassify_locked(&mut tx, lesson).await?;
        }
        tx.commit().await?;

        self.lesson_id = data.lesson_id;
        self.title = data.title;
        self.file_path = data.file_path;
        self.resource_type = kind.as_str().to_string();
        self.file_size = data.file_size;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        let mut tx = mm.executor().begin().await?;
        let lesson = Lesson::lock_for_update(&mut tx, self.lesson_id).await?;

        sqlx::query("DELETE FROM lesson_resources WHERE id = $1")
            .bind(self.id)
            .execute(&mut *tx)
            .await?;

        if let Some(lesson) = lesson {
            Lesson::reclassify_locked(&mut tx, &lesson).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM lesson_resources WHERE id = $1")
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
            sqlx::query_as("SELECT * FROM lesson_resources ORDER BY created_at LIMIT $1 OFFSET $2")
                .bind(limit)
                .bind(offset)
                .fetch_all(mm.executor())
                .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lesson_resources")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl LessonResource {
    pub async fn all_by_lesson(mm: &ModelManager, lesson_id: Uuid) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM lesson_resources WHERE lesson_id = $1 ORDER BY created_at",
        )
        .bind(lesson_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }
}

impl_paginatable_for!(LessonResource, LessonResourceCreate, Uuid);
