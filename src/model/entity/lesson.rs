use crate::impl_paginatable_for;
use crate::lms::{ContentType, LessonContent, classify};
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use sqlx::prelude::Row;
use sqlx::PgConnection;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LessonLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl LessonLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LessonStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl LessonStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Lesson {
    id: Uuid,
    title: String,
    description: String,
    competency: String,
    level: String,
    module: String,
    applicable_grades: String,
    video_urls: String,
    article_content: String,
    quiz_data: String,
    default_content_type: String,
    primary_content_type: String,
    status: String,
    is_published: bool,
    recommend_low_competency: bool,
    view_count: i32,
    completion_count: i32,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Authored lesson fields. The primary content type is always derived.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(default)]
pub struct LessonCreate {
    pub title: String,
    pub description: String,
    pub competency: String,
    pub level: LessonLevel,
    pub module: String,
    /// Comma separated, e.g. `6,7,8`
    pub applicable_grades: String,
    /// JSON array of URLs
    pub video_urls: String,
    /// HTML
    pub article_content: String,
    /// JSON array of questions
    pub quiz_data: String,
    /// Used when the lesson has no classifiable content yet
    pub default_content_type: ContentType,
    pub status: LessonStatus,
    pub recommend_low_competency: bool,
}

impl LessonCreate {
    pub fn content(&self, has_resources: bool) -> LessonContent<'_> {
        LessonContent {
            video_urls: &self.video_urls,
            article: &self.article_content,
            quiz_data: &self.quiz_data,
            has_resources,
        }
    }

    pub fn primary_content_type(&self, has_resources: bool) -> ContentType {
        classify(&self.content(has_resources), self.default_content_type)
    }
}

/// Percentage of views that ended in a completion, one decimal place.
pub fn completion_rate(view_count: i32, completion_count: i32) -> f64 {
    if view_count <= 0 {
        return 0.0;
    }
    let rate = f64::from(completion_count) / f64::from(view_count) * 100.0;
    (rate * 10.0).round() / 10.0
}

impl ResourceTyped for Lesson {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Lesson
    }
}

impl Lesson {
    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_published(&self) -> bool {
        self.is_published
    }

    pub fn view_count(&self) -> i32 {
        self.view_count
    }

    pub fn completion_count(&self) -> i32 {
        self.completion_count
    }

    pub fn completion_rate(&self) -> f64 {
        completion_rate(self.view_count, self.completion_count)
    }

    pub fn default_content_type(&self) -> ContentType {
        self.default_content_type.parse().unwrap_or_default()
    }

    pub fn primary_content_type(&self) -> ContentType {
        self.primary_content_type.parse().unwrap_or_default()
    }

    pub fn content(&self, has_resources: bool) -> LessonContent<'_> {
        LessonContent {
            video_urls: &self.video_urls,
            article: &self.article_content,
            quiz_data: &self.quiz_data,
            has_resources,
        }
    }

    /// Staff see every lesson, everyone else only published ones.
    pub fn is_visible_to(&self, actor: &AuthenticatedUser) -> bool {
        self.is_published || actor.user_role().is_staff()
    }
}

#[async_trait]
impl CrudRepository<Lesson, LessonCreate, uuid::Uuid> for Lesson {
    async fn create(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: LessonCreate,
    ) -> DatabaseResult<Self> {
        // a new lesson has no attachments
        let primary = data.primary_content_type(false);
        let is_published = data.status == LessonStatus::Published;
        let created_by = actor.account_id();

        let result = sqlx::query(
            r#"
            INSERT INTO lessons (id, title, description, competency, level, module,
                applicable_grades, video_urls, article_content, quiz_data, default_content_type,
                primary_content_type, status, is_published, recommend_low_competency, created_by)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16)
            RETURNING id, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.competency)
        .bind(data.level.as_str())
        .bind(&data.module)
        .bind(&data.applicable_grades)
        .bind(&data.video_urls)
        .bind(&data.article_content)
        .bind(&data.quiz_data)
        .bind(data.default_content_type.as_str())
        .bind(primary.as_str())
        .bind(data.status.as_str())
        .bind(is_published)
        .bind(data.recommend_low_competency)
        .bind(created_by)
        .fetch_one(mm.executor())
        .await?;

        let id: Uuid = result.try_get("id")?;
        tracing::debug!("lesson {} classified as {}", id, primary);

        Ok(Lesson {
            id,
            title: data.title,
            description: data.description,
            competency: data.competency,
            level: data.level.as_str().to_string(),
            module: data.module,
            applicable_grades: data.applicable_grades,
            video_urls: data.video_urls,
            article_content: data.article_content,
            quiz_data: data.quiz_data,
            default_content_type: data.default_content_type.as_str().to_string(),
            primary_content_type: primary.as_str().to_string(),
            status: data.status.as_str().to_string(),
            is_published,
            recommend_low_competency: data.recommend_low_competency,
            view_count: 0,
            completion_count: 0,
            created_by,
            created_at: result.try_get("created_at")?,
            updated_at: result.try_get("updated_at")?,
        })
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: LessonCreate,
    ) -> DatabaseResult<Self> {
        // attachments may change concurrently, classify under the row lock
        let mut tx = mm.executor().begin().await?;
        Self::lock_for_update(&mut tx, self.id).await?;
        let has_resources = Self::has_resources_in(&mut tx, self.id).await?;
        let primary = data.primary_content_type(has_resources);
        let is_published = data.status == LessonStatus::Published;

        let updated_at: DateTime<Utc> = sqlx::query_scalar(
            r#"
            UPDATE lessons SET title = $1, description = $2, competency = $3, level = $4,
                module = $5, applicable_grades = $6, video_urls = $7, article_content = $8,
                quiz_data = $9, default_content_type = $10, primary_content_type = $11,
                status = $12, is_published = $13, recommend_low_competency = $14,
                updated_at = now()
            WHERE id = $15
            RETURNING updated_at
            "#,
        )
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.competency)
        .bind(data.level.as_str())
        .bind(&data.module)
        .bind(&data.applicable_grades)
        .bind(&data.video_urls)
        .bind(&data.article_content)
        .bind(&data.quiz_data)
        .bind(data.default_content_type.as_str())
        .bind(primary.as_str())
        .bind(data.status.as_str())
        .bind(is_published)
        .bind(data.recommend_low_competency)
        .bind(self.id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        self.title = data.title;
        self.description = data.description;
        self.competency = data.competency;
        self.level = data.level.as_str().to_string();
        self.module = data.module;
        self.applicable_grades = data.applicable_grades;
        self.video_urls = data.video_urls;
        self.article_content = data.article_content;
        self.quiz_data = data.quiz_data;
        self.default_content_type = data.default_content_type.as_str().to_string();
        self.primary_content_type = primary.as_str().to_string();
        self.status = data.status.as_str().to_string();
        self.is_published = is_published;
        self.recommend_low_competency = data.recommend_low_competency;
        self.updated_at = updated_at;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM lessons WHERE id = $1")
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        Ok(())
    }

    async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: uuid::Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM lessons WHERE id = $1")
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
            SELECT * FROM lessons
            WHERE ($3 OR is_published)
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .bind(actor.user_role().is_staff())
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lessons WHERE ($1 OR is_published)")
            .bind(actor.user_role().is_staff())
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl Lesson {
    /// Locks the lesson row until the surrounding transaction ends.
    pub(crate) async fn lock_for_update(
        conn: &mut PgConnection,
        lesson_id: Uuid,
    ) -> DatabaseResult<Option<Lesson>> {
        let result = sqlx::query_as("SELECT * FROM lessons WHERE id = $1 FOR UPDATE")
            .bind(lesson_id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(result)
    }

    async fn has_resources_in(conn: &mut PgConnection, lesson_id: Uuid) -> DatabaseResult<bool> {
        let result: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM lesson_resources WHERE lesson_id = $1)")
                .bind(lesson_id)
                .fetch_one(&mut *conn)
                .await?;
        Ok(result)
    }

    /// Re-derives the primary content type of a lesson the caller holds
    /// locked with [`Lesson::lock_for_update`].
    pub(crate) async fn reclassify_locked(
        conn: &mut PgConnection,
        lesson: &Lesson,
    ) -> DatabaseResult<ContentType> {
        let has_resources = Self::has_resources_in(conn, lesson.id).await?;
        let primary = classify(
            &lesson.content(has_resources),
            lesson.default_content_type(),
        );
        if primary == lesson.primary_content_type() {
            return Ok(primary);
        }

        sqlx::query("UPDATE lessons SET primary_content_type = $1, updated_at = now() WHERE id = $2")
            .bind(primary.as_str())
            .bind(lesson.id)
            .execute(&mut *conn)
            .await?;
        tracing::debug!("lesson {} reclassified as {}", lesson.id, primary);
        Ok(primary)
    }

    pub async fn record_view(&mut self, mm: &ModelManager) -> DatabaseResult<()> {
        let view_count: i32 = sqlx::query_scalar(
            "UPDATE lessons SET view_count = view_count + 1 WHERE id = $1 RETURNING view_count",
        )
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;

        self.view_count = view_count;
        Ok(())
    }

    pub async fn record_completion(&mut self, mm: &ModelManager) -> DatabaseResult<()> {
        let completion_count: i32 = sqlx::query_scalar(
            "UPDATE lessons SET completion_count = completion_count + 1 WHERE id = $1 RETURNING completion_count",
        )
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;

        self.completion_count = completion_count;
        Ok(())
    }
}

impl_paginatable_for!(Lesson, LessonCreate, Uuid);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_completion_rate() {
        assert_eq!(completion_rate(0, 0), 0.0);
        assert_eq!(completion_rate(0, 3), 0.0);
        assert_eq!(completion_rate(3, 1), 33.3);
        assert_eq!(completion_rate(3, 2), 66.7);
        assert_eq!(completion_rate(40, 40), 100.0);
    }

    #[test]
    fn test_create_derives_primary_type() {
        let mut data = LessonCreate {
            title: String::from("Design thinking"),
            default_content_type: ContentType::Quiz,
            ..Default::default()
        };
        assert_eq!(data.primary_content_type(false), ContentType::Quiz);
        assert_eq!(data.primary_content_type(true), ContentType::Mixed);

        data.article_content = String::from("<p>Empathize</p>");
        assert_eq!(data.primary_content_type(true), ContentType::Article);

        data.video_urls = String::from(r#"["https://youtu.be/x"]"#);
        assert_eq!(data.primary_content_type(true), ContentType::Video);
    }

    #[test]
    fn test_create_deserializes_with_defaults() {
        let data: LessonCreate =
            serde_json::from_str(r#"{"title": "Empathy", "status": "published"}"#).unwrap();
        assert_eq!(data.level, LessonLevel::Beginner);
        assert_eq!(data.status, LessonStatus::Published);
        assert_eq!(data.default_content_type, ContentType::Video);
        assert!(data.video_urls.is_empty());
    }
}
