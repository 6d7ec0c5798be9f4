use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::entity::{Lesson, LessonResource};

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LessonResponse {
    #[serde(flatten)]
    lesson: Lesson,
    /// Percentage of views that were completed, one decimal place
    completion_rate: f64,
}

impl From<Lesson> for LessonResponse {
    fn from(lesson: Lesson) -> Self {
        Self {
            completion_rate: lesson.completion_rate(),
            lesson,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LessonDetailResponse {
    #[serde(flatten)]
    lesson: LessonResponse,
    resources: Vec<LessonResource>,
}

impl LessonDetailResponse {
    pub fn new(lesson: Lesson, resources: Vec<LessonResource>) -> Self {
        Self {
            lesson: lesson.into(),
            resources,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ResourceAttachBody {
    pub title: String,
    /// Path of an already uploaded file, relative to the uploads directory
    pub file_path: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ResourceUpdateBody {
    /// New title. Empty keeps the current one.
    #[serde(default)]
    pub title: String,
    /// Lesson to move the attachment to
    pub lesson_id: Option<Uuid>,
}
