use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::entity::{Parent, Student};

/// A parent with the children linked to it.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ParentDetailResponse {
    #[serde(flatten)]
    parent: Parent,
    students: Vec<Student>,
}

impl ParentDetailResponse {
    pub fn new(parent: Parent, students: Vec<Student>) -> Self {
        Self { parent, students }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct StudentLinkBody {
    pub student_id: Uuid,
}
