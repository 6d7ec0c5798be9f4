//! Lesson content rules.

mod classify;
pub use classify::{ContentType, LessonContent, classify, strip_tags};

mod resource_kind;
pub use resource_kind::ResourceKind;
