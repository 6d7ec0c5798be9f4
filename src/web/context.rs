//! Request context, e.g. user id, its role, etc.
//!

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};

use crate::{
    model::ResourceType,
    web::{WebResult, error::WebError},
};

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    user_id: uuid::Uuid,
    user_role: UserRole,
}

impl AuthenticatedUser {
    pub fn new(user_id: uuid::Uuid, user_role: UserRole) -> Self {
        Self { user_id, user_role }
    }

    /// Internal actor used by bootstrap code and the CLI.
    pub fn admin() -> Self {
        Self {
            user_role: UserRole::SuperAdmin,
            user_id: uuid::Uuid::max(), // admin ID
        }
    }

    pub fn user_id(&self) -> uuid::Uuid {
        self.user_id
    }

    /// The id of a real account, `None` for the internal admin actor.
    pub fn account_id(&self) -> Option<uuid::Uuid> {
        (self.user_id != uuid::Uuid::max()).then_some(self.user_id)
    }

    pub fn user_role(&self) -> UserRole {
        self.user_role
    }

    pub fn is_super_admin(&self) -> bool {
        self.user_role == UserRole::SuperAdmin
    }

    /// Admin id to filter school-owned listings by. `None` means unrestricted.
    pub fn school_scope(&self) -> Option<uuid::Uuid> {
        match self.user_role {
            UserRole::SchoolAdmin => Some(self.user_id),
            _ => None,
        }
    }

    pub fn require_role(&self, allowed: &[UserRole], resource: ResourceType) -> WebResult<()> {
        if allowed.contains(&self.user_role) {
            Ok(())
        } else {
            Err(WebError::resource_forbidden(resource))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    SuperAdmin,
    ProgramCoordinator,
    SchoolAdmin,
    ThinkingCoach,
    Parent,
    Student,
}

impl UserRole {
    pub const STAFF: &'static [UserRole] = &[
        UserRole::SuperAdmin,
        UserRole::ProgramCoordinator,
        UserRole::SchoolAdmin,
        UserRole::ThinkingCoach,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "SUPER_ADMIN",
            Self::ProgramCoordinator => "PROGRAM_COORDINATOR",
            Self::SchoolAdmin => "SCHOOL_ADMIN",
            Self::ThinkingCoach => "THINKING_COACH",
            Self::Parent => "PARENT",
            Self::Student => "STUDENT",
        }
    }

    /// Where the role lands after signing in.
    pub fn dashboard_path(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "/super-admin/dashboard/",
            Self::ProgramCoordinator => "/coordinator/dashboard/",
            Self::SchoolAdmin => "/school-admin/dashboard/",
            Self::ThinkingCoach => "/teacher/dashboard/",
            Self::Parent => "/parent/dashboard/",
            Self::Student => "/student/dashboard/",
        }
    }

    pub fn is_staff(&self) -> bool {
        Self::STAFF.contains(self)
    }
}

impl TryFrom<&str> for UserRole {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "SUPER_ADMIN" => Ok(Self::SuperAdmin),
            "PROGRAM_COORDINATOR" => Ok(Self::ProgramCoordinator),
            "SCHOOL_ADMIN" => Ok(Self::SchoolAdmin),
            "THINKING_COACH" => Ok(Self::ThinkingCoach),
            "PARENT" => Ok(Self::Parent),
            "STUDENT" => Ok(Self::Student),
            other => Err(format!("unknown role `{other}`")),
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    maybe_user: Option<AuthenticatedUser>,
}

impl RequestContext {
    pub fn new(maybe_user: Option<AuthenticatedUser>) -> Self {
        Self { maybe_user }
    }

    pub fn user(&self) -> WebResult<&AuthenticatedUser> {
        self.maybe_user.as_ref().ok_or(WebError::auth_required())
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = parts.extensions.get::<RequestContext>();
        if let Some(ctx) = ctx {
            Ok(ctx.clone())
        } else {
            Ok(RequestContext::new(None))
        }
    }
}
