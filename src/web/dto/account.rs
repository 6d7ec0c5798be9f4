use serde::{Deserialize, Serialize};

use crate::{
    auth::MIN_PASSWORD_LEN,
    model::entity::UserEntity,
    web::UserRole,
};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SigninBody {
    pub username: String,
    pub password: String,
    /// Role the user signs in as. Must match the account's role.
    pub role: UserRole,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SigninResponse {
    pub user: UserEntity,
    /// Dashboard of the signed in role
    pub redirect: &'static str,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UserCreateBody {
    pub username: String,
    pub password: String,
    pub role: UserRole,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UserUpdateBody {
    pub username: String,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct PasswordChangeBody {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl PasswordChangeBody {
    /// Checks everything that does not need the stored hash.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.new_password.is_empty() {
            return Err("new password is required");
        }
        if self.new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err("new password must be at least 8 characters long");
        }
        if self.new_password != self.confirm_password {
            return Err("new passwords do not match");
        }
        if self.new_password == self.current_password {
            return Err("new password must differ from the current one");
        }
        Ok(())
    }
}

/// Headline counts for the signed in user's dashboard, scoped to what the
/// role may see. Counts the role cannot see are omitted.
#[derive(Debug, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DashboardResponse {
    pub role: Option<UserRole>,
    pub schools: Option<i64>,
    pub classes: Option<i64>,
    pub students: Option<i64>,
    pub teachers: Option<i64>,
    pub parents: Option<i64>,
    pub lessons: i64,
}

#[cfg(test)]
mod test {
    use super::*;

    fn body(current: &str, new: &str, confirm: &str) -> PasswordChangeBody {
        PasswordChangeBody {
            current_password: current.to_string(),
            new_password: new.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    #[test]
    fn test_password_change_validation() {
        assert!(body("oldpassword", "newpassword", "newpassword").validate().is_ok());
        assert!(body("oldpassword", "", "").validate().is_err());
        assert!(body("oldpassword", "short", "short").validate().is_err());
        assert!(body("oldpassword", "newpassword", "newpassw0rd").validate().is_err());
        assert!(body("samepassword", "samepassword", "samepassword").validate().is_err());
    }
}
