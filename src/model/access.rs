use uuid::Uuid;

use crate::{
    model::{
        ModelManager,
        error::{DatabaseError, DatabaseResult},
    },
    web::{AuthenticatedUser, UserRole},
};

#[async_trait::async_trait]
pub trait HasOwner {
    type OwnerId: PartialEq + Send + Sync;
    async fn get_owner_id(
        &self,
        mm: &ModelManager,
        ctx: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId>;
}

pub async fn check_access<T: HasOwner<OwnerId = O>, O: PartialEq + Send + Sync>(
    mm: &ModelManager,
    ctx: &AuthenticatedUser,
    resource: &T,
    expected: O,
) -> DatabaseResult<()> {
    // super admin can get all resources
    if ctx.user_role() == UserRole::SuperAdmin {
        return Ok(());
    }

    let actual_owner = resource.get_owner_id(mm, ctx).await?;

    if actual_owner == expected {
        Ok(())
    } else {
        Err(DatabaseError::Forbidden)
    }
}

/// Records that belong to a school. Their owner is the school's admin.
pub trait SchoolScoped {
    fn school_id(&self) -> Option<Uuid>;
}

pub(crate) async fn school_admin_of(
    mm: &ModelManager,
    school_id: Option<Uuid>,
) -> DatabaseResult<Option<Uuid>> {
    let Some(school_id) = school_id else {
        return Ok(None);
    };

    let admin: Option<Option<Uuid>> =
        sqlx::query_scalar("SELECT school_admin_id FROM schools WHERE id = $1")
            .bind(school_id)
            .fetch_optional(mm.executor())
            .await?;

    Ok(admin.flatten())
}

#[macro_export]
macro_rules! impl_school_owned_for {
    ($ent:ident) => {
        #[async_trait::async_trait]
        impl $crate::model::HasOwner for $ent {
            type OwnerId = Option<uuid::Uuid>;

            async fn get_owner_id(
                &self,
                mm: &$crate::model::ModelManager,
                _actor: &$crate::web::AuthenticatedUser,
            ) -> $crate::model::DatabaseResult<Self::OwnerId> {
                $crate::model::access::school_admin_of(
                    mm,
                    $crate::model::SchoolScoped::school_id(self),
                )
                .await
            }
        }
    };
}
