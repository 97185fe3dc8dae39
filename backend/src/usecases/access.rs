use std::sync::Arc;

use crates::domain::{
    repositories::profiles::ProfileRepository,
    value_objects::enums::profile_roles::ProfileRole,
};
use tracing::{error, warn};
use uuid::Uuid;

use super::errors::{SubscriptionError, UseCaseResult};

/// Resolves admin rights from `profiles.role`.
pub struct AdminAuthorizer<P>
where
    P: ProfileRepository + Send + Sync + 'static,
{
    profile_repo: Arc<P>,
}

impl<P> AdminAuthorizer<P>
where
    P: ProfileRepository + Send + Sync + 'static,
{
    pub fn new(profile_repo: Arc<P>) -> Self {
        Self { profile_repo }
    }

    pub async fn is_admin(&self, user_id: Uuid) -> UseCaseResult<bool> {
        let profile = self.profile_repo.find_by_id(user_id).await.map_err(|err| {
            error!(
                %user_id,
                db_error = ?err,
                "access: failed to load profile"
            );
            SubscriptionError::Internal(err)
        })?;

        Ok(profile
            .map(|profile| ProfileRole::from_db_value(&profile.role).is_admin())
            .unwrap_or(false))
    }

    pub async fn require_admin(&self, user_id: Uuid) -> UseCaseResult<()> {
        if self.is_admin(user_id).await? {
            return Ok(());
        }

        warn!(%user_id, "access: admin operation refused");
        Err(SubscriptionError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crates::domain::{entities::profiles::ProfileEntity, repositories::profiles::MockProfileRepository};
    use mockall::predicate::eq;

    fn profile(id: Uuid, role: &str) -> ProfileEntity {
        ProfileEntity {
            id,
            full_name: Some("Dana".to_string()),
            email: Some("dana@example.com".to_string()),
            role: role.to_string(),
        }
    }

    #[tokio::test]
    async fn admin_role_is_allowed() {
        let user_id = Uuid::new_v4();
        let mut profile_repo = MockProfileRepository::new();
        profile_repo
            .expect_find_by_id()
            .with(eq(user_id))
            .returning(move |id| Ok(Some(profile(id, "admin"))));

        let authorizer = AdminAuthorizer::new(Arc::new(profile_repo));

        assert!(authorizer.require_admin(user_id).await.is_ok());
    }

    #[tokio::test]
    async fn regular_and_missing_profiles_are_forbidden() {
        let user_id = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let mut profile_repo = MockProfileRepository::new();
        profile_repo
            .expect_find_by_id()
            .with(eq(user_id))
            .returning(move |id| Ok(Some(profile(id, "user"))));
        profile_repo
            .expect_find_by_id()
            .with(eq(stranger))
            .returning(|_| Ok(None));

        let authorizer = AdminAuthorizer::new(Arc::new(profile_repo));

        assert!(matches!(
            authorizer.require_admin(user_id).await,
            Err(SubscriptionError::Forbidden)
        ));
        assert!(!authorizer.is_admin(stranger).await.unwrap());
    }

    #[tokio::test]
    async fn store_failure_is_internal() {
        let mut profile_repo = MockProfileRepository::new();
        profile_repo
            .expect_find_by_id()
            .returning(|_| Err(anyhow::anyhow!("connection refused")));

        let authorizer = AdminAuthorizer::new(Arc::new(profile_repo));

        assert!(matches!(
            authorizer.require_admin(Uuid::new_v4()).await,
            Err(SubscriptionError::Internal(_))
        ));
    }
}
