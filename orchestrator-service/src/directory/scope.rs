//! Tenant-scope resolution and role checks.

use serde::Serialize;
use service_core::error::{AppError, AuthzError};

use super::models::Role;
use super::store::DirectoryStore;
use crate::services::token::Principal;

/// The organization id and effective role a request operates under.
///
/// The role comes from the current membership, not the token: a demotion takes
/// effect on the next request, not the next login.
#[derive(Debug, Clone, Serialize)]
pub struct OrganizationContext {
    pub user_id: String,
    pub organization_id: String,
    pub role: Role,
}

/// Resolve the principal's active organization scope.
///
/// Fails with `NoActiveOrganization` when the principal holds no membership
/// matching the token's embedded organization — the defense against tokens
/// that outlive a membership removal.
pub async fn resolve_scope(
    store: &dyn DirectoryStore,
    principal: &Principal,
) -> Result<OrganizationContext, AppError> {
    let membership = store
        .membership(&principal.user_id, &principal.organization_id)
        .await?
        .ok_or(AuthzError::NoActiveOrganization)?;

    Ok(OrganizationContext {
        user_id: principal.user_id.clone(),
        organization_id: membership.organization_id,
        role: membership.role,
    })
}

/// Check the context's role against the minimum required role. Role ordering:
/// admin > manager > member, so a required manager is satisfied by an admin.
pub fn authorize(context: &OrganizationContext, required: Role) -> Result<(), AuthzError> {
    if context.role >= required {
        Ok(())
    } else {
        Err(AuthzError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::models::Membership;
    use crate::directory::store::InMemoryDirectory;

    fn context(role: Role) -> OrganizationContext {
        OrganizationContext {
            user_id: "u1".into(),
            organization_id: "o1".into(),
            role,
        }
    }

    #[test]
    fn admin_satisfies_every_requirement() {
        for required in [Role::Member, Role::Manager, Role::Admin] {
            assert!(authorize(&context(Role::Admin), required).is_ok());
        }
    }

    #[test]
    fn manager_requirement_accepts_manager_and_admin_only() {
        assert!(authorize(&context(Role::Admin), Role::Manager).is_ok());
        assert!(authorize(&context(Role::Manager), Role::Manager).is_ok());
        assert_eq!(
            authorize(&context(Role::Member), Role::Manager),
            Err(AuthzError::Forbidden)
        );
    }

    #[tokio::test]
    async fn stale_token_without_membership_is_rejected() {
        let store = InMemoryDirectory::new();
        let principal = Principal {
            user_id: "u1".into(),
            organization_id: "o1".into(),
            role: Role::Admin,
        };

        let err = resolve_scope(&store, &principal).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Authz(AuthzError::NoActiveOrganization)
        ));
    }

    #[tokio::test]
    async fn membership_role_overrides_token_role() {
        let store = InMemoryDirectory::new();
        store
            .upsert_membership(Membership::new("u1".into(), "o1".into(), Role::Member))
            .await
            .unwrap();

        // Token still claims admin; the current membership wins.
        let principal = Principal {
            user_id: "u1".into(),
            organization_id: "o1".into(),
            role: Role::Admin,
        };
        let ctx = resolve_scope(&store, &principal).await.unwrap();
        assert_eq!(ctx.role, Role::Member);
    }
}
