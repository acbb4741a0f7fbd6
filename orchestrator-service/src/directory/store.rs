//! Directory storage seam.
//!
//! Persistence schema design is out of scope for the gateway; the trait is
//! the boundary a relational implementation would fill. The in-memory
//! implementation backs development and the test suites.

use async_trait::async_trait;
use dashmap::DashMap;
use service_core::error::AppError;

use super::models::{Invitation, Membership, Organization, User};

#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn insert_user(&self, user: User) -> Result<(), AppError>;
    async fn update_user(&self, user: User) -> Result<(), AppError>;
    async fn user_by_id(&self, id: &str) -> Result<Option<User>, AppError>;
    async fn user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn insert_organization(&self, org: Organization) -> Result<(), AppError>;
    async fn organization(&self, id: &str) -> Result<Option<Organization>, AppError>;

    async fn upsert_membership(&self, membership: Membership) -> Result<(), AppError>;
    async fn membership(
        &self,
        user_id: &str,
        organization_id: &str,
    ) -> Result<Option<Membership>, AppError>;
    async fn remove_membership(
        &self,
        user_id: &str,
        organization_id: &str,
    ) -> Result<(), AppError>;

    async fn insert_invitation(&self, invitation: Invitation) -> Result<(), AppError>;
    async fn update_invitation(&self, invitation: Invitation) -> Result<(), AppError>;
    async fn invitation(&self, id: &str) -> Result<Option<Invitation>, AppError>;
    async fn invitations_for_email(&self, email: &str) -> Result<Vec<Invitation>, AppError>;
}

#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    users: DashMap<String, User>,
    users_by_email: DashMap<String, String>,
    organizations: DashMap<String, Organization>,
    memberships: DashMap<(String, String), Membership>,
    invitations: DashMap<String, Invitation>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DirectoryStore for InMemoryDirectory {
    async fn insert_user(&self, user: User) -> Result<(), AppError> {
        let email_key = user.email.to_lowercase();
        if self.users_by_email.contains_key(&email_key) {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Email already registered"
            )));
        }
        self.users_by_email.insert(email_key, user.id.clone());
        self.users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn update_user(&self, user: User) -> Result<(), AppError> {
        if !self.users.contains_key(&user.id) {
            return Err(AppError::NotFound(anyhow::anyhow!("User not found")));
        }
        self.users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn user_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(id).map(|u| u.clone()))
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let id = match self.users_by_email.get(&email.to_lowercase()) {
            Some(id) => id.clone(),
            None => return Ok(None),
        };
        self.user_by_id(&id).await
    }

    async fn insert_organization(&self, org: Organization) -> Result<(), AppError> {
        self.organizations.insert(org.id.clone(), org);
        Ok(())
    }

    async fn organization(&self, id: &str) -> Result<Option<Organization>, AppError> {
        Ok(self.organizations.get(id).map(|o| o.clone()))
    }

    async fn upsert_membership(&self, membership: Membership) -> Result<(), AppError> {
        let key = (
            membership.user_id.clone(),
            membership.organization_id.clone(),
        );
        self.memberships.insert(key, membership);
        Ok(())
    }

    async fn membership(
        &self,
        user_id: &str,
        organization_id: &str,
    ) -> Result<Option<Membership>, AppError> {
        let key = (user_id.to_string(), organization_id.to_string());
        Ok(self.memberships.get(&key).map(|m| m.clone()))
    }

    async fn remove_membership(
        &self,
        user_id: &str,
        organization_id: &str,
    ) -> Result<(), AppError> {
        let key = (user_id.to_string(), organization_id.to_string());
        self.memberships.remove(&key);
        Ok(())
    }

    async fn insert_invitation(&self, invitation: Invitation) -> Result<(), AppError> {
        self.invitations.insert(invitation.id.clone(), invitation);
        Ok(())
    }

    async fn update_invitation(&self, invitation: Invitation) -> Result<(), AppError> {
        if !self.invitations.contains_key(&invitation.id) {
            return Err(AppError::NotFound(anyhow::anyhow!("Invitation not found")));
        }
        self.invitations.insert(invitation.id.clone(), invitation);
        Ok(())
    }

    async fn invitation(&self, id: &str) -> Result<Option<Invitation>, AppError> {
        Ok(self.invitations.get(id).map(|i| i.clone()))
    }

    async fn invitations_for_email(&self, email: &str) -> Result<Vec<Invitation>, AppError> {
        let email = email.to_lowercase();
        let mut out: Vec<Invitation> = self
            .invitations
            .iter()
            .filter(|entry| entry.value().email.to_lowercase() == email)
            .map(|entry| entry.value().clone())
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::models::Role;

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let store = InMemoryDirectory::new();
        let first = User::new("a@example.com".into(), "A".into(), "hash".into());
        let second = User::new("A@Example.com".into(), "A2".into(), "hash".into());

        store.insert_user(first).await.unwrap();
        assert!(store.insert_user(second).await.is_err());
    }

    #[tokio::test]
    async fn membership_roundtrip_and_removal() {
        let store = InMemoryDirectory::new();
        store
            .upsert_membership(Membership::new("u1".into(), "o1".into(), Role::Manager))
            .await
            .unwrap();

        let found = store.membership("u1", "o1").await.unwrap().unwrap();
        assert_eq!(found.role, Role::Manager);

        store.remove_membership("u1", "o1").await.unwrap();
        assert!(store.membership("u1", "o1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invitations_filtered_by_email() {
        let store = InMemoryDirectory::new();
        store
            .insert_invitation(Invitation::new(
                "o1".into(),
                "x@example.com".into(),
                Role::Member,
                "u1".into(),
            ))
            .await
            .unwrap();
        store
            .insert_invitation(Invitation::new(
                "o1".into(),
                "y@example.com".into(),
                Role::Member,
                "u1".into(),
            ))
            .await
            .unwrap();

        let found = store.invitations_for_email("X@EXAMPLE.COM").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].email, "x@example.com");
    }
}
