//! Tenant directory entities: users, organizations, memberships, invitations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Role within an organization. The variant order is the authorization order:
/// `Admin > Manager > Member`, compared with `Ord`, never by string.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Manager,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "member" => Ok(Role::Member),
            "manager" => Ok(Role::Manager),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// The organization a fresh login token is scoped to.
    pub active_organization_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: String, name: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email,
            name,
            password_hash,
            active_organization_id: None,
            created_at: Utc::now(),
        }
    }
}

/// The tenant boundary. Every other entity in the suite is scoped to exactly
/// one organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
}

impl Organization {
    pub fn new(name: String, owner_id: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            owner_id,
            created_at: Utc::now(),
        }
    }
}

/// A user may hold memberships in several organizations; the active one for a
/// request is selected by the token's embedded organization id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub user_id: String,
    pub organization_id: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl Membership {
    pub fn new(user_id: String, organization_id: String, role: Role) -> Self {
        Self {
            user_id,
            organization_id,
            role,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl std::fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// Raised when an invitation is driven out of a terminal state.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invitation is already {status}")]
pub struct InvitationStateError {
    pub status: InvitationStatus,
}

/// An invitation transitions exactly once: pending to accepted (which creates
/// the membership) or pending to rejected. Both outcomes are terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    pub id: String,
    pub organization_id: String,
    pub email: String,
    pub role: Role,
    pub status: InvitationStatus,
    pub invited_by: String,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl Invitation {
    pub fn new(organization_id: String, email: String, role: Role, invited_by: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            organization_id,
            email,
            role,
            status: InvitationStatus::Pending,
            invited_by,
            created_at: Utc::now(),
            responded_at: None,
        }
    }

    pub fn accept(&mut self) -> Result<(), InvitationStateError> {
        self.transition(InvitationStatus::Accepted)
    }

    pub fn reject(&mut self) -> Result<(), InvitationStateError> {
        self.transition(InvitationStatus::Rejected)
    }

    fn transition(&mut self, to: InvitationStatus) -> Result<(), InvitationStateError> {
        if self.status != InvitationStatus::Pending {
            return Err(InvitationStateError {
                status: self.status,
            });
        }
        self.status = to;
        self.responded_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_ordering_is_total() {
        assert!(Role::Admin > Role::Manager);
        assert!(Role::Manager > Role::Member);
        assert!(Role::Admin > Role::Member);
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("MANAGER".parse::<Role>().unwrap(), Role::Manager);
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn invitation_accept_then_accept_is_invalid() {
        let mut inv = Invitation::new(
            "org-1".into(),
            "invitee@example.com".into(),
            Role::Member,
            "admin-1".into(),
        );
        inv.accept().unwrap();
        assert_eq!(inv.status, InvitationStatus::Accepted);
        assert!(inv.responded_at.is_some());

        assert_eq!(
            inv.accept(),
            Err(InvitationStateError {
                status: InvitationStatus::Accepted
            })
        );
    }

    #[test]
    fn invitation_accept_then_reject_is_invalid() {
        let mut inv = Invitation::new(
            "org-1".into(),
            "invitee@example.com".into(),
            Role::Member,
            "admin-1".into(),
        );
        inv.accept().unwrap();
        assert_eq!(
            inv.reject(),
            Err(InvitationStateError {
                status: InvitationStatus::Accepted
            })
        );
    }

    #[test]
    fn invitation_reject_is_terminal() {
        let mut inv = Invitation::new(
            "org-1".into(),
            "invitee@example.com".into(),
            Role::Member,
            "admin-1".into(),
        );
        inv.reject().unwrap();
        assert_eq!(inv.status, InvitationStatus::Rejected);
        assert!(inv.accept().is_err());
    }
}
