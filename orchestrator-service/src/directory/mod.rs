pub mod models;
pub mod scope;
pub mod store;

pub use models::{Invitation, InvitationStatus, Membership, Organization, Role, User};
pub use scope::{OrganizationContext, authorize, resolve_scope};
pub use store::{DirectoryStore, InMemoryDirectory};
