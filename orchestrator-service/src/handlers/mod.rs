pub mod auth;
pub mod collaboration;
pub mod dashboard;
pub mod health;
pub mod invitations;
