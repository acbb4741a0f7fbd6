pub mod dashboard;
pub mod health;

pub use dashboard::{DashboardSection, DashboardView, dashboard};
pub use health::{AggregateHealthReport, BackendHealth, HealthState, health};
