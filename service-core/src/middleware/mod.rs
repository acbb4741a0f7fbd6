pub mod tracing;
pub mod trust;
