//! Database rows and domain types read by the dashboard.

pub mod task;
pub mod user;
pub mod workspace;
