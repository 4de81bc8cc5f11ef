//! Business logic services.

pub mod access;
pub mod auth;
pub mod buckets;
pub mod dashboard;
pub mod date_range;
pub mod invalidation;
pub mod metrics;
pub mod scope;
