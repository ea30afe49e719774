//! # keymetric-entity
//!
//! Persisted domain models for Keymetric: provider tasks (one row per
//! outstanding upstream ticket) and job run logs (one row per scheduled
//! task execution), together with the store traits the database crate
//! implements.

pub mod job_log;
pub mod task;
