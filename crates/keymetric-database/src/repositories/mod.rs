//! Repository implementations over PostgreSQL.

pub mod job_log;
pub mod notification;
pub mod task;
