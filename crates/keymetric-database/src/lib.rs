//! # keymetric-database
//!
//! PostgreSQL persistence for Keymetric: pool management, migrations, and
//! repository implementations of the entity store traits.

pub mod connection;
pub mod migration;
pub mod repositories;
