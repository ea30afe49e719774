//! Core traits defined in `keymetric-core` and implemented by other crates.

pub mod notifier;

pub use notifier::Notifier;
