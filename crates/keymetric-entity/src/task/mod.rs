//! Provider task entity: one row per outstanding upstream ticket.

pub mod model;
pub mod status;
pub mod store;

pub use model::{CreateProviderTask, ProviderTask};
pub use status::TaskStatus;
pub use store::TaskStore;
