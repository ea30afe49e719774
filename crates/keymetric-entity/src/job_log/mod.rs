//! Job run log entity: one row per scheduled task execution.

pub mod model;
pub mod status;
pub mod store;

pub use model::JobRunLog;
pub use status::JobRunStatus;
pub use store::JobLogStore;
