//! Concrete scheduled job bodies.

pub mod keyword_refresh;
pub mod suggestion_plan;
pub mod ticket_poll;

pub use keyword_refresh::KeywordRefreshJob;
pub use suggestion_plan::SuggestionPlanJob;
pub use ticket_poll::TicketPollJob;
