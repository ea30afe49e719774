//! Background worker and scheduled job configuration.

use serde::{Deserialize, Serialize};

/// Background job worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the worker is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maximum poll attempts before a provider task is marked timed out.
    #[serde(default = "default_max_poll_retries")]
    pub max_poll_retries: i32,
    /// Cron schedules for the registered jobs. Schedule expressions are
    /// operator-supplied configuration; the worker never parses or owns them.
    #[serde(default)]
    pub schedules: ScheduleConfig,
    /// Keyword watchlist refreshed by the keyword_refresh job.
    #[serde(default)]
    pub watchlist: WatchlistConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_poll_retries: default_max_poll_retries(),
            schedules: ScheduleConfig::default(),
            watchlist: WatchlistConfig::default(),
        }
    }
}

/// Cron expressions for each registered scheduled job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Ticket poller — advances all outstanding provider tasks.
    #[serde(default = "default_ticket_poll")]
    pub ticket_poll: String,
    /// Keyword refresh — submits keyword-check requests for the watchlist.
    #[serde(default = "default_keyword_refresh")]
    pub keyword_refresh: String,
    /// Suggestion planner — short-polls keyword suggestions.
    #[serde(default = "default_suggestion_plan")]
    pub suggestion_plan: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            ticket_poll: default_ticket_poll(),
            keyword_refresh: default_keyword_refresh(),
            suggestion_plan: default_suggestion_plan(),
        }
    }
}

/// Keywords tracked by the refresh job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatchlistConfig {
    /// Keywords to refresh on each run.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Storefront country code sent with each request.
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_true() -> bool {
    true
}

fn default_max_poll_retries() -> i32 {
    30
}

fn default_ticket_poll() -> String {
    // every minute
    "0 * * * * *".to_string()
}

fn default_keyword_refresh() -> String {
    // daily at 5 AM
    "0 0 5 * * *".to_string()
}

fn default_suggestion_plan() -> String {
    // Monday at 7 AM
    "0 0 7 * * 1".to_string()
}

fn default_country() -> String {
    "us".to_string()
}
