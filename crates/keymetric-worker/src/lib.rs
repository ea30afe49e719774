//! # keymetric-worker
//!
//! Background execution layer: the [`runner::JobRunner`] wraps every
//! scheduled job body in a retry/backoff state machine persisted to a
//! single job run log row, the [`poller::TicketPoller`] advances
//! outstanding provider tickets, and [`scheduler::CronScheduler`] wires
//! job bodies to their cron cadences.

pub mod jobs;
pub mod poller;
pub mod runner;
pub mod scheduler;

#[cfg(test)]
mod testutil;

pub use poller::TicketPoller;
pub use runner::{JobOutcome, JobRunner};
pub use scheduler::{CronScheduler, ScheduledJob};
