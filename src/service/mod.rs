//! Service layer: job coordination for the trigger surfaces.
//!
//! [`JobService`] guards against overlapping runs of the same job, bounds
//! each run by its wall-clock budget and keeps the last summary per job.

pub mod job_service;

pub use job_service::{JobService, JobSnapshot};
