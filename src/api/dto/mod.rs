//! Data Transfer Objects for REST response serialization.

pub mod job_dto;

pub use job_dto::*;
