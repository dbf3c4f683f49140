//! API endpoint handlers.
//!
//! Each module corresponds to one screen or feature of the triage client.
//! Handlers delegate to the pipeline and never hold the session lock
//! across a model call.

pub mod areas;
pub mod health;
pub mod models;
pub mod sessions;
pub mod tip;
pub mod triage;
