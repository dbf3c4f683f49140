//! Triage pipeline: symptom sanitizing, model gateway, reply parsing and
//! facility matching, composed by the orchestrator.

pub mod gateway;
pub mod maps;
pub mod matcher;
pub mod orchestrator;
pub mod parser;
pub mod prompt;
pub mod sanitize;

pub use matcher::{match_facilities, MatchOptions, MatchReport, MatchStatus};
pub use orchestrator::{RankedFacility, TriagePipeline, TriageReport, TriageSource};
