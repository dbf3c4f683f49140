//! Per-tab session state.
//!
//! Everything that survives between chat turns lives here and is owned by
//! the caller, who passes it into the pipeline for each turn.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::geo::GeoPoint;
use crate::models::MessageRole;

/// Transcript entries kept per session; older turns are dropped.
pub const MAX_TRANSCRIPT_MESSAGES: usize = 40;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    pub at: DateTime<Utc>,
}

/// How the caller's position was obtained for the last turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum LocationChoice {
    /// Device geolocation.
    Device { point: GeoPoint },
    /// Manually picked preset area.
    Area { name: String, point: GeoPoint },
    /// Nothing supplied; the configured default was used.
    Default { point: GeoPoint },
}

impl LocationChoice {
    pub fn point(&self) -> GeoPoint {
        match self {
            Self::Device { point } | Self::Area { point, .. } | Self::Default { point } => *point,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TriageSession {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Last model that answered. Advisory: tried first next turn.
    pub sticky_model: Option<String>,
    pub location: Option<LocationChoice>,
    transcript: Vec<ChatMessage>,
}

impl TriageSession {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    pub fn with_id(id: Uuid) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            sticky_model: None,
            location: None,
            transcript: Vec::new(),
        }
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn push_message(&mut self, role: MessageRole, content: impl Into<String>) {
        self.transcript.push(ChatMessage {
            role,
            content: content.into(),
            at: Utc::now(),
        });
        if self.transcript.len() > MAX_TRANSCRIPT_MESSAGES {
            let excess = self.transcript.len() - MAX_TRANSCRIPT_MESSAGES;
            self.transcript.drain(..excess);
        }
    }
}

impl Default for TriageSession {
    fn default() -> Self {
        Self::new()
    }
}
