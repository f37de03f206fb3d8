//! Combat event fan-out to the hosted real-time service

pub mod log;
#[cfg(test)]
pub mod recorder;
pub mod supabase;

use futures::future::BoxFuture;
use serde::Serialize;
use uuid::Uuid;

pub use log::LogPublisher;
pub use supabase::SupabaseRealtime;

/// Kind of change subscribers are told about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ParticipantUpdate,
    TurnChange,
    RoundChange,
    CombatEnd,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::ParticipantUpdate => "participant_update",
            EventKind::TurnChange => "turn_change",
            EventKind::RoundChange => "round_change",
            EventKind::CombatEnd => "combat_end",
        }
    }
}

/// Payload broadcast on a combat channel
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatEvent {
    pub combat_id: Uuid,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub data: serde_json::Value,
}

/// Publish capability. Delivery, retry and channel authorization belong to
/// the provider behind it.
pub trait Publisher: Send + Sync {
    fn publish<'a>(
        &'a self,
        channel: &'a str,
        event: &'a CombatEvent,
    ) -> BoxFuture<'a, Result<(), PublishError>>;
}

/// Publish errors
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Realtime API error (status {status}): {body}")]
    Api { status: u16, body: String },
}
