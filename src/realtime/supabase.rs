//! Supabase Realtime broadcast over its REST endpoint

use futures::future::{BoxFuture, FutureExt};
use reqwest::Client;
use serde::Serialize;

use crate::store::SupabaseClient;

use super::{CombatEvent, PublishError, Publisher};

/// Broadcasts combat events through `/realtime/v1/api/broadcast`
#[derive(Clone)]
pub struct SupabaseRealtime {
    http: Client,
    supabase: SupabaseClient,
}

#[derive(Serialize)]
struct BroadcastRequest<'a> {
    messages: [BroadcastMessage<'a>; 1],
}

#[derive(Serialize)]
struct BroadcastMessage<'a> {
    topic: &'a str,
    event: &'static str,
    payload: &'a CombatEvent,
}

impl SupabaseRealtime {
    pub fn new(supabase: SupabaseClient) -> Self {
        Self {
            http: Client::new(),
            supabase,
        }
    }

    fn broadcast_url(&self) -> String {
        format!("{}/realtime/v1/api/broadcast", self.supabase.base_url())
    }
}

impl Publisher for SupabaseRealtime {
    fn publish<'a>(
        &'a self,
        channel: &'a str,
        event: &'a CombatEvent,
    ) -> BoxFuture<'a, Result<(), PublishError>> {
        async move {
            let body = BroadcastRequest {
                messages: [BroadcastMessage {
                    topic: channel,
                    event: event.kind.as_str(),
                    payload: event,
                }],
            };

            let response = self
                .supabase
                .authorize(self.http.post(self.broadcast_url()))
                .json(&body)
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(PublishError::Api { status: status.as_u16(), body });
            }

            Ok(())
        }
        .boxed()
    }
}
