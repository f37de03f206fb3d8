//! Publisher used when real-time delivery is switched off

use futures::future::{self, BoxFuture, FutureExt};
use tracing::debug;

use super::{CombatEvent, PublishError, Publisher};

/// Writes events to the log instead of a channel
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPublisher;

impl Publisher for LogPublisher {
    fn publish<'a>(
        &'a self,
        channel: &'a str,
        event: &'a CombatEvent,
    ) -> BoxFuture<'a, Result<(), PublishError>> {
        debug!(
            channel = %channel,
            combat_id = %event.combat_id,
            event_type = event.kind.as_str(),
            data = %event.data,
            "Realtime disabled, dropping combat event"
        );
        future::ready(Ok(())).boxed()
    }
}
