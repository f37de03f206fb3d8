//! Publisher double that keeps every event it is handed

use futures::future::{self, BoxFuture, FutureExt};
use parking_lot::Mutex;

use super::{CombatEvent, EventKind, PublishError, Publisher};

#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<(String, CombatEvent)>>,
    failing: bool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records nothing and fails every publish
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().iter().map(|(_, e)| e.kind).collect()
    }

    pub fn events(&self) -> Vec<(String, CombatEvent)> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Publisher for RecordingPublisher {
    fn publish<'a>(
        &'a self,
        channel: &'a str,
        event: &'a CombatEvent,
    ) -> BoxFuture<'a, Result<(), PublishError>> {
        if self.failing {
            return future::ready(Err(PublishError::Api {
                status: 503,
                body: "realtime outage".into(),
            }))
            .boxed();
        }
        self.events.lock().push((channel.to_string(), event.clone()));
        future::ready(Ok(())).boxed()
    }
}
