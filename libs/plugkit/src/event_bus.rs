//! Topic-based publish/subscribe dispatcher.
//!
//! The decoupling backbone between plugins: an editor announces
//! "editor.file_opened" without knowing which plugins care. Dispatch is
//! synchronous on the publishing thread, in subscription order; events with
//! no subscriber are dropped (no queue, no replay). Topic strings and
//! payload layouts are an out-of-band contract between publisher and
//! subscribers — the bus performs no schema validation.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use thiserror::Error;

use crate::contracts::EventHandler;

#[derive(Debug, Error)]
pub enum EventBusError {
    #[error("re-entrant publish of topic '{0}' during its own dispatch")]
    ReentrantTopic(String),
}

/// A published event: topic plus an ordered sequence of typed values.
#[derive(Debug, Clone)]
pub struct Event {
    topic: String,
    data: Vec<serde_json::Value>,
}

impl Event {
    pub fn new(topic: impl Into<String>, data: Vec<serde_json::Value>) -> Self {
        Self {
            topic: topic.into(),
            data,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn data(&self) -> &[serde_json::Value] {
        &self.data
    }

    /// Positional payload access; `None` past the end.
    pub fn property(&self, index: usize) -> Option<&serde_json::Value> {
        self.data.get(index)
    }
}

struct Subscription {
    handler: Arc<dyn EventHandler>,
    topics: HashSet<String>,
}

/// Synchronous in-process event dispatcher.
#[derive(Default)]
pub struct EventBus {
    subscriptions: RwLock<Vec<Subscription>>,
    // Topics currently being dispatched; breaks handler recursion.
    in_flight: Mutex<HashSet<String>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for a set of topics. A handler only ever sees
    /// events whose topic is in its subscribed set.
    pub fn subscribe<I, S>(&self, handler: Arc<dyn EventHandler>, topics: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let topics: HashSet<String> = topics.into_iter().map(Into::into).collect();
        tracing::debug!(?topics, "Subscribing event handler");
        self.subscriptions
            .write()
            .push(Subscription { handler, topics });
    }

    /// Deliver synchronously to every currently subscribed handler of
    /// `topic`, in subscription order. Returns the delivery count.
    ///
    /// A handler republishing the topic being dispatched gets
    /// [`EventBusError::ReentrantTopic`]; republishing a different topic is
    /// allowed. Subscribing during dispatch is safe (delivery runs over a
    /// snapshot) and takes effect for the next publish.
    pub fn publish(
        &self,
        topic: &str,
        data: Vec<serde_json::Value>,
    ) -> Result<usize, EventBusError> {
        if !self.in_flight.lock().insert(topic.to_owned()) {
            return Err(EventBusError::ReentrantTopic(topic.to_owned()));
        }
        let _guard = InFlightGuard {
            bus: self,
            topic: topic.to_owned(),
        };

        let targets: Vec<Arc<dyn EventHandler>> = self
            .subscriptions
            .read()
            .iter()
            .filter(|s| s.topics.contains(topic))
            .map(|s| Arc::clone(&s.handler))
            .collect();

        let event = Event::new(topic, data);
        for handler in &targets {
            handler.process(&event);
        }

        if targets.is_empty() {
            tracing::trace!(topic, "Event dropped: no subscribers");
        }
        Ok(targets.len())
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.subscriptions
            .read()
            .iter()
            .filter(|s| s.topics.contains(topic))
            .count()
    }
}

struct InFlightGuard<'a> {
    bus: &'a EventBus,
    topic: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.bus.in_flight.lock().remove(&self.topic);
    }
}
