//! The append-only event stream — bounded memory of one task's activity.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default capacity of an [`EventStream`] before the oldest entries are discarded.
pub const DEFAULT_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Task,
    Action,
    Observation,
    Recovery,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Task => write!(f, "task"),
            Self::Action => write!(f, "action"),
            Self::Observation => write!(f, "observation"),
            Self::Recovery => write!(f, "recovery"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(event_type: EventType, content: impl Into<String>) -> Self {
        Self { event_type, content: content.into(), timestamp: Utc::now() }
    }
}

/// Summary statistics over the events currently held in the stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSummary {
    pub total_events: usize,
    pub event_types: HashMap<String, usize>,
    pub first_event: Option<Event>,
    pub last_event: Option<Event>,
}

/// A bounded, append-only log of [`Event`]s.
///
/// Never mutated after append; accessed only from the single task driving
/// one agent loop, so no internal locking is needed — concurrency across
/// tasks is handled one layer up, by giving each task its own stream.
#[derive(Debug)]
pub struct EventStream {
    events: VecDeque<Event>,
    capacity: usize,
}

impl EventStream {
    pub fn new(capacity: usize) -> Self {
        Self { events: VecDeque::with_capacity(capacity.min(4096)), capacity }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Append an event, discarding the oldest entry if at capacity.
    pub fn append(&mut self, event: Event) {
        if self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        tracing::debug!(event_type = %event.event_type, "EventStream::append");
        self.events.push_back(event);
    }

    pub fn push(&mut self, event_type: EventType, content: impl Into<String>) {
        self.append(Event::new(event_type, content));
    }

    /// The last `k` events in insertion order.
    pub fn recent(&self, k: usize) -> Vec<&Event> {
        let len = self.events.len();
        let start = len.saturating_sub(k);
        self.events.iter().skip(start).collect()
    }

    pub fn by_type(&self, event_type: EventType) -> Vec<&Event> {
        self.events.iter().filter(|e| e.event_type == event_type).collect()
    }

    /// Every event currently held, oldest first.
    pub fn all(&self) -> Vec<&Event> {
        self.events.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn summary(&self) -> EventSummary {
        let mut event_types = HashMap::new();
        for event in &self.events {
            *event_types.entry(event.event_type.to_string()).or_insert(0) += 1;
        }
        EventSummary {
            total_events: self.events.len(),
            event_types,
            first_event: self.events.front().cloned(),
            last_event: self.events.back().cloned(),
        }
    }

    /// Count of recent events classified as errors (see [`is_error_observation`]).
    pub fn recent_error_count(&self, k: usize) -> usize {
        self.recent(k)
            .into_iter()
            .filter(|e| e.event_type == EventType::Observation && is_error_observation(&e.content))
            .count()
    }
}

/// Case-insensitive match against the source's error-keyword set.
pub fn is_error_observation(observation: &str) -> bool {
    const KEYWORDS: &[&str] =
        &["error:", "traceback", "exception", "failed", "command not found", "permission denied"];
    let lower = observation.to_lowercase();
    KEYWORDS.iter().any(|k| lower.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_stamps_timestamp_and_preserves_order() {
        let mut stream = EventStream::with_default_capacity();
        stream.push(EventType::Task, "start");
        stream.push(EventType::Action, "execute_python");
        let recent = stream.recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].content, "start");
        assert_eq!(recent[1].content, "execute_python");
    }

    #[test]
    fn test_capacity_discards_oldest() {
        let mut stream = EventStream::new(3);
        for i in 0..5 {
            stream.push(EventType::Observation, format!("obs-{i}"));
        }
        assert_eq!(stream.len(), 3);
        let recent = stream.recent(10);
        assert_eq!(recent[0].content, "obs-2");
        assert_eq!(recent[2].content, "obs-4");
    }

    #[test]
    fn test_by_type_filters() {
        let mut stream = EventStream::with_default_capacity();
        stream.push(EventType::Action, "a1");
        stream.push(EventType::Observation, "o1");
        stream.push(EventType::Action, "a2");
        assert_eq!(stream.by_type(EventType::Action).len(), 2);
        assert_eq!(stream.by_type(EventType::Observation).len(), 1);
    }

    #[test]
    fn test_summary_counts() {
        let mut stream = EventStream::with_default_capacity();
        stream.push(EventType::Task, "start");
        stream.push(EventType::Action, "a1");
        stream.push(EventType::Action, "a2");
        let summary = stream.summary();
        assert_eq!(summary.total_events, 3);
        assert_eq!(summary.event_types.get("action"), Some(&2));
        assert_eq!(summary.event_types.get("task"), Some(&1));
    }

    #[test]
    fn test_error_classifier() {
        assert!(is_error_observation("Traceback (most recent call last):"));
        assert!(is_error_observation("bash: foo: command not found"));
        assert!(is_error_observation("ERROR: something broke"));
        assert!(!is_error_observation("Computation finished successfully"));
    }

    #[test]
    fn test_recent_error_count() {
        let mut stream = EventStream::with_default_capacity();
        stream.push(EventType::Observation, "all good");
        stream.push(EventType::Observation, "Traceback: boom");
        stream.push(EventType::Observation, "permission denied");
        assert_eq!(stream.recent_error_count(20), 2);
    }
}
