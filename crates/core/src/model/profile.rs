use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected a trace event array or an object with a `traceEvents` array")]
    MissingEvents,
}

/// Stable identity of an event: its index in [`Profile::events`].
///
/// Selection, hover and highlight compare ids, never event contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u32);

impl EventId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Trace event phase (`ph`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Phase {
    #[serde(rename = "X")]
    Complete,
    #[serde(rename = "B")]
    Begin,
    #[serde(rename = "E")]
    End,
    #[serde(rename = "i", alias = "I")]
    Instant,
    #[serde(rename = "M")]
    Metadata,
    #[serde(rename = "C")]
    Counter,
    #[default]
    #[serde(other)]
    Other,
}

/// One decoded trace record. Times are in microseconds.
///
/// `name`, `start_time` and `duration` are optional so that a malformed
/// record decodes instead of failing the whole profile; layout skips it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceEvent {
    #[serde(rename = "pid", default)]
    pub process_id: i64,
    #[serde(rename = "tid", default)]
    pub thread_id: i64,
    #[serde(rename = "ts", default)]
    pub start_time: Option<f64>,
    #[serde(rename = "dur", default)]
    pub duration: Option<f64>,
    #[serde(rename = "ph", default)]
    pub phase: Phase,
    #[serde(rename = "cat", default)]
    pub category: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub args: Option<serde_json::Value>,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
}

impl TraceEvent {
    pub fn end_time(&self) -> Option<f64> {
        Some(self.start_time? + self.duration?)
    }

    /// `args.name` of a metadata record (`process_name`, `thread_name`).
    pub fn metadata_name(&self) -> Option<&str> {
        self.args.as_ref()?.get("name")?.as_str()
    }
}

/// The ordered, immutable input of the viewer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "traceEvents")]
    pub events: Vec<TraceEvent>,
}

impl Profile {
    pub fn new(events: Vec<TraceEvent>) -> Self {
        Self { events }
    }

    /// Decode a trace file as written by Chrome / Bazel: either an object
    /// with a `traceEvents` array or a bare array of events.
    ///
    /// Records are decoded one by one; a record that does not fit
    /// [`TraceEvent`] is dropped instead of failing the profile.
    pub fn from_json(data: &[u8]) -> Result<Self, ProfileError> {
        let records = match serde_json::from_slice::<Value>(data)? {
            Value::Array(records) => records,
            Value::Object(mut root) => match root.remove("traceEvents") {
                Some(Value::Array(records)) => records,
                _ => return Err(ProfileError::MissingEvents),
            },
            _ => return Err(ProfileError::MissingEvents),
        };

        let total = records.len();
        let events: Vec<TraceEvent> = records
            .into_iter()
            .enumerate()
            .filter_map(|(i, record)| match serde_json::from_value(record) {
                Ok(event) => Some(event),
                Err(e) => {
                    debug!("profile: dropping record {i}: {e}");
                    None
                }
            })
            .collect();
        if events.len() < total {
            debug!("profile: dropped {} of {total} records", total - events.len());
        }
        Ok(Self { events })
    }

    pub fn event(&self, id: EventId) -> Option<&TraceEvent> {
        self.events.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events paired with their ids, in profile order.
    pub fn iter(&self) -> impl Iterator<Item = (EventId, &TraceEvent)> {
        self.events
            .iter()
            .enumerate()
            .map(|(i, e)| (EventId(i as u32), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_object_form() {
        let json = br#"{"traceEvents":[
            {"pid":1,"tid":2,"ts":100,"dur":50,"ph":"X","cat":"build","name":"compile","args":{}}
        ]}"#;
        let profile = Profile::from_json(json).expect("parse");
        assert_eq!(profile.len(), 1);
        let e = &profile.events[0];
        assert_eq!(e.process_id, 1);
        assert_eq!(e.thread_id, 2);
        assert_eq!(e.phase, Phase::Complete);
        assert_eq!(e.name.as_deref(), Some("compile"));
        assert_eq!(e.end_time(), Some(150.0));
    }

    #[test]
    fn parses_array_form_and_unknown_phases() {
        let json = br#"[
            {"ph":"B","ts":1,"name":"a"},
            {"ph":"E","ts":2},
            {"ph":"I","ts":3,"name":"mark"},
            {"ph":"s","ts":4,"name":"flow"}
        ]"#;
        let profile = Profile::from_json(json).expect("parse");
        let phases: Vec<_> = profile.events.iter().map(|e| e.phase).collect();
        assert_eq!(
            phases,
            vec![Phase::Begin, Phase::End, Phase::Instant, Phase::Other]
        );
    }

    #[test]
    fn malformed_record_still_decodes() {
        let json = br#"{"traceEvents":[{"ph":"X","pid":1}]}"#;
        let profile = Profile::from_json(json).expect("parse");
        assert!(profile.events[0].name.is_none());
        assert!(profile.events[0].end_time().is_none());
    }

    #[test]
    fn badly_typed_records_are_dropped_not_fatal() {
        let json = br#"{"traceEvents":[
            {"ph":"X","ts":1,"dur":2,"name":"good"},
            {"ph":"X","ts":"oops","dur":2,"name":"bad ts"},
            {"ph":"X","ts":5,"dur":2,"name":7},
            {"ph":"X","ts":9,"dur":1,"name":"also good"}
        ]}"#;
        let profile = Profile::from_json(json).expect("parse");
        let names: Vec<_> = profile.events.iter().filter_map(|e| e.name.as_deref()).collect();
        assert_eq!(names, vec!["good", "also good"]);
        assert_eq!(profile.event(EventId(1)).and_then(|e| e.start_time), Some(9.0));
    }

    #[test]
    fn rejects_json_without_events() {
        assert!(matches!(
            Profile::from_json(br#"{"displayTimeUnit":"ms"}"#),
            Err(ProfileError::MissingEvents)
        ));
        assert!(matches!(
            Profile::from_json(b"42"),
            Err(ProfileError::MissingEvents)
        ));
    }

    #[test]
    fn rejects_non_json() {
        assert!(matches!(
            Profile::from_json(b"not a trace"),
            Err(ProfileError::Json(_))
        ));
    }

    #[test]
    fn metadata_name_reads_args() {
        let json = br#"[{"ph":"M","name":"thread_name","pid":1,"tid":7,"args":{"name":"worker-7"}}]"#;
        let profile = Profile::from_json(json).expect("parse");
        assert_eq!(profile.events[0].metadata_name(), Some("worker-7"));
    }

    #[test]
    fn ids_follow_profile_order() {
        let profile = Profile::new(vec![TraceEvent::default(), TraceEvent::default()]);
        let ids: Vec<_> = profile.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![EventId(0), EventId(1)]);
        assert!(profile.event(EventId(2)).is_none());
    }
}
