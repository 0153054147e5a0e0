use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::sync::Arc;

use log::debug;

use super::profile::{EventId, Phase, Profile, TraceEvent};

/// A track is identified by the process and thread that emitted its events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackKey {
    pub process_id: i64,
    pub thread_id: i64,
}

/// An event placed on a track row.
#[derive(Debug, Clone)]
pub struct LaidOutEvent {
    pub id: EventId,
    pub start: f64,
    pub duration: f64,
    pub depth: u32,
    pub label: Arc<str>,
    /// Lower-cased name, precomputed for filtering.
    folded_name: Box<str>,
}

impl LaidOutEvent {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Case-insensitive substring test; `needle` must already be lower-cased.
    pub fn name_contains(&self, needle: &str) -> bool {
        self.folded_name.contains(needle)
    }
}

/// Events routed to one panel, with their row assignment.
#[derive(Debug, Clone)]
pub struct PanelLayout {
    pub track: TrackKey,
    pub name: Arc<str>,
    /// Layout order: start time, longer spans first on ties.
    pub events: Vec<LaidOutEvent>,
    /// Indices into `events`, one vector per depth. Within a row events are
    /// disjoint and sorted by start (and therefore by end).
    pub rows: Vec<Vec<usize>>,
}

impl PanelLayout {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn event(&self, index: usize) -> Option<&LaidOutEvent> {
        self.events.get(index)
    }

    pub fn position_of(&self, id: EventId) -> Option<usize> {
        self.events.iter().position(|e| e.id == id)
    }

    /// Events of `row` whose extent intersects `[from, to]` (model time).
    pub fn events_in_row(
        &self,
        row: usize,
        from: f64,
        to: f64,
    ) -> impl Iterator<Item = &LaidOutEvent> {
        let slots = self.rows.get(row).map(Vec::as_slice).unwrap_or(&[]);
        let first = slots.partition_point(|&i| self.events[i].end() < from);
        slots[first..]
            .iter()
            .map(|&i| &self.events[i])
            .take_while(move |e| e.start <= to)
    }
}

/// Derived per-panel layout of a profile plus its time extent.
#[derive(Debug, Clone, Default)]
pub struct LayoutModel {
    pub panels: Vec<Rc<PanelLayout>>,
    /// Largest `start + duration` of any laid-out event.
    pub x_max: f64,
    /// Earliest start of any laid-out event; 0 for an empty layout.
    pub x_min: f64,
}

impl LayoutModel {
    pub fn event_count(&self) -> usize {
        self.panels.iter().map(|p| p.events.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }
}

struct Span<'a> {
    id: EventId,
    start: f64,
    duration: f64,
    name: &'a str,
}

#[derive(Default)]
struct TrackNames {
    processes: HashMap<i64, String>,
    threads: HashMap<(i64, i64), String>,
}

impl TrackNames {
    fn label(&self, key: TrackKey) -> String {
        let process = self
            .processes
            .get(&key.process_id)
            .cloned()
            .unwrap_or_else(|| format!("Process {}", key.process_id));
        let thread = self
            .threads
            .get(&(key.process_id, key.thread_id))
            .cloned()
            .unwrap_or_else(|| format!("Thread {}", key.thread_id));
        format!("{process} / {thread}")
    }
}

fn track_of(event: &TraceEvent) -> TrackKey {
    TrackKey {
        process_id: event.process_id,
        thread_id: event.thread_id,
    }
}

/// Build the layout for `profile`.
///
/// Complete (`X`) events and matched `B`/`E` pairs become spans; anything
/// missing a name or timestamp, or with a negative duration, is skipped.
pub fn build_layout(profile: &Profile) -> LayoutModel {
    let mut names = TrackNames::default();
    let mut tracks: BTreeMap<TrackKey, Vec<Span<'_>>> = BTreeMap::new();
    let mut open: HashMap<TrackKey, Vec<(EventId, &TraceEvent)>> = HashMap::new();
    let mut skipped = 0usize;

    for (id, event) in profile.iter() {
        let key = track_of(event);
        match event.phase {
            Phase::Metadata => match (event.name.as_deref(), event.metadata_name()) {
                (Some("process_name"), Some(name)) => {
                    names.processes.insert(key.process_id, name.to_string());
                }
                (Some("thread_name"), Some(name)) => {
                    names.threads.insert((key.process_id, key.thread_id), name.to_string());
                }
                _ => {}
            },
            Phase::Complete => {
                match (event.name.as_deref(), event.start_time, event.duration) {
                    (Some(name), Some(start), Some(duration))
                        if start.is_finite() && duration.is_finite() && duration >= 0.0 =>
                    {
                        tracks.entry(key).or_default().push(Span {
                            id,
                            start,
                            duration,
                            name,
                        });
                    }
                    _ => skipped += 1,
                }
            }
            Phase::Begin => open.entry(key).or_default().push((id, event)),
            Phase::End => {
                let Some((begin_id, begin)) = open.get_mut(&key).and_then(Vec::pop) else {
                    skipped += 1;
                    continue;
                };
                let name = begin.name.as_deref().or(event.name.as_deref());
                match (name, begin.start_time, event.start_time) {
                    (Some(name), Some(start), Some(end)) if start.is_finite() && end >= start => {
                        tracks.entry(key).or_default().push(Span {
                            id: begin_id,
                            start,
                            duration: end - start,
                            name,
                        });
                    }
                    _ => skipped += 1,
                }
            }
            Phase::Instant | Phase::Counter | Phase::Other => {}
        }
    }

    skipped += open.values().map(Vec::len).sum::<usize>();
    if skipped > 0 {
        debug!("layout: skipped {skipped} malformed or unmatched events");
    }

    let mut x_max: f64 = 0.0;
    let mut x_min = f64::INFINITY;
    let mut panels = Vec::with_capacity(tracks.len());
    for (key, mut spans) in tracks {
        spans.sort_by(|a, b| {
            a.start
                .total_cmp(&b.start)
                .then_with(|| b.duration.total_cmp(&a.duration))
        });
        let layout = stack_track(key, names.label(key), &spans);
        if let Some(end) = layout.events.iter().map(LaidOutEvent::end).reduce(f64::max) {
            x_max = x_max.max(end);
        }
        // Events are in start order.
        if let Some(first) = layout.events.first() {
            x_min = x_min.min(first.start);
        }
        panels.push(Rc::new(layout));
    }

    debug!(
        "layout: {} panels, {} events, x_max={x_max}",
        panels.len(),
        panels.iter().map(|p| p.events.len()).sum::<usize>()
    );
    let x_min = if x_min.is_finite() { x_min } else { 0.0 };
    LayoutModel {
        panels,
        x_max,
        x_min,
    }
}

/// Assign depths with an open-span stack. A span nests under every span on
/// the stack that has not ended by its start, so two spans on the same row
/// never overlap.
fn stack_track(track: TrackKey, name: String, spans: &[Span<'_>]) -> PanelLayout {
    let mut events = Vec::with_capacity(spans.len());
    let mut rows: Vec<Vec<usize>> = Vec::new();
    let mut stack: Vec<f64> = Vec::new();

    for span in spans {
        while stack.last().is_some_and(|&end| end <= span.start) {
            stack.pop();
        }
        let depth = stack.len();
        stack.push(span.start + span.duration);

        if rows.len() <= depth {
            rows.resize_with(depth + 1, Vec::new);
        }
        rows[depth].push(events.len());
        events.push(LaidOutEvent {
            id: span.id,
            start: span.start,
            duration: span.duration,
            depth: depth as u32,
            label: Arc::from(span.name),
            folded_name: span.name.to_lowercase().into_boxed_str(),
        });
    }

    PanelLayout {
        track,
        name: Arc::from(name),
        events,
        rows,
    }
}
