use crate::model::{EventId, LayoutModel};

use super::input::Step;

/// A matched event: the panel showing it, its position in that panel's
/// layout and its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanRef {
    pub panel: usize,
    pub slot: usize,
    pub id: EventId,
}

/// Filter text, the events matching it and the current selection among them.
#[derive(Debug, Default)]
pub struct FilterState {
    filter_text: String,
    matched_spans: Vec<SpanRef>,
    selected_span_index: Option<usize>,
}

impl FilterState {
    /// Replace the filter text and recompute the match set. The first match
    /// (if any) becomes the selection.
    ///
    /// Matching is a case-insensitive substring test on names only, in
    /// layout order: panels in track order, events in start order. An empty
    /// text matches nothing.
    pub fn set_filter(&mut self, text: &str, layout: &LayoutModel) {
        self.filter_text = text.to_string();
        self.matched_spans.clear();

        if !text.is_empty() {
            let needle = text.to_lowercase();
            for (panel, track) in layout.panels.iter().enumerate() {
                self.matched_spans.extend(
                    track
                        .events
                        .iter()
                        .enumerate()
                        .filter(|(_, e)| e.name_contains(&needle))
                        .map(|(slot, e)| SpanRef {
                            panel,
                            slot,
                            id: e.id,
                        }),
                );
            }
        }

        self.selected_span_index = if self.matched_spans.is_empty() {
            None
        } else {
            Some(0)
        };
    }

    /// Move the selection one match forward or back, wrapping at both ends.
    /// Returns false when there is nothing to select.
    pub fn step(&mut self, step: Step) -> bool {
        let len = self.matched_spans.len();
        if len == 0 {
            return false;
        }
        let current = self.selected_span_index.unwrap_or(0);
        self.selected_span_index = Some(match step {
            Step::Next => (current + 1) % len,
            Step::Previous => (current + len - 1) % len,
        });
        true
    }

    /// Select a match directly, e.g. when the user clicks a matched event.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.matched_spans.len() {
            return false;
        }
        self.selected_span_index = Some(index);
        true
    }

    pub fn filter_text(&self) -> &str {
        &self.filter_text
    }

    pub fn matched_spans(&self) -> &[SpanRef] {
        &self.matched_spans
    }

    pub fn selected_span_index(&self) -> Option<usize> {
        self.selected_span_index
    }

    pub fn selected(&self) -> Option<SpanRef> {
        self.selected_span_index
            .and_then(|i| self.matched_spans.get(i).copied())
    }

    pub fn selected_event(&self) -> Option<EventId> {
        self.selected().map(|s| s.id)
    }

    /// Position of an event in the match set.
    pub fn index_of(&self, id: EventId) -> Option<usize> {
        self.matched_spans.iter().position(|s| s.id == id)
    }

    /// One-based position of the selection and the match count, for a
    /// "3 / 12" style counter. `(0, 0)` without matches.
    pub fn match_status(&self) -> (usize, usize) {
        let total = self.matched_spans.len();
        match self.selected_span_index {
            Some(i) if total > 0 => (i + 1, total),
            _ => (0, total),
        }
    }
}
