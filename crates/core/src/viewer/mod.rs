//! The trace viewer orchestrator.
//!
//! Owns the layout, the panels, the shared scale and the filter state, and
//! routes host input to them. Hosts drive it with [`TraceViewer::tick`] once
//! per frame and replay each panel's display list.

pub mod filter;
pub mod input;
pub mod query;
pub mod scheduler;
pub mod scroll;

use std::rc::Rc;

use log::{debug, info};
use serde_json::Value;

use crate::config::ViewerConfig;
use crate::model::{EventId, LayoutModel, Profile, TraceEvent, build_layout};
use crate::views::{Panel, SharedScale};

pub use filter::{FilterState, SpanRef};
pub use input::{Key, KeyDisposition, KeyPress, KeyTarget, Modifiers, Step};
pub use query::{MemoryQueryParams, QueryParams};
pub use scheduler::{AnimationLoop, Liveness};

/// Tooltip data for one event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDetails {
    pub name: String,
    pub category: Option<String>,
    pub start: f64,
    pub duration: f64,
    pub args: Option<Value>,
}

pub struct TraceViewer {
    profile: Profile,
    layout: LayoutModel,
    panels: Vec<Panel>,
    scale: SharedScale,
    filter: FilterState,
    query: Box<dyn QueryParams>,
    animation: AnimationLoop,
    config: Rc<ViewerConfig>,
    mounted: bool,
}

impl std::fmt::Debug for TraceViewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceViewer")
            .field("panels", &self.panels.len())
            .field("scale", &self.scale.get())
            .field("filter", &self.filter)
            .field("mounted", &self.mounted)
            .finish_non_exhaustive()
    }
}

impl TraceViewer {
    pub fn new(profile: Profile, config: ViewerConfig, query: Box<dyn QueryParams>) -> Self {
        let layout = build_layout(&profile);
        let config = Rc::new(config);
        let scale = SharedScale::new(1.0);
        let panels = layout
            .panels
            .iter()
            .map(|track| {
                Panel::new(
                    Rc::clone(track),
                    layout.x_max,
                    scale.reader(),
                    Rc::clone(&config),
                )
            })
            .collect();
        debug!(
            "viewer: {} events in {} panels, x_max={}",
            layout.event_count(),
            layout.panels.len(),
            layout.x_max
        );
        Self {
            profile,
            layout,
            panels,
            scale,
            filter: FilterState::default(),
            query,
            animation: AnimationLoop::default(),
            config,
            mounted: false,
        }
    }

    /// Start the frame loop and restore the filter from the query string.
    pub fn mount(&mut self) {
        if self.mounted {
            return;
        }
        self.mounted = true;
        self.animation.start();
        info!("viewer mounted with {} panels", self.panels.len());

        let key = self.config.filter_query_param.clone();
        if let Some(initial) = self.query.query_param(&key).filter(|v| !v.is_empty()) {
            debug!("restoring filter {initial:?} from query string");
            self.update_filter(&initial);
        }
    }

    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        self.animation.stop();
        info!("viewer unmounted");
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Handle for callbacks that may fire after unmount.
    pub fn liveness(&self) -> Liveness {
        self.animation.liveness()
    }

    /// One host frame. Returns true when the panels were updated.
    pub fn tick(&mut self) -> bool {
        if !self.animation.begin_frame() {
            return false;
        }
        self.update();
        true
    }

    /// Push the selection to every panel, then resize and redraw them.
    pub fn update(&mut self) {
        let selected = self.filter.selected_event();
        for panel in &mut self.panels {
            panel.set_selected_event(selected);
        }
        self.fit_if_unset();
        for panel in &mut self.panels {
            panel.resize();
            panel.draw();
        }
    }

    fn fit_if_unset(&mut self) {
        if self.scale.version() == 0 {
            self.fit();
        }
    }

    /// Fit `[x_min, x_max]` into the first sized panel and scroll every
    /// panel to the first event.
    fn fit(&mut self) {
        let Some(scale) = self.fit_scale() else {
            return;
        };
        if !self.scale.set(scale) {
            return;
        }
        let left = self.layout.x_min * scale;
        for p in &mut self.panels {
            p.resize();
            p.set_scroll_x(left);
        }
        debug!("fit scale {scale} from x={}", self.layout.x_min);
    }

    fn fit_scale(&self) -> Option<f64> {
        let extent = self.layout.x_max - self.layout.x_min;
        if extent <= 0.0 {
            return None;
        }
        self.panels
            .iter()
            .map(|p| p.container().client_width())
            .find(|w| *w > 0.0)
            .map(|w| w / extent)
    }

    pub fn update_filter(&mut self, text: &str) {
        if !self.mounted {
            return;
        }
        self.query
            .set_query_param(&self.config.filter_query_param, text);
        self.filter.set_filter(text, &self.layout);
        debug!(
            "filter {text:?}: {} matches",
            self.filter.matched_spans().len()
        );
        self.scroll_to_selected_span();
        self.update();
    }

    pub fn handle_key_down(&mut self, press: &KeyPress) -> KeyDisposition {
        if !self.mounted || press.target == KeyTarget::FilterInput {
            return KeyDisposition::Default;
        }
        let Some(step) = press.match_step() else {
            return KeyDisposition::Default;
        };
        if !self.filter.step(step) {
            return KeyDisposition::Default;
        }
        self.scroll_to_selected_span();
        self.update();
        KeyDisposition::PreventDefault
    }

    /// Bring the selected match into view. No-op without a selection.
    pub fn scroll_to_selected_span(&mut self) {
        let Some(span) = self.filter.selected() else {
            return;
        };
        // Scrollable extents must reflect the current scale and sizes.
        self.fit_if_unset();
        for panel in &mut self.panels {
            panel.resize();
        }
        scroll::scroll_to_span(&mut self.panels, span, self.scale.get());
    }

    /// Offsets reported by a panel's native scroll container.
    pub fn handle_native_scroll(&mut self, panel: usize, left: f64, top: f64) {
        if !self.mounted {
            return;
        }
        let Some(source) = self.panels.get_mut(panel) else {
            return;
        };
        source.set_scroll_x(left);
        source.set_scroll_y(top);
        let left = source.scroll_x();
        for other in &mut self.panels {
            other.set_scroll_x(left);
        }
    }

    /// Zoom by `factor` around canvas x `pointer_x` of `panel`.
    pub fn zoom_at(&mut self, panel: usize, pointer_x: f64, factor: f64) {
        if !self.mounted || !(factor.is_finite() && factor > 0.0) {
            return;
        }
        let Some(anchor_panel) = self.panels.get(panel) else {
            return;
        };
        let old_scale = self.scale.get();
        let anchor = (pointer_x + anchor_panel.scroll_x()) / old_scale;
        let new_scale = (old_scale * factor).clamp(self.config.min_scale, self.config.max_scale);
        if !self.scale.set(new_scale) {
            return;
        }
        let left = anchor * new_scale - pointer_x;
        for p in &mut self.panels {
            p.resize();
            p.set_scroll_x(left);
        }
    }

    /// Fit the whole trace into the panel width and scroll to its start.
    pub fn fit_to_width(&mut self) {
        if self.mounted {
            self.fit();
        }
    }

    /// Route a pointer move to `panel` and return the event under it.
    pub fn handle_pointer_move(&mut self, panel: usize, x: f64, y: f64) -> Option<EventId> {
        if !self.mounted {
            return None;
        }
        let hovered = self.panels.get(panel)?.get_hovered_event(x, y);
        for (i, p) in self.panels.iter_mut().enumerate() {
            p.set_hovered_event(if i == panel { hovered } else { None });
        }
        hovered
    }

    pub fn handle_pointer_leave(&mut self) {
        for p in &mut self.panels {
            p.set_hovered_event(None);
        }
    }

    /// Select the clicked event if it is part of the match set.
    pub fn handle_click(&mut self, panel: usize, x: f64, y: f64) -> Option<EventId> {
        if !self.mounted {
            return None;
        }
        let id = self.panels.get(panel)?.get_hovered_event(x, y)?;
        if let Some(index) = self.filter.index_of(id) {
            self.filter.select(index);
            self.update();
        }
        Some(id)
    }

    pub fn event(&self, id: EventId) -> Option<&TraceEvent> {
        self.profile.event(id)
    }

    pub fn event_details(&self, id: EventId) -> Option<EventDetails> {
        let event = self.profile.event(id)?;
        let (start, duration) = self
            .layout
            .panels
            .iter()
            .find_map(|p| p.position_of(id).and_then(|i| p.event(i)))
            .map(|e| (e.start, e.duration))?;
        Some(EventDetails {
            name: event.name.clone().unwrap_or_default(),
            category: event.category.clone(),
            start,
            duration,
            args: event.args.clone(),
        })
    }

    pub fn hovered_event(&self) -> Option<(usize, EventId)> {
        self.panels
            .iter()
            .enumerate()
            .find_map(|(i, p)| p.hovered_event().map(|id| (i, id)))
    }

    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    pub fn panel_mut(&mut self, index: usize) -> Option<&mut Panel> {
        self.panels.get_mut(index)
    }

    pub fn layout(&self) -> &LayoutModel {
        &self.layout
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn filter_text(&self) -> &str {
        self.filter.filter_text()
    }

    pub fn matched_spans(&self) -> &[SpanRef] {
        self.filter.matched_spans()
    }

    pub fn selected_span_index(&self) -> Option<usize> {
        self.filter.selected_span_index()
    }

    pub fn match_status(&self) -> (usize, usize) {
        self.filter.match_status()
    }

    pub fn scale(&self) -> f64 {
        self.scale.get()
    }

    /// Set `canvasXPerModelX` directly. Returns false for invalid values.
    pub fn set_scale(&mut self, scale: f64) -> bool {
        self.scale.set(scale)
    }
}

impl Drop for TraceViewer {
    fn drop(&mut self) {
        self.animation.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Phase;

    fn span(tid: i64, ts: f64, dur: f64, name: &str) -> TraceEvent {
        TraceEvent {
            process_id: 1,
            thread_id: tid,
            start_time: Some(ts),
            duration: Some(dur),
            phase: Phase::Complete,
            name: Some(name.into()),
            ..TraceEvent::default()
        }
    }

    fn viewer(events: Vec<TraceEvent>) -> TraceViewer {
        let mut v = TraceViewer::new(
            Profile::new(events),
            ViewerConfig::default(),
            Box::new(MemoryQueryParams::default()),
        );
        for i in 0..v.panels().len() {
            if let Some(p) = v.panel_mut(i) {
                p.container_mut().set_client_size(100.0, 100.0);
            }
        }
        v
    }

    #[test]
    fn first_update_fits_trace_to_width() {
        let mut v = viewer(vec![span(1, 0.0, 400.0, "a")]);
        v.mount();
        assert!(v.tick());
        assert_eq!(v.scale(), 0.25);

        // Later frames keep a scale set by the user.
        v.set_scale(1.0);
        v.tick();
        assert_eq!(v.scale(), 1.0);
    }

    #[test]
    fn fit_skips_the_empty_time_before_the_first_event() {
        let mut v = viewer(vec![span(1, 5_000.0, 300.0, "a"), span(2, 5_100.0, 300.0, "b")]);
        v.mount();
        v.tick();
        // 100px for the 400µs between 5000 and 5400.
        assert_eq!(v.scale(), 0.25);
        for p in v.panels() {
            assert_eq!(p.scroll_x(), 1_250.0);
            assert_eq!(p.container().scroll_left(), 1_250.0);
        }
        let first = v.panels()[0]
            .canvas()
            .commands()
            .iter()
            .find_map(|c| match c {
                trace_view_protocol::RenderCommand::DrawRect {
                    rect,
                    event_id: Some(_),
                    ..
                } => Some(*rect),
                _ => None,
            })
            .expect("first span drawn");
        assert_eq!(first.x, 0.0);
        assert_eq!(first.w, 75.0);
    }

    #[test]
    fn tick_only_runs_while_mounted() {
        let mut v = viewer(vec![span(1, 0.0, 10.0, "a")]);
        assert!(!v.tick());
        v.mount();
        let live = v.liveness();
        assert!(v.tick());
        v.unmount();
        assert!(!v.tick());
        assert!(!live.is_live());
    }

    #[test]
    fn input_is_ignored_when_unmounted() {
        let mut v = viewer(vec![span(1, 0.0, 10.0, "a")]);
        v.update_filter("a");
        assert!(v.matched_spans().is_empty());
        assert_eq!(
            v.handle_key_down(&KeyPress::new(Key::Enter)),
            KeyDisposition::Default
        );
        assert_eq!(v.handle_pointer_move(0, 1.0, 30.0), None);
    }

    #[test]
    fn mount_restores_filter_from_query_string() {
        let params = MemoryQueryParams::with("timingFilter", "b");
        let mut v = TraceViewer::new(
            Profile::new(vec![span(1, 0.0, 10.0, "a"), span(1, 20.0, 10.0, "b")]),
            ViewerConfig::default(),
            Box::new(params.clone()),
        );
        v.mount();
        assert_eq!(v.filter_text(), "b");
        assert_eq!(v.matched_spans().len(), 1);
        assert_eq!(v.panels()[0].selected_event(), Some(EventId(1)));
    }

    #[test]
    fn zoom_keeps_the_time_under_the_pointer() {
        let mut v = viewer(vec![span(1, 0.0, 1000.0, "a")]);
        v.mount();
        v.set_scale(1.0);
        v.tick();
        v.handle_native_scroll(0, 200.0, 0.0);
        // Pointer at canvas x 50 → time 250.
        v.zoom_at(0, 50.0, 2.0);
        assert_eq!(v.scale(), 2.0);
        assert_eq!(v.panels()[0].scroll_x(), 450.0);

        v.zoom_at(0, 0.0, 1e12);
        assert_eq!(v.scale(), v.config().max_scale);
    }

    #[test]
    fn fit_to_width_resets_scale_and_scroll() {
        let mut v = viewer(vec![span(1, 0.0, 1000.0, "a")]);
        v.mount();
        v.set_scale(1.0);
        v.tick();
        v.handle_native_scroll(0, 300.0, 0.0);
        v.fit_to_width();
        assert_eq!(v.scale(), 0.1);
        assert_eq!(v.panels()[0].scroll_x(), 0.0);
    }

    #[test]
    fn native_scroll_syncs_horizontal_offset_only() {
        let mut v = viewer(vec![
            span(1, 0.0, 1000.0, "a"),
            span(1, 0.0, 10.0, "nested"),
            span(1, 1.0, 5.0, "deeper"),
            span(1, 2.0, 1.0, "deepest"),
            span(1, 2.0, 0.5, "bottom"),
            span(2, 0.0, 1000.0, "b"),
        ]);
        v.mount();
        v.set_scale(1.0);
        v.tick();
        v.handle_native_scroll(0, 150.0, 20.0);
        assert_eq!(v.panels()[0].scroll_x(), 150.0);
        assert_eq!(v.panels()[1].scroll_x(), 150.0);
        assert_eq!(v.panels()[0].scroll_y(), 20.0);
        assert_eq!(v.panels()[1].scroll_y(), 0.0);

        // Out-of-range offsets clamp.
        v.handle_native_scroll(1, 5000.0, -3.0);
        assert_eq!(v.panels()[0].scroll_x(), 900.0);
        assert_eq!(v.panels()[1].scroll_y(), 0.0);
    }

    #[test]
    fn hover_is_tracked_on_one_panel() {
        let mut v = viewer(vec![span(1, 0.0, 100.0, "a"), span(2, 0.0, 100.0, "b")]);
        v.mount();
        v.tick();
        let y = v.config().header_height + 1.0;
        assert_eq!(v.handle_pointer_move(1, 10.0, y), Some(EventId(1)));
        assert_eq!(v.hovered_event(), Some((1, EventId(1))));
        assert_eq!(v.panels()[0].hovered_event(), None);

        let details = v.event_details(EventId(1)).expect("details");
        assert_eq!(details.name, "b");
        assert_eq!(details.duration, 100.0);

        v.handle_pointer_leave();
        assert_eq!(v.hovered_event(), None);
    }

    #[test]
    fn clicking_a_match_selects_it() {
        let mut v = viewer(vec![span(1, 0.0, 40.0, "job"), span(1, 50.0, 40.0, "job")]);
        v.mount();
        v.set_scale(1.0);
        v.update_filter("job");
        assert_eq!(v.selected_span_index(), Some(0));
        let y = v.config().header_height + 1.0;
        assert_eq!(v.handle_click(0, 60.0, y), Some(EventId(1)));
        assert_eq!(v.selected_span_index(), Some(1));
        assert_eq!(v.panels()[0].selected_event(), Some(EventId(1)));
    }

    #[test]
    fn empty_profile_is_inert() {
        let mut v = viewer(Vec::new());
        v.mount();
        assert!(v.tick());
        v.update_filter("x");
        assert!(v.matched_spans().is_empty());
        assert_eq!(
            v.handle_key_down(&KeyPress::new(Key::Enter)),
            KeyDisposition::Default
        );
        assert_eq!(v.scale(), 1.0);
    }
}
