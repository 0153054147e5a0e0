use std::rc::Rc;
use std::sync::Arc;

use trace_view_protocol::{Point, Rect, RenderCommand, TextAlign, ThemeToken};

use crate::config::ViewerConfig;
use crate::model::{EventId, LaidOutEvent, PanelLayout};
use crate::views::ruler;
use crate::views::transform::ScaleReader;

/// Host-side scroll container of a panel.
///
/// Mirrors what a native scrolling element exposes: the visible (client)
/// size set by the host, the scroll offsets, and the scrollable extent,
/// which follows the size of the sizer element the panel places inside it.
/// Assigning an offset clamps it to the scrollable range, as native
/// containers do.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Container {
    client_width: f64,
    client_height: f64,
    scroll_left: f64,
    scroll_top: f64,
    sizer_width: f64,
    sizer_height: f64,
}

impl Container {
    pub fn set_client_size(&mut self, width: f64, height: f64) {
        self.client_width = width.max(0.0);
        self.client_height = height.max(0.0);
    }

    pub fn client_width(&self) -> f64 {
        self.client_width
    }

    pub fn client_height(&self) -> f64 {
        self.client_height
    }

    pub fn scroll_left(&self) -> f64 {
        self.scroll_left
    }

    pub fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    pub fn scroll_width(&self) -> f64 {
        self.sizer_width.max(self.client_width)
    }

    pub fn scroll_height(&self) -> f64 {
        self.sizer_height.max(self.client_height)
    }

    pub fn sizer(&self) -> (f64, f64) {
        (self.sizer_width, self.sizer_height)
    }

    pub fn max_scroll_left(&self) -> f64 {
        (self.scroll_width() - self.client_width).max(0.0)
    }

    pub fn max_scroll_top(&self) -> f64 {
        (self.scroll_height() - self.client_height).max(0.0)
    }

    fn set_sizer(&mut self, width: f64, height: f64) {
        self.sizer_width = width.max(0.0);
        self.sizer_height = height.max(0.0);
    }

    fn set_scroll_left(&mut self, left: f64) {
        self.scroll_left = clamp_offset(left, self.max_scroll_left());
    }

    fn set_scroll_top(&mut self, top: f64) {
        self.scroll_top = clamp_offset(top, self.max_scroll_top());
    }
}

fn clamp_offset(value: f64, max: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, max) }
}

/// Backing canvas of a panel: its pixel size and the display list produced
/// by the last [`Panel::draw`].
#[derive(Debug, Clone, Default)]
pub struct Canvas {
    css_width: f64,
    css_height: f64,
    device_pixel_ratio: f64,
    commands: Vec<RenderCommand>,
}

impl Canvas {
    /// Size in device pixels.
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            (self.css_width * self.device_pixel_ratio).round() as u32,
            (self.css_height * self.device_pixel_ratio).round() as u32,
        )
    }

    /// Size in CSS pixels; all commands use these coordinates.
    pub fn css_size(&self) -> (f64, f64) {
        (self.css_width, self.css_height)
    }

    pub fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }

    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    fn resize(&mut self, width: f64, height: f64, dpr: f64) {
        self.css_width = width;
        self.css_height = height;
        self.device_pixel_ratio = if dpr > 0.0 { dpr } else { 1.0 };
    }
}

/// One scrollable track view: a container, a canvas and the events of one
/// [`PanelLayout`].
#[derive(Debug)]
pub struct Panel {
    layout: Rc<PanelLayout>,
    x_max: f64,
    scale: ScaleReader,
    config: Rc<ViewerConfig>,
    container: Container,
    canvas: Canvas,
    scroll_x: f64,
    scroll_y: f64,
    selected_event: Option<EventId>,
    hovered_event: Option<EventId>,
    frames_drawn: u64,
}

impl Panel {
    pub fn new(
        layout: Rc<PanelLayout>,
        x_max: f64,
        scale: ScaleReader,
        config: Rc<ViewerConfig>,
    ) -> Self {
        Self {
            layout,
            x_max,
            scale,
            config,
            container: Container::default(),
            canvas: Canvas::default(),
            scroll_x: 0.0,
            scroll_y: 0.0,
            selected_event: None,
            hovered_event: None,
            frames_drawn: 0,
        }
    }

    pub fn layout(&self) -> &PanelLayout {
        &self.layout
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Hosts report the visible size of the panel through this.
    pub fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn scroll_x(&self) -> f64 {
        self.scroll_x
    }

    pub fn scroll_y(&self) -> f64 {
        self.scroll_y
    }

    /// Apply a horizontal offset to both the container and the panel.
    pub fn set_scroll_x(&mut self, x: f64) {
        self.container.set_scroll_left(x);
        self.scroll_x = self.container.scroll_left();
    }

    /// Apply a vertical offset to both the container and the panel.
    pub fn set_scroll_y(&mut self, y: f64) {
        self.container.set_scroll_top(y);
        self.scroll_y = self.container.scroll_top();
    }

    pub fn selected_event(&self) -> Option<EventId> {
        self.selected_event
    }

    pub fn set_selected_event(&mut self, event: Option<EventId>) {
        self.selected_event = event;
    }

    pub fn hovered_event(&self) -> Option<EventId> {
        self.hovered_event
    }

    pub fn set_hovered_event(&mut self, event: Option<EventId>) {
        self.hovered_event = event;
    }

    /// Number of completed [`Panel::draw`] calls.
    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    pub fn header_height(&self) -> f64 {
        self.config.header_height
    }

    pub fn row_height(&self) -> f64 {
        self.config.row_height
    }

    /// Full height of the panel content: header, rows and bottom padding.
    pub fn content_height(&self) -> f64 {
        self.config.header_height
            + self.layout.row_count() as f64 * self.config.row_height
            + self.config.bottom_padding
    }

    /// Height of the part of the container that shows rows.
    pub fn rows_viewport_height(&self) -> f64 {
        (self.container.client_height() - self.config.header_height).max(0.0)
    }

    /// Size the sizer and the canvas after the container size or the scale
    /// changed. Idempotent.
    pub fn resize(&mut self) {
        let width = self.scale.model_to_canvas_len(self.x_max);
        self.container.set_sizer(width, self.content_height());
        self.canvas.resize(
            self.container.client_width(),
            self.container.client_height(),
            self.config.device_pixel_ratio,
        );
        // The content may have shrunk; keep offsets within range.
        self.set_scroll_x(self.scroll_x);
        self.set_scroll_y(self.scroll_y);
    }

    /// Rebuild the display list for the visible window.
    pub fn draw(&mut self) {
        let mut out = std::mem::take(&mut self.canvas.commands);
        out.clear();

        let (width, height) = self.canvas.css_size();
        if width > 0.0 && height > 0.0 {
            self.paint(&mut out, width, height);
        }

        self.canvas.commands = out;
        self.frames_drawn += 1;
    }

    fn paint(&self, out: &mut Vec<RenderCommand>, width: f64, height: f64) {
        let cfg = &*self.config;
        let header = cfg.header_height;
        let scale = self.scale.get();

        out.push(RenderCommand::DrawRect {
            rect: Rect::new(0.0, 0.0, width, height),
            color: ThemeToken::PanelBackground,
            label: None,
            event_id: None,
        });

        let view_start = self.scale.canvas_to_model_x(0.0, self.scroll_x);
        let view_end = self.scale.canvas_to_model_x(width, self.scroll_x);
        let (ticks, major) = ruler::ticks(view_start, view_end, width, cfg.min_tick_spacing);
        ruler::push_gridlines(out, &ticks, header, height);

        out.push(RenderCommand::SetClip {
            rect: Rect::new(0.0, header, width, (height - header).max(0.0)),
        });

        let rows_height = (height - header).max(0.0);
        let first_row = (self.scroll_y / cfg.row_height).floor().max(0.0) as usize;
        let last_row = ((self.scroll_y + rows_height) / cfg.row_height).ceil() as usize;
        let last_row = last_row.min(self.layout.row_count());

        let mut selected_rect = None;
        for row in first_row..last_row {
            let y = header + row as f64 * cfg.row_height - self.scroll_y;
            for event in self.layout.events_in_row(row, view_start, view_end) {
                let selected = self.selected_event == Some(event.id);
                let x = self.scale.model_to_canvas_x(event.start, self.scroll_x);
                let mut w = event.duration * scale;
                if w < 0.5 {
                    if !selected {
                        continue;
                    }
                    w = w.max(1.0);
                }
                let rect = Rect::new(x, y, w, (cfg.row_height - cfg.row_gap).max(0.0));
                out.push(RenderCommand::DrawRect {
                    rect,
                    color: color_for_name(&event.label),
                    label: (w >= cfg.min_label_width).then(|| Arc::clone(&event.label)),
                    event_id: Some(u64::from(event.id.0)),
                });
                if self.hovered_event == Some(event.id) {
                    out.push(RenderCommand::DrawRect {
                        rect,
                        color: ThemeToken::HoverHighlight,
                        label: None,
                        event_id: None,
                    });
                }
                if selected {
                    selected_rect = Some(rect);
                }
            }
        }

        // Stroke last so neighbouring spans cannot cover the outline.
        if let Some(rect) = selected_rect {
            out.push(RenderCommand::StrokeRect {
                rect,
                color: ThemeToken::SelectionHighlight,
                width: cfg.highlight_width,
            });
        }
        out.push(RenderCommand::ClearClip);

        self.paint_header(out, width, &ticks, major);
        out.push(RenderCommand::DrawLine {
            from: Point::new(0.0, height),
            to: Point::new(width, height),
            color: ThemeToken::PanelBorder,
            width: 1.0,
        });
    }

    fn paint_header(&self, out: &mut Vec<RenderCommand>, width: f64, ticks: &[ruler::Tick], major: f64) {
        let cfg = &*self.config;
        out.push(RenderCommand::DrawRect {
            rect: Rect::new(0.0, 0.0, width, cfg.header_height),
            color: ThemeToken::PanelHeaderBackground,
            label: None,
            event_id: None,
        });

        // Keep ruler labels clear of the track name.
        let name_extent = 8.0 + self.layout.name.chars().count() as f64 * cfg.font_size * 0.6;
        let clear: Vec<_> = ticks.iter().copied().filter(|t| t.x > name_extent).collect();
        ruler::push_header_ticks(out, &clear, major, cfg.header_height, cfg.font_size);

        out.push(RenderCommand::DrawText {
            position: Point::new(4.0_f64.min(cfg.header_height), cfg.header_height * 0.5),
            text: Arc::clone(&self.layout.name),
            color: ThemeToken::PanelHeaderText,
            font_size: cfg.font_size,
            align: TextAlign::Left,
        });
    }

    /// Event under the pointer, in canvas coordinates.
    pub fn get_hovered_event(&self, x: f64, y: f64) -> Option<EventId> {
        let cfg = &*self.config;
        if x < 0.0 || x >= self.container.client_width() || y < cfg.header_height {
            return None;
        }
        let row_y = y - cfg.header_height + self.scroll_y;
        let row = (row_y / cfg.row_height).floor();
        if row < 0.0 {
            return None;
        }
        let t = self.scale.canvas_to_model_x(x, self.scroll_x);
        // Half a pixel of slack so sub-pixel spans stay reachable.
        let slack = 0.5 / self.scale.get();
        self.layout
            .events_in_row(row as usize, t - slack, t + slack)
            .next()
            .map(|e| e.id)
    }

    /// Vertical offset of a row relative to the first row.
    pub fn row_offset(&self, event: &LaidOutEvent) -> f64 {
        f64::from(event.depth) * self.config.row_height
    }
}

/// Stable palette color for a span name (FNV-1a).
pub fn color_for_name(name: &str) -> ThemeToken {
    let hash = name
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
            (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
        });
    let palette = ThemeToken::SPAN_PALETTE;
    palette[(hash % palette.len() as u64) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Phase, Profile, TraceEvent, build_layout};
    use crate::views::transform::SharedScale;

    fn event(ts: f64, dur: f64, name: &str) -> TraceEvent {
        TraceEvent {
            process_id: 1,
            thread_id: 1,
            start_time: Some(ts),
            duration: Some(dur),
            phase: Phase::Complete,
            name: Some(name.into()),
            ..TraceEvent::default()
        }
    }

    fn panel_for(events: Vec<TraceEvent>, scale: &SharedScale) -> Panel {
        let layout = build_layout(&Profile::new(events));
        let mut panel = Panel::new(
            Rc::clone(&layout.panels[0]),
            layout.x_max,
            scale.reader(),
            Rc::new(ViewerConfig::default()),
        );
        panel.container_mut().set_client_size(200.0, 100.0);
        panel.resize();
        panel
    }

    fn event_rects(panel: &Panel) -> Vec<(u64, Rect)> {
        panel
            .canvas()
            .commands()
            .iter()
            .filter_map(|c| match c {
                RenderCommand::DrawRect {
                    rect,
                    event_id: Some(id),
                    ..
                } => Some((*id, *rect)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn resize_sizes_sizer_and_canvas() {
        let scale = SharedScale::new(2.0);
        let mut panel = panel_for(vec![event(0.0, 500.0, "a"), event(10.0, 5.0, "b")], &scale);
        assert_eq!(panel.container().sizer().0, 1000.0);
        assert_eq!(panel.container().scroll_width(), 1000.0);
        assert_eq!(panel.canvas().css_size(), (200.0, 100.0));

        // Idempotent.
        let before = panel.container().clone();
        panel.resize();
        assert_eq!(panel.container(), &before);

        // Shrinking the content clamps the scroll offset.
        panel.set_scroll_x(800.0);
        assert_eq!(panel.scroll_x(), 800.0);
        scale.set(0.5);
        panel.resize();
        assert_eq!(panel.container().scroll_width(), 250.0);
        assert_eq!(panel.scroll_x(), 50.0);
        assert_eq!(panel.container().scroll_left(), 50.0);
    }

    #[test]
    fn canvas_uses_device_pixel_ratio() {
        let scale = SharedScale::new(1.0);
        let layout = build_layout(&Profile::new(vec![event(0.0, 10.0, "a")]));
        let config = ViewerConfig {
            device_pixel_ratio: 2.0,
            ..ViewerConfig::default()
        };
        let mut panel = Panel::new(
            Rc::clone(&layout.panels[0]),
            layout.x_max,
            scale.reader(),
            Rc::new(config),
        );
        panel.container_mut().set_client_size(150.5, 40.0);
        panel.resize();
        assert_eq!(panel.canvas().pixel_size(), (301, 80));
    }

    #[test]
    fn draw_only_emits_visible_events() {
        let scale = SharedScale::new(1.0);
        let mut panel = panel_for(
            vec![
                event(0.0, 50.0, "left"),
                event(150.0, 20.0, "inside"),
                event(400.0, 50.0, "right"),
            ],
            &scale,
        );
        panel.set_scroll_x(100.0);
        panel.draw();
        let rects = event_rects(&panel);
        assert_eq!(rects.len(), 1);
        assert_eq!(rects[0].0, 1);
        assert_eq!(rects[0].1.x, 50.0);
        assert_eq!(rects[0].1.y, ViewerConfig::default().header_height);
        assert_eq!(panel.frames_drawn(), 1);
    }

    #[test]
    fn nested_events_land_on_their_rows() {
        let scale = SharedScale::new(1.0);
        let mut panel = panel_for(vec![event(0.0, 100.0, "outer"), event(10.0, 20.0, "inner")], &scale);
        panel.draw();
        let rects = event_rects(&panel);
        let cfg = ViewerConfig::default();
        assert_eq!(rects[0].1.y, cfg.header_height);
        assert_eq!(rects[1].1.y, cfg.header_height + cfg.row_height);
    }

    #[test]
    fn selected_event_gets_a_stroke() {
        let scale = SharedScale::new(1.0);
        let mut panel = panel_for(vec![event(0.0, 10.0, "a"), event(20.0, 10.0, "b")], &scale);
        panel.draw();
        let strokes = |p: &Panel| {
            p.canvas()
                .commands()
                .iter()
                .filter_map(|c| match c {
                    RenderCommand::StrokeRect { rect, color, .. } => Some((*rect, *color)),
                    _ => None,
                })
                .collect::<Vec<_>>()
        };
        assert!(strokes(&panel).is_empty());

        panel.set_selected_event(Some(EventId(1)));
        panel.draw();
        let s = strokes(&panel);
        assert_eq!(s.len(), 1);
        assert_eq!(s[0].0.x, 20.0);
        assert_eq!(s[0].1, ThemeToken::SelectionHighlight);
    }

    #[test]
    fn sub_pixel_events_are_skipped_unless_selected() {
        let scale = SharedScale::new(0.01);
        let mut panel = panel_for(vec![event(0.0, 10_000.0, "wide"), event(15_000.0, 10.0, "tiny")], &scale);
        panel.draw();
        assert_eq!(event_rects(&panel).len(), 1);

        panel.set_selected_event(Some(EventId(1)));
        panel.draw();
        let rects = event_rects(&panel);
        assert_eq!(rects.len(), 2);
        assert_eq!(rects[1].1.w, 1.0);
    }

    #[test]
    fn labels_only_on_wide_events() {
        let scale = SharedScale::new(1.0);
        let mut panel = panel_for(vec![event(0.0, 100.0, "wide"), event(150.0, 5.0, "narrow")], &scale);
        panel.draw();
        let labels: Vec<_> = panel
            .canvas()
            .commands()
            .iter()
            .filter_map(|c| match c {
                RenderCommand::DrawRect {
                    event_id: Some(_),
                    label,
                    ..
                } => Some(label.as_deref().map(str::to_string)),
                _ => None,
            })
            .collect();
        assert_eq!(labels, vec![Some("wide".to_string()), None]);
    }

    #[test]
    fn zero_sized_canvas_draws_nothing() {
        let scale = SharedScale::new(1.0);
        let mut panel = panel_for(vec![event(0.0, 10.0, "a")], &scale);
        panel.container_mut().set_client_size(0.0, 0.0);
        panel.resize();
        panel.draw();
        assert!(panel.canvas().commands().is_empty());
        assert_eq!(panel.frames_drawn(), 1);
    }

    #[test]
    fn hit_testing_inverts_the_transform() {
        let scale = SharedScale::new(2.0);
        let mut panel = panel_for(vec![event(0.0, 100.0, "outer"), event(10.0, 20.0, "inner")], &scale);
        panel.container_mut().set_client_size(100.0, 100.0);
        panel.resize();
        let cfg = ViewerConfig::default();
        let row0 = cfg.header_height + 1.0;
        let row1 = cfg.header_height + cfg.row_height + 1.0;

        assert_eq!(panel.get_hovered_event(5.0, row0), Some(EventId(0)));
        assert_eq!(panel.get_hovered_event(30.0, row1), Some(EventId(1)));
        assert_eq!(panel.get_hovered_event(5.0, row1), None);
        assert_eq!(panel.get_hovered_event(5.0, 1.0), None, "header is not a hit");

        panel.set_scroll_x(40.0);
        // canvas x 0 → pixel 40 → t=20.
        assert_eq!(panel.get_hovered_event(0.0, row1), Some(EventId(1)));
        assert_eq!(panel.get_hovered_event(-1.0, row1), None);
    }

    #[test]
    fn hovered_event_gets_an_overlay() {
        let scale = SharedScale::new(1.0);
        let mut panel = panel_for(vec![event(0.0, 10.0, "a")], &scale);
        panel.set_hovered_event(Some(EventId(0)));
        panel.draw();
        assert!(panel.canvas().commands().iter().any(|c| matches!(
            c,
            RenderCommand::DrawRect {
                color: ThemeToken::HoverHighlight,
                ..
            }
        )));
    }

    #[test]
    fn a_full_frame_uses_every_panel_token() {
        let scale = SharedScale::new(1.0);
        let mut panel = panel_for(vec![event(0.0, 150.0, "outer"), event(10.0, 40.0, "inner")], &scale);
        panel.set_selected_event(Some(EventId(1)));
        panel.set_hovered_event(Some(EventId(0)));
        // Wide enough for ruler labels past the track name.
        panel.container_mut().set_client_size(600.0, 100.0);
        panel.resize();
        panel.draw();

        let used: std::collections::HashSet<ThemeToken> = panel
            .canvas()
            .commands()
            .iter()
            .filter_map(|c| match c {
                RenderCommand::DrawRect { color, .. }
                | RenderCommand::StrokeRect { color, .. }
                | RenderCommand::DrawText { color, .. }
                | RenderCommand::DrawLine { color, .. } => Some(*color),
                RenderCommand::SetClip { .. } | RenderCommand::ClearClip => None,
            })
            .collect();
        for token in [
            ThemeToken::PanelBackground,
            ThemeToken::PanelHeaderBackground,
            ThemeToken::PanelHeaderText,
            ThemeToken::PanelBorder,
            ThemeToken::RulerText,
            ThemeToken::Gridline,
            ThemeToken::SelectionHighlight,
            ThemeToken::HoverHighlight,
        ] {
            assert!(used.contains(&token), "{token:?} never drawn");
        }
    }

    #[test]
    fn color_is_stable_per_name() {
        assert_eq!(color_for_name("compile"), color_for_name("compile"));
        assert!(ThemeToken::SPAN_PALETTE.contains(&color_for_name("")));
    }
}
