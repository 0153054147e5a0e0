use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use eframe::egui;
use log::{info, warn};
use trace_view_core::ViewerConfig;
use trace_view_core::model::Profile;
use trace_view_core::viewer::{Key, KeyDisposition, KeyPress, Modifiers, QueryParams, TraceViewer};
use trace_view_core::views::ruler::format_duration;
use trace_view_protocol::ThemeToken;

use crate::renderer;
use crate::theme::{self, ThemeMode};

/// Tallest a panel gets before its rows scroll inside it.
const MAX_PANEL_HEIGHT: f32 = 260.0;
const PANEL_GAP: f32 = 2.0;

fn query_params() -> Box<dyn QueryParams> {
    #[cfg(target_arch = "wasm32")]
    {
        Box::new(crate::web::WebQueryParams)
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        Box::new(trace_view_core::viewer::MemoryQueryParams::default())
    }
}

fn open_viewer(data: &[u8], pixels_per_point: f32) -> Result<TraceViewer> {
    let profile = Profile::from_json(data).context("failed to parse profile")?;
    info!("loaded {} trace records", profile.len());
    let config = ViewerConfig {
        device_pixel_ratio: f64::from(pixels_per_point),
        ..ViewerConfig::default()
    };
    Ok(TraceViewer::new(profile, config, query_params()))
}

/// Main application state.
pub struct TraceViewApp {
    viewer: Option<TraceViewer>,
    theme_mode: ThemeMode,
    filter_input: String,
    /// Vertical offset of the panel stack.
    stack_scroll: f32,
    error: Option<String>,
    /// Profile bytes delivered by an async fetch.
    pending_data: Arc<Mutex<Option<Vec<u8>>>>,
}

impl TraceViewApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let theme_mode = ThemeMode::Dark;
        cc.egui_ctx.set_visuals(theme_mode.visuals());
        theme::apply_typography(&cc.egui_ctx);

        let pending_data = Arc::new(Mutex::new(None));

        // On WASM, `#demo` in the URL loads the bundled sample trace.
        #[cfg(target_arch = "wasm32")]
        if let Some(window) = web_sys::window() {
            if window.location().hash().unwrap_or_default() == "#demo" {
                let pending = Arc::clone(&pending_data);
                let ctx = cc.egui_ctx.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    match crate::web::fetch_bytes("assets/demo.json").await {
                        Ok(bytes) => {
                            if let Ok(mut slot) = pending.lock() {
                                *slot = Some(bytes);
                            }
                            ctx.request_repaint();
                        }
                        Err(e) => warn!("demo fetch failed: {e:#}"),
                    }
                });
            }
        }

        Self {
            viewer: None,
            theme_mode,
            filter_input: String::new(),
            stack_scroll: 0.0,
            error: None,
            pending_data,
        }
    }

    fn load_profile(&mut self, data: &[u8], pixels_per_point: f32) {
        match open_viewer(data, pixels_per_point) {
            Ok(viewer) => {
                // The previous viewer unmounts on drop.
                self.viewer = Some(viewer);
                self.filter_input.clear();
                self.stack_scroll = 0.0;
                self.error = None;
            }
            Err(e) => self.report(&e),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn load_file(&mut self, path: &std::path::Path, pixels_per_point: f32) {
        match std::fs::read(path).with_context(|| format!("reading {}", path.display())) {
            Ok(data) => self.load_profile(&data, pixels_per_point),
            Err(e) => self.report(&e),
        }
    }

    fn report(&mut self, error: &anyhow::Error) {
        warn!("{error:#}");
        self.error = Some(format!("{error:#}"));
    }

    /// Route Enter / Shift+Enter to the viewer before widgets see them.
    fn handle_navigation_keys(&mut self, ctx: &egui::Context, filter_id: egui::Id) {
        let Some(viewer) = self.viewer.as_mut() else {
            return;
        };
        let (enter, modifiers) = ctx.input(|i| (i.key_pressed(egui::Key::Enter), i.modifiers));
        if !enter {
            return;
        }
        let mut press = KeyPress::new(Key::Enter);
        press.modifiers = Modifiers {
            shift: modifiers.shift,
            ctrl: modifiers.ctrl,
            alt: modifiers.alt,
            meta: modifiers.mac_cmd,
        };
        if ctx.memory(|m| m.has_focus(filter_id)) {
            press = press.in_filter_input();
        }
        if viewer.handle_key_down(&press) == KeyDisposition::PreventDefault {
            ctx.input_mut(|i| i.consume_key(modifiers, egui::Key::Enter));
        }
    }

    fn toolbar(&mut self, ctx: &egui::Context, ui: &mut egui::Ui, filter_id: egui::Id) {
        ui.horizontal(|ui| {
            ui.heading("trace-view");
            ui.separator();

            if ui.button("Open").clicked() {
                #[cfg(not(target_arch = "wasm32"))]
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter("Trace", &["json"])
                    .pick_file()
                {
                    self.load_file(&path, ctx.pixels_per_point());
                }
            }

            ui.separator();

            let enabled = self.viewer.is_some();
            let edit = egui::TextEdit::singleline(&mut self.filter_input)
                .id(filter_id)
                .hint_text("Filter spans")
                .desired_width(220.0);
            let response = ui.add_enabled(enabled, edit);
            if response.changed() {
                if let Some(viewer) = self.viewer.as_mut() {
                    viewer.update_filter(&self.filter_input);
                }
            }

            if let Some(viewer) = self.viewer.as_mut() {
                let (current, total) = viewer.match_status();
                if !viewer.filter_text().is_empty() {
                    ui.label(format!("{current} / {total}"));
                }
                let mut step = |shift: bool| {
                    let press = KeyPress::new(Key::Enter);
                    viewer.handle_key_down(&if shift { press.with_shift() } else { press });
                };
                if ui.add_enabled(total > 0, egui::Button::new("▲")).clicked() {
                    step(true);
                }
                if ui.add_enabled(total > 0, egui::Button::new("▼")).clicked() {
                    step(false);
                }
                ui.separator();
                if ui.button("Fit").clicked() {
                    viewer.fit_to_width();
                }
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let label = match self.theme_mode {
                    ThemeMode::Dark => "Light",
                    ThemeMode::Light => "Dark",
                };
                if ui.button(label).clicked() {
                    self.theme_mode = self.theme_mode.toggled();
                    ctx.set_visuals(self.theme_mode.visuals());
                }
            });
        });
    }

    fn status_bar(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if let Some(err) = &self.error {
                ui.colored_label(ui.visuals().error_fg_color, err);
            } else if let Some(viewer) = &self.viewer {
                let layout = viewer.layout();
                ui.label(format!(
                    "{} events | {} tracks | {} total | Enter / Shift+Enter step through matches",
                    layout.event_count(),
                    layout.panels.len(),
                    format_duration(layout.x_max),
                ));
            } else {
                ui.label("No trace loaded: click Open or drop a Chrome trace JSON file");
            }
        });
    }

    fn timeline(&mut self, ui: &mut egui::Ui) {
        let Some(viewer) = self.viewer.as_mut() else {
            ui.centered_and_justified(|ui| {
                ui.heading("Drop a trace here or click Open");
            });
            return;
        };

        let available = ui.available_rect_before_wrap();
        let mut rects = Vec::with_capacity(viewer.panels().len());
        let mut top = available.top() - self.stack_scroll;
        for i in 0..viewer.panels().len() {
            let Some(panel) = viewer.panel_mut(i) else {
                continue;
            };
            let height = (panel.content_height() as f32).min(MAX_PANEL_HEIGHT);
            panel
                .container_mut()
                .set_client_size(f64::from(available.width()), f64::from(height));
            rects.push(egui::Rect::from_min_size(
                egui::pos2(available.left(), top),
                egui::vec2(available.width(), height),
            ));
            top += height + PANEL_GAP;
        }
        let stack_height = top + self.stack_scroll - available.top();

        if !viewer.is_mounted() {
            viewer.mount();
            self.filter_input = viewer.filter_text().to_string();
        }

        let (scroll, zoom, pointer) = ui.input(|i| {
            (i.smooth_scroll_delta, i.zoom_delta(), i.pointer.hover_pos())
        });
        for (index, rect) in rects.iter().enumerate() {
            let visible = rect.intersect(available);
            if visible.height() <= 0.0 {
                continue;
            }
            let response = ui.allocate_rect(visible, egui::Sense::click_and_drag());
            let local = |pos: egui::Pos2| (f64::from(pos.x - rect.left()), f64::from(pos.y - rect.top()));

            if response.dragged() {
                let delta = response.drag_delta();
                let panel = &viewer.panels()[index];
                let (left, top) = (
                    panel.scroll_x() - f64::from(delta.x),
                    panel.scroll_y() - f64::from(delta.y),
                );
                viewer.handle_native_scroll(index, left, top);
            }

            if !response.hovered() {
                continue;
            }
            let Some(pos) = pointer else {
                continue;
            };
            let (x, y) = local(pos);

            if (zoom - 1.0).abs() > 0.001 {
                viewer.zoom_at(index, x, f64::from(zoom));
            } else if scroll != egui::Vec2::ZERO {
                let panel = &viewer.panels()[index];
                let overflows = panel.container().max_scroll_top() > 0.0;
                let left = panel.scroll_x() - f64::from(scroll.x);
                let top = if overflows {
                    panel.scroll_y() - f64::from(scroll.y)
                } else {
                    self.stack_scroll = (self.stack_scroll - scroll.y)
                        .clamp(0.0, (stack_height - available.height()).max(0.0));
                    panel.scroll_y()
                };
                viewer.handle_native_scroll(index, left, top);
            }

            if response.clicked() {
                viewer.handle_click(index, x, y);
            }

            let hovered = viewer.handle_pointer_move(index, x, y);
            if let Some(details) = hovered.and_then(|id| viewer.event_details(id)) {
                response.on_hover_ui_at_pointer(|ui| {
                    ui.strong(&details.name);
                    ui.label(format!(
                        "start {} | duration {}",
                        format_duration(details.start),
                        format_duration(details.duration)
                    ));
                    if let Some(category) = &details.category {
                        ui.label(format!("category: {category}"));
                    }
                    if let Some(args) = details.args.as_ref().filter(|a| !a.is_null()) {
                        ui.monospace(args.to_string());
                    }
                });
            }
        }
        if pointer.is_none_or(|p| !available.contains(p)) {
            viewer.handle_pointer_leave();
        }

        viewer.tick();

        let mut painter = ui.painter_at(available);
        painter.rect_filled(
            available,
            egui::CornerRadius::ZERO,
            theme::resolve(ThemeToken::PanelBorder, self.theme_mode),
        );
        for (panel, rect) in viewer.panels().iter().zip(&rects) {
            if !rect.intersects(available) {
                continue;
            }
            painter.set_clip_rect(rect.intersect(available));
            renderer::render_commands(
                &mut painter,
                panel.canvas().commands(),
                rect.min,
                self.theme_mode,
            );
        }
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context, filter_id: egui::Id) {
        if ctx.memory(|m| m.has_focus(filter_id)) {
            return;
        }
        let Some(viewer) = self.viewer.as_mut() else {
            return;
        };
        let Some(first) = viewer.panels().first() else {
            return;
        };
        let width = first.container().client_width();
        let (left, top) = (first.scroll_x(), first.scroll_y());
        let step = viewer.config().zoom_step;
        ctx.input(|i| {
            if i.key_pressed(egui::Key::ArrowLeft) {
                viewer.handle_native_scroll(0, left - width * 0.1, top);
            }
            if i.key_pressed(egui::Key::ArrowRight) {
                viewer.handle_native_scroll(0, left + width * 0.1, top);
            }
            if i.key_pressed(egui::Key::Plus) || i.key_pressed(egui::Key::Equals) {
                viewer.zoom_at(0, width / 2.0, step);
            }
            if i.key_pressed(egui::Key::Minus) {
                viewer.zoom_at(0, width / 2.0, 1.0 / step);
            }
            if i.key_pressed(egui::Key::Num0) {
                viewer.fit_to_width();
            }
        });
    }
}

impl eframe::App for TraceViewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let pending = self
            .pending_data
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(data) = pending {
            self.load_profile(&data, ctx.pixels_per_point());
        }

        let dropped = ctx.input(|i| i.raw.dropped_files.first().and_then(|f| f.bytes.clone()));
        if let Some(bytes) = dropped {
            self.load_profile(&bytes, ctx.pixels_per_point());
        }

        let filter_id = egui::Id::new("timing_filter");
        self.handle_navigation_keys(ctx, filter_id);
        self.handle_shortcuts(ctx, filter_id);

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| self.toolbar(ctx, ui, filter_id));
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| self.status_bar(ui));
        egui::CentralPanel::default().show(ctx, |ui| self.timeline(ui));

        // The viewer's frame loop runs for as long as it is mounted.
        if self
            .viewer
            .as_ref()
            .is_some_and(|v| v.liveness().is_live())
        {
            ctx.request_repaint();
        }
    }
}
