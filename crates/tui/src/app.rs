use std::io::stdout;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Paragraph},
};
use trace_view_core::viewer::{Key, KeyDisposition, KeyPress, Modifiers, TraceViewer};
use trace_view_core::views::ruler::format_duration;

use crate::renderer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    Filter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

struct App {
    viewer: TraceViewer,
    mode: Mode,
    input: String,
    focus: usize,
    first_panel: usize,
    /// Screen area of every panel; empty for panels scrolled out of view.
    areas: Vec<Rect>,
}

pub fn run(viewer: TraceViewer) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(viewer);
    let size = terminal.size()?;
    // Panels need their size before the filter is restored on mount.
    app.layout(Rect::new(0, 0, size.width, size.height));
    app.viewer.mount();
    app.input = app.viewer.filter_text().to_string();

    let result = event_loop(&mut terminal, &mut app);
    app.viewer.unmount();

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    result
}

fn event_loop(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        let size = terminal.size()?;
        app.layout(Rect::new(0, 0, size.width, size.height));
        app.viewer.tick();
        terminal.draw(|frame| app.render(frame))?;

        if event::poll(Duration::from_millis(50))? && app.handle_event(event::read()?) == Flow::Quit {
            return Ok(());
        }
    }
}

fn key_press(key: &KeyEvent, in_filter: bool) -> KeyPress {
    let mut press = KeyPress::new(match key.code {
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Escape,
        KeyCode::Char(c) => Key::Char(c),
        _ => Key::Other,
    });
    press.modifiers = Modifiers {
        shift: key.modifiers.contains(KeyModifiers::SHIFT),
        ctrl: key.modifiers.contains(KeyModifiers::CONTROL),
        alt: key.modifiers.contains(KeyModifiers::ALT),
        meta: key.modifiers.contains(KeyModifiers::SUPER),
    };
    if in_filter {
        press = press.in_filter_input();
    }
    press
}

impl App {
    fn new(viewer: TraceViewer) -> Self {
        let panels = viewer.panels().len();
        Self {
            viewer,
            mode: Mode::Normal,
            input: String::new(),
            focus: 0,
            first_panel: 0,
            areas: vec![Rect::default(); panels],
        }
    }

    /// Stack panels between the title and status lines and report their
    /// sizes to the viewer.
    fn layout(&mut self, screen: Rect) {
        let count = self.viewer.panels().len();
        if count == 0 {
            return;
        }
        self.focus = self.focus.min(count - 1);
        if self.focus < self.first_panel {
            self.first_panel = self.focus;
        }
        loop {
            self.allocate(screen);
            if !self.areas[self.focus].is_empty() || self.first_panel >= self.focus {
                break;
            }
            self.first_panel += 1;
        }

        for (i, area) in self.areas.iter().enumerate() {
            if let Some(panel) = self.viewer.panel_mut(i) {
                // Hidden panels keep the width so horizontal sync still clamps correctly.
                panel
                    .container_mut()
                    .set_client_size(f64::from(screen.width), f64::from(area.height));
            }
        }
    }

    fn allocate(&mut self, screen: Rect) {
        let count = self.viewer.panels().len();
        let avail = screen.height.saturating_sub(2);
        let visible = (count - self.first_panel) as u16;
        let share = (avail / visible.max(1)).max(3);

        let mut y = 1;
        for (i, area) in self.areas.iter_mut().enumerate() {
            let remaining = (avail + 1).saturating_sub(y);
            if i < self.first_panel || remaining == 0 {
                *area = Rect::default();
                continue;
            }
            let wanted = self.viewer.panels()[i].content_height().ceil() as u16;
            let height = wanted.min(share).min(remaining);
            *area = Rect::new(screen.x, y, screen.width, height);
            y += height;
        }
    }

    fn render(&self, frame: &mut Frame) {
        let screen = frame.area();
        let layout = self.viewer.layout();

        let title = Block::default()
            .title(format!(
                " trace-view | {} events in {} tracks | scale {:.3} cells/µs ",
                layout.event_count(),
                layout.panels.len(),
                self.viewer.scale()
            ))
            .style(Style::default().fg(Color::White).bg(Color::DarkGray));
        frame.render_widget(title, Rect::new(0, 0, screen.width, 1));

        if layout.panels.is_empty() {
            frame.render_widget(
                Paragraph::new(" no spans in this profile"),
                Rect::new(0, 1, screen.width, screen.height.saturating_sub(2)),
            );
        }

        let buf = frame.buffer_mut();
        for (i, (panel, area)) in self.viewer.panels().iter().zip(&self.areas).enumerate() {
            if area.is_empty() {
                continue;
            }
            renderer::paint(buf, *area, panel.canvas().commands());
            if i == self.focus {
                buf[(area.x, area.y)]
                    .set_char('▸')
                    .set_style(Style::default().fg(Color::Green));
            }
        }

        let status = Paragraph::new(self.status_line())
            .style(Style::default().fg(Color::White).bg(Color::DarkGray));
        frame.render_widget(
            status,
            Rect::new(0, screen.height.saturating_sub(1), screen.width, 1),
        );
    }

    fn status_line(&self) -> String {
        let mut line = match self.mode {
            Mode::Filter => format!(" /{}█", self.input),
            Mode::Normal if self.viewer.filter_text().is_empty() => String::from(" "),
            Mode::Normal => {
                let (current, total) = self.viewer.match_status();
                format!(" filter {:?}: {current}/{total}", self.viewer.filter_text())
            }
        };

        if let Some(details) = self
            .viewer
            .hovered_event()
            .and_then(|(_, id)| self.viewer.event_details(id))
        {
            line.push_str(&format!(
                " | {} {}",
                details.name,
                format_duration(details.duration)
            ));
            if let Some(category) = details.category {
                line.push_str(&format!(" [{category}]"));
            }
        }

        line.push_str(" | / filter  n/N match  ←→ pan  ↑↓ rows  tab track  +/- zoom  0 fit  q quit");
        line
    }

    fn handle_event(&mut self, event: Event) -> Flow {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(&key),
            Event::Mouse(mouse) => {
                self.handle_mouse(&mouse);
                Flow::Continue
            }
            _ => Flow::Continue,
        }
    }

    fn handle_key(&mut self, key: &KeyEvent) -> Flow {
        let press = key_press(key, self.mode == Mode::Filter);
        if self.viewer.handle_key_down(&press) == KeyDisposition::PreventDefault {
            return Flow::Continue;
        }

        match self.mode {
            Mode::Filter => match key.code {
                KeyCode::Enter | KeyCode::Esc => self.mode = Mode::Normal,
                KeyCode::Backspace => {
                    self.input.pop();
                    self.viewer.update_filter(&self.input);
                }
                KeyCode::Char(c) => {
                    self.input.push(c);
                    self.viewer.update_filter(&self.input);
                }
                _ => {}
            },
            Mode::Normal => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Flow::Quit,
                KeyCode::Char('/') => {
                    self.mode = Mode::Filter;
                    self.input = self.viewer.filter_text().to_string();
                }
                // Terminals rarely report Shift+Enter, so n/N stand in for it.
                KeyCode::Char('n') => {
                    self.viewer.handle_key_down(&KeyPress::new(Key::Enter));
                }
                KeyCode::Char('N') => {
                    self.viewer
                        .handle_key_down(&KeyPress::new(Key::Enter).with_shift());
                }
                KeyCode::Left | KeyCode::Char('h') => self.pan(-0.1),
                KeyCode::Right | KeyCode::Char('l') => self.pan(0.1),
                KeyCode::Up | KeyCode::Char('k') => self.scroll_rows(self.focus, -1.0),
                KeyCode::Down | KeyCode::Char('j') => self.scroll_rows(self.focus, 1.0),
                KeyCode::Char('+') | KeyCode::Char('=') => self.zoom_centre(true),
                KeyCode::Char('-') => self.zoom_centre(false),
                KeyCode::Char('0') => self.viewer.fit_to_width(),
                KeyCode::Tab => self.cycle_focus(1),
                KeyCode::BackTab => self.cycle_focus(-1),
                _ => {}
            },
        }
        Flow::Continue
    }

    fn handle_mouse(&mut self, mouse: &MouseEvent) {
        let hit = self.areas.iter().enumerate().find(|(_, a)| {
            mouse.column >= a.left()
                && mouse.column < a.right()
                && mouse.row >= a.top()
                && mouse.row < a.bottom()
        });
        let Some((index, area)) = hit.map(|(i, a)| (i, *a)) else {
            self.viewer.handle_pointer_leave();
            return;
        };
        // Cell centres in panel coordinates.
        let x = f64::from(mouse.column - area.x) + 0.5;
        let y = f64::from(mouse.row - area.y) + 0.5;

        match mouse.kind {
            MouseEventKind::Moved => {
                self.viewer.handle_pointer_move(index, x, y);
            }
            MouseEventKind::Down(MouseButton::Left) => {
                self.focus = index;
                self.viewer.handle_click(index, x, y);
            }
            MouseEventKind::ScrollUp if mouse.modifiers.contains(KeyModifiers::CONTROL) => {
                let step = self.viewer.config().zoom_step;
                self.viewer.zoom_at(index, x, step);
            }
            MouseEventKind::ScrollDown if mouse.modifiers.contains(KeyModifiers::CONTROL) => {
                let step = self.viewer.config().zoom_step;
                self.viewer.zoom_at(index, x, 1.0 / step);
            }
            MouseEventKind::ScrollUp => self.scroll_rows(index, -1.0),
            MouseEventKind::ScrollDown => self.scroll_rows(index, 1.0),
            MouseEventKind::ScrollLeft => self.pan(-0.05),
            MouseEventKind::ScrollRight => self.pan(0.05),
            _ => {}
        }
    }

    /// Pan every track by a fraction of the visible width.
    fn pan(&mut self, fraction: f64) {
        let Some(panel) = self.viewer.panels().get(self.focus) else {
            return;
        };
        let delta = (panel.container().client_width() * fraction).round();
        let delta = if delta == 0.0 { fraction.signum() } else { delta };
        let (left, top) = (panel.scroll_x() + delta, panel.scroll_y());
        self.viewer.handle_native_scroll(self.focus, left, top);
    }

    fn scroll_rows(&mut self, index: usize, rows: f64) {
        let Some(panel) = self.viewer.panels().get(index) else {
            return;
        };
        let (left, top) = (panel.scroll_x(), panel.scroll_y() + rows * panel.row_height());
        self.viewer.handle_native_scroll(index, left, top);
    }

    fn zoom_centre(&mut self, zoom_in: bool) {
        let Some(panel) = self.viewer.panels().get(self.focus) else {
            return;
        };
        let centre = panel.container().client_width() / 2.0;
        let step = self.viewer.config().zoom_step;
        let factor = if zoom_in { step } else { 1.0 / step };
        self.viewer.zoom_at(self.focus, centre, factor);
    }

    fn cycle_focus(&mut self, delta: isize) {
        let count = self.viewer.panels().len();
        if count == 0 {
            return;
        }
        self.focus = (self.focus as isize + delta).rem_euclid(count as isize) as usize;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trace_view_core::ViewerConfig;
    use trace_view_core::model::{Phase, Profile, TraceEvent};
    use trace_view_core::viewer::MemoryQueryParams;

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

    fn app(events: Vec<TraceEvent>) -> App {
        let viewer = TraceViewer::new(
            Profile::new(events),
            ViewerConfig::terminal(),
            Box::new(MemoryQueryParams::default()),
        );
        let mut app = App::new(viewer);
        app.layout(Rect::new(0, 0, 80, 24));
        app.viewer.mount();
        app.viewer.tick();
        app
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn panels_stack_below_the_title() {
        let app = app(vec![span(1, 0.0, 10.0, "a"), span(2, 0.0, 10.0, "b")]);
        assert_eq!(app.areas[0], Rect::new(0, 1, 80, 2));
        assert_eq!(app.areas[1], Rect::new(0, 3, 80, 2));
        assert_eq!(app.viewer.panels()[0].container().client_width(), 80.0);
    }

    #[test]
    fn typing_filters_live_and_enter_leaves_the_input() {
        let mut app = app(vec![span(1, 0.0, 10.0, "compile"), span(1, 20.0, 10.0, "link")]);
        app.handle_key(&key(KeyCode::Char('/')));
        assert_eq!(app.mode, Mode::Filter);
        for c in "lin".chars() {
            app.handle_key(&key(KeyCode::Char(c)));
        }
        assert_eq!(app.viewer.filter_text(), "lin");
        assert_eq!(app.viewer.matched_spans().len(), 1);

        // Enter inside the input is not navigation; it closes the input.
        app.handle_key(&key(KeyCode::Enter));
        assert_eq!(app.mode, Mode::Normal);
        assert_eq!(app.viewer.selected_span_index(), Some(0));

        app.handle_key(&key(KeyCode::Char('/')));
        app.handle_key(&key(KeyCode::Backspace));
        app.handle_key(&key(KeyCode::Backspace));
        app.handle_key(&key(KeyCode::Backspace));
        assert_eq!(app.viewer.filter_text(), "");
    }

    #[test]
    fn n_steps_through_matches() {
        let mut app = app(vec![span(1, 0.0, 10.0, "job"), span(1, 20.0, 10.0, "job")]);
        app.viewer.update_filter("job");
        app.handle_key(&key(KeyCode::Char('n')));
        assert_eq!(app.viewer.selected_span_index(), Some(1));
        app.handle_key(&key(KeyCode::Char('N')));
        assert_eq!(app.viewer.selected_span_index(), Some(0));
        app.handle_key(&key(KeyCode::Enter));
        assert_eq!(app.viewer.selected_span_index(), Some(1));
    }

    #[test]
    fn q_quits_only_outside_the_input() {
        let mut app = app(vec![span(1, 0.0, 10.0, "a")]);
        app.handle_key(&key(KeyCode::Char('/')));
        assert_eq!(app.handle_key(&key(KeyCode::Char('q'))), Flow::Continue);
        app.handle_key(&key(KeyCode::Esc));
        assert_eq!(app.handle_key(&key(KeyCode::Char('q'))), Flow::Quit);
    }

    #[test]
    fn tab_cycles_focus() {
        let mut app = app(vec![span(1, 0.0, 10.0, "a"), span(2, 0.0, 10.0, "b")]);
        app.handle_key(&key(KeyCode::Tab));
        assert_eq!(app.focus, 1);
        app.handle_key(&key(KeyCode::Tab));
        assert_eq!(app.focus, 0);
        app.handle_key(&key(KeyCode::BackTab));
        assert_eq!(app.focus, 1);
    }
}
