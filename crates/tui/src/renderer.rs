use ratatui::buffer::Buffer;
use ratatui::layout::Rect as CellRect;
use ratatui::style::{Color, Modifier, Style};
use trace_view_protocol::{Point, Rect, RenderCommand, TextAlign, ThemeToken};

pub fn theme_to_color(token: ThemeToken) -> Color {
    match token {
        ThemeToken::SpanRed => Color::Rgb(243, 139, 168),
        ThemeToken::SpanPeach => Color::Rgb(250, 179, 135),
        ThemeToken::SpanYellow => Color::Rgb(249, 226, 175),
        ThemeToken::SpanGreen => Color::Rgb(166, 227, 161),
        ThemeToken::SpanBlue => Color::Rgb(137, 180, 250),
        ThemeToken::SpanMauve => Color::Rgb(203, 166, 247),
        ThemeToken::PanelBackground => Color::Black,
        ThemeToken::PanelHeaderBackground => Color::DarkGray,
        ThemeToken::PanelHeaderText => Color::White,
        ThemeToken::PanelBorder => Color::DarkGray,
        ThemeToken::RulerText => Color::Gray,
        ThemeToken::Gridline => Color::Rgb(50, 50, 60),
        ThemeToken::TextPrimary => Color::White,
        ThemeToken::SelectionHighlight => Color::Green,
        ThemeToken::HoverHighlight => Color::LightYellow,
    }
}

/// Cells covered by `rect`, whose coordinates are relative to `area`.
fn cell_rect(area: CellRect, rect: &Rect) -> CellRect {
    let clamp = |v: f64| v.clamp(0.0, f64::from(u16::MAX)) as u16;
    let left = clamp((f64::from(area.x) + rect.x).floor());
    let top = clamp((f64::from(area.y) + rect.y).floor());
    let right = clamp((f64::from(area.x) + rect.right()).ceil());
    let bottom = clamp((f64::from(area.y) + rect.bottom()).ceil());
    CellRect::new(left, top, right.saturating_sub(left), bottom.saturating_sub(top))
}

fn cell_point(area: CellRect, p: &Point) -> (i32, i32) {
    (
        i32::from(area.x) + p.x.floor() as i32,
        i32::from(area.y) + p.y.floor() as i32,
    )
}

fn in_clip(clip: CellRect, x: i32, y: i32) -> bool {
    x >= i32::from(clip.left())
        && x < i32::from(clip.right())
        && y >= i32::from(clip.top())
        && y < i32::from(clip.bottom())
}

/// Replay a panel display list into `area`. One canvas unit is one cell.
pub fn paint(buf: &mut Buffer, area: CellRect, commands: &[RenderCommand]) {
    let area = area.intersection(buf.area);
    let mut clip = area;

    for cmd in commands {
        match cmd {
            RenderCommand::SetClip { rect } => clip = cell_rect(area, rect).intersection(area),
            RenderCommand::ClearClip => clip = area,
            RenderCommand::DrawRect {
                rect, color, label, ..
            } => {
                let cells = cell_rect(area, rect).intersection(clip);
                if cells.is_empty() {
                    continue;
                }
                if *color == ThemeToken::HoverHighlight {
                    buf.set_style(cells, Style::default().add_modifier(Modifier::UNDERLINED));
                    continue;
                }
                buf.set_style(cells, Style::default().fg(Color::Black).bg(theme_to_color(*color)));
                for y in cells.top()..cells.bottom() {
                    for x in cells.left()..cells.right() {
                        buf[(x, y)].set_char(' ');
                    }
                }
                if let Some(label) = label
                    && cells.width > 2
                {
                    buf.set_stringn(
                        cells.x + 1,
                        cells.y,
                        label,
                        usize::from(cells.width - 2),
                        Style::default(),
                    );
                }
            }
            RenderCommand::StrokeRect { rect, color, .. } => {
                let cells = cell_rect(area, rect).intersection(clip);
                buf.set_style(
                    cells,
                    Style::default()
                        .bg(theme_to_color(*color))
                        .add_modifier(Modifier::BOLD),
                );
            }
            RenderCommand::DrawText {
                position,
                text,
                color,
                align,
                ..
            } => {
                let (x, y) = cell_point(area, position);
                let len = text.chars().count() as i32;
                let x = match align {
                    TextAlign::Left => x,
                    TextAlign::Center => x - len / 2,
                    TextAlign::Right => x - len,
                };
                let x = x.max(i32::from(clip.left()));
                if !in_clip(clip, x, y) {
                    continue;
                }
                let max = (i32::from(clip.right()) - x) as usize;
                buf.set_stringn(
                    x as u16,
                    y as u16,
                    text,
                    max,
                    Style::default().fg(theme_to_color(*color)),
                );
            }
            RenderCommand::DrawLine {
                from, to, color, ..
            } => {
                let style = Style::default().fg(theme_to_color(*color));
                let (x0, y0) = cell_point(area, from);
                if from.x == to.x {
                    let y1 = i32::from(area.y) + to.y.ceil() as i32;
                    for y in y0..y1.max(y0 + 1) {
                        if in_clip(clip, x0, y) {
                            buf[(x0 as u16, y as u16)].set_char('│').set_style(style);
                        }
                    }
                } else {
                    let x1 = i32::from(area.x) + to.x.ceil() as i32;
                    for x in x0.min(x1)..x0.max(x1) {
                        if in_clip(clip, x, y0) {
                            buf[(x as u16, y0 as u16)].set_char('─').set_style(style);
                        }
                    }
                }
            }
        }
    }
}
