use egui::{Align2, CornerRadius, FontId, Pos2, Rect, Stroke, StrokeKind};
use trace_view_protocol::{RenderCommand, TextAlign, ThemeToken};

use crate::theme::{self, ThemeMode};

fn to_egui(rect: &trace_view_protocol::Rect, offset: Pos2) -> Rect {
    Rect::from_min_size(
        Pos2::new(rect.x as f32 + offset.x, rect.y as f32 + offset.y),
        egui::vec2(rect.w as f32, rect.h as f32),
    )
}

/// Replay a panel display list into an egui `Painter`.
///
/// `offset` is the screen position of the panel's top-left corner. Clip
/// commands narrow the painter's clip rect and restore it afterwards.
pub fn render_commands(
    painter: &mut egui::Painter,
    commands: &[RenderCommand],
    offset: Pos2,
    mode: ThemeMode,
) {
    let base_clip = painter.clip_rect();

    for cmd in commands {
        match cmd {
            RenderCommand::DrawRect {
                rect, color, label, ..
            } => {
                let r = to_egui(rect, offset);
                if !painter.clip_rect().intersects(r) {
                    continue;
                }
                painter.rect_filled(r, CornerRadius::ZERO, theme::resolve(*color, mode));

                let Some(text) = label else {
                    continue;
                };
                if r.width() <= 6.0 || r.height() <= 8.0 {
                    continue;
                }
                let font_size = (r.height() - 6.0).clamp(6.0, 11.0);
                let text_color = theme::resolve(ThemeToken::TextPrimary, mode);
                let inner = r.shrink2(egui::vec2(3.0, 0.0));
                let galley = painter.layout_no_wrap(
                    text.to_string(),
                    FontId::proportional(font_size),
                    text_color,
                );
                if galley.size().x <= inner.width() {
                    let pos = Pos2::new(inner.left(), inner.center().y - galley.size().y / 2.0);
                    painter.with_clip_rect(r.intersect(painter.clip_rect()))
                        .galley(pos, galley, text_color);
                }
            }

            RenderCommand::StrokeRect { rect, color, width } => {
                painter.rect_stroke(
                    to_egui(rect, offset),
                    CornerRadius::ZERO,
                    Stroke::new(*width as f32, theme::resolve(*color, mode)),
                    StrokeKind::Inside,
                );
            }

            RenderCommand::DrawText {
                position,
                text,
                color,
                font_size,
                align,
            } => {
                let anchor = match align {
                    TextAlign::Left => Align2::LEFT_CENTER,
                    TextAlign::Center => Align2::CENTER_CENTER,
                    TextAlign::Right => Align2::RIGHT_CENTER,
                };
                painter.text(
                    Pos2::new(position.x as f32 + offset.x, position.y as f32 + offset.y),
                    anchor,
                    text.as_ref(),
                    FontId::proportional(*font_size as f32),
                    theme::resolve(*color, mode),
                );
            }

            RenderCommand::DrawLine {
                from,
                to,
                color,
                width,
            } => {
                let p1 = Pos2::new(from.x as f32 + offset.x, from.y as f32 + offset.y);
                let p2 = Pos2::new(to.x as f32 + offset.x, to.y as f32 + offset.y);
                painter.line_segment(
                    [p1, p2],
                    Stroke::new(*width as f32, theme::resolve(*color, mode)),
                );
            }

            RenderCommand::SetClip { rect } => {
                painter.set_clip_rect(base_clip.intersect(to_egui(rect, offset)));
            }

            RenderCommand::ClearClip => painter.set_clip_rect(base_clip),
        }
    }

    painter.set_clip_rect(base_clip);
}
