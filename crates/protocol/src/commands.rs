use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::theme::ThemeToken;
use crate::types::{Point, Rect};

/// A single, stateless render instruction.
///
/// Each panel rebuilds a `Vec<RenderCommand>` on every draw. Hosts replay
/// the list in order onto their native surface (egui painter, terminal
/// buffer, ...); every command carries all the data it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RenderCommand {
    /// Fill a rectangle, optionally with a text label and the id of the
    /// trace event it represents (for hit-testing by hosts).
    DrawRect {
        rect: Rect,
        color: ThemeToken,
        label: Option<Arc<str>>,
        event_id: Option<u64>,
    },

    /// Outline a rectangle. Used for the selected-event highlight.
    StrokeRect {
        rect: Rect,
        color: ThemeToken,
        width: f64,
    },

    /// Draw a text string at a position.
    DrawText {
        position: Point,
        text: Arc<str>,
        color: ThemeToken,
        font_size: f64,
        align: TextAlign,
    },

    /// Draw a line segment.
    DrawLine {
        from: Point,
        to: Point,
        color: ThemeToken,
        width: f64,
    },

    /// Restrict subsequent drawing to a rectangular region.
    SetClip { rect: Rect },

    /// Remove the active clip region.
    ClearClip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}
