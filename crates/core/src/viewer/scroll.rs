//! Scroll-to-selection math.

use log::trace;

use crate::views::Panel;

use super::filter::SpanRef;

/// Offset that centres `target` in a viewport of `viewport` pixels, clamped
/// to `[0, scrollable - viewport]`.
pub fn centered_offset(target: f64, viewport: f64, scrollable: f64) -> f64 {
    let max = (scrollable - viewport).max(0.0);
    (target - viewport / 2.0).clamp(0.0, max)
}

/// Offset that brings `[top, top + height)` into view, or `None` when it is
/// already fully visible at `current`.
pub fn reveal_offset(
    top: f64,
    height: f64,
    current: f64,
    viewport: f64,
    scrollable: f64,
) -> Option<f64> {
    if top >= current && top + height <= current + viewport {
        return None;
    }
    Some(centered_offset(top + height / 2.0, viewport, scrollable))
}

/// Bring `span` into view.
///
/// Every panel scrolls horizontally so the tracks stay time-aligned; only
/// the panel hosting the span scrolls vertically, and only when the span's
/// row is outside its visible rows.
pub fn scroll_to_span(panels: &mut [Panel], span: SpanRef, scale: f64) {
    let Some(host) = panels.get_mut(span.panel) else {
        return;
    };
    let Some(event) = host.layout().event(span.slot).cloned() else {
        return;
    };

    let container = host.container();
    let x = centered_offset(
        event.start * scale,
        container.client_width(),
        container.scroll_width(),
    );

    let row_height = host.row_height();
    let header = host.header_height();
    let y = reveal_offset(
        host.row_offset(&event),
        row_height,
        host.scroll_y(),
        host.rows_viewport_height(),
        container.scroll_height() - header,
    );
    if let Some(y) = y {
        host.set_scroll_y(y);
    }

    trace!("scroll to {:?} at x={x} y={y:?}", span.id);
    for panel in panels.iter_mut() {
        panel.set_scroll_x(x);
    }
}
