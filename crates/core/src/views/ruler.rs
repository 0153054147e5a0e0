use std::sync::Arc;

use trace_view_protocol::{Point, RenderCommand, TextAlign, ThemeToken};

/// A tick of the time ruler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// Model time in microseconds.
    pub time: f64,
    /// Canvas x of the tick.
    pub x: f64,
    pub major: bool,
}

/// Ticks covering the model-time window `[view_start, view_end]` drawn
/// across `width` pixels.
pub fn ticks(view_start: f64, view_end: f64, width: f64, min_spacing: f64) -> (Vec<Tick>, f64) {
    let duration = view_end - view_start;
    if duration.is_nan() || width.is_nan() || duration <= 0.0 || width <= 0.0 {
        return (Vec::new(), 0.0);
    }

    let x_scale = width / duration;
    let (major, subdivisions) = nice_interval(duration, width, min_spacing);
    let minor = major / f64::from(subdivisions);

    let mut out = Vec::new();
    let first = (view_start / minor).floor() as i64;
    let last = (view_end / minor).ceil() as i64;
    for n in first..=last {
        let t = n as f64 * minor;
        let x = (t - view_start) * x_scale;
        if x < 0.0 || x > width {
            continue;
        }
        out.push(Tick {
            time: t,
            x,
            major: n.rem_euclid(i64::from(subdivisions)) == 0,
        });
    }
    (out, major)
}

/// Gridlines for every major tick, from `top` to `bottom`.
pub fn push_gridlines(out: &mut Vec<RenderCommand>, ticks: &[Tick], top: f64, bottom: f64) {
    for tick in ticks.iter().filter(|t| t.major) {
        out.push(RenderCommand::DrawLine {
            from: Point::new(tick.x, top),
            to: Point::new(tick.x, bottom),
            color: ThemeToken::Gridline,
            width: 0.5,
        });
    }
}

/// Tick marks along the bottom edge of the header and labels for major ticks.
pub fn push_header_ticks(
    out: &mut Vec<RenderCommand>,
    ticks: &[Tick],
    major_interval: f64,
    header_height: f64,
    font_size: f64,
) {
    for tick in ticks {
        let len = if tick.major {
            header_height * 0.4
        } else {
            header_height * 0.2
        };
        out.push(RenderCommand::DrawLine {
            from: Point::new(tick.x, header_height - len),
            to: Point::new(tick.x, header_height),
            color: ThemeToken::Gridline,
            width: if tick.major { 1.0 } else { 0.5 },
        });
        if tick.major {
            out.push(RenderCommand::DrawText {
                position: Point::new(tick.x + 3.0, header_height * 0.5),
                text: Arc::from(format_time_label(tick.time, major_interval)),
                color: ThemeToken::RulerText,
                font_size,
                align: TextAlign::Left,
            });
        }
    }
}

/// Choose a "nice" major tick interval (µs) so that major ticks are at least
/// `min_spacing` pixels apart. Returns (major_interval_us, subdivisions).
fn nice_interval(duration_us: f64, width_px: f64, min_spacing: f64) -> (f64, u32) {
    let target_count = (width_px / min_spacing.max(1.0)).max(1.0);
    let raw_interval = duration_us / target_count;

    const NICE: &[(f64, u32)] = &[
        (0.001, 2),
        (0.002, 2),
        (0.005, 5),
        (0.01, 2),
        (0.02, 2),
        (0.05, 5),
        (0.1, 2),
        (0.2, 2),
        (0.5, 5),
        (1.0, 2),
        (2.0, 2),
        (5.0, 5),
        (10.0, 2),
        (20.0, 2),
        (50.0, 5),
        (100.0, 2),
        (200.0, 2),
        (500.0, 5),
        (1_000.0, 2),
        (2_000.0, 2),
        (5_000.0, 5),
        (10_000.0, 2),
        (20_000.0, 2),
        (50_000.0, 5),
        (100_000.0, 2),
        (200_000.0, 2),
        (500_000.0, 5),
        (1_000_000.0, 2),
        (2_000_000.0, 2),
        (5_000_000.0, 5),
        (10_000_000.0, 2),
        (20_000_000.0, 2),
        (30_000_000.0, 3),
        (60_000_000.0, 2),
    ];

    for &(interval, subs) in NICE {
        if interval >= raw_interval {
            return (interval, subs);
        }
    }

    // Longer than a minute per tick: whole minutes, rounded up to a power of ten.
    let minutes = (raw_interval / 60_000_000.0).ceil();
    let magnitude = 10.0_f64.powi(minutes.log10().ceil() as i32);
    (magnitude * 60_000_000.0, 2)
}

/// Format a timestamp in microseconds for a ruler label. Precision follows
/// the tick interval so adjacent labels differ.
pub fn format_time_label(us: f64, interval: f64) -> String {
    let abs = us.abs().max(interval);
    if abs >= 60_000_000.0 {
        let mins = (us / 60_000_000.0).floor();
        let secs = (us - mins * 60_000_000.0) / 1_000_000.0;
        format!("{mins:.0}m{secs:.0}s")
    } else if abs >= 1_000_000.0 {
        format!("{:.*}s", decimals(interval / 1_000_000.0), us / 1_000_000.0)
    } else if abs >= 1_000.0 {
        format!("{:.*}ms", decimals(interval / 1_000.0), us / 1_000.0)
    } else if abs >= 1.0 {
        format!("{:.*}µs", decimals(interval), us)
    } else {
        format!("{:.0}ns", us * 1_000.0)
    }
}

/// Digits after the decimal point needed to show steps of `step` units.
fn decimals(step: f64) -> usize {
    if step >= 1.0 {
        0
    } else {
        (-step.log10()).ceil().clamp(0.0, 3.0) as usize
    }
}

/// Format a duration in µs for tooltips and status lines.
pub fn format_duration(us: f64) -> String {
    if us < 1_000.0 {
        format!("{us:.1}µs")
    } else if us < 1_000_000.0 {
        format!("{:.2}ms", us / 1_000.0)
    } else {
        format!("{:.2}s", us / 1_000_000.0)
    }
}
