use egui::{Color32, CornerRadius, Stroke};
use trace_view_protocol::ThemeToken;

/// Resolved RGBA color for egui rendering.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl ResolvedColor {
    const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_color32(self) -> Color32 {
        Color32::from_rgba_unmultiplied(self.r, self.g, self.b, self.a)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeMode {
    Dark,
    Light,
}

pub fn resolve(token: ThemeToken, mode: ThemeMode) -> Color32 {
    match mode {
        ThemeMode::Dark => resolve_dark(token),
        ThemeMode::Light => resolve_light(token),
    }
    .to_color32()
}

fn resolve_dark(token: ThemeToken) -> ResolvedColor {
    // Catppuccin Mocha palette
    use ThemeToken::*;
    match token {
        SpanRed => ResolvedColor::rgb(0xf3, 0x8b, 0xa8),
        SpanPeach => ResolvedColor::rgb(0xfa, 0xb3, 0x87),
        SpanYellow => ResolvedColor::rgb(0xf9, 0xe2, 0xaf),
        SpanGreen => ResolvedColor::rgb(0xa6, 0xe3, 0xa1),
        SpanBlue => ResolvedColor::rgb(0x89, 0xb4, 0xfa),
        SpanMauve => ResolvedColor::rgb(0xcb, 0xa6, 0xf7),

        PanelBackground => ResolvedColor::rgb(0x1e, 0x1e, 0x2e), // Base
        PanelHeaderBackground => ResolvedColor::rgb(0x18, 0x18, 0x25), // Mantle
        PanelHeaderText => ResolvedColor::rgb(0xcd, 0xd6, 0xf4), // Text
        PanelBorder => ResolvedColor::rgb(0x31, 0x32, 0x44),     // Surface0
        RulerText => ResolvedColor::rgb(0xa6, 0xad, 0xc8),       // Subtext0
        Gridline => ResolvedColor::rgba(0x6c, 0x70, 0x86, 60),   // Overlay0

        TextPrimary => ResolvedColor::rgb(0x11, 0x11, 0x1b), // Crust, on span fills

        SelectionHighlight => ResolvedColor::rgb(0xf5, 0xe0, 0xdc), // Rosewater
        HoverHighlight => ResolvedColor::rgba(0xcd, 0xd6, 0xf4, 50),
    }
}

fn resolve_light(token: ThemeToken) -> ResolvedColor {
    // Catppuccin Latte palette
    use ThemeToken::*;
    match token {
        SpanRed => ResolvedColor::rgb(0xd2, 0x0f, 0x39),
        SpanPeach => ResolvedColor::rgb(0xfe, 0x64, 0x0b),
        SpanYellow => ResolvedColor::rgb(0xdf, 0x8e, 0x1d),
        SpanGreen => ResolvedColor::rgb(0x40, 0xa0, 0x2b),
        SpanBlue => ResolvedColor::rgb(0x1e, 0x66, 0xf5),
        SpanMauve => ResolvedColor::rgb(0x88, 0x39, 0xef),

        PanelBackground => ResolvedColor::rgb(250, 250, 252),
        PanelHeaderBackground => ResolvedColor::rgb(240, 240, 245),
        PanelHeaderText => ResolvedColor::rgb(40, 40, 50),
        PanelBorder => ResolvedColor::rgb(210, 210, 220),
        RulerText => ResolvedColor::rgb(100, 100, 110),
        Gridline => ResolvedColor::rgba(0, 0, 0, 25),

        TextPrimary => ResolvedColor::rgb(255, 255, 255),

        SelectionHighlight => ResolvedColor::rgb(20, 20, 30),
        HoverHighlight => ResolvedColor::rgba(255, 255, 255, 70),
    }
}

pub const FONT_TITLE: f32 = 16.0;
pub const FONT_BODY: f32 = 12.0;
pub const FONT_CAPTION: f32 = 11.0;

/// Widget colors for one theme mode.
struct Chrome {
    panel: Color32,
    window: Color32,
    extreme: Color32,
    idle: Color32,
    hovered: Color32,
    accent: Color32,
    text: Color32,
    border: Color32,
}

impl ThemeMode {
    fn chrome(self) -> Chrome {
        match self {
            // Catppuccin Mocha
            Self::Dark => Chrome {
                panel: Color32::from_rgb(0x18, 0x18, 0x25),
                window: Color32::from_rgb(0x1e, 0x1e, 0x2e),
                extreme: Color32::from_rgb(0x11, 0x11, 0x1b),
                idle: Color32::from_rgb(0x45, 0x47, 0x5a),
                hovered: Color32::from_rgb(0x58, 0x5b, 0x70),
                accent: Color32::from_rgb(0x89, 0xb4, 0xfa),
                text: Color32::from_rgb(0xcd, 0xd6, 0xf4),
                border: Color32::from_rgb(0x31, 0x32, 0x44),
            },
            Self::Light => Chrome {
                panel: Color32::from_rgb(250, 250, 252),
                window: Color32::WHITE,
                extreme: Color32::WHITE,
                idle: Color32::from_rgb(230, 230, 235),
                hovered: Color32::from_rgb(220, 220, 228),
                accent: Color32::from_rgb(50, 110, 220),
                text: Color32::from_rgb(40, 40, 50),
                border: Color32::from_rgb(210, 210, 220),
            },
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    /// egui widget visuals matching the panel palette.
    pub fn visuals(self) -> egui::Visuals {
        let c = self.chrome();
        let mut v = match self {
            Self::Dark => egui::Visuals::dark(),
            Self::Light => egui::Visuals::light(),
        };
        v.panel_fill = c.panel;
        v.window_fill = c.window;
        v.extreme_bg_color = c.extreme;
        v.faint_bg_color = c.window;
        v.widgets.noninteractive.bg_stroke = Stroke::new(1.0, c.border);
        v.widgets.noninteractive.fg_stroke = Stroke::new(1.0, c.text);
        v.widgets.inactive.bg_fill = c.idle;
        v.widgets.hovered.bg_fill = c.hovered;
        v.widgets.active.bg_fill = c.accent;
        v.selection.bg_fill = c.accent.gamma_multiply(0.3);
        v.selection.stroke = Stroke::new(1.0, c.accent);
        v.hyperlink_color = c.accent;
        for w in [
            &mut v.widgets.noninteractive,
            &mut v.widgets.inactive,
            &mut v.widgets.hovered,
            &mut v.widgets.active,
            &mut v.widgets.open,
        ] {
            w.corner_radius = CornerRadius::same(4);
        }
        v
    }
}

pub fn apply_typography(ctx: &egui::Context) {
    use egui::{FontId, TextStyle};

    ctx.style_mut(|style| {
        style.text_styles.insert(TextStyle::Heading, FontId::proportional(FONT_TITLE));
        style.text_styles.insert(TextStyle::Body, FontId::proportional(FONT_BODY));
        style.text_styles.insert(TextStyle::Button, FontId::proportional(FONT_BODY));
        style.text_styles.insert(TextStyle::Small, FontId::proportional(FONT_CAPTION));
        style.text_styles.insert(TextStyle::Monospace, FontId::monospace(FONT_CAPTION));
        style.spacing.item_spacing = egui::vec2(8.0, 6.0);
        style.spacing.button_padding = egui::vec2(8.0, 4.0);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_palette_differs_between_modes() {
        for token in ThemeToken::SPAN_PALETTE {
            assert_ne!(resolve(token, ThemeMode::Dark), resolve(token, ThemeMode::Light));
        }
    }

    #[test]
    fn toggling_twice_is_identity() {
        assert_eq!(ThemeMode::Dark.toggled().toggled(), ThemeMode::Dark);
    }
}
