use serde::{Deserialize, Serialize};

/// Semantic color tokens resolved by the host's active theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThemeToken {
    // Span palette, picked by a hash of the event name.
    SpanRed,
    SpanPeach,
    SpanYellow,
    SpanGreen,
    SpanBlue,
    SpanMauve,

    PanelBackground,
    PanelHeaderBackground,
    PanelHeaderText,
    PanelBorder,

    RulerText,
    Gridline,

    /// Label text on span fills; hosts pick it when replaying labels.
    TextPrimary,

    SelectionHighlight,
    HoverHighlight,
}

impl ThemeToken {
    pub const SPAN_PALETTE: [ThemeToken; 6] = [
        ThemeToken::SpanRed,
        ThemeToken::SpanPeach,
        ThemeToken::SpanYellow,
        ThemeToken::SpanGreen,
        ThemeToken::SpanBlue,
        ThemeToken::SpanMauve,
    ];
}
