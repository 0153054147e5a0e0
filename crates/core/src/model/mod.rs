pub mod layout;
pub mod profile;

pub use layout::{LaidOutEvent, LayoutModel, PanelLayout, TrackKey, build_layout};
pub use profile::{EventId, Phase, Profile, ProfileError, TraceEvent};
