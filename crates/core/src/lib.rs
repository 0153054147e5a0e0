//! Core of the trace viewer: profile model, panel layout, the shared
//! time/pixel transform and the [`viewer::TraceViewer`] that ties panels,
//! filtering and scrolling together.
//!
//! Hosts feed input in and replay each panel's display list.

pub mod config;
pub mod model;
pub mod viewer;
pub mod views;

pub use config::{ConfigError, ViewerConfig};
pub use viewer::TraceViewer;
