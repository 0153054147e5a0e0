pub mod panel;
pub mod ruler;
pub mod transform;

pub use panel::{Canvas, Container, Panel};
pub use transform::{ScaleReader, SharedScale};
