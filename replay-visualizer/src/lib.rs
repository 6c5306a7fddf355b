//! Panel renderers and frame composition for generation replays.

pub mod colors;
pub mod compositor;
pub mod environment;
pub mod fitness;
pub mod fonts;
pub mod network;
mod plot;
pub mod present;
pub mod scatter;
pub mod stats;

pub use compositor::{FrameCompositor, Layout, PanelInputs, PanelRect};
pub use fonts::Fonts;
pub use present::{Mp4Presenter, NullPresenter, PngSequencePresenter, Presenter};
