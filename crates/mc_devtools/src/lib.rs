pub mod overlay;

pub use overlay::{ButtonStates, DebugStats, Overlay, PaintShape, PanelActions, PanelModel, ScenePaint};
