mod overlay;

pub(crate) use overlay::{draw_overlay, OverlayData};
