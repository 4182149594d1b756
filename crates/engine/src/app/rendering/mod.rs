mod frame;
mod renderer;
mod texture;

pub use frame::FrameTarget;
pub use renderer::Renderer;
pub use texture::{Texture, TextureCache};
