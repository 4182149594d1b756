use std::path::PathBuf;
use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use crate::app::tools::{draw_overlay, OverlayData};
use crate::app::Scene;

use super::frame::FrameTarget;
use super::texture::TextureCache;

const CLEAR_COLOR: [u8; 4] = [12, 14, 20, 255];

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    width: u32,
    height: u32,
    textures: TextureCache,
}

impl Renderer {
    pub fn new(window: Arc<Window>, asset_root: PathBuf) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            width: size.width,
            height: size.height,
            textures: TextureCache::new(asset_root),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.width = width;
        self.height = height;
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    /// Draws one frame of `scene`, then the overlay on top, and presents it.
    pub(crate) fn render(
        &mut self,
        scene: &mut dyn Scene,
        overlay: Option<&OverlayData>,
    ) -> Result<(), Error> {
        self.textures.begin_frame();
        {
            let mut target = FrameTarget::new(
                self.pixels.frame_mut(),
                self.width,
                self.height,
                &mut self.textures,
            );
            target.clear(CLEAR_COLOR);
            scene.render(&mut target);
            if let Some(overlay) = overlay {
                draw_overlay(&mut target, overlay);
            }
        }
        self.textures.end_frame();
        self.pixels.render()
    }
}
