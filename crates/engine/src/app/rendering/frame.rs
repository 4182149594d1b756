use crate::world::{DrawTarget, PixelRect, RenderState};

use super::texture::TextureCache;

const MISSING_TEXTURE_RGBA: [u8; 4] = [255, 0, 255, 255];

/// Software draw target over an RGBA8 frame buffer.
pub struct FrameTarget<'a> {
    frame: &'a mut [u8],
    width: u32,
    height: u32,
    textures: &'a mut TextureCache,
}

impl<'a> FrameTarget<'a> {
    pub fn new(frame: &'a mut [u8], width: u32, height: u32, textures: &'a mut TextureCache) -> Self {
        Self {
            frame,
            width,
            height,
            textures,
        }
    }

    pub fn clear(&mut self, rgba: [u8; 4]) {
        for pixel in self.frame.chunks_exact_mut(4) {
            pixel.copy_from_slice(&rgba);
        }
    }

    fn bounds(&self) -> PixelRect {
        PixelRect::new(0, 0, self.width, self.height)
    }

    fn blend_at(&mut self, x: i32, y: i32, rgba: [u8; 4]) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let Some(dst) = self.frame.get_mut(offset..offset + 4) else {
            return;
        };
        blend(dst, rgba);
    }
}

/// Source-over blend of `src` onto `dst`.
fn blend(dst: &mut [u8], src: [u8; 4]) {
    let alpha = src[3] as u32;
    match alpha {
        0 => {}
        255 => dst.copy_from_slice(&src),
        _ => {
            let inverse = 255 - alpha;
            for channel in 0..3 {
                dst[channel] = ((src[channel] as u32 * alpha + dst[channel] as u32 * inverse) / 255) as u8;
            }
            dst[3] = (alpha + dst[3] as u32 * inverse / 255).min(255) as u8;
        }
    }
}

impl DrawTarget for FrameTarget<'_> {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn draw_image(&mut self, state: &RenderState, texture: &str, src: PixelRect, dest: (i32, i32)) {
        let placed = PixelRect::new(
            state.offset.0 + dest.0,
            state.offset.1 + dest.1,
            src.width,
            src.height,
        );
        let visible = placed.intersect(&state.clip).intersect(&self.bounds());
        if visible.is_empty() {
            return;
        }
        let Some(image) = self.textures.get(texture) else {
            for y in visible.y..visible.bottom() {
                for x in visible.x..visible.right() {
                    self.blend_at(x, y, MISSING_TEXTURE_RGBA);
                }
            }
            return;
        };
        for y in visible.y..visible.bottom() {
            let src_y = src.y + (y - placed.y);
            for x in visible.x..visible.right() {
                let src_x = src.x + (x - placed.x);
                if src_x < 0 || src_y < 0 {
                    continue;
                }
                if let Some(rgba) = image.pixel(src_x as u32, src_y as u32) {
                    self.blend_at(x, y, rgba);
                }
            }
        }
    }

    fn fill_rect(&mut self, state: &RenderState, rect: PixelRect, rgba: [u8; 4]) {
        let visible = rect
            .translate(state.offset.0, state.offset.1)
            .intersect(&state.clip)
            .intersect(&self.bounds());
        for y in visible.y..visible.bottom() {
            for x in visible.x..visible.right() {
                self.blend_at(x, y, rgba);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::rendering::texture::Texture;

    fn pixel(frame: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * width + x) * 4) as usize;
        [frame[offset], frame[offset + 1], frame[offset + 2], frame[offset + 3]]
    }

    #[test]
    fn fill_rect_is_offset_and_clipped() {
        let mut frame = vec![0u8; 8 * 8 * 4];
        let mut textures = TextureCache::new(std::env::temp_dir());
        let mut target = FrameTarget::new(&mut frame, 8, 8, &mut textures);
        target.clear([0, 0, 0, 255]);

        let state = RenderState::screen(8, 8).nested((2, 2), (3, 3));
        target.fill_rect(&state, PixelRect::new(-1, -1, 10, 10), [255, 255, 255, 255]);

        assert_eq!(pixel(&frame, 8, 1, 1), [0, 0, 0, 255]);
        assert_eq!(pixel(&frame, 8, 2, 2), [255, 255, 255, 255]);
        assert_eq!(pixel(&frame, 8, 4, 4), [255, 255, 255, 255]);
        assert_eq!(pixel(&frame, 8, 5, 5), [0, 0, 0, 255]);
    }

    #[test]
    fn translucent_fill_blends_over_frame() {
        let mut frame = vec![0u8; 4];
        let mut textures = TextureCache::new(std::env::temp_dir());
        let mut target = FrameTarget::new(&mut frame, 1, 1, &mut textures);
        target.clear([0, 0, 200, 255]);
        target.fill_rect(&RenderState::screen(1, 1), PixelRect::new(0, 0, 1, 1), [200, 0, 0, 128]);
        assert_eq!(pixel(&frame, 1, 0, 0), [100, 0, 99, 255]);
    }

    #[test]
    fn draw_image_copies_source_window_and_skips_transparent() {
        let mut textures = TextureCache::new(std::env::temp_dir());
        let mut rgba = Vec::new();
        for index in 0..4u8 {
            rgba.extend_from_slice(&[index * 10, 0, 0, if index == 3 { 0 } else { 255 }]);
        }
        let _held = textures.insert("strip.png", Texture::from_rgba(4, 1, rgba).expect("texture"));

        let mut frame = vec![0u8; 4 * 4 * 4];
        let mut target = FrameTarget::new(&mut frame, 4, 4, &mut textures);
        target.clear([1, 1, 1, 255]);
        target.draw_image(
            &RenderState::screen(4, 4),
            "strip.png",
            PixelRect::new(1, 0, 3, 1),
            (0, 2),
        );

        assert_eq!(pixel(&frame, 4, 0, 2), [10, 0, 0, 255]);
        assert_eq!(pixel(&frame, 4, 1, 2), [20, 0, 0, 255]);
        assert_eq!(pixel(&frame, 4, 2, 2), [1, 1, 1, 255]);
        assert_eq!(pixel(&frame, 4, 3, 2), [1, 1, 1, 255]);
    }

    #[test]
    fn missing_texture_draws_placeholder() {
        let temp = tempfile::TempDir::new().expect("temp dir");
        let mut textures = TextureCache::new(temp.path().to_path_buf());
        let mut frame = vec![0u8; 2 * 2 * 4];
        let mut target = FrameTarget::new(&mut frame, 2, 2, &mut textures);
        target.draw_image(
            &RenderState::screen(2, 2),
            "nope.png",
            PixelRect::new(0, 0, 1, 1),
            (1, 1),
        );
        assert_eq!(pixel(&frame, 2, 1, 1), MISSING_TEXTURE_RGBA);
        assert_eq!(pixel(&frame, 2, 0, 0), [0, 0, 0, 0]);
    }
}
