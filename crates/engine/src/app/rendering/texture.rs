use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

use image::ImageReader;
use tracing::{debug, warn};

/// Decoded RGBA8 pixels.
#[derive(Debug, PartialEq, Eq)]
pub struct Texture {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl Texture {
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        (rgba.len() == expected).then_some(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let bytes = self.rgba.get(offset..offset + 4)?;
        Some([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

/// Textures keyed by path. Entries are weak; a frame holds strong handles for the
/// textures it draws, so anything not drawn for a whole frame is released.
#[derive(Debug)]
pub struct TextureCache {
    asset_root: PathBuf,
    entries: HashMap<String, Weak<Texture>>,
    held: HashMap<String, Rc<Texture>>,
    held_last_frame: HashMap<String, Rc<Texture>>,
    failed: HashSet<String>,
}

impl TextureCache {
    pub fn new(asset_root: PathBuf) -> Self {
        Self {
            asset_root,
            entries: HashMap::new(),
            held: HashMap::new(),
            held_last_frame: HashMap::new(),
            failed: HashSet::new(),
        }
    }

    pub fn begin_frame(&mut self) {
        self.held_last_frame = std::mem::take(&mut self.held);
    }

    /// Drops handles held over from the previous frame and forgets dead entries.
    pub fn end_frame(&mut self) {
        self.held_last_frame.clear();
        let before = self.entries.len();
        self.entries.retain(|_, texture| texture.strong_count() > 0);
        let evicted = before - self.entries.len();
        if evicted > 0 {
            debug!(evicted, live = self.entries.len(), "texture_cache_evicted");
        }
    }

    /// Registers an already decoded texture under `key` for the current frame.
    pub fn insert(&mut self, key: &str, texture: Texture) -> Rc<Texture> {
        let texture = Rc::new(texture);
        self.entries.insert(key.to_string(), Rc::downgrade(&texture));
        self.held.insert(key.to_string(), Rc::clone(&texture));
        self.failed.remove(key);
        texture
    }

    pub fn get(&mut self, key: &str) -> Option<Rc<Texture>> {
        if let Some(texture) = self.held.get(key) {
            return Some(Rc::clone(texture));
        }
        let texture = self.load(key)?;
        self.held.insert(key.to_string(), Rc::clone(&texture));
        Some(texture)
    }

    /// Upgrades a live entry or decodes the file. Failures are reported once per key.
    pub fn load(&mut self, key: &str) -> Option<Rc<Texture>> {
        if let Some(texture) = self.entries.get(key).and_then(Weak::upgrade) {
            return Some(texture);
        }
        if self.failed.contains(key) {
            return None;
        }
        let path = self.resolve(key);
        match decode_png(&path) {
            Ok(texture) => {
                let texture = Rc::new(texture);
                self.entries.insert(key.to_string(), Rc::downgrade(&texture));
                debug!(key, width = texture.width, height = texture.height, "texture_loaded");
                Some(texture)
            }
            Err(reason) => {
                self.failed.insert(key.to_string());
                warn!(
                    key,
                    path = %path.display(),
                    reason = reason.as_str(),
                    "texture_load_failed_using_placeholder"
                );
                None
            }
        }
    }

    pub fn live_count(&self) -> usize {
        self.entries
            .values()
            .filter(|texture| texture.strong_count() > 0)
            .count()
    }

    fn resolve(&self, key: &str) -> PathBuf {
        let path = Path::new(key);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.asset_root.join(path)
        }
    }
}

fn decode_png(path: &Path) -> Result<Texture, String> {
    let reader = ImageReader::open(path).map_err(|error| format!("file_open_failed:{error}"))?;
    let image = reader
        .decode()
        .map_err(|error| format!("decode_failed:{error}"))?
        .to_rgba8();
    let (width, height) = image.dimensions();
    Texture::from_rgba(width, height, image.into_raw())
        .ok_or_else(|| "unexpected_pixel_buffer_size".to_string())
}
