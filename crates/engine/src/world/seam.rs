use super::geom::{Direction, Vec2};

/// A directed edge between two maps, with both maps' pixel sizes captured so points
/// can be carried across it in either direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Seam {
    pub direction: Direction,
    pub from_size: Vec2,
    pub to_size: Vec2,
    /// Shift applied to the axis perpendicular to `direction` when crossing.
    pub offset_px: f32,
}

impl Seam {
    /// Maps a point in the source map's frame into the destination map's frame.
    pub fn forward(&self, point: Vec2) -> Vec2 {
        match self.direction {
            Direction::Right => Vec2::new(point.x - self.from_size.x, point.y + self.offset_px),
            Direction::Left => Vec2::new(point.x + self.to_size.x, point.y + self.offset_px),
            Direction::Down => Vec2::new(point.x + self.offset_px, point.y - self.from_size.y),
            Direction::Up => Vec2::new(point.x + self.offset_px, point.y + self.to_size.y),
        }
    }

    /// Inverse of [`Seam::forward`].
    pub fn back(&self, point: Vec2) -> Vec2 {
        match self.direction {
            Direction::Right => Vec2::new(point.x + self.from_size.x, point.y - self.offset_px),
            Direction::Left => Vec2::new(point.x - self.to_size.x, point.y - self.offset_px),
            Direction::Down => Vec2::new(point.x - self.offset_px, point.y + self.from_size.y),
            Direction::Up => Vec2::new(point.x - self.offset_px, point.y - self.to_size.y),
        }
    }
}
