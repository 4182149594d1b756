use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::geom::{Direction, Rect, Vec2};
use super::map::MapId;
use super::registry::MapRegistry;

/// Base travel rate at speed multiplier 1.0.
pub const PX_PER_SECOND: f32 = 100.0;
/// Bound on one-tile step-backs after the first snap.
const MAX_STEP_BACKS: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveSpeed {
    #[default]
    Idle,
    Walk,
    Trot,
    Run,
}

impl MoveSpeed {
    pub fn multiplier(self) -> f32 {
        match self {
            MoveSpeed::Idle => 0.0,
            MoveSpeed::Walk => 0.5,
            MoveSpeed::Trot => 1.0,
            MoveSpeed::Run => 2.0,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            MoveSpeed::Idle => "idle",
            MoveSpeed::Walk => "walk",
            MoveSpeed::Trot => "trot",
            MoveSpeed::Run => "run",
        }
    }
}

/// The physical part of a character: where it is, how big its footprint is and how
/// it is currently trying to move.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub map: MapId,
    /// Center of the footprint in the current map's pixel frame.
    pub position: Vec2,
    pub footprint: Vec2,
    facing: Direction,
    speed: MoveSpeed,
    blocked: bool,
    pub noclip: bool,
}

impl Body {
    pub fn new(map: MapId, position: Vec2, footprint: Vec2) -> Self {
        Self {
            map,
            position,
            footprint,
            facing: Direction::Down,
            speed: MoveSpeed::Idle,
            blocked: false,
            noclip: false,
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_center(self.position, self.footprint)
    }

    pub fn facing(&self) -> Direction {
        self.facing
    }

    pub fn speed(&self) -> MoveSpeed {
        self.speed
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    /// Ignored while blocked against `direction`, so holding a direction into a wall
    /// does not restart movement every tick.
    pub fn set_movement(&mut self, speed: MoveSpeed, direction: Direction) {
        if self.blocked && self.facing == direction {
            return;
        }
        self.speed = speed;
        self.facing = direction;
        self.blocked = false;
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub fn place(&mut self, map: MapId, position: Vec2) {
        self.map = map;
        self.position = position;
    }

    /// Point `reach` pixels past the footprint edge in the facing direction.
    pub fn use_position(&self, reach: f32) -> Vec2 {
        let half = if self.facing.is_horizontal() {
            self.footprint.x / 2.0
        } else {
            self.footprint.y / 2.0
        };
        self.position + self.facing.unit() * (half + reach)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveOutcome {
    pub blocked: bool,
    /// Edge crossed onto a neighboring map this tick.
    pub crossed: Option<Direction>,
}

/// Advances `body` by one tick of its current movement, resolving collisions against
/// its map and carrying it onto a neighbor when it leaves the map's bounds.
pub fn step_body(body: &mut Body, maps: &MapRegistry, dt: Duration) -> MoveOutcome {
    let distance = body.speed.multiplier() * PX_PER_SECOND * dt.as_secs_f32();
    if distance <= 0.0 {
        return MoveOutcome::default();
    }
    let Some(map) = maps.get(body.map) else {
        return MoveOutcome::default();
    };

    let bounds = body.bounds();
    let facing = body.facing;
    let (start_edge, forward) = match facing {
        Direction::Up => (bounds.top, -1.0),
        Direction::Down => (bounds.bottom(), 1.0),
        Direction::Left => (bounds.left, -1.0),
        Direction::Right => (bounds.right(), 1.0),
    };
    let corners = |edge: f32| match facing {
        Direction::Up | Direction::Down => {
            [Vec2::new(bounds.left, edge), Vec2::new(bounds.right(), edge)]
        }
        Direction::Left | Direction::Right => {
            [Vec2::new(edge, bounds.top), Vec2::new(edge, bounds.bottom())]
        }
    };
    let noclip = body.noclip;
    let hits = |edge: f32| !noclip && corners(edge).iter().any(|corner| map.collides_at(*corner));

    let extent = facing.tile_extent();
    let mut edge = start_edge + forward * distance;
    let mut collided = false;
    let mut step_backs = 0;
    while hits(edge) {
        if !collided {
            edge = if forward < 0.0 {
                (edge / extent).floor() * extent + 1.0
            } else {
                (edge / extent).ceil() * extent - 1.0
            };
            collided = true;
            continue;
        }
        step_backs += 1;
        if step_backs > MAX_STEP_BACKS {
            warn!(
                map = map.name(),
                direction = %facing,
                x = body.position.x,
                y = body.position.y,
                "movement_step_back_exhausted"
            );
            edge = start_edge;
            break;
        }
        edge -= forward * extent;
    }

    let mut resolved = bounds;
    match facing {
        Direction::Up => resolved.top = edge,
        Direction::Down => resolved.top = edge - bounds.height,
        Direction::Left => resolved.left = edge,
        Direction::Right => resolved.left = edge - bounds.width,
    }
    body.position = resolved.center();

    if collided {
        body.speed = MoveSpeed::Idle;
    }
    body.blocked = collided;

    let size = map.pixel_size();
    let position = body.position;
    let crossing = [
        (Direction::Up, position.y < 0.0),
        (Direction::Down, position.y >= size.y),
        (Direction::Left, position.x < 0.0),
        (Direction::Right, position.x >= size.x),
    ]
    .into_iter()
    .find(|(direction, outside)| *outside && map.neighbor(*direction).is_some())
    .map(|(direction, _)| direction);

    let mut crossed = None;
    if let Some(direction) = crossing {
        if let Some((next, seam)) = maps.seam(body.map, direction) {
            body.map = next;
            body.position = seam.forward(position);
            crossed = Some(direction);
        }
    }

    MoveOutcome {
        blocked: collided,
        crossed,
    }
}
