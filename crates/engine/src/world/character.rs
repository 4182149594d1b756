use std::time::Duration;

use super::actor::{ActionContext, Actor};
use super::clock::ClockQuery;
use super::geom::{Direction, Vec2};
use super::movement::{step_body, Body, MoveOutcome, MoveSpeed};
use super::registry::MapRegistry;
use super::timer::Timer;
use super::viewer::PixelRect;

const FRAME_DURATION: Duration = Duration::from_millis(150);

/// Sheet laid out with one row per facing (down, left, right, up) and one column
/// per walk frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterSprite {
    texture: String,
    frame_width: u32,
    frame_height: u32,
    frames: u32,
    frame: u32,
    timer: Timer,
}

impl CharacterSprite {
    pub fn new(texture: impl Into<String>, frame_width: u32, frame_height: u32, frames: u32) -> Self {
        Self {
            texture: texture.into(),
            frame_width,
            frame_height,
            frames: frames.max(1),
            frame: 0,
            timer: Timer::started(FRAME_DURATION),
        }
    }

    pub fn texture(&self) -> &str {
        &self.texture
    }

    pub fn frame_size(&self) -> Vec2 {
        Vec2::new(self.frame_width as f32, self.frame_height as f32)
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    /// Walk cycle speed follows the movement multiplier; standing still shows frame 0.
    pub fn animate(&mut self, dt: Duration, speed: MoveSpeed) {
        if speed == MoveSpeed::Idle {
            self.frame = 0;
            self.timer.restart();
            return;
        }
        self.timer.set_rate(speed.multiplier());
        self.timer.advance(dt);
        if self.timer.finished() {
            self.frame = (self.frame + 1) % self.frames;
            self.timer.restart();
        }
    }

    pub fn source_rect(&self, facing: Direction) -> PixelRect {
        let row = match facing {
            Direction::Down => 0,
            Direction::Left => 1,
            Direction::Right => 2,
            Direction::Up => 3,
        };
        PixelRect::new(
            (self.frame * self.frame_width) as i32,
            (row * self.frame_height) as i32,
            self.frame_width,
            self.frame_height,
        )
    }
}

#[derive(Debug, Clone)]
pub struct Character {
    pub name: String,
    pub body: Body,
    pub actor: Actor,
    pub sprite: Option<CharacterSprite>,
}

impl Character {
    pub fn new(name: impl Into<String>, body: Body) -> Self {
        Self {
            name: name.into(),
            body,
            actor: Actor::new(),
            sprite: None,
        }
    }

    /// Attaches a sprite and sizes the footprint to one frame.
    pub fn with_sprite(mut self, sprite: CharacterSprite) -> Self {
        self.body.footprint = sprite.frame_size();
        self.sprite = Some(sprite);
        self
    }

    /// Runs the script, then resolves the resulting movement.
    pub fn update(
        &mut self,
        dt: Duration,
        clock: &dyn ClockQuery,
        maps: &MapRegistry,
    ) -> MoveOutcome {
        let ctx = ActionContext { dt, clock, maps };
        self.actor.update(&mut self.body, &ctx);
        let outcome = step_body(&mut self.body, maps, dt);
        if let Some(sprite) = self.sprite.as_mut() {
            sprite.animate(dt, self.body.speed());
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::clock::GameClock;
    use crate::world::map::{Map, MapId};

    #[test]
    fn sprite_sets_footprint_and_picks_row_by_facing() {
        let body = Body::new(MapId(0), Vec2::new(50.0, 50.0), Vec2::ZERO);
        let character =
            Character::new("rarity", body).with_sprite(CharacterSprite::new("rarity.png", 24, 40, 4));
        assert_eq!(character.body.footprint, Vec2::new(24.0, 40.0));

        let sprite = character.sprite.as_ref().expect("sprite");
        assert_eq!(sprite.source_rect(Direction::Right), PixelRect::new(0, 80, 24, 40));
    }

    #[test]
    fn walk_cycle_advances_while_moving_and_resets_when_idle() {
        let mut sprite = CharacterSprite::new("pony.png", 32, 32, 3);
        sprite.animate(Duration::from_millis(160), MoveSpeed::Trot);
        assert_eq!(sprite.frame(), 1);
        sprite.animate(Duration::from_millis(80), MoveSpeed::Run);
        assert_eq!(sprite.frame(), 2);
        sprite.animate(Duration::from_millis(16), MoveSpeed::Idle);
        assert_eq!(sprite.frame(), 0);
    }

    #[test]
    fn update_runs_script_before_movement() {
        let mut maps = MapRegistry::new();
        maps.insert(Map::new("field", 10, 10)).expect("insert");
        let clock = GameClock::default();

        let body = Body::new(MapId(0), Vec2::new(100.0, 100.0), Vec2::new(16.0, 16.0));
        let mut character = Character::new("npc", body);
        character.actor.move_by(Direction::Down, MoveSpeed::Trot, 1);

        character.update(Duration::from_millis(100), &clock, &maps);
        assert!((character.body.position.y - 110.0).abs() < 1e-3);
    }
}
