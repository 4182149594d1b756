use std::time::Duration;

use engine::world::{
    Character, ClockQuery, Direction, GameClock, MapId, MapRegistry, MoveSpeed, ObjectEvent, TilePos,
};
use engine::{InputAction, InputSnapshot};
use tracing::{debug, info, warn};

/// Pixels past the footprint edge checked by the interact key.
pub(crate) const USE_REACH_PX: f32 = 15.0;

/// What the player asked for on one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PlayerIntent {
    pub direction: Option<Direction>,
    pub speed: MoveSpeed,
    pub interact: bool,
    pub toggle_collision_debug: bool,
}

impl PlayerIntent {
    pub(crate) fn from_input(input: &InputSnapshot) -> Self {
        let direction = [
            (InputAction::MoveUp, Direction::Up),
            (InputAction::MoveDown, Direction::Down),
            (InputAction::MoveLeft, Direction::Left),
            (InputAction::MoveRight, Direction::Right),
        ]
        .into_iter()
        .find(|(action, _)| input.is_down(*action))
        .map(|(_, direction)| direction);
        let speed = match direction {
            None => MoveSpeed::Idle,
            Some(_) if input.is_down(InputAction::Run) => MoveSpeed::Run,
            Some(_) if input.is_down(InputAction::Walk) => MoveSpeed::Walk,
            Some(_) => MoveSpeed::Trot,
        };
        Self {
            direction,
            speed,
            interact: input.pressed(InputAction::Interact),
            toggle_collision_debug: input.pressed(InputAction::ToggleCollisionDebug),
        }
    }
}

/// Everything the map scene simulates, passed by reference to update and draw.
#[derive(Debug)]
pub(crate) struct WorldState {
    pub maps: MapRegistry,
    pub clock: GameClock,
    pub player: Character,
    pub npcs: Vec<Character>,
    pub debug_collision: bool,
    pub dialogue: Option<String>,
}

impl WorldState {
    pub(crate) fn new(mut maps: MapRegistry, clock: GameClock, player: Character) -> Self {
        maps.set_active(player.body.map);
        Self {
            maps,
            clock,
            player,
            npcs: Vec::new(),
            debug_collision: false,
            dialogue: None,
        }
    }

    pub(crate) fn active_map(&self) -> MapId {
        self.player.body.map
    }

    pub(crate) fn tick(&mut self, dt: Duration, intent: PlayerIntent) {
        if intent.toggle_collision_debug {
            self.debug_collision = !self.debug_collision;
            info!(enabled = self.debug_collision, "collision_debug_toggled");
        }

        self.clock.advance(dt);
        self.steer_player(intent);

        let left_map = self.player.body.map;
        let left_at = self.player.body.position;
        let outcome = self.player.update(dt, &self.clock, &self.maps);
        if let Some(direction) = outcome.crossed {
            self.maps[left_map].release_tracking(left_at);
            for event in self.maps[left_map].drain_events() {
                self.handle_event(left_map, event);
            }
            self.enter_map(self.player.body.map);
            debug!(direction = %direction, "player_crossed_seam");
        }

        for npc in &mut self.npcs {
            npc.update(dt, &self.clock, &self.maps);
        }

        let map = self.player.body.map;
        self.maps[map].update(dt, self.player.body.position);

        if intent.interact {
            self.dialogue = None;
            let target = self.player.body.use_position(USE_REACH_PX);
            let handled = self.maps[map].interact(target);
            debug!(x = target.x, y = target.y, handled, "player_interact");
        }

        for event in self.maps[map].drain_events() {
            self.handle_event(map, event);
        }
    }

    fn steer_player(&mut self, intent: PlayerIntent) {
        if !self.player.actor.is_idle() {
            return;
        }
        let body = &mut self.player.body;
        match intent.direction {
            Some(direction) => body.set_movement(intent.speed, direction),
            None => {
                let facing = body.facing();
                body.set_movement(MoveSpeed::Idle, facing);
            }
        }
    }

    fn enter_map(&mut self, map: MapId) {
        self.maps.set_active(map);
        info!(map = self.maps[map].name(), "player_entered_map");
    }

    fn handle_event(&mut self, map: MapId, event: ObjectEvent) {
        match event {
            ObjectEvent::Entered { object } => debug!(object = object.as_str(), "object_entered"),
            ObjectEvent::Exited { object } => debug!(object = object.as_str(), "object_exited"),
            ObjectEvent::ShowText { object, text } => {
                info!(object = object.as_str(), text = text.as_str(), "dialogue_shown");
                self.dialogue = Some(text);
            }
            ObjectEvent::Warp {
                object,
                map: target,
                tile,
            } => self.warp(map, &object, &target, tile),
        }
    }

    fn warp(&mut self, from: MapId, object: &str, target: &str, tile: TilePos) {
        let Some(to) = self.maps.id_of(target) else {
            warn!(object, map = target, "warp_unknown_map");
            return;
        };
        self.maps[from].release_tracking(self.player.body.position);
        self.maps[from].drain_events();
        self.player.body.place(to, tile.center());
        self.enter_map(to);
        info!(object, map = target, tile = %tile, "player_warped");
    }

    pub(crate) fn status_lines(&self) -> Vec<String> {
        let body = &self.player.body;
        let date = self.clock.date();
        let mut lines = vec![
            format!("map {}", self.maps[body.map].name()),
            format!(
                "{} {} day {} year {}",
                self.clock.hour(),
                date.season(),
                date.day_of_month(),
                date.year()
            ),
            format!(
                "tile {} pos {:.0},{:.0}",
                TilePos::containing(body.position),
                body.position.x,
                body.position.y
            ),
            format!("facing {} blocked {}", body.facing(), body.is_blocked()),
        ];
        if let Some(text) = &self.dialogue {
            lines.push(format!("says: {text}"));
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::world::{Body, Map, MapObject, ObjectKind, ObjectShape, Rect, Vec2};

    const TICK: Duration = Duration::from_millis(100);

    fn player_at(map: MapId, x: f32, y: f32) -> Character {
        Character::new("player", Body::new(map, Vec2::new(x, y), Vec2::new(32.0, 32.0)))
    }

    fn world(maps: MapRegistry, player: Character) -> WorldState {
        WorldState::new(maps, GameClock::default(), player)
    }

    fn walk(direction: Direction, speed: MoveSpeed) -> PlayerIntent {
        PlayerIntent {
            direction: Some(direction),
            speed,
            ..PlayerIntent::default()
        }
    }

    fn town_with(objects: Vec<MapObject>) -> MapRegistry {
        let mut town = Map::new("town", 20, 20);
        for object in objects {
            town.add_object(object);
        }
        let mut maps = MapRegistry::new();
        maps.insert(town).expect("insert town");
        maps.insert(Map::new("farm", 20, 20)).expect("insert farm");
        maps
    }

    #[test]
    fn intent_prefers_run_over_walk_and_reads_press_edges() {
        let input = InputSnapshot::empty()
            .with_action_down(InputAction::MoveLeft, true)
            .with_action_down(InputAction::Run, true)
            .with_action_down(InputAction::Walk, true)
            .with_action_down(InputAction::Interact, true);
        let intent = PlayerIntent::from_input(&input);
        assert_eq!(intent.direction, Some(Direction::Left));
        assert_eq!(intent.speed, MoveSpeed::Run);
        assert!(intent.interact);

        let idle = PlayerIntent::from_input(&InputSnapshot::empty());
        assert_eq!(idle, PlayerIntent::default());
    }

    #[test]
    fn held_direction_moves_player_at_trot() {
        let mut world = world(town_with(Vec::new()), player_at(MapId(0), 100.0, 100.0));
        world.tick(TICK, walk(Direction::Right, MoveSpeed::Trot));
        assert!((world.player.body.position.x - 110.0).abs() < 1e-3);

        world.tick(TICK, PlayerIntent::default());
        assert!((world.player.body.position.x - 110.0).abs() < 1e-3);
        assert_eq!(world.player.body.speed(), MoveSpeed::Idle);
        assert_eq!(world.player.body.facing(), Direction::Right);
    }

    #[test]
    fn interacting_with_a_sign_shows_its_text_until_next_interact() {
        let sign = MapObject::new(
            "notice",
            Rect::new(192.0, 160.0, 32.0, 32.0),
            ObjectKind::Sign {
                texture: "signs/notice.png".to_string(),
                text: "Welcome to Ponyville".to_string(),
            },
        );
        let mut world = world(town_with(vec![sign]), player_at(MapId(0), 166.0, 176.0));
        world.player.body.set_movement(MoveSpeed::Idle, Direction::Right);

        let interact = PlayerIntent {
            interact: true,
            ..PlayerIntent::default()
        };
        world.tick(TICK, interact);
        assert_eq!(world.dialogue.as_deref(), Some("Welcome to Ponyville"));
        assert!(world
            .status_lines()
            .contains(&"says: Welcome to Ponyville".to_string()));

        world.player.body.set_movement(MoveSpeed::Idle, Direction::Left);
        world.tick(TICK, interact);
        assert_eq!(world.dialogue, None);
    }

    #[test]
    fn stepping_on_a_door_warps_to_its_tile() {
        let door = MapObject::new(
            "barn_door",
            Rect::new(64.0, 64.0, 32.0, 32.0),
            ObjectKind::Door {
                map: "farm".to_string(),
                tile: TilePos::new(4, 4),
            },
        );
        let mut world = world(town_with(vec![door]), player_at(MapId(0), 80.0, 80.0));

        world.tick(TICK, PlayerIntent::default());
        assert_eq!(world.player.body.map, MapId(1));
        assert_eq!(world.player.body.position, Vec2::new(144.0, 144.0));
        assert_eq!(world.maps.active(), Some(MapId(1)));
        assert_eq!(world.maps[MapId(0)].active_objects().count(), 0);
    }

    #[test]
    fn door_to_unknown_map_leaves_player_in_place() {
        let door = MapObject::new(
            "broken_door",
            Rect::new(64.0, 64.0, 32.0, 32.0),
            ObjectKind::Door {
                map: "nowhere".to_string(),
                tile: TilePos::new(1, 1),
            },
        );
        let mut world = world(town_with(vec![door]), player_at(MapId(0), 80.0, 80.0));
        world.tick(TICK, PlayerIntent::default());
        assert_eq!(world.player.body.map, MapId(0));
        assert_eq!(world.player.body.position, Vec2::new(80.0, 80.0));
    }

    #[test]
    fn walking_off_an_edge_switches_the_active_map() {
        let mut west = Map::new("west", 10, 10);
        west.declare_neighbor(Direction::Right, "east");
        let mut east = Map::new("east", 10, 10);
        east.declare_neighbor(Direction::Left, "west");
        let mut maps = MapRegistry::new();
        maps.insert(west).expect("insert west");
        maps.insert(east).expect("insert east");
        maps.wire_neighbors().expect("wire");

        let mut world = world(maps, player_at(MapId(0), 310.0, 100.0));
        world.tick(TICK, walk(Direction::Right, MoveSpeed::Run));
        assert_eq!(world.active_map(), MapId(1));
        assert_eq!(world.maps.active(), Some(MapId(1)));
        assert!((world.player.body.position.x - 10.0).abs() < 1e-3);
    }

    #[test]
    fn crossing_a_seam_flushes_exit_events_on_the_old_map() {
        let mut west = Map::new("west", 10, 10);
        west.declare_neighbor(Direction::Right, "east");
        west.add_object(MapObject::new(
            "gate",
            Rect::new(288.0, 64.0, 32.0, 64.0),
            ObjectKind::Barrier {
                shape: ObjectShape::Ellipse,
            },
        ));
        let mut east = Map::new("east", 10, 10);
        east.declare_neighbor(Direction::Left, "west");
        let mut maps = MapRegistry::new();
        maps.insert(west).expect("insert west");
        maps.insert(east).expect("insert east");
        maps.wire_neighbors().expect("wire");

        let mut world = world(maps, player_at(MapId(0), 305.0, 96.0));
        world.player.body.noclip = true;
        world.tick(TICK, PlayerIntent::default());
        assert_eq!(world.maps[MapId(0)].active_objects().count(), 1);

        world.tick(TICK, walk(Direction::Right, MoveSpeed::Run));
        assert_eq!(world.active_map(), MapId(1));
        assert_eq!(world.maps[MapId(0)].active_objects().count(), 0);
        assert!(world.maps[MapId(0)].drain_events().is_empty());
    }

    #[test]
    fn f1_toggles_collision_debug() {
        let mut world = world(town_with(Vec::new()), player_at(MapId(0), 100.0, 100.0));
        let toggle = PlayerIntent {
            toggle_collision_debug: true,
            ..PlayerIntent::default()
        };
        world.tick(TICK, toggle);
        assert!(world.debug_collision);
        world.tick(TICK, toggle);
        assert!(!world.debug_collision);
    }

    #[test]
    fn clock_advances_with_simulated_time() {
        let mut world = world(town_with(Vec::new()), player_at(MapId(0), 100.0, 100.0));
        for _ in 0..10 {
            world.tick(TICK, PlayerIntent::default());
        }
        assert_eq!(world.clock.hour().minute(), 2);
    }
}
