use std::time::Duration;

use engine::world::{Actor, Body, Character, Direction, MapId, MoveSpeed, TilePos, Vec2};

pub(crate) const DEMO_NPC_NAME: &str = "rarity";
const DEMO_NPC_HOME_MAP: &str = "path_a";
const DEMO_NPC_HOME_TILE: TilePos = TilePos::new(14, 14);
const PACE_TILES: u32 = 4;
const PAUSE: Duration = Duration::from_millis(2500);

/// Paces east-west three times, looks north, paces north-south three times, looks
/// west, all twice over.
pub(crate) fn script_demo_npc(actor: &mut Actor) {
    actor
        .reposition(DEMO_NPC_HOME_TILE, Some(DEMO_NPC_HOME_MAP))
        .repeat_begin(2)
        .repeat_begin(3)
        .move_by(Direction::Right, MoveSpeed::Walk, PACE_TILES)
        .move_by(Direction::Left, MoveSpeed::Walk, PACE_TILES)
        .repeat_end()
        .face(Direction::Up)
        .wait(PAUSE)
        .repeat_begin(3)
        .move_by(Direction::Down, MoveSpeed::Walk, PACE_TILES)
        .move_by(Direction::Up, MoveSpeed::Walk, PACE_TILES)
        .repeat_end()
        .face(Direction::Left)
        .wait(PAUSE)
        .repeat_end();
}

/// The scripted NPC starts on `map` and relocates itself on its first tick.
pub(crate) fn spawn_demo_npc(map: MapId, footprint: Vec2) -> Character {
    let body = Body::new(map, DEMO_NPC_HOME_TILE.center(), footprint);
    let mut npc = Character::new(DEMO_NPC_NAME, body);
    script_demo_npc(&mut npc.actor);
    npc
}
