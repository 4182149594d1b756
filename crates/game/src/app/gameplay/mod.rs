use std::path::Path;

use engine::world::{
    load_registry, Body, Character, CharacterSprite, Date, GameClock, MapLoadError, TilePos,
    TimeError, Vec2, TILE_HEIGHT, TILE_WIDTH,
};
use thiserror::Error;
use tracing::info;

use super::config::{ConfigError, GameConfig};

mod npc;
mod scene;
mod world_state;

pub(crate) use scene::MapScene;
use world_state::WorldState;

/// Frames per row in a character sheet.
const SHEET_FRAMES: u32 = 4;

#[derive(Debug, Error)]
pub(crate) enum WorldSetupError {
    #[error(transparent)]
    Maps(#[from] MapLoadError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Clock(#[from] TimeError),
    #[error("start map \"{0}\" is not in the map registry")]
    UnknownStartMap(String),
}

fn character_sprite(texture: Option<&str>) -> Option<CharacterSprite> {
    texture.map(|texture| CharacterSprite::new(texture, TILE_WIDTH, TILE_HEIGHT, SHEET_FRAMES))
}

fn with_optional_sprite(character: Character, texture: Option<&str>) -> Character {
    match character_sprite(texture) {
        Some(sprite) => character.with_sprite(sprite),
        None => character,
    }
}

/// Loads the maps named by `config` and places the player and the demo NPC.
pub(crate) fn build_world(
    config: &GameConfig,
    assets_dir: &Path,
) -> Result<WorldState, WorldSetupError> {
    let maps = load_registry(&assets_dir.join(&config.maps))?;
    let start = maps
        .id_of(&config.start_map)
        .ok_or_else(|| WorldSetupError::UnknownStartMap(config.start_map.clone()))?;

    let mut clock = GameClock::at(Date::default(), config.start_hour()?);
    clock.set_timescale(config.timescale)?;

    let footprint = Vec2::new(TILE_WIDTH as f32, TILE_HEIGHT as f32);
    let [tile_x, tile_y] = config.start_tile;
    let player = with_optional_sprite(
        Character::new(
            "player",
            Body::new(start, TilePos::new(tile_x, tile_y).center(), footprint),
        ),
        config.player_sprite.as_deref(),
    );

    let mut world = WorldState::new(maps, clock, player);
    world.debug_collision = config.debug_collision;
    world.npcs.push(with_optional_sprite(
        npc::spawn_demo_npc(start, footprint),
        config.npc_sprite.as_deref(),
    ));

    info!(
        map = config.start_map.as_str(),
        tile_x,
        tile_y,
        npc = npc::DEMO_NPC_NAME,
        "world_ready"
    );
    Ok(world)
}
