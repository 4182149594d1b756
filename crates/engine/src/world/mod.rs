//! The tile world: maps and their topology, movement, scripted actors and the
//! seamless viewer.

mod actor;
mod character;
mod clock;
mod geom;
mod loader;
mod map;
mod movement;
mod objects;
mod registry;
mod seam;
mod timer;
mod viewer;

pub use actor::{ActionContext, Action, Actor, RepeatUntil, Repeater, Step};
pub use character::{Character, CharacterSprite};
pub use clock::{
    tint_color, ClockQuery, Date, GameClock, Hour, Season, Seasons, TimeError, Weekday,
    DAYS_PER_SEASON, DAYS_PER_YEAR, MAX_TIMESCALE, MILLIS_PER_GAME_MINUTE, MINUTES_PER_DAY,
};
pub use geom::{
    Direction, Rect, TilePos, Vec2, SCREEN_HEIGHT, SCREEN_WIDTH, TILE_HEIGHT, TILE_WIDTH,
};
pub use loader::{
    load_map, load_registry, parse_map, MapDocumentError, MapErrorCode, MapLoadError,
    SourceLocation,
};
pub use map::{CollisionLayer, Map, MapId, NeighborEdge, TileLayer, TileOverlay, Tileset};
pub use movement::{step_body, Body, MoveOutcome, MoveSpeed, PX_PER_SECOND};
pub use objects::{MapObject, ObjectDefinition, ObjectEvent, ObjectKind, ObjectLoadError, ObjectShape};
pub use registry::MapRegistry;
pub use seam::Seam;
pub use timer::Timer;
pub use viewer::{DrawContext, DrawTarget, MapViewer, PixelRect, RenderState, SubView};
