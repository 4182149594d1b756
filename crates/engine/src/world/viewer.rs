//! Seamless rendering of the active map and whatever part of its neighbors the
//! view overhangs.

use super::character::Character;
use super::clock::Season;
use super::geom::{Direction, Rect, TilePos, Vec2, SCREEN_HEIGHT, SCREEN_WIDTH, TILE_HEIGHT, TILE_WIDTH};
use super::map::{Map, MapId, TileLayer};
use super::objects::ObjectKind;
use super::registry::MapRegistry;

const TILLED_RGBA: [u8; 4] = [101, 67, 33, 150];
const WATERED_RGBA: [u8; 4] = [40, 60, 120, 90];
const HIGHLIGHT_RGBA: [u8; 4] = [255, 255, 255, 60];
const PLACEHOLDER_RGBA: [u8; 4] = [240, 200, 80, 255];
const DEBUG_BODY_RGBA: [u8; 4] = [200, 0, 0, 150];
const DEBUG_TILE_RGBA: [u8; 4] = [200, 0, 0, 110];

/// Integer screen rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn intersect(&self, other: &PixelRect) -> PixelRect {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        PixelRect::new(
            x,
            y,
            (right - x).max(0) as u32,
            (bottom - y).max(0) as u32,
        )
    }

    pub fn translate(&self, dx: i32, dy: i32) -> PixelRect {
        PixelRect::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

/// Screen placement for a batch of draws: coordinates are shifted by `offset` and
/// anything outside `clip` is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderState {
    pub offset: (i32, i32),
    pub clip: PixelRect,
}

impl RenderState {
    pub fn screen(width: u32, height: u32) -> Self {
        Self {
            offset: (0, 0),
            clip: PixelRect::new(0, 0, width, height),
        }
    }

    /// A child state whose origin sits at `origin` inside this one, clipped to `size`.
    pub fn nested(&self, origin: (i32, i32), size: (u32, u32)) -> Self {
        let offset = (self.offset.0 + origin.0, self.offset.1 + origin.1);
        let area = PixelRect::new(offset.0, offset.1, size.0, size.1);
        Self {
            offset,
            clip: self.clip.intersect(&area),
        }
    }
}

pub trait DrawTarget {
    fn size(&self) -> (u32, u32);

    /// Copies `src` from the texture keyed by `texture` so its top-left lands at
    /// `dest` relative to `state.offset`.
    fn draw_image(&mut self, state: &RenderState, texture: &str, src: PixelRect, dest: (i32, i32));

    fn fill_rect(&mut self, state: &RenderState, rect: PixelRect, rgba: [u8; 4]);
}

/// What the viewer needs besides the maps themselves.
pub struct DrawContext<'a> {
    pub maps: &'a MapRegistry,
    pub characters: &'a [&'a Character],
    pub season: Season,
    pub debug_collision: bool,
}

/// One neighbor slice of the view: the part of `map` covered by `area` (in that
/// map's pixel frame), drawn at `screen_origin`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubView {
    pub direction: Direction,
    pub map: MapId,
    pub area: Rect,
    pub screen_origin: (i32, i32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapViewer {
    map: MapId,
    area: Rect,
}

impl MapViewer {
    pub fn new(map: MapId) -> Self {
        Self::with_size(map, Vec2::new(SCREEN_WIDTH as f32, SCREEN_HEIGHT as f32))
    }

    pub fn with_size(map: MapId, size: Vec2) -> Self {
        Self {
            map,
            area: Rect::new(0.0, 0.0, size.x, size.y),
        }
    }

    pub fn map(&self) -> MapId {
        self.map
    }

    pub fn set_map(&mut self, map: MapId) {
        self.map = map;
    }

    pub fn area(&self) -> Rect {
        self.area
    }

    pub fn resize(&mut self, size: Vec2) {
        let center = self.center();
        self.area.width = size.x;
        self.area.height = size.y;
        self.center_on(center);
    }

    /// Centers on `position` rounded to whole pixels so tiles never land on
    /// fractional coordinates.
    pub fn center_on(&mut self, position: Vec2) {
        let rounded = position.round_half_up();
        self.area.left = rounded.x - self.area.width / 2.0;
        self.area.top = rounded.y - self.area.height / 2.0;
    }

    pub fn center(&self) -> Vec2 {
        self.area.center()
    }

    /// Neighbor slices the view overhangs, each already translated into the
    /// neighbor's pixel frame.
    pub fn plan(&self, maps: &MapRegistry) -> Vec<SubView> {
        let Some(map) = maps.get(self.map) else {
            return Vec::new();
        };
        let size = map.pixel_size();
        let area = self.area;
        let mut views = Vec::new();

        for direction in Direction::ALL {
            let Some((neighbor, seam)) = maps.seam(self.map, direction) else {
                continue;
            };
            let (overhang, slice, screen_origin) = match direction {
                Direction::Left => {
                    let overhang = (-area.left).min(area.width);
                    (
                        overhang,
                        Rect::new(area.left, area.top, overhang, area.height),
                        (0.0, 0.0),
                    )
                }
                Direction::Right => {
                    let overhang = (area.right() - size.x).min(area.width);
                    (
                        overhang,
                        Rect::new(size.x, area.top, overhang, area.height),
                        (area.width - overhang, 0.0),
                    )
                }
                Direction::Up => {
                    let overhang = (-area.top).min(area.height);
                    (
                        overhang,
                        Rect::new(area.left, area.top, area.width, overhang),
                        (0.0, 0.0),
                    )
                }
                Direction::Down => {
                    let overhang = (area.bottom() - size.y).min(area.height);
                    (
                        overhang,
                        Rect::new(area.left, size.y, area.width, overhang),
                        (0.0, area.height - overhang),
                    )
                }
            };
            if overhang <= 0.0 {
                continue;
            }

            let origin = seam.forward(slice.origin());
            views.push(SubView {
                direction,
                map: neighbor,
                area: Rect::new(origin.x, origin.y, slice.width, slice.height),
                screen_origin: (screen_origin.0 as i32, screen_origin.1 as i32),
            });
        }
        views
    }

    /// Draws the overhung neighbor slices, then the active map on top.
    pub fn draw(&self, ctx: &DrawContext<'_>, target: &mut dyn DrawTarget) {
        let (width, height) = target.size();
        let screen = RenderState::screen(width, height);

        for view in self.plan(ctx.maps) {
            let state = screen.nested(
                view.screen_origin,
                (view.area.width as u32, view.area.height as u32),
            );
            if let Some(map) = ctx.maps.get(view.map) {
                draw_area(ctx, map, view.area, &state, target);
            }
        }

        let view = screen.nested((0, 0), (self.area.width as u32, self.area.height as u32));
        if let Some(map) = ctx.maps.get(self.map) {
            draw_area(ctx, map, self.area, &view, target);
        }
    }
}

/// Tile range covering `area`, one extra tile each way for partial overhang,
/// clamped to the map.
fn visible_tiles(map: &Map, area: Rect) -> (i32, i32, i32, i32) {
    let start_x = ((area.left / TILE_WIDTH as f32).floor() as i32).max(0);
    let start_y = ((area.top / TILE_HEIGHT as f32).floor() as i32).max(0);
    let span_x = (area.width / TILE_WIDTH as f32).ceil() as i32 + 1;
    let span_y = (area.height / TILE_HEIGHT as f32).ceil() as i32 + 1;
    let end_x = (start_x + span_x).min(map.width_tiles() as i32);
    let end_y = (start_y + span_y).min(map.height_tiles() as i32);
    (start_x, start_y, end_x, end_y)
}

/// Floors so points left of or above `origin` land on the pixel that contains them.
fn to_screen(point: Vec2, origin: Vec2) -> (i32, i32) {
    (
        (point.x - origin.x).floor() as i32,
        (point.y - origin.y).floor() as i32,
    )
}

fn rect_to_screen(rect: Rect, origin: Vec2) -> PixelRect {
    let (x, y) = to_screen(rect.origin(), origin);
    PixelRect::new(x, y, rect.width.max(0.0) as u32, rect.height.max(0.0) as u32)
}

fn draw_area(
    ctx: &DrawContext<'_>,
    map: &Map,
    area: Rect,
    state: &RenderState,
    target: &mut dyn DrawTarget,
) {
    let origin = Vec2::new(area.left.floor(), area.top.floor());
    let tiles = visible_tiles(map, area);

    draw_layers(ctx, map, map.lower_layers(), tiles, origin, state, target);
    draw_overlays(map, tiles, origin, state, target);

    for object in map.objects() {
        if !area.intersects(&object.bounds()) {
            continue;
        }
        if let ObjectKind::Sign { texture, .. } = object.kind() {
            let bounds = rect_to_screen(object.bounds(), origin);
            target.draw_image(
                state,
                texture,
                PixelRect::new(0, 0, bounds.width, bounds.height),
                (bounds.x, bounds.y),
            );
        }
    }

    for character in ctx.characters {
        let bounds = character.body.bounds();
        if character.body.map != map.id() || !area.intersects(&bounds) {
            continue;
        }
        match &character.sprite {
            Some(sprite) => {
                let frame = sprite.frame_size();
                let top_left = character.body.position - frame * 0.5;
                target.draw_image(
                    state,
                    sprite.texture(),
                    sprite.source_rect(character.body.facing()),
                    to_screen(top_left, origin),
                );
            }
            None => target.fill_rect(state, rect_to_screen(bounds, origin), PLACEHOLDER_RGBA),
        }
        if ctx.debug_collision {
            target.fill_rect(state, rect_to_screen(bounds, origin), DEBUG_BODY_RGBA);
        }
    }

    draw_layers(ctx, map, map.upper_layers(), tiles, origin, state, target);

    if ctx.debug_collision {
        if let Some(layer) = map.collision_layer() {
            let (start_x, start_y, end_x, end_y) = tiles;
            for tile in layer.solid_tiles() {
                if tile.x < start_x || tile.x >= end_x || tile.y < start_y || tile.y >= end_y {
                    continue;
                }
                let (x, y) = to_screen(tile.origin(), origin);
                target.fill_rect(
                    state,
                    PixelRect::new(x, y, TILE_WIDTH, TILE_HEIGHT),
                    DEBUG_TILE_RGBA,
                );
            }
        }
    }
}

fn draw_layers(
    ctx: &DrawContext<'_>,
    map: &Map,
    layers: &[TileLayer],
    (start_x, start_y, end_x, end_y): (i32, i32, i32, i32),
    origin: Vec2,
    state: &RenderState,
    target: &mut dyn DrawTarget,
) {
    for layer in layers.iter().filter(|layer| layer.visible_in(ctx.season)) {
        for y in start_y..end_y {
            for x in start_x..end_x {
                let tile = TilePos::new(x, y);
                let Some((tileset, (src_x, src_y))) = map.tile_source(map.gid_at(layer, tile)) else {
                    continue;
                };
                target.draw_image(
                    state,
                    &tileset.image,
                    PixelRect::new(src_x as i32, src_y as i32, TILE_WIDTH, TILE_HEIGHT),
                    to_screen(tile.origin(), origin),
                );
            }
        }
    }
}

fn draw_overlays(
    map: &Map,
    (start_x, start_y, end_x, end_y): (i32, i32, i32, i32),
    origin: Vec2,
    state: &RenderState,
    target: &mut dyn DrawTarget,
) {
    for y in start_y..end_y {
        for x in start_x..end_x {
            let tile = TilePos::new(x, y);
            let Some(overlay) = map.overlay(tile).filter(|overlay| !overlay.is_blank()) else {
                continue;
            };
            let (sx, sy) = to_screen(tile.origin(), origin);
            let rect = PixelRect::new(sx, sy, TILE_WIDTH, TILE_HEIGHT);
            for (set, rgba) in [
                (overlay.tilled, TILLED_RGBA),
                (overlay.watered, WATERED_RGBA),
                (overlay.highlight, HIGHLIGHT_RGBA),
            ] {
                if set {
                    target.fill_rect(state, rect, rgba);
                }
            }
        }
    }
}
