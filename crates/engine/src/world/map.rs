use std::fmt;
use std::time::Duration;

use super::clock::{Season, Seasons};
use super::geom::{Direction, Rect, TilePos, Vec2, TILE_HEIGHT, TILE_WIDTH};
use super::objects::{MapObject, ObjectEvent};

/// Dense index assigned by the registry in load order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MapId(pub u32);

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollisionLayer {
    width: u32,
    height: u32,
    solid: Vec<bool>,
}

impl CollisionLayer {
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            solid: vec![false; width as usize * height as usize],
        }
    }

    /// Builds a layer from row-major tile ids where any non-zero id is solid.
    pub fn from_gids(width: u32, height: u32, gids: &[u32]) -> Self {
        let mut layer = Self::empty(width, height);
        for (cell, gid) in layer.solid.iter_mut().zip(gids) {
            *cell = *gid != 0;
        }
        layer
    }

    fn index(&self, tile: TilePos) -> Option<usize> {
        if tile.x < 0 || tile.y < 0 || tile.x >= self.width as i32 || tile.y >= self.height as i32
        {
            return None;
        }
        Some(tile.y as usize * self.width as usize + tile.x as usize)
    }

    /// Tiles outside the grid never collide, which lets entities walk off the edge
    /// onto a neighbor.
    pub fn is_solid(&self, tile: TilePos) -> bool {
        self.index(tile)
            .and_then(|index| self.solid.get(index).copied())
            .unwrap_or(false)
    }

    pub fn set_solid(&mut self, tile: TilePos, solid: bool) {
        if let Some(index) = self.index(tile) {
            self.solid[index] = solid;
        }
    }

    pub fn solid_tiles(&self) -> impl Iterator<Item = TilePos> + '_ {
        let width = self.width.max(1) as usize;
        self.solid
            .iter()
            .enumerate()
            .filter(|(_, solid)| **solid)
            .map(move |(index, _)| TilePos::new((index % width) as i32, (index / width) as i32))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tileset {
    pub first_gid: u32,
    /// Texture key handed to the draw target.
    pub image: String,
    pub columns: u32,
    pub tile_count: u32,
}

impl Tileset {
    fn covers(&self, gid: u32) -> bool {
        gid >= self.first_gid && gid - self.first_gid < self.tile_count
    }

    /// Source rectangle of `gid` inside the tileset image, in pixels.
    pub fn source_rect(&self, gid: u32) -> (u32, u32) {
        let local = gid - self.first_gid;
        let columns = self.columns.max(1);
        (
            local % columns * TILE_WIDTH,
            local / columns * TILE_HEIGHT,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileLayer {
    pub name: String,
    /// `None` shows the layer all year.
    pub seasons: Option<Seasons>,
    pub gids: Vec<u32>,
}

impl TileLayer {
    pub fn visible_in(&self, season: Season) -> bool {
        self.seasons.map_or(true, |seasons| seasons.contains(season))
    }
}

/// Per-tile state written by gameplay systems layered over the static map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TileOverlay {
    pub tilled: bool,
    pub watered: bool,
    pub highlight: bool,
}

impl TileOverlay {
    pub fn is_blank(&self) -> bool {
        !self.tilled && !self.watered && !self.highlight
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborEdge {
    pub map: MapId,
    pub offset_px: f32,
}

#[derive(Debug, Clone)]
pub struct Map {
    pub(crate) id: MapId,
    name: String,
    width: u32,
    height: u32,
    collision: Option<CollisionLayer>,
    tilesets: Vec<Tileset>,
    lower: Vec<TileLayer>,
    upper: Vec<TileLayer>,
    objects: Vec<MapObject>,
    overlays: Vec<TileOverlay>,
    pub(crate) neighbor_decls: [Option<String>; 4],
    neighbors: [Option<NeighborEdge>; 4],
    active: Vec<usize>,
    events: Vec<ObjectEvent>,
}

impl Map {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: MapId::default(),
            name: name.into(),
            width,
            height,
            collision: None,
            tilesets: Vec::new(),
            lower: Vec::new(),
            upper: Vec::new(),
            objects: Vec::new(),
            overlays: vec![TileOverlay::default(); width as usize * height as usize],
            neighbor_decls: Default::default(),
            neighbors: [None; 4],
            active: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn id(&self) -> MapId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width_tiles(&self) -> u32 {
        self.width
    }

    pub fn height_tiles(&self) -> u32 {
        self.height
    }

    pub fn pixel_size(&self) -> Vec2 {
        Vec2::new(
            (self.width * TILE_WIDTH) as f32,
            (self.height * TILE_HEIGHT) as f32,
        )
    }

    pub fn pixel_bounds(&self) -> Rect {
        let size = self.pixel_size();
        Rect::new(0.0, 0.0, size.x, size.y)
    }

    pub fn collision_layer(&self) -> Option<&CollisionLayer> {
        self.collision.as_ref()
    }

    pub fn set_collision_layer(&mut self, layer: CollisionLayer) {
        self.collision = Some(layer);
    }

    /// Marks a tile solid, creating an empty collision layer on first use.
    pub fn set_solid(&mut self, tile: TilePos, solid: bool) {
        let (width, height) = (self.width, self.height);
        self.collision
            .get_or_insert_with(|| CollisionLayer::empty(width, height))
            .set_solid(tile, solid);
    }

    pub fn add_tileset(&mut self, tileset: Tileset) {
        self.tilesets.push(tileset);
    }

    pub fn add_layer(&mut self, layer: TileLayer, above_entities: bool) {
        if above_entities {
            self.upper.push(layer);
        } else {
            self.lower.push(layer);
        }
    }

    pub fn add_object(&mut self, object: MapObject) {
        self.objects.push(object);
    }

    pub fn lower_layers(&self) -> &[TileLayer] {
        &self.lower
    }

    pub fn upper_layers(&self) -> &[TileLayer] {
        &self.upper
    }

    pub fn objects(&self) -> &[MapObject] {
        &self.objects
    }

    pub fn neighbor(&self, direction: Direction) -> Option<NeighborEdge> {
        self.neighbors[direction.index()]
    }

    pub fn set_neighbor(&mut self, direction: Direction, edge: Option<NeighborEdge>) {
        self.neighbors[direction.index()] = edge;
    }

    /// Records the raw `"name[,offset]"` neighbor declaration resolved later by the registry.
    pub fn declare_neighbor(&mut self, direction: Direction, decl: impl Into<String>) {
        self.neighbor_decls[direction.index()] = Some(decl.into());
    }

    /// Finds the tileset holding `gid` and the source pixel origin within its image.
    pub fn tile_source(&self, gid: u32) -> Option<(&Tileset, (u32, u32))> {
        if gid == 0 {
            return None;
        }
        self.tilesets
            .iter()
            .rev()
            .find(|tileset| tileset.covers(gid))
            .map(|tileset| (tileset, tileset.source_rect(gid)))
    }

    pub fn gid_at(&self, layer: &TileLayer, tile: TilePos) -> u32 {
        if tile.x < 0 || tile.y < 0 || tile.x >= self.width as i32 || tile.y >= self.height as i32
        {
            return 0;
        }
        let index = tile.y as usize * self.width as usize + tile.x as usize;
        layer.gids.get(index).copied().unwrap_or(0)
    }

    pub fn overlay(&self, tile: TilePos) -> Option<&TileOverlay> {
        self.overlay_index(tile).and_then(|index| self.overlays.get(index))
    }

    pub fn overlay_mut(&mut self, tile: TilePos) -> Option<&mut TileOverlay> {
        self.overlay_index(tile)
            .and_then(move |index| self.overlays.get_mut(index))
    }

    fn overlay_index(&self, tile: TilePos) -> Option<usize> {
        if tile.x < 0 || tile.y < 0 || tile.x >= self.width as i32 || tile.y >= self.height as i32
        {
            return None;
        }
        Some(tile.y as usize * self.width as usize + tile.x as usize)
    }

    pub fn tile_collides(&self, tile: TilePos) -> bool {
        self.collision
            .as_ref()
            .is_some_and(|layer| layer.is_solid(tile))
    }

    pub fn object_collides(&self, point: Vec2) -> bool {
        self.objects.iter().any(|object| {
            object.bounds().contains(point) && object.has_collision(point - object.position())
        })
    }

    pub fn collides_at(&self, point: Vec2) -> bool {
        self.tile_collides(TilePos::containing(point)) || self.object_collides(point)
    }

    /// Dispatches exit, update, inside, and enter callbacks for the tracked position,
    /// in that order.
    pub fn update(&mut self, dt: Duration, tracked: Vec2) {
        let objects = &mut self.objects;
        let events = &mut self.events;

        self.active.retain(|&index| {
            let object = &mut objects[index];
            if object.bounds().contains(tracked) {
                return true;
            }
            let relative = tracked - object.position();
            object.on_exit(relative, events);
            false
        });

        for object in objects.iter_mut() {
            let relative = tracked - object.position();
            object.update(dt, relative, events);
        }

        for &index in &self.active {
            let object = &mut objects[index];
            let relative = tracked - object.position();
            object.while_inside(relative, events);
        }

        for (index, object) in objects.iter_mut().enumerate() {
            if !object.bounds().contains(tracked) || self.active.contains(&index) {
                continue;
            }
            let relative = tracked - object.position();
            object.on_enter(relative, events);
            self.active.push(index);
        }
    }

    /// Fires `on_exit` for every active object, used when the tracked entity leaves the map.
    pub fn release_tracking(&mut self, tracked: Vec2) {
        for index in std::mem::take(&mut self.active) {
            let object = &mut self.objects[index];
            let relative = tracked - object.position();
            object.on_exit(relative, &mut self.events);
        }
    }

    /// Fires `on_interact` on every object containing `position`, active or not.
    pub fn interact(&mut self, position: Vec2) -> bool {
        let mut handled = false;
        for object in self.objects.iter_mut() {
            if object.bounds().contains(position) {
                let relative = position - object.position();
                object.on_interact(relative, &mut self.events);
                handled = true;
            }
        }
        handled
    }

    pub fn active_objects(&self) -> impl Iterator<Item = &MapObject> + '_ {
        self.active.iter().map(|&index| &self.objects[index])
    }

    pub fn drain_events(&mut self) -> Vec<ObjectEvent> {
        std::mem::take(&mut self.events)
    }
}
