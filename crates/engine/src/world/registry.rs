use std::collections::HashMap;
use std::ops::{Index, IndexMut};

use tracing::{debug, info};

use super::geom::{Direction, TILE_HEIGHT, TILE_WIDTH};
use super::loader::MapLoadError;
use super::map::{Map, MapId, NeighborEdge};
use super::seam::Seam;

/// Every loaded map, addressable by dense id or by name.
#[derive(Debug, Default)]
pub struct MapRegistry {
    maps: Vec<Map>,
    by_name: HashMap<String, MapId>,
    active: Option<MapId>,
}

impl MapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mut map: Map) -> Result<MapId, MapLoadError> {
        if self.by_name.contains_key(map.name()) {
            return Err(MapLoadError::DuplicateMap {
                map: map.name().to_string(),
            });
        }
        let id = MapId(self.maps.len() as u32);
        map.id = id;
        self.by_name.insert(map.name().to_string(), id);
        debug!(map = map.name(), id = id.0, "map_registered");
        self.maps.push(map);
        Ok(id)
    }

    /// Resolves each map's declared `"name[,offset]"` neighbors. Offsets are in tiles
    /// along the axis perpendicular to the edge.
    pub fn wire_neighbors(&mut self) -> Result<(), MapLoadError> {
        let mut resolved = Vec::new();
        for map in &self.maps {
            for direction in Direction::ALL {
                let Some(decl) = map.neighbor_decls[direction.index()].as_deref() else {
                    continue;
                };
                let edge = self.parse_neighbor(map.name(), direction, decl)?;
                resolved.push((map.id(), direction, edge));
            }
        }

        let wired = resolved.len();
        for (id, direction, edge) in resolved {
            self.maps[id.0 as usize].set_neighbor(direction, Some(edge));
        }
        info!(maps = self.maps.len(), edges = wired, "map_neighbors_wired");
        Ok(())
    }

    fn parse_neighbor(
        &self,
        map: &str,
        direction: Direction,
        decl: &str,
    ) -> Result<NeighborEdge, MapLoadError> {
        let (name, offset) = match decl.split_once(',') {
            Some((name, offset)) => (name.trim(), Some(offset.trim())),
            None => (decl.trim(), None),
        };

        let neighbor = self
            .id_of(name)
            .ok_or_else(|| MapLoadError::UnknownNeighbor {
                map: map.to_string(),
                direction,
                neighbor: name.to_string(),
            })?;

        let offset_tiles = match offset {
            None | Some("") => 0,
            Some(raw) => raw
                .parse::<i32>()
                .map_err(|_| MapLoadError::InvalidNeighborOffset {
                    map: map.to_string(),
                    direction,
                    value: raw.to_string(),
                })?,
        };

        let tile_span = if direction.is_horizontal() {
            TILE_HEIGHT
        } else {
            TILE_WIDTH
        };
        Ok(NeighborEdge {
            map: neighbor,
            offset_px: (offset_tiles * tile_span as i32) as f32,
        })
    }

    pub fn get(&self, id: MapId) -> Option<&Map> {
        self.maps.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: MapId) -> Option<&mut Map> {
        self.maps.get_mut(id.0 as usize)
    }

    pub fn id_of(&self, name: &str) -> Option<MapId> {
        self.by_name.get(name).copied()
    }

    pub fn by_name(&self, name: &str) -> Option<&Map> {
        self.id_of(name).and_then(|id| self.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Map> + '_ {
        self.maps.iter()
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn active(&self) -> Option<MapId> {
        self.active
    }

    pub fn set_active(&mut self, id: MapId) {
        if self.get(id).is_some() {
            self.active = Some(id);
        }
    }

    /// The neighbor across `direction` from `from`, with the seam carrying points
    /// from `from`'s frame into the neighbor's.
    pub fn seam(&self, from: MapId, direction: Direction) -> Option<(MapId, Seam)> {
        let source = self.get(from)?;
        let edge = source.neighbor(direction)?;
        let target = self.get(edge.map)?;
        Some((
            edge.map,
            Seam {
                direction,
                from_size: source.pixel_size(),
                to_size: target.pixel_size(),
                offset_px: edge.offset_px,
            },
        ))
    }
}

impl Index<MapId> for MapRegistry {
    type Output = Map;

    fn index(&self, id: MapId) -> &Map {
        &self.maps[id.0 as usize]
    }
}

impl IndexMut<MapId> for MapRegistry {
    fn index_mut(&mut self, id: MapId) -> &mut Map {
        &mut self.maps[id.0 as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::geom::Vec2;

    #[test]
    fn ids_follow_insertion_order() {
        let mut registry = MapRegistry::new();
        let a = registry.insert(Map::new("a", 4, 4)).expect("insert a");
        let b = registry.insert(Map::new("b", 4, 4)).expect("insert b");
        assert_eq!((a, b), (MapId(0), MapId(1)));
        assert_eq!(registry.id_of("b"), Some(b));
        assert_eq!(registry[b].id(), b);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = MapRegistry::new();
        registry.insert(Map::new("a", 4, 4)).expect("insert a");
        let error = registry.insert(Map::new("a", 2, 2)).expect_err("duplicate");
        assert!(matches!(error, MapLoadError::DuplicateMap { map } if map == "a"));
    }

    #[test]
    fn neighbor_offsets_scale_along_perpendicular_axis() {
        let mut registry = MapRegistry::new();
        let mut town = Map::new("town", 20, 15);
        town.declare_neighbor(Direction::Right, "forest, 2");
        town.declare_neighbor(Direction::Down, "beach,-1");
        registry.insert(town).expect("insert town");
        registry.insert(Map::new("forest", 10, 30)).expect("insert forest");
        registry.insert(Map::new("beach", 40, 10)).expect("insert beach");
        registry.wire_neighbors().expect("wire");

        let town = registry.by_name("town").expect("town");
        assert_eq!(
            town.neighbor(Direction::Right),
            Some(NeighborEdge {
                map: MapId(1),
                offset_px: 64.0
            })
        );
        assert_eq!(
            town.neighbor(Direction::Down),
            Some(NeighborEdge {
                map: MapId(2),
                offset_px: -32.0
            })
        );
        assert_eq!(town.neighbor(Direction::Up), None);

        let (forest, seam) = registry
            .seam(MapId(0), Direction::Right)
            .expect("right seam");
        assert_eq!(forest, MapId(1));
        assert_eq!(seam.forward(Vec2::new(641.0, 10.0)), Vec2::new(1.0, 74.0));
    }

    #[test]
    fn unknown_neighbor_fails_wiring() {
        let mut registry = MapRegistry::new();
        let mut town = Map::new("town", 4, 4);
        town.declare_neighbor(Direction::Left, "nowhere");
        registry.insert(town).expect("insert");
        let error = registry.wire_neighbors().expect_err("unknown neighbor");
        assert!(matches!(
            error,
            MapLoadError::UnknownNeighbor { neighbor, direction: Direction::Left, .. }
                if neighbor == "nowhere"
        ));
    }

    #[test]
    fn bad_offset_fails_wiring() {
        let mut registry = MapRegistry::new();
        let mut town = Map::new("town", 4, 4);
        town.declare_neighbor(Direction::Up, "town,north");
        registry.insert(town).expect("insert");
        assert!(matches!(
            registry.wire_neighbors(),
            Err(MapLoadError::InvalidNeighborOffset { .. })
        ));
    }
}
