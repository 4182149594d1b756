use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use thiserror::Error;
use tracing::{info, warn};

use super::clock::Seasons;
use super::geom::{Direction, Rect, TILE_HEIGHT, TILE_WIDTH};
use super::map::{CollisionLayer, Map, TileLayer, Tileset};
use super::objects::{MapObject, ObjectDefinition};
use super::registry::MapRegistry;

/// Upper bits of a layer gid carry Tiled's flip flags.
const GID_MASK: u32 = 0x1FFF_FFFF;
const COLLISION_LAYER_NAME: &str = "collision";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapErrorCode {
    XmlMalformed,
    InvalidRoot,
    MissingAttribute,
    InvalidValue,
    UnsupportedEncoding,
    InvalidTileData,
}

#[derive(Debug, Clone)]
pub struct MapDocumentError {
    pub code: MapErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for MapDocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for MapDocumentError {}

#[derive(Debug, Error)]
pub enum MapLoadError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Document(#[from] MapDocumentError),
    #[error("duplicate map name \"{map}\"")]
    DuplicateMap { map: String },
    #[error("map \"{map}\" declares unknown {direction} neighbor \"{neighbor}\"")]
    UnknownNeighbor {
        map: String,
        direction: Direction,
        neighbor: String,
    },
    #[error("map \"{map}\" has invalid {direction} neighbor offset \"{value}\"")]
    InvalidNeighborOffset {
        map: String,
        direction: Direction,
        value: String,
    },
}

/// Loads the map list at `path` and every map it names, then wires neighbors.
///
/// The list is a `<maps>` document of `<map id="name" file="relative.tmx"/>` entries.
/// Map files are resolved relative to the list's directory and receive ids in
/// document order.
pub fn load_registry(path: &Path) -> Result<MapRegistry, MapLoadError> {
    let raw = read_file(path)?;
    let doc = Document::parse(&raw).map_err(|error| malformed(path, &error))?;
    let ctx = DocContext { doc: &doc, path };

    let root = doc.root_element();
    if !root.has_tag_name("maps") {
        return Err(ctx
            .error_at(root, MapErrorCode::InvalidRoot, "root element must be <maps>".to_string())
            .into());
    }

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut registry = MapRegistry::new();
    for entry in root.children().filter(|node| node.has_tag_name("map")) {
        let name = ctx.required_attr(entry, "id")?;
        let file = ctx.required_attr(entry, "file")?;
        let map = load_map(name, &base_dir.join(file))?;
        registry.insert(map)?;
    }

    registry.wire_neighbors()?;
    info!(
        path = %path.display(),
        maps = registry.len(),
        "map_registry_loaded"
    );
    Ok(registry)
}

pub fn load_map(name: &str, path: &Path) -> Result<Map, MapLoadError> {
    let raw = read_file(path)?;
    parse_map(name, path, &raw)
}

/// Parses TMX text. `path` names the document in errors and anchors relative
/// tileset and image paths.
pub fn parse_map(name: &str, path: &Path, raw: &str) -> Result<Map, MapLoadError> {
    let doc = Document::parse(raw).map_err(|error| malformed(path, &error))?;
    let ctx = DocContext { doc: &doc, path };

    let root = doc.root_element();
    if !root.has_tag_name("map") {
        return Err(ctx
            .error_at(root, MapErrorCode::InvalidRoot, "root element must be <map>".to_string())
            .into());
    }

    let width = ctx.parse_attr::<u32>(root, "width")?;
    let height = ctx.parse_attr::<u32>(root, "height")?;
    let mut map = Map::new(name, width, height);
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

    for (key, value) in read_properties(root) {
        let direction = Direction::ALL
            .into_iter()
            .find(|direction| direction.compass_name().eq_ignore_ascii_case(&key));
        if let Some(direction) = direction {
            map.declare_neighbor(direction, value);
        }
    }

    let mut has_collision = false;
    for child in root.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "tileset" => {
                let tileset = parse_tileset(&ctx, child, base_dir)?;
                map.add_tileset(tileset);
            }
            "layer" => {
                let layer_name = child.attribute("name").unwrap_or_default().to_string();
                let gids = parse_layer_data(&ctx, child, width, height)?;
                if layer_name.eq_ignore_ascii_case(COLLISION_LAYER_NAME) {
                    map.set_collision_layer(CollisionLayer::from_gids(width, height, &gids));
                    has_collision = true;
                    continue;
                }
                let properties = read_properties(child);
                let seasons = properties.get("season").map(|raw| Seasons::parse(raw));
                let above = properties
                    .get("render")
                    .is_some_and(|value| value.eq_ignore_ascii_case("above"));
                map.add_layer(
                    TileLayer {
                        name: layer_name,
                        seasons,
                        gids,
                    },
                    above,
                );
            }
            "objectgroup" => load_objects(&ctx, child, &mut map)?,
            _ => {}
        }
    }

    if !has_collision {
        warn!(map = name, path = %path.display(), "map_missing_collision_layer");
    }
    info!(
        map = name,
        width,
        height,
        objects = map.objects().len(),
        "map_loaded"
    );
    Ok(map)
}

struct DocContext<'a, 'input> {
    doc: &'a Document<'input>,
    path: &'a Path,
}

impl<'a, 'input> DocContext<'a, 'input> {
    fn error_at(&self, node: Node<'_, '_>, code: MapErrorCode, message: String) -> MapDocumentError {
        let pos = self.doc.text_pos_at(node.range().start);
        MapDocumentError {
            code,
            message,
            file_path: self.path.to_path_buf(),
            location: Some(SourceLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            }),
        }
    }

    fn required_attr<'n>(
        &self,
        node: Node<'n, '_>,
        attr: &str,
    ) -> Result<&'n str, MapDocumentError> {
        node.attribute(attr).ok_or_else(|| {
            self.error_at(
                node,
                MapErrorCode::MissingAttribute,
                format!("<{}> is missing attribute \"{attr}\"", node.tag_name().name()),
            )
        })
    }

    fn parse_attr<T: std::str::FromStr>(
        &self,
        node: Node<'_, '_>,
        attr: &str,
    ) -> Result<T, MapDocumentError> {
        let raw = self.required_attr(node, attr)?;
        self.parse_value(node, attr, raw)
    }

    fn parse_optional_attr<T: std::str::FromStr>(
        &self,
        node: Node<'_, '_>,
        attr: &str,
    ) -> Result<Option<T>, MapDocumentError> {
        node.attribute(attr)
            .map(|raw| self.parse_value(node, attr, raw))
            .transpose()
    }

    fn parse_value<T: std::str::FromStr>(
        &self,
        node: Node<'_, '_>,
        attr: &str,
        raw: &str,
    ) -> Result<T, MapDocumentError> {
        raw.trim().parse::<T>().map_err(|_| {
            self.error_at(
                node,
                MapErrorCode::InvalidValue,
                format!(
                    "attribute \"{attr}\" on <{}> has invalid value \"{raw}\"",
                    node.tag_name().name()
                ),
            )
        })
    }
}

fn read_file(path: &Path) -> Result<String, MapLoadError> {
    fs::read_to_string(path).map_err(|source| MapLoadError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn malformed(path: &Path, error: &roxmltree::Error) -> MapDocumentError {
    MapDocumentError {
        code: MapErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    }
}

/// Collects `<properties><property name value/></properties>` under `node`.
/// Multi-line values may be written as element text instead of a `value` attribute.
fn read_properties(node: Node<'_, '_>) -> BTreeMap<String, String> {
    node.children()
        .filter(|child| child.has_tag_name("properties"))
        .flat_map(|properties| properties.children())
        .filter(|child| child.has_tag_name("property"))
        .filter_map(|property| {
            let name = property.attribute("name")?;
            let value = property
                .attribute("value")
                .or_else(|| property.text())
                .unwrap_or_default();
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

fn parse_tileset(
    ctx: &DocContext<'_, '_>,
    node: Node<'_, '_>,
    base_dir: &Path,
) -> Result<Tileset, MapLoadError> {
    let first_gid = ctx.parse_attr::<u32>(node, "firstgid")?;

    if let Some(source) = node.attribute("source") {
        let tsx_path = base_dir.join(source);
        let raw = read_file(&tsx_path)?;
        let doc = Document::parse(&raw).map_err(|error| malformed(&tsx_path, &error))?;
        let external = DocContext {
            doc: &doc,
            path: &tsx_path,
        };
        let root = doc.root_element();
        if !root.has_tag_name("tileset") {
            return Err(external
                .error_at(
                    root,
                    MapErrorCode::InvalidRoot,
                    "root element must be <tileset>".to_string(),
                )
                .into());
        }
        let tsx_dir = tsx_path.parent().unwrap_or(base_dir);
        return Ok(tileset_body(&external, root, first_gid, tsx_dir)?);
    }

    Ok(tileset_body(ctx, node, first_gid, base_dir)?)
}

fn tileset_body(
    ctx: &DocContext<'_, '_>,
    node: Node<'_, '_>,
    first_gid: u32,
    base_dir: &Path,
) -> Result<Tileset, MapDocumentError> {
    let image = node
        .children()
        .find(|child| child.has_tag_name("image"))
        .ok_or_else(|| {
            ctx.error_at(
                node,
                MapErrorCode::MissingAttribute,
                "<tileset> has no <image>".to_string(),
            )
        })?;
    let source = ctx.required_attr(image, "source")?;

    let columns = match ctx.parse_optional_attr::<u32>(node, "columns")? {
        Some(columns) => columns,
        None => ctx.parse_attr::<u32>(image, "width")? / TILE_WIDTH,
    };
    let tile_count = match ctx.parse_optional_attr::<u32>(node, "tilecount")? {
        Some(count) => count,
        None => columns * (ctx.parse_attr::<u32>(image, "height")? / TILE_HEIGHT),
    };

    Ok(Tileset {
        first_gid,
        image: base_dir.join(source).to_string_lossy().into_owned(),
        columns,
        tile_count,
    })
}

fn parse_layer_data(
    ctx: &DocContext<'_, '_>,
    layer: Node<'_, '_>,
    width: u32,
    height: u32,
) -> Result<Vec<u32>, MapDocumentError> {
    let data = layer
        .children()
        .find(|child| child.has_tag_name("data"))
        .ok_or_else(|| {
            ctx.error_at(
                layer,
                MapErrorCode::InvalidTileData,
                "<layer> has no <data>".to_string(),
            )
        })?;

    let gids = match data.attribute("encoding") {
        Some("csv") => data
            .text()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|cell| !cell.is_empty())
            .map(|cell| {
                cell.parse::<u32>().map_err(|_| {
                    ctx.error_at(
                        data,
                        MapErrorCode::InvalidTileData,
                        format!("invalid tile id \"{cell}\""),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
        None => data
            .children()
            .filter(|child| child.has_tag_name("tile"))
            .map(|tile| {
                ctx.parse_optional_attr::<u32>(tile, "gid")
                    .map(|gid| gid.unwrap_or(0))
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => {
            return Err(ctx.error_at(
                data,
                MapErrorCode::UnsupportedEncoding,
                format!("tile data encoding \"{other}\" is not supported; use csv"),
            ))
        }
    };

    let expected = width as usize * height as usize;
    if gids.len() != expected {
        return Err(ctx.error_at(
            data,
            MapErrorCode::InvalidTileData,
            format!("expected {expected} tiles, found {}", gids.len()),
        ));
    }
    Ok(gids.into_iter().map(|gid| gid & GID_MASK).collect())
}

/// Objects that fail to load are logged and skipped; the rest of the map still loads.
fn load_objects(
    ctx: &DocContext<'_, '_>,
    group: Node<'_, '_>,
    map: &mut Map,
) -> Result<(), MapDocumentError> {
    for node in group.children().filter(|child| child.has_tag_name("object")) {
        let left = ctx.parse_optional_attr::<f32>(node, "x")?.unwrap_or(0.0);
        let top = ctx.parse_optional_attr::<f32>(node, "y")?.unwrap_or(0.0);
        let width = ctx.parse_optional_attr::<f32>(node, "width")?.unwrap_or(0.0);
        let height = ctx.parse_optional_attr::<f32>(node, "height")?.unwrap_or(0.0);

        let definition = ObjectDefinition {
            kind: node
                .attribute("type")
                .or_else(|| node.attribute("class"))
                .unwrap_or_default()
                .to_string(),
            name: node
                .attribute("name")
                .map(str::to_string)
                .unwrap_or_else(|| format!("object_{}", node.attribute("id").unwrap_or("?"))),
            bounds: Rect::new(left, top, width, height),
            properties: read_properties(node),
        };

        match MapObject::from_definition(&definition) {
            Ok(object) => map.add_object(object),
            Err(error) => {
                let pos = ctx.doc.text_pos_at(node.range().start);
                warn!(
                    map = map.name(),
                    object = %definition.name,
                    kind = %definition.kind,
                    line = pos.row,
                    error = %error,
                    "map_object_load_failed"
                );
            }
        }
    }
    Ok(())
}
