use std::collections::BTreeMap;
use std::time::Duration;

use thiserror::Error;

use super::geom::{Rect, TilePos, Vec2};

/// Raw object record as it appears in a map file, before its kind is resolved.
#[derive(Debug, Clone, Default)]
pub struct ObjectDefinition {
    pub kind: String,
    pub name: String,
    pub bounds: Rect,
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ObjectLoadError {
    #[error("unknown object type \"{0}\"")]
    UnknownType(String),
    #[error("missing required property \"{0}\"")]
    MissingProperty(&'static str),
    #[error("property \"{property}\" has invalid value \"{value}\"")]
    InvalidProperty {
        property: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectShape {
    Rect,
    Ellipse,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    Sign { texture: String, text: String },
    Door { map: String, tile: TilePos },
    Barrier { shape: ObjectShape },
}

/// Something a map object asks the game to do, or a note that the tracked
/// entity crossed its bounds.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectEvent {
    Entered { object: String },
    Exited { object: String },
    ShowText { object: String, text: String },
    Warp {
        object: String,
        map: String,
        tile: TilePos,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapObject {
    name: String,
    bounds: Rect,
    kind: ObjectKind,
}

impl MapObject {
    pub fn new(name: impl Into<String>, bounds: Rect, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            bounds,
            kind,
        }
    }

    pub fn from_definition(definition: &ObjectDefinition) -> Result<Self, ObjectLoadError> {
        let kind = match definition.kind.to_ascii_lowercase().as_str() {
            "sign" => ObjectKind::Sign {
                texture: required(definition, "texture")?.to_string(),
                text: required(definition, "text")?.to_string(),
            },
            "door" => ObjectKind::Door {
                map: required(definition, "map")?.to_string(),
                tile: TilePos::new(
                    parse_coordinate(definition, "x")?,
                    parse_coordinate(definition, "y")?,
                ),
            },
            "barrier" => ObjectKind::Barrier {
                shape: match definition.properties.get("shape").map(String::as_str) {
                    None | Some("rect") => ObjectShape::Rect,
                    Some("ellipse") => ObjectShape::Ellipse,
                    Some(other) => {
                        return Err(ObjectLoadError::InvalidProperty {
                            property: "shape",
                            value: other.to_string(),
                        })
                    }
                },
            },
            _ => return Err(ObjectLoadError::UnknownType(definition.kind.clone())),
        };
        Ok(Self::new(definition.name.clone(), definition.bounds, kind))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    pub fn position(&self) -> Vec2 {
        self.bounds.origin()
    }

    /// `relative` is measured from the object's top-left corner.
    pub fn has_collision(&self, relative: Vec2) -> bool {
        match &self.kind {
            ObjectKind::Sign { .. } => true,
            ObjectKind::Door { .. } => false,
            ObjectKind::Barrier {
                shape: ObjectShape::Rect,
            } => true,
            ObjectKind::Barrier {
                shape: ObjectShape::Ellipse,
            } => {
                let rx = self.bounds.width / 2.0;
                let ry = self.bounds.height / 2.0;
                if rx <= 0.0 || ry <= 0.0 {
                    return false;
                }
                let nx = (relative.x - rx) / rx;
                let ny = (relative.y - ry) / ry;
                nx * nx + ny * ny <= 1.0
            }
        }
    }

    pub(crate) fn update(&mut self, _dt: Duration, _relative: Vec2, _events: &mut Vec<ObjectEvent>) {
        // No kind animates on its own yet.
    }

    pub(crate) fn on_enter(&mut self, _relative: Vec2, events: &mut Vec<ObjectEvent>) {
        events.push(ObjectEvent::Entered {
            object: self.name.clone(),
        });
        if let ObjectKind::Door { map, tile } = &self.kind {
            events.push(ObjectEvent::Warp {
                object: self.name.clone(),
                map: map.clone(),
                tile: *tile,
            });
        }
    }

    pub(crate) fn while_inside(&mut self, _relative: Vec2, _events: &mut Vec<ObjectEvent>) {}

    pub(crate) fn on_exit(&mut self, _relative: Vec2, events: &mut Vec<ObjectEvent>) {
        events.push(ObjectEvent::Exited {
            object: self.name.clone(),
        });
    }

    pub(crate) fn on_interact(&mut self, _relative: Vec2, events: &mut Vec<ObjectEvent>) {
        if let ObjectKind::Sign { text, .. } = &self.kind {
            events.push(ObjectEvent::ShowText {
                object: self.name.clone(),
                text: text.clone(),
            });
        }
    }
}

fn required<'a>(
    definition: &'a ObjectDefinition,
    property: &'static str,
) -> Result<&'a str, ObjectLoadError> {
    definition
        .properties
        .get(property)
        .map(String::as_str)
        .ok_or(ObjectLoadError::MissingProperty(property))
}

fn parse_coordinate(
    definition: &ObjectDefinition,
    property: &'static str,
) -> Result<i32, ObjectLoadError> {
    let raw = required(definition, property)?;
    raw.trim()
        .parse()
        .map_err(|_| ObjectLoadError::InvalidProperty {
            property,
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(kind: &str, properties: &[(&str, &str)]) -> ObjectDefinition {
        ObjectDefinition {
            kind: kind.to_string(),
            name: "obj".to_string(),
            bounds: Rect::new(64.0, 64.0, 32.0, 32.0),
            properties: properties
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        }
    }

    #[test]
    fn sign_requires_texture_and_text() {
        let error = MapObject::from_definition(&definition("Sign", &[("texture", "sign.png")]))
            .expect_err("text is missing");
        assert_eq!(error, ObjectLoadError::MissingProperty("text"));

        let sign = MapObject::from_definition(&definition(
            "SIGN",
            &[("texture", "sign.png"), ("text", "Welcome")],
        ))
        .expect("sign loads");
        assert!(sign.has_collision(Vec2::new(0.0, 0.0)));
    }

    #[test]
    fn unknown_type_is_reported() {
        let error = MapObject::from_definition(&definition("fountain", &[]))
            .expect_err("unknown type");
        assert_eq!(error, ObjectLoadError::UnknownType("fountain".to_string()));
    }

    #[test]
    fn door_parses_destination_tile() {
        let door = MapObject::from_definition(&definition(
            "door",
            &[("map", "house"), ("x", "3"), ("y", "7")],
        ))
        .expect("door loads");
        assert_eq!(
            door.kind(),
            &ObjectKind::Door {
                map: "house".to_string(),
                tile: TilePos::new(3, 7)
            }
        );
        assert!(!door.has_collision(Vec2::new(16.0, 16.0)));

        let error = MapObject::from_definition(&definition(
            "door",
            &[("map", "house"), ("x", "three"), ("y", "7")],
        ))
        .expect_err("x is not a number");
        assert!(matches!(
            error,
            ObjectLoadError::InvalidProperty { property: "x", .. }
        ));
    }

    #[test]
    fn ellipse_barrier_leaves_corners_open() {
        let barrier = MapObject::from_definition(&definition("barrier", &[("shape", "ellipse")]))
            .expect("barrier loads");
        assert!(barrier.has_collision(Vec2::new(16.0, 16.0)));
        assert!(!barrier.has_collision(Vec2::new(1.0, 1.0)));
    }

    #[test]
    fn interacting_with_sign_shows_its_text() {
        let mut sign = MapObject::new(
            "board",
            Rect::new(0.0, 0.0, 32.0, 32.0),
            ObjectKind::Sign {
                texture: "sign.png".to_string(),
                text: "Ponyville".to_string(),
            },
        );
        let mut events = Vec::new();
        sign.on_interact(Vec2::new(4.0, 4.0), &mut events);
        assert_eq!(
            events,
            vec![ObjectEvent::ShowText {
                object: "board".to_string(),
                text: "Ponyville".to_string()
            }]
        );
    }
}
