//! XML tileset loader.
//!
//! ```xml
//! <tileset>
//!   <tile type="path" probability="4" rotateRight="true" fixed="0">
//!     <socket face="up" label="PATH" symmetric="true"/>
//!     <socket face="right" label="GRASS" symmetric="true"/>
//!     <socket face="down" label="PATH" symmetric="true"/>
//!     <socket face="left" label="GRASS" symmetric="true"/>
//!     <socket face="above" label="EMPTY" invariant="true"/>
//!     <socket face="below" label="GROUND" invariant="true"/>
//!     <exclude face="up" type="pine"/>
//!   </tile>
//! </tileset>
//! ```
//!
//! Every tile must declare all six faces. Exclusions are only valid on
//! horizontal faces.

use super::tile::{Exclusions, Face, Socket, TileArchetype};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TilesetError {
    /// File not found or cannot be read
    FileNotFound(String),
    /// XML syntax error
    XmlError(String),
    MissingAttribute { element: String, attribute: String },
    InvalidAttribute {
        element: String,
        attribute: String,
        value: String,
        reason: String,
    },
    MissingSocket { tile: String, face: Face },
    UnknownFace(String),
    /// Element not allowed at this position
    UnexpectedElement(String),
}

impl fmt::Display for TilesetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TilesetError::FileNotFound(path) => write!(f, "file not found: {}", path),
            TilesetError::XmlError(msg) => write!(f, "XML error: {}", msg),
            TilesetError::MissingAttribute { element, attribute } => {
                write!(f, "missing attribute '{}' on <{}>", attribute, element)
            }
            TilesetError::InvalidAttribute {
                element,
                attribute,
                value,
                reason,
            } => write!(
                f,
                "invalid attribute {}='{}' on <{}>: {}",
                attribute, value, element, reason
            ),
            TilesetError::MissingSocket { tile, face } => {
                write!(f, "tile '{}' has no socket for face {:?}", tile, face)
            }
            TilesetError::UnknownFace(name) => write!(f, "unknown face: {}", name),
            TilesetError::UnexpectedElement(name) => write!(f, "unexpected element <{}>", name),
        }
    }
}

impl std::error::Error for TilesetError {}

/// Load archetypes from a tileset file.
pub fn load_tileset(path: impl AsRef<Path>) -> Result<Vec<TileArchetype>, TilesetError> {
    let path = path.as_ref();
    let xml = std::fs::read_to_string(path)
        .map_err(|_| TilesetError::FileNotFound(path.display().to_string()))?;
    parse_tileset(&xml)
}

/// Parse archetypes from tileset XML text.
pub fn parse_tileset(xml: &str) -> Result<Vec<TileArchetype>, TilesetError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut archetypes = Vec::new();
    let mut current: Option<PendingTile> = None;
    let mut in_tileset = false;

    loop {
        let (element, self_closing) = match reader.read_event() {
            Ok(Event::Start(e)) => (e, false),
            Ok(Event::Empty(e)) => (e, true),
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"tile" {
                    if let Some(tile) = current.take() {
                        archetypes.push(tile.finish()?);
                    }
                } else if e.name().as_ref() == b"tileset" {
                    in_tileset = false;
                }
                continue;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(TilesetError::XmlError(format!("{}", e))),
            _ => continue,
        };

        let name = element_name(&element)?;
        let attrs = parse_attributes(&element)?;
        match (name.as_str(), current.as_mut()) {
            ("tileset", None) if !in_tileset => in_tileset = !self_closing,
            ("tile", None) if in_tileset => {
                let tile = PendingTile::from_attributes(&attrs)?;
                if self_closing {
                    archetypes.push(tile.finish()?);
                } else {
                    current = Some(tile);
                }
            }
            ("socket", Some(tile)) => {
                let face = parse_face(&name, &attrs)?;
                tile.sockets[face.index()] = Some(parse_socket(&attrs)?);
            }
            ("exclude", Some(tile)) => {
                let face = parse_face(&name, &attrs)?;
                let type_id = required(&name, &attrs, "type")?;
                if !tile.exclusions.push(face, type_id) {
                    return Err(TilesetError::InvalidAttribute {
                        element: name.clone(),
                        attribute: "face".into(),
                        value: format!("{:?}", face).to_lowercase(),
                        reason: "exclusions apply to horizontal faces only".into(),
                    });
                }
            }
            _ => return Err(TilesetError::UnexpectedElement(name.clone())),
        }
    }

    if let Some(tile) = current {
        return Err(TilesetError::XmlError(format!(
            "unclosed <tile type=\"{}\">",
            tile.type_id
        )));
    }
    Ok(archetypes)
}

struct PendingTile {
    type_id: String,
    weight: u32,
    rotate_right: bool,
    rotate_180: bool,
    rotate_left: bool,
    fixed_count: usize,
    sockets: [Option<Socket>; 6],
    exclusions: Exclusions,
}

impl PendingTile {
    fn from_attributes(attrs: &HashMap<String, String>) -> Result<Self, TilesetError> {
        Ok(Self {
            type_id: required("tile", attrs, "type")?.to_string(),
            weight: parse_number("tile", attrs, "probability", 1)?,
            rotate_right: parse_bool("tile", attrs, "rotateRight")?,
            rotate_180: parse_bool("tile", attrs, "rotate180")?,
            rotate_left: parse_bool("tile", attrs, "rotateLeft")?,
            fixed_count: parse_number("tile", attrs, "fixed", 0)?,
            sockets: Default::default(),
            exclusions: Exclusions::default(),
        })
    }

    fn finish(self) -> Result<TileArchetype, TilesetError> {
        let mut sockets: Vec<Socket> = Vec::with_capacity(6);
        for (face, socket) in Face::ALL.into_iter().zip(self.sockets) {
            sockets.push(socket.ok_or_else(|| TilesetError::MissingSocket {
                tile: self.type_id.clone(),
                face,
            })?);
        }
        let sockets = sockets
            .try_into()
            .map_err(|_| TilesetError::XmlError("socket table size".into()))?;
        Ok(TileArchetype {
            type_id: self.type_id,
            weight: self.weight,
            rotate_right: self.rotate_right,
            rotate_180: self.rotate_180,
            rotate_left: self.rotate_left,
            fixed_count: self.fixed_count,
            sockets,
            exclusions: self.exclusions,
        })
    }
}

fn parse_socket(attrs: &HashMap<String, String>) -> Result<Socket, TilesetError> {
    let rotation_index: u16 = parse_number("socket", attrs, "rotationIndex", 0)?;
    if rotation_index % 90 != 0 {
        return Err(TilesetError::InvalidAttribute {
            element: "socket".into(),
            attribute: "rotationIndex".into(),
            value: rotation_index.to_string(),
            reason: "must be a multiple of 90".into(),
        });
    }
    Ok(Socket {
        label: required("socket", attrs, "label")?.to_string(),
        symmetric: parse_bool("socket", attrs, "symmetric")?,
        flipped: parse_bool("socket", attrs, "flipped")?,
        rotation_index: rotation_index % 360,
        rotationally_invariant: parse_bool("socket", attrs, "invariant")?,
    })
}

fn parse_face(element: &str, attrs: &HashMap<String, String>) -> Result<Face, TilesetError> {
    let name = required(element, attrs, "face")?;
    Face::parse(name).ok_or_else(|| TilesetError::UnknownFace(name.to_string()))
}

fn required<'a>(
    element: &str,
    attrs: &'a HashMap<String, String>,
    attribute: &str,
) -> Result<&'a str, TilesetError> {
    attrs
        .get(attribute)
        .map(String::as_str)
        .ok_or_else(|| TilesetError::MissingAttribute {
            element: element.to_string(),
            attribute: attribute.to_string(),
        })
}

fn parse_bool(
    element: &str,
    attrs: &HashMap<String, String>,
    attribute: &str,
) -> Result<bool, TilesetError> {
    match attrs.get(attribute).map(String::as_str) {
        None | Some("false") | Some("False") | Some("0") => Ok(false),
        Some("true") | Some("True") | Some("1") => Ok(true),
        Some(other) => Err(TilesetError::InvalidAttribute {
            element: element.to_string(),
            attribute: attribute.to_string(),
            value: other.to_string(),
            reason: "expected true or false".into(),
        }),
    }
}

fn parse_number<T: std::str::FromStr>(
    element: &str,
    attrs: &HashMap<String, String>,
    attribute: &str,
    default: T,
) -> Result<T, TilesetError> {
    match attrs.get(attribute) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| TilesetError::InvalidAttribute {
                element: element.to_string(),
                attribute: attribute.to_string(),
                value: value.clone(),
                reason: "expected a non-negative integer".into(),
            }),
    }
}

fn element_name(elem: &BytesStart) -> Result<String, TilesetError> {
    std::str::from_utf8(elem.name().as_ref())
        .map(str::to_string)
        .map_err(|e| TilesetError::XmlError(format!("invalid UTF-8 in element name: {}", e)))
}

fn parse_attributes(elem: &BytesStart) -> Result<HashMap<String, String>, TilesetError> {
    let mut attrs = HashMap::new();
    for attr_result in elem.attributes() {
        let attr =
            attr_result.map_err(|e| TilesetError::XmlError(format!("attribute error: {}", e)))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| TilesetError::XmlError(format!("invalid UTF-8 in attribute key: {}", e)))?
            .to_string();
        let value = std::str::from_utf8(&attr.value)
            .map_err(|e| TilesetError::XmlError(format!("invalid UTF-8 in attribute value: {}", e)))?
            .to_string();
        attrs.insert(key, value);
    }
    Ok(attrs)
}
