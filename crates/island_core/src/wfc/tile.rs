//! Tile variants, faces and sockets.
//!
//! A tile archetype is authored once with six sockets. Rotated variants are
//! derived from it by cycling the horizontal sockets (and their exclusion
//! lists) through up -> right -> down -> left and advancing the rotation
//! index of the vertical sockets.
//!
//! Axis convention: right is +X, up is +Z, above is +Y.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the six faces of a cell, also used as a neighbor direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Face {
    Up,
    Down,
    Left,
    Right,
    Above,
    Below,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::Up,
        Face::Down,
        Face::Left,
        Face::Right,
        Face::Above,
        Face::Below,
    ];

    /// Horizontal faces in clockwise rotation order.
    pub const CLOCKWISE: [Face; 4] = [Face::Up, Face::Right, Face::Down, Face::Left];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn opposite(self) -> Face {
        match self {
            Face::Up => Face::Down,
            Face::Down => Face::Up,
            Face::Left => Face::Right,
            Face::Right => Face::Left,
            Face::Above => Face::Below,
            Face::Below => Face::Above,
        }
    }

    pub fn is_horizontal(self) -> bool {
        !matches!(self, Face::Above | Face::Below)
    }

    /// Grid offset `(dx, dy, dz)` of the neighbor across this face.
    pub fn offset(self) -> (i64, i64, i64) {
        match self {
            Face::Up => (0, 0, 1),
            Face::Down => (0, 0, -1),
            Face::Left => (-1, 0, 0),
            Face::Right => (1, 0, 0),
            Face::Above => (0, 1, 0),
            Face::Below => (0, -1, 0),
        }
    }

    /// Slot in the per-face exclusion table (horizontal faces only).
    fn exclusion_slot(self) -> Option<usize> {
        match self {
            Face::Up => Some(0),
            Face::Right => Some(1),
            Face::Down => Some(2),
            Face::Left => Some(3),
            Face::Above | Face::Below => None,
        }
    }

    /// The face this one ends up on after a 90° clockwise turn.
    pub fn turned_clockwise(self) -> Face {
        match self {
            Face::Up => Face::Right,
            Face::Right => Face::Down,
            Face::Down => Face::Left,
            Face::Left => Face::Up,
            vertical => vertical,
        }
    }

    pub fn parse(name: &str) -> Option<Face> {
        match name {
            "up" => Some(Face::Up),
            "down" => Some(Face::Down),
            "left" => Some(Face::Left),
            "right" => Some(Face::Right),
            "above" => Some(Face::Above),
            "below" => Some(Face::Below),
            _ => None,
        }
    }
}

/// Rotation about the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [Rotation::R0, Rotation::R90, Rotation::R180, Rotation::R270];

    pub fn degrees(self) -> u16 {
        self.quarter_turns() as u16 * 90
    }

    pub fn quarter_turns(self) -> usize {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 1,
            Rotation::R180 => 2,
            Rotation::R270 => 3,
        }
    }

    pub fn from_quarter_turns(turns: usize) -> Rotation {
        Rotation::ALL[turns % 4]
    }

    pub fn from_degrees(degrees: u16) -> Option<Rotation> {
        match degrees % 360 {
            0 => Some(Rotation::R0),
            90 => Some(Rotation::R90),
            180 => Some(Rotation::R180),
            270 => Some(Rotation::R270),
            _ => None,
        }
    }

    /// The next rotation, +90°.
    pub fn next(self) -> Rotation {
        Rotation::from_quarter_turns(self.quarter_turns() + 1)
    }
}

impl TryFrom<u16> for Rotation {
    type Error = String;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        Rotation::from_degrees(degrees)
            .ok_or_else(|| format!("rotation must be a multiple of 90, got {}", degrees))
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

/// Identity of a variant: `(type_id, rotation)`.
///
/// Two variants are the same entity iff their keys are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileKey {
    pub type_id: String,
    #[serde(default)]
    pub rotation: Rotation,
}

impl TileKey {
    pub fn new(type_id: impl Into<String>, rotation: Rotation) -> Self {
        Self {
            type_id: type_id.into(),
            rotation,
        }
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.type_id, self.rotation.degrees())
    }
}

/// Compatibility descriptor of one face.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Socket {
    pub label: String,
    /// Horizontal faces: matches regardless of flip.
    pub symmetric: bool,
    /// Horizontal faces: two non-symmetric sockets match only if their flips differ.
    pub flipped: bool,
    /// Vertical faces: rotation in degrees, compared when not invariant.
    pub rotation_index: u16,
    /// Vertical faces: matches any rotation of another invariant socket.
    pub rotationally_invariant: bool,
}

impl Socket {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn symmetric(mut self) -> Self {
        self.symmetric = true;
        self
    }

    pub fn flipped(mut self) -> Self {
        self.flipped = true;
        self
    }

    pub fn invariant(mut self) -> Self {
        self.rotationally_invariant = true;
        self
    }

    pub fn with_rotation_index(mut self, rotation_index: u16) -> Self {
        self.rotation_index = rotation_index % 360;
        self
    }

    /// Whether `self` on a horizontal face can touch `other` on the facing side.
    pub fn fits_horizontal(&self, other: &Socket) -> bool {
        self.label == other.label
            && (self.symmetric || other.symmetric || self.flipped != other.flipped)
    }

    /// Whether `self` on a vertical face can touch `other` on the facing side.
    pub fn fits_vertical(&self, other: &Socket) -> bool {
        self.label == other.label
            && ((self.rotationally_invariant && other.rotationally_invariant)
                || self.rotation_index == other.rotation_index)
    }
}

/// Socket table indexed by `Face::index()`.
pub type Sockets = [Socket; 6];

/// Excluded neighbor type ids, one list per horizontal face.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Exclusions {
    lists: [Vec<String>; 4],
}

impl Exclusions {
    pub fn get(&self, face: Face) -> &[String] {
        match face.exclusion_slot() {
            Some(slot) => &self.lists[slot],
            None => &[],
        }
    }

    /// Add an excluded type on a horizontal face. Vertical faces are ignored.
    pub fn push(&mut self, face: Face, type_id: impl Into<String>) -> bool {
        match face.exclusion_slot() {
            Some(slot) => {
                self.lists[slot].push(type_id.into());
                true
            }
            None => false,
        }
    }

    pub fn excludes(&self, face: Face, type_id: &str) -> bool {
        self.get(face).iter().any(|t| t == type_id)
    }

    // Slots follow clockwise order, so a quarter turn shifts each list by one.
    fn turned_clockwise(&self) -> Exclusions {
        let mut lists = self.lists.clone();
        lists.rotate_right(1);
        Exclusions { lists }
    }
}

/// A tile as authored, before rotated variants are generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileArchetype {
    pub type_id: String,
    pub weight: u32,
    pub rotate_right: bool,
    pub rotate_180: bool,
    pub rotate_left: bool,
    pub fixed_count: usize,
    pub sockets: Sockets,
    pub exclusions: Exclusions,
}

impl TileArchetype {
    /// An archetype with every socket set to `socket`, weight 1, no rotations.
    pub fn uniform(type_id: impl Into<String>, socket: Socket) -> Self {
        Self {
            type_id: type_id.into(),
            weight: 1,
            rotate_right: false,
            rotate_180: false,
            rotate_left: false,
            fixed_count: 0,
            sockets: std::array::from_fn(|_| socket.clone()),
            exclusions: Exclusions::default(),
        }
    }

    pub fn with_socket(mut self, face: Face, socket: Socket) -> Self {
        self.sockets[face.index()] = socket;
        self
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_rotations(mut self, right: bool, half: bool, left: bool) -> Self {
        self.rotate_right = right;
        self.rotate_180 = half;
        self.rotate_left = left;
        self
    }

    pub fn with_fixed_count(mut self, fixed_count: usize) -> Self {
        self.fixed_count = fixed_count;
        self
    }

    pub fn excluding(mut self, face: Face, type_id: impl Into<String>) -> Self {
        self.exclusions.push(face, type_id);
        self
    }

    /// Rotations this archetype generates, the base rotation first.
    pub fn rotations(&self) -> Vec<Rotation> {
        let mut rotations = vec![Rotation::R0];
        if self.rotate_right {
            rotations.push(Rotation::R90);
        }
        if self.rotate_180 {
            rotations.push(Rotation::R180);
        }
        if self.rotate_left {
            rotations.push(Rotation::R270);
        }
        rotations
    }

    /// Only the 90° variant is generated (e.g. straight paths).
    pub fn quarter_turn_only(&self) -> bool {
        self.rotate_right && !self.rotate_180 && !self.rotate_left
    }

    /// Build the variant for `rotation`.
    pub fn variant(&self, archetype: usize, rotation: Rotation) -> TileVariant {
        let base = TileVariant {
            type_id: self.type_id.clone(),
            rotation: Rotation::R0,
            archetype,
            weight: self.weight,
            fixed_count: self.fixed_count,
            sockets: self.sockets.clone(),
            exclusions: self.exclusions.clone(),
        };
        let mut variant = base;
        for _ in 0..rotation.quarter_turns() {
            variant = variant.turned_clockwise();
        }
        if rotation != Rotation::R0 {
            variant.fixed_count = 0;
        }
        variant
    }
}

/// One concrete, possibly rotated, placeable tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileVariant {
    pub type_id: String,
    pub rotation: Rotation,
    /// Index of the archetype this variant was generated from.
    pub archetype: usize,
    pub weight: u32,
    pub fixed_count: usize,
    pub sockets: Sockets,
    pub exclusions: Exclusions,
}

impl TileVariant {
    pub fn key(&self) -> TileKey {
        TileKey::new(self.type_id.clone(), self.rotation)
    }

    pub fn socket(&self, face: Face) -> &Socket {
        &self.sockets[face.index()]
    }

    /// This variant turned 90° clockwise about the vertical axis.
    ///
    /// The socket on the up face moves to the right face, right to down,
    /// down to left, left to up. Vertical sockets keep their label and
    /// advance their rotation index by 90.
    pub fn turned_clockwise(&self) -> TileVariant {
        let mut sockets = self.sockets.clone();
        for face in Face::CLOCKWISE {
            sockets[face.turned_clockwise().index()] = self.sockets[face.index()].clone();
        }
        for face in [Face::Above, Face::Below] {
            let socket = &mut sockets[face.index()];
            socket.rotation_index = (socket.rotation_index + 90) % 360;
        }
        TileVariant {
            type_id: self.type_id.clone(),
            rotation: self.rotation.next(),
            archetype: self.archetype,
            weight: self.weight,
            fixed_count: self.fixed_count,
            sockets,
            exclusions: self.exclusions.turned_clockwise(),
        }
    }
}
