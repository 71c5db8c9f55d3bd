//! Tile catalog: the variant arena and its adjacency table.
//!
//! Variants are stored in one vector and referred to by `TileId`. The
//! adjacency table is built once from a single pairwise predicate, so if B is
//! a legal neighbor of A across a face then A is a legal neighbor of B across
//! the opposite face.

use super::tile::{Face, Rotation, TileArchetype, TileKey, TileVariant};
use std::collections::HashMap;
use std::fmt;

/// Index of a variant in its catalog.
pub type TileId = usize;

/// Errors building or querying a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    Empty,
    DuplicateVariant(TileKey),
    NoVariantFound { type_id: String, rotation: Rotation },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Empty => write!(f, "tile catalog has no tiles"),
            CatalogError::DuplicateVariant(key) => write!(f, "duplicate tile variant {}", key),
            CatalogError::NoVariantFound { type_id, rotation } => write!(
                f,
                "no variant '{}' with rotation {}",
                type_id,
                rotation.degrees()
            ),
        }
    }
}

impl std::error::Error for CatalogError {}

impl CatalogError {
    pub fn not_found(key: &TileKey) -> Self {
        CatalogError::NoVariantFound {
            type_id: key.type_id.clone(),
            rotation: key.rotation,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TileCatalog {
    archetypes: Vec<TileArchetype>,
    variants: Vec<TileVariant>,
    by_key: HashMap<TileKey, TileId>,
    /// `adjacency[face][tile]`: tiles that may sit across `face` of `tile`.
    adjacency: [Vec<Vec<TileId>>; 6],
}

impl TileCatalog {
    /// Generate all variants and build the adjacency table.
    ///
    /// Base variants come first in archetype order, followed by the rotated
    /// variants of each archetype (90, 180, 270).
    pub fn new(archetypes: Vec<TileArchetype>, apply_exclusions: bool) -> Result<Self, CatalogError> {
        if archetypes.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut variants: Vec<TileVariant> = archetypes
            .iter()
            .enumerate()
            .map(|(i, archetype)| archetype.variant(i, Rotation::R0))
            .collect();
        for (i, archetype) in archetypes.iter().enumerate() {
            for rotation in archetype.rotations().into_iter().skip(1) {
                variants.push(archetype.variant(i, rotation));
            }
        }

        let mut by_key = HashMap::with_capacity(variants.len());
        for (id, variant) in variants.iter().enumerate() {
            let key = variant.key();
            if by_key.insert(key.clone(), id).is_some() {
                return Err(CatalogError::DuplicateVariant(key));
            }
        }

        let adjacency = std::array::from_fn(|f| {
            let face = Face::ALL[f];
            variants
                .iter()
                .map(|a| {
                    variants
                        .iter()
                        .enumerate()
                        .filter(|(_, b)| compatible(a, face, b, apply_exclusions))
                        .map(|(id, _)| id)
                        .collect()
                })
                .collect()
        });

        Ok(Self {
            archetypes,
            variants,
            by_key,
            adjacency,
        })
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn variant(&self, id: TileId) -> &TileVariant {
        &self.variants[id]
    }

    pub fn variants(&self) -> &[TileVariant] {
        &self.variants
    }

    pub fn archetypes(&self) -> &[TileArchetype] {
        &self.archetypes
    }

    pub fn key(&self, id: TileId) -> TileKey {
        self.variants[id].key()
    }

    /// Tiles that may sit across `face` of `tile`.
    pub fn neighbors(&self, tile: TileId, face: Face) -> &[TileId] {
        &self.adjacency[face.index()][tile]
    }

    pub fn find(&self, key: &TileKey) -> Option<TileId> {
        self.by_key.get(key).copied()
    }

    pub fn lookup(&self, key: &TileKey) -> Result<TileId, CatalogError> {
        self.find(key).ok_or_else(|| CatalogError::not_found(key))
    }

    /// The same tile turned +90°.
    ///
    /// Archetypes that only generate the 90° variant alternate between 0°
    /// and 90°.
    pub fn rotated(&self, id: TileId) -> Result<TileId, CatalogError> {
        let variant = &self.variants[id];
        let mut rotation = variant.rotation.next();
        if self.archetypes[variant.archetype].quarter_turn_only() {
            rotation = match rotation {
                Rotation::R180 => Rotation::R0,
                Rotation::R270 => Rotation::R90,
                other => other,
            };
        }
        self.lookup(&TileKey::new(variant.type_id.clone(), rotation))
    }
}

/// Whether `b` may sit across `face` of `a`.
fn compatible(a: &TileVariant, face: Face, b: &TileVariant, apply_exclusions: bool) -> bool {
    let own = a.socket(face);
    let other = b.socket(face.opposite());
    if !face.is_horizontal() {
        return own.fits_vertical(other);
    }
    if apply_exclusions
        && (a.exclusions.excludes(face, &b.type_id)
            || b.exclusions.excludes(face.opposite(), &a.type_id))
    {
        return false;
    }
    own.fits_horizontal(other)
}
