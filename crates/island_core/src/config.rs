//! Solver configuration.
//!
//! Every toggle is read once when a solver is built. Files are plain JSON; any
//! field left out takes its default.

use crate::wfc::tile::{Rotation, TileKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Error reading a configuration file.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Json(e) => write!(f, "invalid config JSON: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Json(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}

/// Grid dimensions. `y` is the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridDims {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl GridDims {
    pub const fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.x * self.y * self.z
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat index `x + z*dimX + y*dimX*dimZ`.
    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + z * self.x + y * self.x * self.z
    }

    #[inline]
    pub fn contains(&self, x: i64, y: i64, z: i64) -> bool {
        x >= 0
            && y >= 0
            && z >= 0
            && (x as usize) < self.x
            && (y as usize) < self.y
            && (z as usize) < self.z
    }
}

impl Default for GridDims {
    fn default() -> Self {
        Self::new(12, 4, 12)
    }
}

/// Tile offer queue settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfferConfig {
    /// Number of tiles held in the queue. The first `queue_size` offers are
    /// drawn from the whole catalog.
    pub queue_size: usize,
    /// Types never offered to the player.
    pub excluded_types: Vec<String>,
}

impl Default for OfferConfig {
    fn default() -> Self {
        Self {
            queue_size: 3,
            excluded_types: ["limit", "solid", "empty", "border"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Solver toggles and anchors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub dims: GridDims,
    /// Weighted tile choice. Uniform when off.
    pub probability_constraint: bool,
    /// Apply per-face exclusion lists when building adjacency.
    pub excluded_neighbor_constraint: bool,
    pub floor_ceiling_constraint: bool,
    pub fixed_tiles_constraint: bool,
    pub border_constraint: bool,
    /// Only re-propagate cells near recent collapses.
    pub use_optimization: bool,
    /// Collapse cells whose domain stayed at one option across two passes.
    pub one_tile_collapse_optimization: bool,
    /// Pick among all open cells instead of the lowest-entropy ones.
    pub random_generation: bool,
    /// Solve the whole grid. When off only the center cube is solved.
    pub generate_all: bool,
    pub initial_cube_size: usize,
    pub floor_tile: TileKey,
    pub ceiling_tile: TileKey,
    /// The limit tile's type is never left in a propagated domain.
    pub limit_tile: TileKey,
    pub seed: Option<u64>,
    pub offer: OfferConfig,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            dims: GridDims::default(),
            probability_constraint: true,
            excluded_neighbor_constraint: true,
            floor_ceiling_constraint: true,
            fixed_tiles_constraint: true,
            border_constraint: true,
            use_optimization: true,
            one_tile_collapse_optimization: true,
            random_generation: false,
            generate_all: true,
            initial_cube_size: 4,
            floor_tile: TileKey::new("solid", Rotation::R0),
            ceiling_tile: TileKey::new("empty", Rotation::R0),
            limit_tile: TileKey::new("limit", Rotation::R0),
            seed: None,
            offer: OfferConfig::default(),
        }
    }
}

impl SolverConfig {
    /// All constraints and optimizations off. Useful for small hand-built grids.
    pub fn unconstrained(dims: GridDims) -> Self {
        Self {
            dims,
            probability_constraint: false,
            excluded_neighbor_constraint: false,
            floor_ceiling_constraint: false,
            fixed_tiles_constraint: false,
            border_constraint: false,
            use_optimization: false,
            one_tile_collapse_optimization: false,
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
