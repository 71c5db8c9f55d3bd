//! Socket-based tile solver for 3D islands.
//!
//! - `tile`: faces, rotations, sockets and tile variants
//! - `catalog`: the variant arena and its adjacency table
//! - `tileset`: XML tileset loading
//! - `wave`: the grid of cells and their domains
//! - `visit`: visitability marking around collapses
//! - `propagate`: per-cell domain recomputation
//! - `scheduler`: cell selection and weighted tile choice
//! - `solver`: the step-driven solver, placements and regeneration
//! - `events`: solver events and observers

pub mod catalog;
pub mod events;
pub mod propagate;
pub mod scheduler;
pub mod solver;
pub mod tile;
pub mod tileset;
pub mod visit;
pub mod wave;

pub use catalog::{CatalogError, TileCatalog, TileId};
pub use events::{CollapseOrigin, SolverEvent, SolverObserver};
pub use solver::{
    PlacementOutcome, PlacementRequest, SolveStats, SolverError, SolverState, StepResult,
    TileSolver,
};
pub use tile::{Face, Rotation, Socket, TileArchetype, TileKey, TileVariant};
pub use tileset::{load_tileset, parse_tileset, TilesetError};
pub use wave::{Cell, CellCoord, Grid, GridSnapshot};
