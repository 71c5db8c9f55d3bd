//! Core of the island builder.
//!
//! This crate provides:
//! - Tile catalogs loaded from XML tilesets
//! - A step-driven wave function collapse solver over a 3D grid
//! - Interactive tile placement and the tile offer queue
//! - A Bevy plugin that drives the solver per frame

pub mod config;
pub mod offer;
pub mod plugin;
pub mod rng;
pub mod wfc;

pub use config::{ConfigError, GridDims, OfferConfig, SolverConfig};
pub use offer::{OfferError, TileOffer};
pub use plugin::{
    IslandSolver, PlaceTileRequest, RegenerateRequest, SolverEventMessage, TileSolverPlugin,
};
pub use rng::{StdRandom, TileRng};
pub use wfc::{
    CatalogError, CellCoord, GridSnapshot, PlacementOutcome, PlacementRequest, SolveStats,
    SolverError, SolverEvent, StepResult, TileCatalog, TileKey, TileSolver, TilesetError,
};
