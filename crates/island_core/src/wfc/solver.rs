//! The tile solver.
//!
//! `TileSolver` owns the grid and drives it one step at a time:
//!
//! 1. The first `advance()` builds the grid and applies the border, floor,
//!    ceiling and fixed-tile constraints, then runs one propagation pass.
//! 2. Each later `advance()` applies queued placements, picks a cell, commits
//!    a tile and propagates.
//! 3. An open cell with no option left is a conflict: the grid is thrown away
//!    and rebuilt from step 1. There is no backtracking.
//!
//! A driver (test loop, Bevy system, batch `solve`) decides how many steps to
//! run per frame.

use super::catalog::{CatalogError, TileCatalog, TileId};
use super::events::{dispatch, CollapseOrigin, SolverEvent, SolverObserver};
use super::propagate::{propagate_pass, valid_tile_set, PassSummary};
use super::scheduler::{choose_tile, find_conflict, select_cell, Selection};
use super::tile::{TileArchetype, TileKey};
use super::visit::mark_visitable;
use super::wave::{CellCoord, Grid, GridSnapshot};
use crate::config::SolverConfig;
use crate::rng::{shuffle_with_rng, StdRandom, TileRng};
use bevy::log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;

/// Errors reported by the solver. Conflicts are not errors: they are
/// recovered by regeneration and reported as events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolverError {
    /// Unknown tile, or a catalog that could not be built.
    Catalog(CatalogError),
    /// Setup that can never solve. Raised before any solving begins.
    Misconfiguration { reason: String },
    CellOutOfBounds(CellCoord),
    CellAlreadyCollapsed(CellCoord),
    /// `solve` gave up after this many attempts.
    AttemptsExhausted { attempts: u32 },
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverError::Catalog(e) => write!(f, "{}", e),
            SolverError::Misconfiguration { reason } => {
                write!(f, "solver misconfigured: {}", reason)
            }
            SolverError::CellOutOfBounds(c) => {
                write!(f, "cell ({}, {}, {}) is outside the grid", c.x, c.y, c.z)
            }
            SolverError::CellAlreadyCollapsed(c) => {
                write!(f, "cell ({}, {}, {}) is already collapsed", c.x, c.y, c.z)
            }
            SolverError::AttemptsExhausted { attempts } => {
                write!(f, "no solution after {} attempts", attempts)
            }
        }
    }
}

impl std::error::Error for SolverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SolverError::Catalog(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CatalogError> for SolverError {
    fn from(e: CatalogError) -> Self {
        SolverError::Catalog(e)
    }
}

fn misconfigured(reason: impl Into<String>) -> SolverError {
    SolverError::Misconfiguration {
        reason: reason.into(),
    }
}

/// Result of one `advance()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    Progressed,
    /// Every active cell is collapsed.
    Converged,
    /// An open cell ran out of options; the grid was regenerated.
    Conflict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverState {
    /// Grid not built yet.
    Initial,
    Running,
    Converged,
}

/// A tile dropped by the player. `cell` is `None` when the tile was
/// released over no valid cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRequest {
    pub tile: TileKey,
    pub cell: Option<CellCoord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementOutcome {
    Placed { index: usize },
    /// No target cell: the tile is dropped and a propagation pass still runs.
    Discarded,
}

/// Counters kept across regenerations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SolveStats {
    /// Current attempt, starting at 1.
    pub attempts: u32,
    pub conflicts: u32,
    /// Cells collapsed by the scheduler.
    pub collapses: usize,
    pub single_option_collapses: usize,
    pub placements: usize,
}

/// Type ids and ids of the tiles named by the config.
#[derive(Debug, Clone, Copy)]
struct Anchors {
    floor: Option<TileId>,
    ceiling: Option<TileId>,
    limit: Option<TileId>,
}

pub struct TileSolver {
    catalog: TileCatalog,
    config: SolverConfig,
    anchors: Anchors,
    /// Tiles never left in a propagated domain.
    excluded: Vec<bool>,
    grid: Grid,
    rng: Box<dyn TileRng>,
    state: SolverState,
    /// Collapses in the current attempt, forced ones included.
    iterations: usize,
    stats: SolveStats,
    valid_tiles: HashSet<TileKey>,
    pending: VecDeque<PlacementRequest>,
    observers: Vec<Box<dyn SolverObserver>>,
}

impl TileSolver {
    /// Build a solver seeded from `config.seed` (entropy when unset).
    pub fn new(catalog: TileCatalog, config: SolverConfig) -> Result<Self, SolverError> {
        let rng = Box::new(StdRandom::from_optional_seed(config.seed));
        Self::with_rng(catalog, config, rng)
    }

    /// Build the catalog from archetypes, honouring
    /// `config.excluded_neighbor_constraint`.
    pub fn from_archetypes(
        archetypes: Vec<TileArchetype>,
        config: SolverConfig,
    ) -> Result<Self, SolverError> {
        let catalog = TileCatalog::new(archetypes, config.excluded_neighbor_constraint)?;
        Self::new(catalog, config)
    }

    pub fn with_rng(
        catalog: TileCatalog,
        config: SolverConfig,
        rng: Box<dyn TileRng>,
    ) -> Result<Self, SolverError> {
        let anchors = validate(&catalog, &config)?;
        let excluded = catalog
            .variants()
            .iter()
            .map(|v| v.type_id == config.limit_tile.type_id)
            .collect();
        let grid = Grid::new(config.dims, catalog.len());

        Ok(Self {
            catalog,
            config,
            anchors,
            excluded,
            grid,
            rng,
            state: SolverState::Initial,
            iterations: 0,
            stats: SolveStats {
                attempts: 1,
                ..Default::default()
            },
            valid_tiles: HashSet::new(),
            pending: VecDeque::new(),
            observers: Vec::new(),
        })
    }

    /// Register an observer for collapse, conflict and regeneration events.
    pub fn subscribe(&mut self, observer: impl SolverObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn catalog(&self) -> &TileCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn state(&self) -> SolverState {
        self.state
    }

    pub fn is_converged(&self) -> bool {
        self.state == SolverState::Converged
    }

    pub fn stats(&self) -> SolveStats {
        self.stats
    }

    pub fn attempt(&self) -> u32 {
        self.stats.attempts
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Tiles possible in at least one open, visitable cell after the last pass.
    pub fn valid_tile_set(&self) -> &HashSet<TileKey> {
        &self.valid_tiles
    }

    pub fn pending_placements(&self) -> usize {
        self.pending.len()
    }

    pub fn snapshot(&self) -> GridSnapshot {
        self.grid.snapshot(&self.catalog)
    }

    /// Build the grid and apply the initial constraints.
    ///
    /// Discards any existing grid. Called by the first `advance()` and by
    /// regeneration.
    pub fn initialize(&mut self) {
        let dims = self.config.dims;
        self.grid = Grid::new(dims, self.catalog.len());
        self.iterations = 0;
        self.valid_tiles.clear();

        if !self.config.generate_all {
            let size = self.config.initial_cube_size;
            let (start_x, start_z) = ((dims.x - size) / 2, (dims.z - size) / 2);
            for index in 0..self.grid.len() {
                let c = self.grid.cell(index).coord;
                let inside = (start_x..start_x + size).contains(&c.x)
                    && (start_z..start_z + size).contains(&c.z)
                    && (1..dims.y - 1).contains(&c.y);
                self.grid.cell_mut(index).active = inside;
            }
        }

        if self.config.border_constraint {
            if let Some(limit) = self.anchors.limit {
                for z in 0..dims.z {
                    for x in 0..dims.x {
                        if x == 0 || z == 0 || x == dims.x - 1 || z == dims.z - 1 {
                            self.force(dims.index(x, 1, z), limit);
                        }
                    }
                }
            }
        }

        if self.config.floor_ceiling_constraint {
            let top = dims.y - 1;
            for z in 0..dims.z {
                for x in 0..dims.x {
                    if let Some(floor) = self.anchors.floor {
                        self.force(dims.index(x, 0, z), floor);
                    }
                    if let Some(ceiling) = self.anchors.ceiling {
                        self.force(dims.index(x, top, z), ceiling);
                    }
                }
            }
        }

        if self.config.fixed_tiles_constraint {
            for tile in 0..self.catalog.len() {
                let count = self.catalog.variant(tile).fixed_count;
                if count == 0 {
                    continue;
                }
                // Prefer open cells that can still hold the tile.
                self.run_pass();
                let open = self.grid.cells().iter().filter(|c| !c.collapsed);
                let mut free: Vec<usize> = open
                    .clone()
                    .filter(|c| c.domain.contains(&tile))
                    .map(|c| c.index)
                    .collect();
                if free.is_empty() {
                    free = open.map(|c| c.index).collect();
                }
                shuffle_with_rng(&mut free, self.rng.as_mut());
                for index in free.into_iter().take(count) {
                    self.force(index, tile);
                }
            }
        }

        let summary = self.run_pass();
        self.state = SolverState::Running;
        debug!(
            "grid {}x{}x{} initialized (attempt {}): {} forced, {} open active cells, {} recomputed, {} narrowed, {} emptied",
            dims.x,
            dims.y,
            dims.z,
            self.stats.attempts,
            self.iterations,
            self.grid.open_active_cells(),
            summary.recomputed,
            summary.narrowed,
            summary.emptied
        );
    }

    /// Run one scheduling step.
    pub fn advance(&mut self) -> StepResult {
        if self.state == SolverState::Initial {
            self.initialize();
            return StepResult::Progressed;
        }

        self.apply_pending();

        // Placements after convergence can still leave a cell without options.
        if self.state == SolverState::Converged {
            return match find_conflict(&self.grid) {
                Some(index) => self.conflict(index),
                None => StepResult::Converged,
            };
        }

        let entropy_ordering = !self.config.random_generation;
        let index = match select_cell(&self.grid, entropy_ordering, self.rng.as_mut()) {
            Selection::Cell(index) => index,
            Selection::Exhausted => {
                self.state = SolverState::Converged;
                info!(
                    "island converged on attempt {} after {} collapses ({} conflicts, {} single-option, {} placed)",
                    self.stats.attempts,
                    self.iterations,
                    self.stats.conflicts,
                    self.stats.single_option_collapses,
                    self.stats.placements
                );
                self.emit(SolverEvent::Converged {
                    attempt: self.stats.attempts,
                    iterations: self.iterations,
                });
                return StepResult::Converged;
            }
            Selection::Conflict(index) => return self.conflict(index),
        };

        mark_visitable(&mut self.grid, index);
        let weighted = self.config.probability_constraint;
        let Some(tile) = choose_tile(
            &self.grid.cell(index).domain,
            &self.catalog,
            weighted,
            self.rng.as_mut(),
        ) else {
            // select_cell never hands out an empty domain.
            return StepResult::Progressed;
        };
        self.commit(index, tile, CollapseOrigin::Selected);
        self.stats.collapses += 1;

        self.run_pass();
        if self.config.one_tile_collapse_optimization {
            self.collapse_single_options();
            self.refresh_valid_tiles();
        }
        StepResult::Progressed
    }

    /// Run steps until convergence, regenerating on conflicts.
    pub fn solve(&mut self, max_attempts: u32) -> Result<SolveStats, SolverError> {
        loop {
            match self.advance() {
                StepResult::Converged => return Ok(self.stats),
                StepResult::Conflict if self.stats.attempts > max_attempts => {
                    return Err(SolverError::AttemptsExhausted {
                        attempts: self.stats.attempts - 1,
                    });
                }
                _ => {}
            }
        }
    }

    /// Discard the grid and start a new attempt. Queued placements are
    /// dropped.
    pub fn regenerate(&mut self) {
        let finished = self.stats.attempts;
        self.emit(SolverEvent::RegenerationStarted { attempt: finished });
        self.pending.clear();
        self.stats.attempts += 1;
        info!("regenerating island, attempt {}", self.stats.attempts);
        self.initialize();
        self.emit(SolverEvent::RegenerationFinished {
            attempt: self.stats.attempts,
        });
    }

    /// Queue a placement for the start of the next step.
    pub fn enqueue_placement(&mut self, request: PlacementRequest) {
        self.pending.push_back(request);
    }

    /// Place a tile chosen by the player.
    ///
    /// The tile must exist and the target cell must be open. The cell is
    /// collapsed to the tile and one propagation pass runs; no other cell is
    /// collapsed by this call. Without a target the tile is discarded and the
    /// pass still runs.
    pub fn place(
        &mut self,
        tile: &TileKey,
        cell: Option<CellCoord>,
    ) -> Result<PlacementOutcome, SolverError> {
        let tile = self.catalog.lookup(tile)?;
        if self.state == SolverState::Initial {
            self.initialize();
        }

        let Some(coord) = cell else {
            debug!("placement of {} discarded", self.catalog.key(tile));
            self.run_pass();
            return Ok(PlacementOutcome::Discarded);
        };
        let index = self
            .grid
            .index_of(coord)
            .ok_or(SolverError::CellOutOfBounds(coord))?;
        if self.grid.cell(index).collapsed {
            return Err(SolverError::CellAlreadyCollapsed(coord));
        }

        mark_visitable(&mut self.grid, index);
        self.commit(index, tile, CollapseOrigin::Placed);
        self.stats.placements += 1;
        self.run_pass();
        Ok(PlacementOutcome::Placed { index })
    }

    /// Open, visitable cells whose domain still holds `tile`.
    pub fn candidate_cells(&self, tile: &TileKey) -> Result<Vec<CellCoord>, SolverError> {
        let id = self.catalog.lookup(tile)?;
        Ok(self
            .grid
            .cells()
            .iter()
            .filter(|c| !c.collapsed && c.visitable && c.domain.contains(&id))
            .map(|c| c.coord)
            .collect())
    }

    /// Report the empty cell at `index` and start a new attempt.
    fn conflict(&mut self, index: usize) -> StepResult {
        let coord = self.grid.cell(index).coord;
        self.stats.conflicts += 1;
        warn!(
            "no option left at ({}, {}, {}) on attempt {}",
            coord.x, coord.y, coord.z, self.stats.attempts
        );
        self.emit(SolverEvent::Conflict {
            coord,
            attempt: self.stats.attempts,
        });
        self.regenerate();
        StepResult::Conflict
    }

    fn apply_pending(&mut self) {
        while let Some(request) = self.pending.pop_front() {
            if let Err(e) = self.place(&request.tile, request.cell) {
                warn!("placement of {} rejected: {}", request.tile, e);
            }
        }
    }

    /// Collapse during initialization.
    fn force(&mut self, index: usize, tile: TileId) {
        if self.grid.cell(index).collapsed {
            return;
        }
        mark_visitable(&mut self.grid, index);
        self.commit(index, tile, CollapseOrigin::Forced);
    }

    fn commit(&mut self, index: usize, tile: TileId, origin: CollapseOrigin) {
        self.grid.collapse(index, tile);
        self.iterations += 1;
        let coord = self.grid.cell(index).coord;
        self.emit(SolverEvent::Collapsed {
            coord,
            index,
            tile: self.catalog.key(tile),
            origin,
        });
    }

    fn run_pass(&mut self) -> PassSummary {
        let summary = propagate_pass(
            &mut self.grid,
            &self.catalog,
            &self.excluded,
            self.config.use_optimization,
        );
        self.refresh_valid_tiles();
        summary
    }

    /// Collapse open, visitable, active cells whose domain has held a single
    /// option since before the last pass.
    fn collapse_single_options(&mut self) {
        let settled: Vec<(usize, TileId)> = self
            .grid
            .cells()
            .iter()
            .filter(|c| {
                c.active
                    && !c.collapsed
                    && c.visitable
                    && c.entropy() == 1
                    && c.previous_entropy == 1
            })
            .map(|c| (c.index, c.domain[0]))
            .collect();

        for (index, tile) in settled {
            mark_visitable(&mut self.grid, index);
            self.commit(index, tile, CollapseOrigin::SingleOption);
            self.stats.single_option_collapses += 1;
        }
    }

    fn refresh_valid_tiles(&mut self) {
        self.valid_tiles = valid_tile_set(&self.grid, &self.catalog);
    }

    fn emit(&mut self, event: SolverEvent) {
        for observer in &mut self.observers {
            dispatch(observer.as_mut(), &event);
        }
    }
}

/// Reject setups that can never solve.
fn validate(catalog: &TileCatalog, config: &SolverConfig) -> Result<Anchors, SolverError> {
    let dims = config.dims;
    if dims.is_empty() {
        return Err(misconfigured("grid dimensions must be non-zero"));
    }

    let anchor = |enabled: bool, key: &TileKey, role: &str| -> Result<Option<TileId>, SolverError> {
        if !enabled {
            return Ok(None);
        }
        catalog
            .find(key)
            .map(Some)
            .ok_or_else(|| misconfigured(format!("{} tile {} is not in the catalog", role, key)))
    };
    let anchors = Anchors {
        floor: anchor(config.floor_ceiling_constraint, &config.floor_tile, "floor")?,
        ceiling: anchor(config.floor_ceiling_constraint, &config.ceiling_tile, "ceiling")?,
        limit: anchor(config.border_constraint, &config.limit_tile, "limit")?,
    };

    if config.border_constraint && dims.y < 2 {
        return Err(misconfigured("border constraint needs at least 2 layers"));
    }
    if config.border_constraint && config.floor_ceiling_constraint && dims.y < 3 {
        return Err(misconfigured(
            "border with floor and ceiling needs at least 3 layers",
        ));
    }

    if config.probability_constraint {
        if let Some(v) = catalog
            .variants()
            .iter()
            .find(|v| v.weight == 0 && v.type_id != config.limit_tile.type_id)
        {
            return Err(misconfigured(format!(
                "tile {} has zero weight with weighted selection on",
                v.key()
            )));
        }
    }

    if config.fixed_tiles_constraint {
        let fixed: usize = catalog.variants().iter().map(|v| v.fixed_count).sum();
        let layer = dims.x * dims.z;
        let mut taken = 0;
        if config.border_constraint {
            taken += layer - dims.x.saturating_sub(2) * dims.z.saturating_sub(2);
        }
        if config.floor_ceiling_constraint {
            taken += if dims.y > 1 { 2 * layer } else { layer };
        }
        let free = dims.len().saturating_sub(taken);
        if fixed > free {
            return Err(misconfigured(format!(
                "{} fixed tiles do not fit in {} free cells",
                fixed, free
            )));
        }
    }

    if !config.generate_all {
        let size = config.initial_cube_size;
        if size == 0 || size > dims.x.min(dims.z) {
            return Err(misconfigured(format!(
                "center cube size {} does not fit a {}x{} layer",
                size, dims.x, dims.z
            )));
        }
        if dims.y < 3 {
            return Err(misconfigured("center cube needs at least 3 layers"));
        }
    }

    Ok(anchors)
}
