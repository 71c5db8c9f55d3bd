//! Constraint propagation.
//!
//! Each uncollapsed cell's domain is recomputed from the whole catalog: a
//! tile survives if, for every existing neighbor, some tile in that
//! neighbor's domain allows it across the shared face. Cells are updated in
//! place in index order, so later cells in a pass see the domains already
//! narrowed earlier in the same pass.

use super::catalog::{TileCatalog, TileId};
use super::tile::{Face, TileKey};
use super::wave::Grid;
use std::collections::HashSet;

/// Result of one pass over the grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Cells whose domain was recomputed.
    pub recomputed: usize,
    /// Recomputed cells whose domain came out smaller than before.
    pub narrowed: usize,
    /// Recomputed cells left with no option.
    pub emptied: usize,
}

/// Domain implied for the cell at `index` by its neighbors' current domains.
///
/// `excluded[tile]` marks tiles that never survive propagation (the border
/// limit tile).
pub fn check_neighbours(
    grid: &Grid,
    catalog: &TileCatalog,
    index: usize,
    excluded: &[bool],
) -> Vec<TileId> {
    let mut candidates: Vec<bool> = (0..catalog.len())
        .map(|tile| !excluded.get(tile).copied().unwrap_or(false))
        .collect();
    let mut allowed = vec![false; catalog.len()];

    for face in Face::ALL {
        let Some(neighbor) = grid.neighbor(index, face) else {
            continue;
        };
        allowed.fill(false);
        // Tiles allowed on this side of the neighbor.
        for &tile in &grid.cell(neighbor).domain {
            for &option in catalog.neighbors(tile, face.opposite()) {
                allowed[option] = true;
            }
        }
        for (keep, ok) in candidates.iter_mut().zip(&allowed) {
            *keep &= *ok;
        }
    }

    candidates
        .iter()
        .enumerate()
        .filter_map(|(tile, &keep)| keep.then_some(tile))
        .collect()
}

/// Run one propagation pass.
///
/// Every cell's `previous_entropy` is set to its domain size at the start of
/// the pass. Collapsed cells are skipped, as are non-visitable cells when
/// `use_optimization` is on.
pub fn propagate_pass(
    grid: &mut Grid,
    catalog: &TileCatalog,
    excluded: &[bool],
    use_optimization: bool,
) -> PassSummary {
    for index in 0..grid.len() {
        let cell = grid.cell_mut(index);
        cell.previous_entropy = cell.entropy();
    }

    let mut summary = PassSummary::default();
    for index in 0..grid.len() {
        let cell = grid.cell(index);
        if cell.collapsed || (use_optimization && !cell.visitable) {
            continue;
        }
        let before = cell.entropy();
        let domain = check_neighbours(grid, catalog, index, excluded);

        summary.recomputed += 1;
        if domain.len() < before {
            summary.narrowed += 1;
        }
        if domain.is_empty() {
            summary.emptied += 1;
        }
        grid.set_domain(index, domain);
    }
    summary
}

/// Keys possible in at least one uncollapsed, visitable cell.
pub fn valid_tile_set(grid: &Grid, catalog: &TileCatalog) -> HashSet<TileKey> {
    let mut seen = vec![false; catalog.len()];
    for cell in grid.cells() {
        if cell.collapsed || !cell.visitable {
            continue;
        }
        for &tile in &cell.domain {
            seen[tile] = true;
        }
    }
    seen.iter()
        .enumerate()
        .filter_map(|(tile, &hit)| hit.then(|| catalog.key(tile)))
        .collect()
}
