//! Cell selection and tile choice.

use super::catalog::{TileCatalog, TileId};
use super::wave::Grid;
use crate::rng::TileRng;

/// Outcome of looking for the next cell to collapse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Collapse this cell next.
    Cell(usize),
    /// This open cell has no option left.
    Conflict(usize),
    /// No open cell remains in the active region.
    Exhausted,
}

/// First open cell with no option left, inside the active region or not.
pub fn find_conflict(grid: &Grid) -> Option<usize> {
    grid.cells()
        .iter()
        .find(|c| !c.collapsed && c.domain.is_empty())
        .map(|c| c.index)
}

/// Pick the next cell among the open, active cells.
///
/// With entropy ordering the pick is uniform among the cells sharing the
/// smallest domain size, otherwise uniform among all open cells. Any open
/// cell with an empty domain, active or not, is reported before any pick is
/// made.
pub fn select_cell(grid: &Grid, entropy_ordering: bool, rng: &mut dyn TileRng) -> Selection {
    if let Some(empty) = find_conflict(grid) {
        return Selection::Conflict(empty);
    }

    let open: Vec<usize> = grid
        .cells()
        .iter()
        .filter(|c| c.active && !c.collapsed)
        .map(|c| c.index)
        .collect();
    if open.is_empty() {
        return Selection::Exhausted;
    }

    if !entropy_ordering {
        return Selection::Cell(open[rng.next_usize_max(open.len())]);
    }

    let min = open
        .iter()
        .map(|&i| grid.cell(i).entropy())
        .min()
        .unwrap_or(0);
    let lowest: Vec<usize> = open
        .into_iter()
        .filter(|&i| grid.cell(i).entropy() == min)
        .collect();
    Selection::Cell(lowest[rng.next_usize_max(lowest.len())])
}

/// Choose a tile from `domain`.
///
/// Weighted draw when `weighted` is set: a number in `[0, total)` walks the
/// cumulative weights. Falls back to a uniform draw when the total weight is
/// zero. `None` only for an empty domain.
pub fn choose_tile(
    domain: &[TileId],
    catalog: &TileCatalog,
    weighted: bool,
    rng: &mut dyn TileRng,
) -> Option<TileId> {
    if domain.is_empty() {
        return None;
    }
    if weighted {
        let total: u64 = domain
            .iter()
            .map(|&t| u64::from(catalog.variant(t).weight))
            .sum();
        if total > 0 {
            let mut roll = rng.next_u64() % total;
            for &tile in domain {
                let weight = u64::from(catalog.variant(tile).weight);
                if roll < weight {
                    return Some(tile);
                }
                roll -= weight;
            }
        }
    }
    Some(domain[rng.next_usize_max(domain.len())])
}
