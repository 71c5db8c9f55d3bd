//! Visitability marking around collapsed cells.
//!
//! With the optimization on, propagation only recomputes visitable cells.
//! A cell's domain can only change when a nearby cell changed, and every
//! collapse marks its surroundings here.

use super::wave::Grid;

/// Offsets `(dx, dy, dz)` marked around a collapse: the cell, its six axis
/// neighbors, the four diagonals in its layer, and the cells above and below
/// shifted one step along z.
pub const VISIT_OFFSETS: [(i64, i64, i64); 15] = [
    (0, 0, 0),
    (0, 0, 1),
    (0, 0, -1),
    (-1, 0, 0),
    (1, 0, 0),
    (0, 1, 0),
    (0, -1, 0),
    (-1, 0, 1),
    (1, 0, 1),
    (-1, 0, -1),
    (1, 0, -1),
    (0, 1, 1),
    (0, 1, -1),
    (0, -1, 1),
    (0, -1, -1),
];

/// Mark the cell at `index` and its surroundings visitable. Offsets that
/// leave the grid are skipped.
pub fn mark_visitable(grid: &mut Grid, index: usize) {
    let dims = grid.dims();
    let coord = grid.cell(index).coord;
    for (dx, dy, dz) in VISIT_OFFSETS {
        if let Some(c) = coord.offset(&dims, dx, dy, dz) {
            grid.cell_mut(dims.index(c.x, c.y, c.z)).visitable = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridDims;
    use crate::wfc::wave::CellCoord;

    #[test]
    fn test_interior_cell_marks_fifteen() {
        let mut grid = Grid::new(GridDims::new(3, 3, 3), 1);
        let center = grid.index_of(CellCoord::new(1, 1, 1)).unwrap();
        mark_visitable(&mut grid, center);

        let marked: Vec<CellCoord> = grid
            .cells()
            .iter()
            .filter(|c| c.visitable)
            .map(|c| c.coord)
            .collect();
        assert_eq!(marked.len(), 15);
        assert!(marked.contains(&CellCoord::new(0, 1, 2)));
        assert!(marked.contains(&CellCoord::new(1, 2, 0)));
        // x diagonals across layers are not part of the frontier
        assert!(!marked.contains(&CellCoord::new(0, 2, 1)));
        assert!(!marked.contains(&CellCoord::new(2, 2, 2)));
    }

    #[test]
    fn test_corner_cell_skips_out_of_range() {
        let mut grid = Grid::new(GridDims::new(2, 2, 2), 1);
        mark_visitable(&mut grid, 0);

        let count = grid.cells().iter().filter(|c| c.visitable).count();
        // self, right, up, above, up-right, above-up
        assert_eq!(count, 6);
        assert!(!grid.get(CellCoord::new(1, 1, 1)).unwrap().visitable);
    }

    #[test]
    fn test_flat_grid() {
        let mut grid = Grid::new(GridDims::new(3, 1, 3), 1);
        let center = grid.index_of(CellCoord::new(1, 0, 1)).unwrap();
        mark_visitable(&mut grid, center);
        assert!(grid.cells().iter().all(|c| c.visitable));
    }
}
