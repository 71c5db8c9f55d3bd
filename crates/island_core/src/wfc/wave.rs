//! Grid of cells, each holding a domain of still-possible tiles.

use super::catalog::{TileCatalog, TileId};
use super::tile::{Face, TileKey};
use crate::config::GridDims;
use serde::{Deserialize, Serialize};

/// Integer cell position. `y` is the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellCoord {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl CellCoord {
    pub const fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    /// The position shifted by `(dx, dy, dz)`, if it stays inside `dims`.
    pub fn offset(self, dims: &GridDims, dx: i64, dy: i64, dz: i64) -> Option<CellCoord> {
        let (x, y, z) = (self.x as i64 + dx, self.y as i64 + dy, self.z as i64 + dz);
        dims.contains(x, y, z)
            .then(|| CellCoord::new(x as usize, y as usize, z as usize))
    }
}

#[derive(Debug, Clone)]
pub struct Cell {
    pub coord: CellCoord,
    pub index: usize,
    /// Still-possible tiles, in catalog order.
    pub domain: Vec<TileId>,
    pub collapsed: bool,
    pub visitable: bool,
    /// Domain size before the most recent propagation pass.
    pub previous_entropy: usize,
    /// Part of the region being solved.
    pub active: bool,
}

impl Cell {
    #[inline]
    pub fn entropy(&self) -> usize {
        self.domain.len()
    }

    /// The committed tile, if collapsed.
    pub fn tile(&self) -> Option<TileId> {
        if self.collapsed {
            self.domain.first().copied()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct Grid {
    dims: GridDims,
    cells: Vec<Cell>,
}

impl Grid {
    /// Every cell starts uncollapsed with the full catalog as its domain.
    pub fn new(dims: GridDims, tile_count: usize) -> Self {
        let full: Vec<TileId> = (0..tile_count).collect();
        let mut cells = Vec::with_capacity(dims.len());
        for y in 0..dims.y {
            for z in 0..dims.z {
                for x in 0..dims.x {
                    cells.push(Cell {
                        coord: CellCoord::new(x, y, z),
                        index: dims.index(x, y, z),
                        domain: full.clone(),
                        collapsed: false,
                        visitable: false,
                        previous_entropy: tile_count,
                        active: true,
                    });
                }
            }
        }
        Self { dims, cells }
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, index: usize) -> &Cell {
        &self.cells[index]
    }

    pub fn cell_mut(&mut self, index: usize) -> &mut Cell {
        &mut self.cells[index]
    }

    pub fn index_of(&self, coord: CellCoord) -> Option<usize> {
        let dims = &self.dims;
        (coord.x < dims.x && coord.y < dims.y && coord.z < dims.z)
            .then(|| dims.index(coord.x, coord.y, coord.z))
    }

    pub fn get(&self, coord: CellCoord) -> Option<&Cell> {
        self.index_of(coord).map(|i| &self.cells[i])
    }

    /// Index of the neighbor across `face`, if inside the grid.
    pub fn neighbor(&self, index: usize, face: Face) -> Option<usize> {
        let (dx, dy, dz) = face.offset();
        self.cells[index]
            .coord
            .offset(&self.dims, dx, dy, dz)
            .map(|c| self.dims.index(c.x, c.y, c.z))
    }

    /// Commit a cell to a single tile.
    pub fn collapse(&mut self, index: usize, tile: TileId) {
        let cell = &mut self.cells[index];
        cell.domain.clear();
        cell.domain.push(tile);
        cell.collapsed = true;
    }

    /// Replace an uncollapsed cell's domain. Collapsed cells are left alone.
    pub fn set_domain(&mut self, index: usize, domain: Vec<TileId>) {
        let cell = &mut self.cells[index];
        if !cell.collapsed {
            cell.domain = domain;
        }
    }

    /// Number of active cells still open.
    pub fn open_active_cells(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| c.active && !c.collapsed)
            .count()
    }

    /// Read-only copy for renderers and tests.
    pub fn snapshot(&self, catalog: &TileCatalog) -> GridSnapshot {
        GridSnapshot {
            dims: self.dims,
            cells: self
                .cells
                .iter()
                .map(|cell| CellSnapshot {
                    coord: cell.coord,
                    collapsed: cell.collapsed,
                    tile: cell.tile().map(|id| catalog.key(id)),
                    entropy: cell.entropy(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSnapshot {
    pub coord: CellCoord,
    pub collapsed: bool,
    pub tile: Option<TileKey>,
    pub entropy: usize,
}

/// Serializable view of a grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub dims: GridDims,
    pub cells: Vec<CellSnapshot>,
}

impl GridSnapshot {
    pub fn get(&self, coord: CellCoord) -> Option<&CellSnapshot> {
        let dims = &self.dims;
        (coord.x < dims.x && coord.y < dims.y && coord.z < dims.z)
            .then(|| &self.cells[dims.index(coord.x, coord.y, coord.z)])
    }

    pub fn is_complete(&self) -> bool {
        self.cells.iter().all(|c| c.collapsed)
    }

    /// One line per z row of layer `y`, one character per cell.
    pub fn layer_rows(&self, y: usize, glyph: impl Fn(&CellSnapshot) -> char) -> Vec<String> {
        let dims = &self.dims;
        if y >= dims.y {
            return Vec::new();
        }
        (0..dims.z)
            .rev()
            .map(|z| {
                (0..dims.x)
                    .map(|x| glyph(&self.cells[dims.index(x, y, z)]))
                    .collect()
            })
            .collect()
    }
}
