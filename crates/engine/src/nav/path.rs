use crate::grid::TileCoord;

pub const MAX_PATH_LENGTH: usize = 256;

/// Route including the start cell. `cursor` counts consumed leading cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    cells: Vec<TileCoord>,
    cursor: usize,
}

impl Path {
    pub(crate) fn from_cells(cells: Vec<TileCoord>) -> Self {
        debug_assert!(!cells.is_empty());
        debug_assert!(cells.len() <= MAX_PATH_LENGTH);
        Self { cells, cursor: 0 }
    }

    pub fn trivial(cell: TileCoord) -> Self {
        Self {
            cells: vec![cell],
            cursor: 0,
        }
    }

    pub fn cells(&self) -> &[TileCoord] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn is_trivial(&self) -> bool {
        self.cells.len() <= 1
    }

    pub fn start(&self) -> Option<TileCoord> {
        self.cells.first().copied()
    }

    pub fn goal(&self) -> Option<TileCoord> {
        self.cells.last().copied()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn next_cell(&self) -> Option<TileCoord> {
        self.cells.get(self.cursor).copied()
    }

    pub fn remaining(&self) -> &[TileCoord] {
        self.cells.get(self.cursor..).unwrap_or(&[])
    }

    pub fn advance(&mut self) {
        if self.cursor < self.cells.len() {
            self.cursor = self.cursor.saturating_add(1);
        }
    }

    pub fn is_complete(&self) -> bool {
        self.cursor >= self.cells.len()
    }
}
