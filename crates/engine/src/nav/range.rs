use std::collections::VecDeque;

use crate::grid::{GridMap, TileCoord};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RangeTile {
    pub reachable: bool,
    pub cost: u32,
}

/// Dense per-cell reachability table for movement highlighting.
///
/// Every step costs 1 regardless of the tile's `move_cost` or walkability;
/// only off-map cells are skipped. Whether a highlighted tile can actually be
/// walked to is left to the pathfinder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveRange {
    width: u32,
    height: u32,
    origin: Option<TileCoord>,
    budget: u32,
    tiles: Vec<RangeTile>,
}

impl MoveRange {
    pub fn compute(&mut self, map: &GridMap, origin: TileCoord, budget: u32) {
        self.clear();
        self.width = map.width();
        self.height = map.height();
        self.tiles
            .resize(map.width() as usize * map.height() as usize, RangeTile::default());
        self.origin = Some(origin);
        self.budget = budget;

        let mut queue = VecDeque::new();
        queue.push_back((origin, 0u32));

        while let Some((cell, cost)) = queue.pop_front() {
            let Some(index) = map.index_of(cell) else {
                continue;
            };
            let tile = &mut self.tiles[index];
            if tile.reachable && cost >= tile.cost {
                continue;
            }
            if cost > budget {
                continue;
            }

            *tile = RangeTile {
                reachable: true,
                cost,
            };

            let next_cost = cost.saturating_add(1);
            for neighbor in cell.neighbors() {
                queue.push_back((neighbor, next_cost));
            }
        }
    }

    pub fn clear(&mut self) {
        self.tiles.fill(RangeTile::default());
        self.origin = None;
        self.budget = 0;
    }

    pub fn origin(&self) -> Option<TileCoord> {
        self.origin
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }

    pub fn tiles(&self) -> &[RangeTile] {
        &self.tiles
    }

    pub fn tile(&self, coord: TileCoord) -> Option<RangeTile> {
        if coord.x < 0 || coord.y < 0 {
            return None;
        }
        let (x, y) = (coord.x as u32, coord.y as u32);
        if x >= self.width || y >= self.height {
            return None;
        }
        self.tiles
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    pub fn is_reachable(&self, coord: TileCoord) -> bool {
        self.tile(coord).is_some_and(|tile| tile.reachable)
    }

    pub fn cost(&self, coord: TileCoord) -> Option<u32> {
        self.tile(coord)
            .filter(|tile| tile.reachable)
            .map(|tile| tile.cost)
    }

    pub fn reachable_cells(&self) -> impl Iterator<Item = (TileCoord, u32)> + '_ {
        let width = self.width.max(1) as usize;
        self.tiles
            .iter()
            .enumerate()
            .filter(|(_, tile)| tile.reachable)
            .map(move |(index, tile)| {
                (
                    TileCoord::new((index % width) as i32, (index / width) as i32),
                    tile.cost,
                )
            })
    }

    pub fn reachable_count(&self) -> usize {
        self.tiles.iter().filter(|tile| tile.reachable).count()
    }
}

pub fn compute_reachable(map: &GridMap, origin: TileCoord, budget: u32) -> MoveRange {
    let mut range = MoveRange::default();
    range.compute(map, origin, budget);
    range
}
