use thiserror::Error;
use tracing::debug;

use super::path::{Path, MAX_PATH_LENGTH};
use crate::grid::{GridMap, TileCoord};

/// Every variant means "no route"; callers stay put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("start tile {0} is not walkable")]
    StartNotWalkable(TileCoord),
    #[error("goal tile {0} is not walkable")]
    GoalNotWalkable(TileCoord),
    #[error("no route from {start} to {goal}")]
    Unreachable { start: TileCoord, goal: TileCoord },
    #[error("route of {length} cells exceeds the {cap} cell cap")]
    TooLong { length: usize, cap: usize },
}

#[derive(Debug, Clone, Copy)]
struct OpenNode {
    index: usize,
    coord: TileCoord,
    h_cost: u32,
    f_cost: u32,
    insertion_order: u64,
}

/// Equal `f` ties prefer lower `h`, then row, column and insertion order.
pub fn find_path(map: &GridMap, start: TileCoord, goal: TileCoord) -> Result<Path, PathError> {
    if start == goal {
        return Ok(Path::trivial(start));
    }
    let start_index = map
        .index_of(start)
        .filter(|_| map.is_walkable(start))
        .ok_or(PathError::StartNotWalkable(start))?;
    let goal_index = map
        .index_of(goal)
        .filter(|_| map.is_walkable(goal))
        .ok_or(PathError::GoalNotWalkable(goal))?;

    let node_count = map.tiles().len();
    let mut closed = vec![false; node_count];
    let mut best_g = vec![u32::MAX; node_count];
    let mut parent = vec![None::<usize>; node_count];
    let mut open = Vec::new();
    let mut next_insertion = 0u64;

    let start_h = start.manhattan_distance(goal);
    open.push(OpenNode {
        index: start_index,
        coord: start,
        h_cost: start_h,
        f_cost: start_h,
        insertion_order: next_insertion,
    });
    next_insertion = next_insertion.saturating_add(1);
    best_g[start_index] = 0;

    while !open.is_empty() {
        let best_index = pick_best_open_node_index(&open);
        let current = open.swap_remove(best_index);
        if closed[current.index] {
            continue;
        }
        closed[current.index] = true;

        if current.index == goal_index {
            let cells = reconstruct_path(map, &parent, start_index, goal_index)
                .ok_or(PathError::Unreachable { start, goal })?;
            if cells.len() > MAX_PATH_LENGTH {
                return Err(PathError::TooLong {
                    length: cells.len(),
                    cap: MAX_PATH_LENGTH,
                });
            }
            debug!(
                %start,
                %goal,
                length = cells.len(),
                cost = best_g[goal_index],
                "path_found"
            );
            return Ok(Path::from_cells(cells));
        }

        let current_g = best_g[current.index];
        for neighbor in current.coord.neighbors() {
            let Some(neighbor_index) = map.index_of(neighbor) else {
                continue;
            };
            if closed[neighbor_index] || !map.is_walkable(neighbor) {
                continue;
            }

            let tentative_g = current_g.saturating_add(map.move_cost(neighbor));
            if tentative_g >= best_g[neighbor_index] {
                continue;
            }

            best_g[neighbor_index] = tentative_g;
            parent[neighbor_index] = Some(current.index);
            let h_cost = neighbor.manhattan_distance(goal);
            open.push(OpenNode {
                index: neighbor_index,
                coord: neighbor,
                h_cost,
                f_cost: tentative_g.saturating_add(h_cost),
                insertion_order: next_insertion,
            });
            next_insertion = next_insertion.saturating_add(1);
        }
    }

    debug!(%start, %goal, "path_not_found");
    Err(PathError::Unreachable { start, goal })
}

fn pick_best_open_node_index(open: &[OpenNode]) -> usize {
    let mut best_index = 0usize;
    for index in 1..open.len() {
        if open_node_order_key(open[index]) < open_node_order_key(open[best_index]) {
            best_index = index;
        }
    }
    best_index
}

fn open_node_order_key(node: OpenNode) -> (u32, u32, i32, i32, u64) {
    (
        node.f_cost,
        node.h_cost,
        node.coord.y,
        node.coord.x,
        node.insertion_order,
    )
}

fn reconstruct_path(
    map: &GridMap,
    parent: &[Option<usize>],
    start_index: usize,
    goal_index: usize,
) -> Option<Vec<TileCoord>> {
    let mut cursor = goal_index;
    let mut indices = vec![cursor];

    while cursor != start_index {
        cursor = parent.get(cursor).and_then(|value| *value)?;
        indices.push(cursor);
    }
    indices.reverse();
    indices
        .into_iter()
        .map(|index| map.coord_of(index))
        .collect()
}
