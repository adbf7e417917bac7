use tracing::debug;

use crate::config::MovementConfig;
use crate::entity::Entity;
use crate::grid::{GridMap, TileCoord};
use crate::nav::{find_path, Path, PathError};
use crate::projection::Vec2;

const PROGRESS_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOutcome {
    Assigned,
    AlreadyThere,
}

/// Whether the controller may begin a new tile step this tick, and whether
/// steps are paid for in action points. Running slides always finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepGate {
    pub may_start: bool,
    pub spend_action_points: bool,
}

impl StepGate {
    pub const FREE: StepGate = StepGate {
        may_start: true,
        spend_action_points: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepBlock {
    NotWalkable,
    NotAdjacent,
    OutOfActionPoints,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementEvent {
    Idle,
    Held,
    CoolingDown { remaining: u32 },
    Sliding,
    Arrived { cell: TileCoord, path_complete: bool },
    Blocked(StepBlock),
}

/// Hands `path` to the entity, dropping whatever path it held before and
/// abandoning a slide in progress (render position snaps back to the logical
/// tile). A path whose only remaining cell is the current tile is discarded.
pub fn assign_path(entity: &mut Entity, mut path: Path) -> AssignOutcome {
    release_path(entity);
    if path.next_cell() == Some(entity.position) {
        path.advance();
    }
    if path.is_complete() {
        return AssignOutcome::AlreadyThere;
    }
    entity.path = Some(path);
    AssignOutcome::Assigned
}

pub fn release_path(entity: &mut Entity) -> Option<Path> {
    if entity.movement.interpolating {
        entity.movement.interpolating = false;
        entity.movement.progress = 0.0;
        entity.movement.pending_cost = 0;
        entity.render_position = Vec2::from_tile(entity.position);
    }
    entity.path.take()
}

/// Drops the rest of the route but lets a slide in progress land on its
/// target tile.
pub fn abandon_route(entity: &mut Entity) -> Option<Path> {
    entity.path.take()
}

pub fn request_path(
    entity: &mut Entity,
    map: &GridMap,
    goal: TileCoord,
) -> Result<AssignOutcome, PathError> {
    match find_path(map, entity.position, goal) {
        Ok(path) => Ok(assign_path(entity, path)),
        Err(error) => {
            debug!(entity = entity.id.0, %goal, %error, "path_request_discarded");
            Err(error)
        }
    }
}

/// One tick of the movement state machine.
///
/// Logical position changes only on the tick the slide reaches 1.0; while the
/// entity is not sliding its render position equals its logical tile.
pub fn update_movement(
    entity: &mut Entity,
    map: &GridMap,
    config: &MovementConfig,
    gate: StepGate,
) -> MovementEvent {
    if entity.movement.interpolating {
        return advance_slide(entity, config, gate);
    }

    let Some(path) = entity.path.as_ref() else {
        return MovementEvent::Idle;
    };
    let Some(next) = path.next_cell() else {
        entity.path = None;
        return MovementEvent::Idle;
    };

    if !gate.may_start {
        return MovementEvent::Held;
    }
    if entity.movement.cooldown > 0 {
        entity.movement.cooldown -= 1;
        return MovementEvent::CoolingDown {
            remaining: entity.movement.cooldown,
        };
    }

    let block = if !map.is_walkable(next) {
        Some(StepBlock::NotWalkable)
    } else if !next.is_adjacent(entity.position) {
        Some(StepBlock::NotAdjacent)
    } else if gate.spend_action_points && !entity.action_points.can_afford(map.move_cost(next)) {
        Some(StepBlock::OutOfActionPoints)
    } else {
        None
    };
    if let Some(block) = block {
        debug!(entity = entity.id.0, %next, ?block, "step_blocked");
        entity.path = None;
        return MovementEvent::Blocked(block);
    }

    debug!(entity = entity.id.0, from = %entity.position, to = %next, "step_started");
    entity.movement.from = entity.position;
    entity.movement.to = next;
    entity.movement.progress = 0.0;
    entity.movement.pending_cost = if gate.spend_action_points {
        map.move_cost(next)
    } else {
        0
    };
    entity.movement.interpolating = true;
    advance_slide(entity, config, gate)
}

fn advance_slide(entity: &mut Entity, config: &MovementConfig, gate: StepGate) -> MovementEvent {
    let movement = &mut entity.movement;
    movement.progress += config.progress_per_tick;

    if movement.progress + PROGRESS_EPSILON < 1.0 {
        entity.render_position = Vec2::lerp(
            Vec2::from_tile(movement.from),
            Vec2::from_tile(movement.to),
            movement.progress,
        );
        return MovementEvent::Sliding;
    }

    entity.position = movement.to;
    entity.render_position = Vec2::from_tile(movement.to);
    movement.progress = 0.0;
    movement.interpolating = false;
    movement.cooldown = movement.delay;
    if gate.spend_action_points {
        entity.action_points.spend(movement.pending_cost);
    }
    movement.pending_cost = 0;

    let path_complete = match entity.path.as_mut() {
        Some(path) => {
            path.advance();
            path.is_complete()
        }
        None => true,
    };
    if path_complete {
        entity.path = None;
    }
    debug!(entity = entity.id.0, cell = %entity.position, path_complete, "step_completed");
    MovementEvent::Arrived {
        cell: entity.position,
        path_complete,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityRole, EntityStore, MovementPhase};
    use crate::grid::{TILE_GRASS, TILE_RUBBLE, TILE_WATER};

    fn store_with(position: TileCoord, delay: u32) -> EntityStore {
        let mut store = EntityStore::default();
        store
            .spawn(position, EntityRole::Npc, delay, 6)
            .expect("spawn");
        store
    }

    fn open_map() -> GridMap {
        GridMap::filled(5, 5, TILE_GRASS).expect("map")
    }

    #[test]
    fn two_cell_path_takes_cooldown_then_five_slide_ticks() {
        let map = open_map();
        let config = MovementConfig::default();
        let mut store = store_with(TileCoord::new(1, 1), 6);
        let entity = store.get_mut(crate::entity::EntityId(0)).expect("entity");
        let path = find_path(&map, TileCoord::new(1, 1), TileCoord::new(2, 1)).expect("path");
        assert_eq!(path.len(), 2);
        assert_eq!(assign_path(entity, path), AssignOutcome::Assigned);

        let mut cooldown_ticks = 0;
        let mut slide_ticks = 0;
        let mut arrived_at = None;
        for tick in 1..=20 {
            let before = entity.position;
            let event = update_movement(entity, &map, &config, StepGate::FREE);
            match event {
                MovementEvent::CoolingDown { .. } => cooldown_ticks += 1,
                MovementEvent::Sliding => {
                    slide_ticks += 1;
                    assert_eq!(entity.position, before, "moved mid-slide");
                }
                MovementEvent::Arrived { cell, path_complete } => {
                    slide_ticks += 1;
                    assert_eq!(cell, TileCoord::new(2, 1));
                    assert!(path_complete);
                    arrived_at = Some(tick);
                    break;
                }
                other => panic!("unexpected event {other:?}"),
            }
        }

        assert_eq!(cooldown_ticks, 6);
        assert_eq!(slide_ticks, 5);
        assert_eq!(arrived_at, Some(11));
        assert_eq!(entity.render_position, Vec2 { x: 2.0, y: 1.0 });
        assert_eq!(entity.movement_phase(), MovementPhase::Idle);
        assert_eq!(entity.movement.cooldown, 6);
        assert!(entity.path().is_none());
    }

    #[test]
    fn render_position_tracks_logical_tile_when_not_sliding() {
        let map = open_map();
        let config = MovementConfig::default();
        let mut store = store_with(TileCoord::new(0, 0), 2);
        let entity = store.get_mut(crate::entity::EntityId(0)).expect("entity");
        request_path(entity, &map, TileCoord::new(3, 2)).expect("path");

        for _ in 0..200 {
            let event = update_movement(entity, &map, &config, StepGate::FREE);
            if !entity.movement.interpolating {
                assert_eq!(entity.render_position, Vec2::from_tile(entity.position));
            } else {
                let from = Vec2::from_tile(entity.movement.from);
                let to = Vec2::from_tile(entity.movement.to);
                let expected = Vec2::lerp(from, to, entity.movement.progress);
                assert_eq!(entity.render_position, expected);
            }
            if event == MovementEvent::Idle {
                break;
            }
        }
        assert_eq!(entity.position, TileCoord::new(3, 2));
    }

    #[test]
    fn trivial_path_is_discarded() {
        let mut store = store_with(TileCoord::new(2, 2), 6);
        let entity = store.get_mut(crate::entity::EntityId(0)).expect("entity");
        assert_eq!(
            assign_path(entity, Path::trivial(TileCoord::new(2, 2))),
            AssignOutcome::AlreadyThere
        );
        assert!(entity.path().is_none());
    }

    #[test]
    fn new_path_replaces_old_and_cancels_slide() {
        let map = open_map();
        let config = MovementConfig::default();
        let mut store = store_with(TileCoord::new(2, 2), 0);
        let entity = store.get_mut(crate::entity::EntityId(0)).expect("entity");
        request_path(entity, &map, TileCoord::new(4, 2)).expect("first");
        assert_eq!(
            update_movement(entity, &map, &config, StepGate::FREE),
            MovementEvent::Sliding
        );

        request_path(entity, &map, TileCoord::new(2, 0)).expect("second");
        assert!(!entity.movement.interpolating);
        assert_eq!(entity.render_position, Vec2 { x: 2.0, y: 2.0 });
        assert_eq!(entity.path().and_then(Path::goal), Some(TileCoord::new(2, 0)));
        assert_eq!(entity.path().and_then(Path::next_cell), Some(TileCoord::new(2, 1)));
    }

    #[test]
    fn failed_request_keeps_current_path() {
        let map = open_map().with_tile(TileCoord::new(4, 4), TILE_WATER);
        let mut store = store_with(TileCoord::new(0, 0), 6);
        let entity = store.get_mut(crate::entity::EntityId(0)).expect("entity");
        request_path(entity, &map, TileCoord::new(2, 0)).expect("path");
        let err = request_path(entity, &map, TileCoord::new(4, 4)).expect_err("blocked goal");
        assert_eq!(err, PathError::GoalNotWalkable(TileCoord::new(4, 4)));
        assert_eq!(entity.path().and_then(Path::goal), Some(TileCoord::new(2, 0)));
    }

    #[test]
    fn held_gate_freezes_cooldown_but_not_running_slide() {
        let map = open_map();
        let config = MovementConfig::default();
        let mut store = store_with(TileCoord::new(0, 0), 1);
        let entity = store.get_mut(crate::entity::EntityId(0)).expect("entity");
        request_path(entity, &map, TileCoord::new(1, 0)).expect("path");
        let held = StepGate {
            may_start: false,
            spend_action_points: false,
        };
        assert_eq!(update_movement(entity, &map, &config, held), MovementEvent::Held);
        assert_eq!(entity.movement.cooldown, 1);

        update_movement(entity, &map, &config, StepGate::FREE);
        assert_eq!(
            update_movement(entity, &map, &config, StepGate::FREE),
            MovementEvent::Sliding
        );
        for _ in 0..3 {
            assert_eq!(update_movement(entity, &map, &config, held), MovementEvent::Sliding);
        }
        assert!(matches!(
            update_movement(entity, &map, &config, held),
            MovementEvent::Arrived { .. }
        ));
    }

    #[test]
    fn combat_steps_spend_tile_cost_and_stop_when_unaffordable() {
        let map = GridMap::filled(5, 1, TILE_RUBBLE).expect("map");
        let config = MovementConfig {
            move_delay_ticks: 0,
            progress_per_tick: 1.0,
        };
        let gate = StepGate {
            may_start: true,
            spend_action_points: true,
        };
        let mut store = EntityStore::default();
        let id = store
            .spawn(TileCoord::new(0, 0), EntityRole::Npc, 0, 3)
            .expect("spawn");
        let entity = store.get_mut(id).expect("entity");
        request_path(entity, &map, TileCoord::new(4, 0)).expect("path");

        assert!(matches!(
            update_movement(entity, &map, &config, gate),
            MovementEvent::Arrived { .. }
        ));
        assert_eq!(entity.action_points.current, 1);
        assert_eq!(
            update_movement(entity, &map, &config, gate),
            MovementEvent::Blocked(StepBlock::OutOfActionPoints)
        );
        assert_eq!(entity.position, TileCoord::new(1, 0));
        assert!(entity.path().is_none());
    }
}
