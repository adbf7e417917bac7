use std::path::Path;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::ai::{act, think, BehaviorContext};
use crate::app::InputSnapshot;
use crate::combat::{CombatPhase, CombatScheduler, CombatTransition, TurnEvent};
use crate::config::SimConfig;
use crate::entity::{Entity, EntityError, EntityId, EntityRole, EntityStore};
use crate::grid::{GridMap, MapLoadError, TileCoord};
use crate::movement::{self, AssignOutcome, MovementEvent, StepGate};
use crate::nav::{MoveRange, PathError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error("no entity with id {0:?}")]
    UnknownEntity(EntityId),
    #[error(transparent)]
    Path(#[from] PathError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RangeKey {
    origin: TileCoord,
    in_combat: bool,
    budget: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub combat: Option<CombatTransition>,
    pub turn: Option<TurnEvent>,
    pub arrivals: Vec<(EntityId, TileCoord)>,
    pub blocked: Vec<EntityId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    Moving,
    Selected,
    OutOfBounds,
}

#[derive(Debug, Clone)]
pub struct World {
    config: SimConfig,
    map: GridMap,
    entities: EntityStore,
    combat: CombatScheduler,
    move_range: MoveRange,
    selected_tile: Option<TileCoord>,
    rng: ChaCha8Rng,
    chase_counter: u32,
    tick: u64,
    range_key: Option<RangeKey>,
}

impl World {
    pub fn new(map: GridMap, config: SimConfig) -> Self {
        Self {
            entities: EntityStore::with_capacity(config.max_entities),
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            config,
            map,
            combat: CombatScheduler::default(),
            move_range: MoveRange::default(),
            selected_tile: None,
            chase_counter: 0,
            tick: 0,
            range_key: None,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn map(&self) -> &GridMap {
        &self.map
    }

    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn player(&self) -> Option<&Entity> {
        self.entities.player()
    }

    pub fn combat(&self) -> &CombatScheduler {
        &self.combat
    }

    pub fn combat_phase(&self) -> CombatPhase {
        self.combat.phase()
    }

    pub fn move_range(&self) -> &MoveRange {
        &self.move_range
    }

    pub fn selected_tile(&self) -> Option<TileCoord> {
        self.selected_tile
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn chase_counter(&self) -> u32 {
        self.chase_counter
    }

    pub fn spawn(&mut self, x: i32, y: i32, role: EntityRole) -> Result<EntityId, EntityError> {
        let position = TileCoord::new(x, y);
        let id = self.entities.spawn(
            position,
            role,
            self.config.movement.move_delay_ticks,
            self.config.combat.max_action_points,
        )?;
        debug!(entity = id.0, ?role, %position, "entity_spawned");
        Ok(id)
    }

    pub fn reset(&mut self) {
        self.entities.clear();
        self.combat.reset();
        self.move_range.clear();
        self.selected_tile = None;
        self.rng = ChaCha8Rng::seed_from_u64(self.config.rng_seed);
        self.chase_counter = 0;
        self.tick = 0;
        self.range_key = None;
        info!(
            width = self.map.width(),
            height = self.map.height(),
            "scene_reset"
        );
    }

    pub fn reload_map(&mut self, path: &Path) -> Result<(), MapLoadError> {
        match GridMap::load(path, self.map.width(), self.map.height()) {
            Ok(map) => {
                self.replace_map(map);
                Ok(())
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "map_reload_failed_keeping_previous");
                Err(error)
            }
        }
    }

    pub fn replace_map(&mut self, map: GridMap) {
        self.map = map;
        self.range_key = None;
        self.refresh_move_range();
    }

    pub fn request_path(
        &mut self,
        id: EntityId,
        goal: TileCoord,
    ) -> Result<AssignOutcome, WorldError> {
        let entity = self
            .entities
            .get_mut(id)
            .ok_or(WorldError::UnknownEntity(id))?;
        Ok(movement::request_path(entity, &self.map, goal)?)
    }

    /// Pointer click on a tile: always selects it, and sends the player there
    /// when it is inside the highlighted move range on the player's turn.
    pub fn click_tile(&mut self, tile: TileCoord) -> ClickOutcome {
        if !self.map.in_bounds(tile) {
            return ClickOutcome::OutOfBounds;
        }
        self.selected_tile = Some(tile);
        self.refresh_move_range();

        let Some(player_id) = self.entities.player_id() else {
            return ClickOutcome::Selected;
        };
        if !self.combat.is_turn(player_id) || !self.move_range.is_reachable(tile) {
            return ClickOutcome::Selected;
        }
        match self.request_path(player_id, tile) {
            Ok(AssignOutcome::Assigned) => ClickOutcome::Moving,
            Ok(AssignOutcome::AlreadyThere) | Err(_) => ClickOutcome::Selected,
        }
    }

    pub fn force_combat(&mut self) {
        self.combat.force();
    }

    pub fn clear_forced_combat(&mut self) {
        self.combat.clear_forced();
    }

    /// Ends the active entity's combat turn. The rest of its route is
    /// dropped; a step already under way still lands before the handoff.
    pub fn end_turn(&mut self) -> Option<EntityId> {
        let active = self.combat.end_turn(&mut self.entities)?;
        if let Some(entity) = self.entities.get_mut(active) {
            movement::abandon_route(entity);
        }
        info!(entity = active.0, "turn_ended_by_request");
        Some(active)
    }

    pub fn refresh_move_range(&mut self) {
        let Some(player) = self.entities.player() else {
            if self.range_key.take().is_some() {
                self.move_range.clear();
            }
            return;
        };
        let in_combat = self.combat.is_active();
        let budget = if in_combat {
            player.action_points.current
        } else {
            self.config.explore_move_budget
        };
        let key = RangeKey {
            origin: player.position,
            in_combat,
            budget,
        };
        if self.range_key == Some(key) {
            return;
        }
        self.move_range.compute(&self.map, key.origin, key.budget);
        self.range_key = Some(key);
        debug!(
            origin = %key.origin,
            budget = key.budget,
            reachable = self.move_range.reachable_count(),
            "move_range_computed"
        );
    }

    pub fn tick(&mut self, input: &InputSnapshot) -> TickReport {
        let mut report = TickReport::default();

        if let Some(tile) = input.clicked_tile() {
            self.click_tile(tile);
        }
        if input.end_turn_pressed() {
            self.end_turn();
        }
        let nudge = input.nudge();

        report.combat = self
            .combat
            .update_engagement(&mut self.entities, &self.config.combat);
        report.turn = self.combat.update_turn(&mut self.entities);

        let player_position = self.entities.player().map(|player| player.position);
        let in_combat = self.combat.is_active();
        let force_replan = in_combat && self.combat.turn_just_started();

        for index in 0..self.entities.len() {
            let id = EntityId(index);
            let may_act = self.combat.is_turn(id);
            let Some(entity) = self.entities.get_mut(id) else {
                continue;
            };

            if may_act {
                let mut context = BehaviorContext {
                    map: &self.map,
                    config: &self.config.ai,
                    rng: &mut self.rng,
                    player_position,
                    chase_counter: &mut self.chase_counter,
                    force_replan,
                    nudge: nudge.filter(|_| entity.is_player()),
                };
                think(entity, &mut context);
                act(entity, &mut context);
            }

            let gate = StepGate {
                may_start: may_act,
                spend_action_points: in_combat,
            };
            match movement::update_movement(entity, &self.map, &self.config.movement, gate) {
                MovementEvent::Arrived { cell, .. } => report.arrivals.push((id, cell)),
                MovementEvent::Blocked(_) => report.blocked.push(id),
                _ => {}
            }
        }

        self.refresh_move_range();
        self.tick += 1;
        report.tick = self.tick;
        report
    }
}
