use tracing::info;

use crate::config::CombatConfig;
use crate::entity::{EntityId, EntityStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CombatPhase {
    #[default]
    Exploring,
    InCombat {
        active: EntityId,
        initialized: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatTransition {
    Started { active: EntityId },
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnEvent {
    Started(EntityId),
    Ended { previous: EntityId, next: EntityId },
}

#[derive(Debug, Clone, Default)]
pub struct CombatScheduler {
    phase: CombatPhase,
    forced: bool,
    fresh_turn: bool,
}

impl CombatScheduler {
    pub fn phase(&self) -> CombatPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, CombatPhase::InCombat { .. })
    }

    pub fn is_forced(&self) -> bool {
        self.forced
    }

    pub fn active_entity(&self) -> Option<EntityId> {
        match self.phase {
            CombatPhase::Exploring => None,
            CombatPhase::InCombat { active, .. } => Some(active),
        }
    }

    pub fn is_turn(&self, id: EntityId) -> bool {
        match self.phase {
            CombatPhase::Exploring => true,
            CombatPhase::InCombat { active, .. } => active == id,
        }
    }

    pub fn turn_just_started(&self) -> bool {
        self.fresh_turn
    }

    pub fn force(&mut self) {
        self.forced = true;
    }

    pub fn clear_forced(&mut self) {
        self.forced = false;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn update_engagement(
        &mut self,
        entities: &mut EntityStore,
        config: &CombatConfig,
    ) -> Option<CombatTransition> {
        let nearest = nearest_npc_distance(entities);
        match self.phase {
            CombatPhase::Exploring => {
                let in_range = nearest.is_some_and(|distance| distance <= config.trigger_range);
                if (!in_range && !self.forced) || entities.is_empty() {
                    return None;
                }
                let active = entities.player_id().unwrap_or(EntityId(0));
                self.phase = CombatPhase::InCombat {
                    active,
                    initialized: false,
                };
                self.fresh_turn = false;
                info!(
                    active = active.0,
                    nearest = nearest.unwrap_or(u32::MAX),
                    forced = self.forced,
                    "combat_started"
                );
                Some(CombatTransition::Started { active })
            }
            CombatPhase::InCombat { .. } => {
                if self.forced || nearest.is_some_and(|distance| distance <= config.clear_range) {
                    return None;
                }
                self.phase = CombatPhase::Exploring;
                self.fresh_turn = false;
                for index in 0..entities.len() {
                    if let Some(entity) = entities.get_mut(EntityId(index)) {
                        entity.action_points.refill();
                    }
                }
                info!(nearest = nearest.unwrap_or(u32::MAX), "combat_ended");
                Some(CombatTransition::Ended)
            }
        }
    }

    /// Per-tick turn bookkeeping. The tick that initializes a turn does
    /// nothing else; exhaustion checks start on the following tick.
    pub fn update_turn(&mut self, entities: &mut EntityStore) -> Option<TurnEvent> {
        self.fresh_turn = false;
        let CombatPhase::InCombat {
            mut active,
            initialized,
        } = self.phase
        else {
            return None;
        };
        if entities.is_empty() {
            self.phase = CombatPhase::Exploring;
            return None;
        }
        if active.0 >= entities.len() {
            active = EntityId(0);
        }
        let entity = entities.get_mut(active)?;

        if !initialized {
            entity.action_points.refill();
            self.phase = CombatPhase::InCombat {
                active,
                initialized: true,
            };
            self.fresh_turn = true;
            info!(
                entity = active.0,
                action_points = entity.action_points.current,
                "turn_started"
            );
            return Some(TurnEvent::Started(active));
        }

        let interpolating = entity.movement.interpolating;
        if !entity.is_player() && !interpolating && !entity.has_active_path() {
            entity.action_points.forfeit();
        }
        if interpolating || !entity.action_points.is_exhausted() {
            return None;
        }

        let next = EntityId((active.0 + 1) % entities.len());
        self.phase = CombatPhase::InCombat {
            active: next,
            initialized: false,
        };
        Some(TurnEvent::Ended {
            previous: active,
            next,
        })
    }

    /// The active entity gives up its remaining action points. The handoff
    /// itself happens on the next turn update once any slide has finished.
    pub fn end_turn(&mut self, entities: &mut EntityStore) -> Option<EntityId> {
        let CombatPhase::InCombat { active, .. } = self.phase else {
            return None;
        };
        let entity = entities.get_mut(active)?;
        entity.action_points.forfeit();
        self.phase = CombatPhase::InCombat {
            active,
            initialized: true,
        };
        Some(active)
    }
}

fn nearest_npc_distance(entities: &EntityStore) -> Option<u32> {
    let player = entities.player()?.position;
    entities
        .iter()
        .filter(|entity| !entity.is_player())
        .map(|entity| entity.position.manhattan_distance(player))
        .min()
}
