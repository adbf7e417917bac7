use thiserror::Error;

use crate::ai::{AiState, Behavior};
use crate::grid::TileCoord;
use crate::nav::Path;
use crate::projection::Vec2;

pub const MAX_ENTITIES: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRole {
    Player,
    Npc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EntityError {
    #[error("entity capacity of {capacity} reached")]
    CapacityExceeded { capacity: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionPoints {
    pub max: u32,
    pub current: u32,
}

impl ActionPoints {
    pub fn full(max: u32) -> Self {
        Self { max, current: max }
    }

    pub fn refill(&mut self) {
        self.current = self.max;
    }

    pub fn can_afford(&self, cost: u32) -> bool {
        self.current >= cost
    }

    pub fn spend(&mut self, cost: u32) {
        self.current = self.current.saturating_sub(cost);
    }

    pub fn forfeit(&mut self) {
        self.current = 0;
    }

    pub fn is_exhausted(&self) -> bool {
        self.current == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementState {
    pub interpolating: bool,
    pub progress: f32,
    pub from: TileCoord,
    pub to: TileCoord,
    pub cooldown: u32,
    pub delay: u32,
    pub pending_cost: u32,
}

impl MovementState {
    fn at_rest(position: TileCoord, delay: u32) -> Self {
        Self {
            interpolating: false,
            progress: 0.0,
            from: position,
            to: position,
            cooldown: delay,
            delay,
            pending_cost: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementPhase {
    Idle,
    Following,
    Interpolating,
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub role: EntityRole,
    pub position: TileCoord,
    pub render_position: Vec2,
    pub movement: MovementState,
    pub ai_state: AiState,
    pub behavior: Behavior,
    pub action_points: ActionPoints,
    pub(crate) path: Option<Path>,
}

impl Entity {
    pub fn is_player(&self) -> bool {
        self.role == EntityRole::Player
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_ref()
    }

    pub fn has_active_path(&self) -> bool {
        self.path.as_ref().is_some_and(|path| !path.is_complete())
    }

    pub fn movement_phase(&self) -> MovementPhase {
        if self.movement.interpolating {
            MovementPhase::Interpolating
        } else if self.has_active_path() {
            MovementPhase::Following
        } else {
            MovementPhase::Idle
        }
    }

    pub fn tint(&self) -> [u8; 3] {
        match self.role {
            EntityRole::Player => [255, 255, 255],
            EntityRole::Npc => self.ai_state.tint(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EntityStore {
    entities: Vec<Entity>,
    capacity: usize,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::with_capacity(MAX_ENTITIES)
    }
}

impl EntityStore {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entities: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn spawn(
        &mut self,
        position: TileCoord,
        role: EntityRole,
        move_delay: u32,
        max_action_points: u32,
    ) -> Result<EntityId, EntityError> {
        if self.entities.len() >= self.capacity {
            return Err(EntityError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        let id = EntityId(self.entities.len());
        let behavior = match role {
            EntityRole::Player => Behavior::Player,
            EntityRole::Npc => Behavior::for_state(AiState::Idle),
        };
        self.entities.push(Entity {
            id,
            role,
            position,
            render_position: Vec2::from_tile(position),
            movement: MovementState::at_rest(position, move_delay),
            ai_state: AiState::Idle,
            behavior,
            action_points: ActionPoints::full(max_action_points),
            path: None,
        });
        Ok(id)
    }

    pub fn clear(&mut self) {
        self.entities.clear();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.0)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn as_slice(&self) -> &[Entity] {
        &self.entities
    }

    pub fn player(&self) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.is_player())
    }

    pub fn player_id(&self) -> Option<EntityId> {
        self.player().map(|entity| entity.id)
    }
}
