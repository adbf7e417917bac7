use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::config::AiConfig;
use crate::entity::Entity;
use crate::grid::{Direction, GridMap, TileCoord};
use crate::movement::request_path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AiState {
    #[default]
    Idle,
    Wander,
    Chase,
}

impl AiState {
    pub fn as_token(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Wander => "wander",
            Self::Chase => "chase",
        }
    }

    pub fn tint(self) -> [u8; 3] {
        match self {
            Self::Idle => [64, 64, 64],
            Self::Wander => [0, 255, 0],
            Self::Chase => [255, 0, 0],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Behavior {
    Player,
    Idle,
    Wander,
    Chase,
}

impl Behavior {
    pub fn for_state(state: AiState) -> Self {
        match state {
            AiState::Idle => Self::Idle,
            AiState::Wander => Self::Wander,
            AiState::Chase => Self::Chase,
        }
    }
}

pub struct BehaviorContext<'a> {
    pub map: &'a GridMap,
    pub config: &'a AiConfig,
    pub rng: &'a mut ChaCha8Rng,
    pub player_position: Option<TileCoord>,
    /// Counts chase replan attempts across all NPCs.
    pub chase_counter: &'a mut u32,
    /// Set on the first tick of an NPC's combat turn; skips the replan throttle.
    pub force_replan: bool,
    pub nudge: Option<Direction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AiTransition {
    pub from: AiState,
    pub to: AiState,
}

pub fn think(entity: &mut Entity, context: &mut BehaviorContext<'_>) -> Option<AiTransition> {
    if entity.is_player() {
        return None;
    }
    let distance = context
        .player_position
        .map(|player| player.manhattan_distance(entity.position));

    let next = match entity.ai_state {
        AiState::Idle if context.config.wander_start_chance.roll(context.rng) => AiState::Wander,
        AiState::Wander if distance.is_some_and(|d| d <= context.config.sight_range) => {
            AiState::Chase
        }
        AiState::Chase if distance.is_some_and(|d| d > context.config.lose_range) => AiState::Idle,
        current => current,
    };
    if next == entity.ai_state {
        return None;
    }

    let transition = AiTransition {
        from: entity.ai_state,
        to: next,
    };
    entity.ai_state = next;
    entity.behavior = Behavior::for_state(next);
    debug!(
        entity = entity.id.0,
        from = transition.from.as_token(),
        to = transition.to.as_token(),
        "ai_transition"
    );
    Some(transition)
}

/// Runs the entity's behavior. Any destination it picks goes through
/// [`request_path`], so an older path is always released first.
pub fn act(entity: &mut Entity, context: &mut BehaviorContext<'_>) {
    match entity.behavior {
        Behavior::Player => player_behavior(entity, context),
        Behavior::Idle => {}
        Behavior::Wander => wander_behavior(entity, context),
        Behavior::Chase => chase_behavior(entity, context),
    }
}

fn player_behavior(entity: &mut Entity, context: &mut BehaviorContext<'_>) {
    let Some(direction) = context.nudge else {
        return;
    };
    // Held keys repeat; a nudge never cuts a running slide short.
    if entity.movement.interpolating {
        return;
    }
    let _ = request_path(entity, context.map, entity.position.step(direction));
}

fn wander_behavior(entity: &mut Entity, context: &mut BehaviorContext<'_>) {
    if entity.path().is_some() {
        return;
    }
    if !context.config.wander_step_chance.roll(context.rng) {
        return;
    }
    let direction = Direction::ALL[context.rng.gen_range(0..Direction::ALL.len())];
    let _ = request_path(entity, context.map, entity.position.step(direction));
}

fn chase_behavior(entity: &mut Entity, context: &mut BehaviorContext<'_>) {
    let Some(player) = context.player_position else {
        return;
    };
    if entity.has_active_path() {
        return;
    }
    *context.chase_counter = context.chase_counter.wrapping_add(1);
    let interval = context.config.chase_replan_interval.max(1);
    if !context.force_replan && *context.chase_counter % interval != 0 {
        return;
    }
    let _ = request_path(entity, context.map, player);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Chance;
    use crate::entity::{EntityId, EntityRole, EntityStore};
    use crate::grid::TILE_GRASS;
    use rand::SeedableRng;

    struct Harness {
        map: GridMap,
        config: AiConfig,
        rng: ChaCha8Rng,
        chase_counter: u32,
    }

    impl Harness {
        fn new(config: AiConfig) -> Self {
            Self {
                map: GridMap::filled(20, 20, TILE_GRASS).expect("map"),
                config,
                rng: ChaCha8Rng::seed_from_u64(42),
                chase_counter: 0,
            }
        }

        fn context(&mut self, player_position: Option<TileCoord>) -> BehaviorContext<'_> {
            BehaviorContext {
                map: &self.map,
                config: &self.config,
                rng: &mut self.rng,
                player_position,
                chase_counter: &mut self.chase_counter,
                force_replan: false,
                nudge: None,
            }
        }
    }

    fn npc_at(position: TileCoord) -> EntityStore {
        let mut store = EntityStore::default();
        store.spawn(position, EntityRole::Npc, 6, 6).expect("spawn");
        store
    }

    #[test]
    fn idle_starts_wandering_when_roll_succeeds() {
        let mut harness = Harness::new(AiConfig {
            wander_start_chance: Chance::new(1, 1),
            ..AiConfig::default()
        });
        let mut store = npc_at(TileCoord::new(10, 10));
        let entity = store.get_mut(EntityId(0)).expect("npc");
        let transition = think(entity, &mut harness.context(None));
        assert_eq!(
            transition,
            Some(AiTransition {
                from: AiState::Idle,
                to: AiState::Wander
            })
        );
        assert_eq!(entity.behavior, Behavior::Wander);
    }

    #[test]
    fn idle_never_wanders_with_zero_chance() {
        let mut harness = Harness::new(AiConfig {
            wander_start_chance: Chance::new(0, 1),
            ..AiConfig::default()
        });
        let mut store = npc_at(TileCoord::new(10, 10));
        let entity = store.get_mut(EntityId(0)).expect("npc");
        for _ in 0..500 {
            assert!(think(entity, &mut harness.context(Some(TileCoord::new(10, 11)))).is_none());
        }
        assert_eq!(entity.ai_state, AiState::Idle);
    }

    #[test]
    fn chase_hysteresis_between_sight_and_lose_ranges() {
        let mut harness = Harness::new(AiConfig::default());
        let mut store = npc_at(TileCoord::new(10, 10));
        let entity = store.get_mut(EntityId(0)).expect("npc");
        entity.ai_state = AiState::Wander;
        entity.behavior = Behavior::Wander;

        assert!(think(entity, &mut harness.context(Some(TileCoord::new(16, 10)))).is_none());
        assert!(think(entity, &mut harness.context(Some(TileCoord::new(15, 10)))).is_some());
        assert_eq!(entity.ai_state, AiState::Chase);

        // Between 5 and 7 the chase holds.
        for x in [15, 16, 17] {
            assert!(think(entity, &mut harness.context(Some(TileCoord::new(x, 10)))).is_none());
            assert_eq!(entity.ai_state, AiState::Chase);
        }
        assert!(think(entity, &mut harness.context(Some(TileCoord::new(18, 10)))).is_some());
        assert_eq!(entity.ai_state, AiState::Idle);
        assert_eq!(entity.behavior, Behavior::Idle);
    }

    #[test]
    fn wander_steps_to_an_adjacent_cell() {
        let mut harness = Harness::new(AiConfig {
            wander_step_chance: Chance::new(1, 1),
            ..AiConfig::default()
        });
        let mut store = npc_at(TileCoord::new(10, 10));
        let entity = store.get_mut(EntityId(0)).expect("npc");
        entity.behavior = Behavior::Wander;
        act(entity, &mut harness.context(None));
        let path = entity.path().expect("wander path");
        assert_eq!(path.len(), 2);
        assert!(path
            .goal()
            .is_some_and(|goal| goal.is_adjacent(TileCoord::new(10, 10))));

        let before = path.clone();
        act(entity, &mut harness.context(None));
        assert_eq!(entity.path(), Some(&before));
    }

    #[test]
    fn wander_off_the_map_edge_is_discarded() {
        let mut harness = Harness::new(AiConfig {
            wander_step_chance: Chance::new(1, 1),
            ..AiConfig::default()
        });
        harness.map = GridMap::filled(1, 1, TILE_GRASS).expect("map");
        let mut store = npc_at(TileCoord::new(0, 0));
        let entity = store.get_mut(EntityId(0)).expect("npc");
        entity.behavior = Behavior::Wander;
        for _ in 0..20 {
            act(entity, &mut harness.context(None));
            assert!(entity.path().is_none());
        }
    }

    #[test]
    fn chase_replans_every_tenth_attempt() {
        let mut harness = Harness::new(AiConfig::default());
        let mut store = npc_at(TileCoord::new(10, 10));
        let entity = store.get_mut(EntityId(0)).expect("npc");
        entity.behavior = Behavior::Chase;
        let player = Some(TileCoord::new(13, 10));

        for _ in 0..9 {
            act(entity, &mut harness.context(player));
            assert!(entity.path().is_none());
        }
        act(entity, &mut harness.context(player));
        assert_eq!(
            entity.path().and_then(|path| path.goal()),
            Some(TileCoord::new(13, 10))
        );
        assert_eq!(harness.chase_counter, 10);

        act(entity, &mut harness.context(player));
        assert_eq!(harness.chase_counter, 10, "active path skips the counter");
    }

    #[test]
    fn forced_replan_ignores_throttle() {
        let mut harness = Harness::new(AiConfig::default());
        let mut store = npc_at(TileCoord::new(10, 10));
        let entity = store.get_mut(EntityId(0)).expect("npc");
        entity.behavior = Behavior::Chase;
        let mut context = harness.context(Some(TileCoord::new(12, 10)));
        context.force_replan = true;
        act(entity, &mut context);
        assert!(entity.has_active_path());
    }

    #[test]
    fn player_nudge_requests_adjacent_step() {
        let mut harness = Harness::new(AiConfig::default());
        let mut store = EntityStore::default();
        let id = store
            .spawn(TileCoord::new(5, 5), EntityRole::Player, 6, 6)
            .expect("spawn");
        let entity = store.get_mut(id).expect("player");
        let mut context = harness.context(None);
        context.nudge = Some(Direction::North);
        act(entity, &mut context);
        assert_eq!(
            entity.path().and_then(|path| path.goal()),
            Some(TileCoord::new(5, 4))
        );
        assert!(think(entity, &mut harness.context(Some(TileCoord::new(5, 5)))).is_none());
    }
}
