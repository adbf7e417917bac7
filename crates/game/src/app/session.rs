use engine::{
    InputAction, InputSnapshot, InputSource, IsoProjection, ScreenPoint, TileCoord, Viewport, World,
};
use tracing::{debug, info};

/// Ticks the player may sit idle on its combat turn before the session
/// ends the turn for it.
const AUTO_END_TURN_IDLE_TICKS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScriptStep {
    /// Point at the tile this far from the player and click it.
    ClickOffset { dx: i32, dy: i32 },
    Press(InputAction),
}

/// Headless stand-in for a human at the keyboard. The camera follows the
/// player and clicks go through the screen projection, as a pointer would.
#[derive(Debug, Clone)]
pub(crate) struct ScriptedSession {
    projection: IsoProjection,
    script: Vec<(u64, ScriptStep)>,
    cursor: usize,
    idle_turn_ticks: u32,
}

impl ScriptedSession {
    pub(crate) fn new(viewport: Viewport, mut script: Vec<(u64, ScriptStep)>) -> Self {
        script.sort_by_key(|(tick, _)| *tick);
        Self {
            projection: IsoProjection::new(viewport),
            script,
            cursor: 0,
            idle_turn_ticks: 0,
        }
    }

    /// Walks toward the NPC, pokes around, then lets combat play out.
    pub(crate) fn demo() -> Self {
        Self::new(
            Viewport::default(),
            vec![
                (5, ScriptStep::ClickOffset { dx: 2, dy: 0 }),
                (40, ScriptStep::ClickOffset { dx: 0, dy: 2 }),
                (80, ScriptStep::Press(InputAction::MoveRight)),
                (120, ScriptStep::ClickOffset { dx: 1, dy: 1 }),
                (200, ScriptStep::Press(InputAction::EndTurn)),
            ],
        )
    }

    fn pointer_for(&self, tile: TileCoord) -> ScreenPoint {
        let corner = self.projection.tile_to_screen(tile);
        ScreenPoint {
            x: corner.x + self.projection.tile_width / 4,
            y: corner.y + self.projection.tile_height / 4,
        }
    }

    fn auto_end_turn(&mut self, world: &World) -> bool {
        let Some(player) = world.player() else {
            return false;
        };
        let waiting = world.combat().is_active()
            && world.combat().is_turn(player.id)
            && !player.movement.interpolating
            && !player.has_active_path();
        if !waiting {
            self.idle_turn_ticks = 0;
            return false;
        }
        self.idle_turn_ticks += 1;
        if self.idle_turn_ticks < AUTO_END_TURN_IDLE_TICKS {
            return false;
        }
        self.idle_turn_ticks = 0;
        info!(
            tick = world.tick_count(),
            action_points = player.action_points.current,
            "auto_end_turn"
        );
        true
    }
}

impl InputSource for ScriptedSession {
    fn next_input(&mut self, world: &World) -> InputSnapshot {
        let map = world.map();
        self.projection.center_map(map.width(), map.height());
        if let Some(player) = world.player() {
            self.projection.follow(player.position);
        }

        let tick = world.tick_count();
        let mut input = InputSnapshot::empty();
        while let Some(&(at, step)) = self.script.get(self.cursor) {
            if at > tick {
                break;
            }
            self.cursor += 1;
            match step {
                ScriptStep::ClickOffset { dx, dy } => {
                    let Some(player) = world.player() else {
                        continue;
                    };
                    let pointer = self.pointer_for(player.position.offset(dx, dy));
                    let tile = self.projection.screen_to_tile(pointer);
                    debug!(tick, x = pointer.x, y = pointer.y, %tile, "scripted_click");
                    input = input.with_clicked_tile(Some(tile));
                }
                ScriptStep::Press(action) => {
                    debug!(tick, ?action, "scripted_press");
                    input = input.with_action_down(action, true);
                }
            }
        }

        if self.auto_end_turn(world) {
            input = input.with_action_down(InputAction::EndTurn, true);
        }
        input
    }
}

#[cfg(test)]
mod tests {
    use engine::{EntityId, EntityRole, GridMap, SimConfig};

    use super::*;

    fn world_with_player(x: i32, y: i32) -> World {
        let mut world = World::new(GridMap::filled(20, 20, 0).expect("map"), SimConfig::default());
        world.spawn(x, y, EntityRole::Player).expect("player");
        world
    }

    #[test]
    fn click_offset_resolves_to_the_intended_tile() {
        let world = world_with_player(5, 5);
        let mut session = ScriptedSession::new(
            Viewport::default(),
            vec![(0, ScriptStep::ClickOffset { dx: 3, dy: -2 })],
        );
        let input = session.next_input(&world);
        assert_eq!(input.clicked_tile(), Some(TileCoord::new(8, 3)));

        let input = session.next_input(&world);
        assert_eq!(input.clicked_tile(), None, "script steps fire once");
    }

    #[test]
    fn due_steps_merge_into_one_snapshot() {
        let world = world_with_player(5, 5);
        let mut session = ScriptedSession::new(
            Viewport::default(),
            vec![
                (0, ScriptStep::Press(InputAction::MoveUp)),
                (0, ScriptStep::Press(InputAction::EndTurn)),
                (9, ScriptStep::Press(InputAction::Quit)),
            ],
        );
        let input = session.next_input(&world);
        assert!(input.is_down(InputAction::MoveUp));
        assert!(input.end_turn_pressed());
        assert!(!input.quit_requested());
    }

    #[test]
    fn idle_player_turn_is_ended_automatically() {
        let mut world = world_with_player(5, 5);
        world.force_combat();
        world.tick(&InputSnapshot::empty());
        assert!(world.combat().is_turn(EntityId(0)));

        let mut session = ScriptedSession::new(Viewport::default(), Vec::new());
        let mut ended_at = None;
        for tick in 1..=AUTO_END_TURN_IDLE_TICKS {
            if session.next_input(&world).end_turn_pressed() {
                ended_at = Some(tick);
                break;
            }
        }
        assert_eq!(ended_at, Some(AUTO_END_TURN_IDLE_TICKS));
    }
}
