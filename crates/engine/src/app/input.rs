use crate::grid::{Direction, TileCoord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    EndTurn,
    Quit,
}

const ACTION_COUNT: usize = 6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveUp => 0,
            InputAction::MoveDown => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::EndTurn => 4,
            InputAction::Quit => 5,
        }
    }

    pub const fn direction(self) -> Option<Direction> {
        match self {
            InputAction::MoveUp => Some(Direction::North),
            InputAction::MoveDown => Some(Direction::South),
            InputAction::MoveLeft => Some(Direction::West),
            InputAction::MoveRight => Some(Direction::East),
            InputAction::EndTurn | InputAction::Quit => None,
        }
    }
}

/// Input gathered for one tick. Clicks arrive already resolved to a tile
/// (see `IsoProjection::screen_to_tile`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    actions: ActionStates,
    clicked_tile: Option<TileCoord>,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn quit_requested(&self) -> bool {
        self.actions.is_down(InputAction::Quit)
    }

    pub fn end_turn_pressed(&self) -> bool {
        self.actions.is_down(InputAction::EndTurn)
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn clicked_tile(&self) -> Option<TileCoord> {
        self.clicked_tile
    }

    pub fn nudge(&self) -> Option<Direction> {
        [
            InputAction::MoveUp,
            InputAction::MoveDown,
            InputAction::MoveLeft,
            InputAction::MoveRight,
        ]
        .into_iter()
        .find(|action| self.actions.is_down(*action))
        .and_then(InputAction::direction)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_clicked_tile(mut self, clicked_tile: Option<TileCoord>) -> Self {
        self.clicked_tile = clicked_tile;
        self
    }
}
