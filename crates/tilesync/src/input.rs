use crate::geom::{Direction, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Attack,
    Cancel,
    Ability1,
    Ability2,
    Ability3,
    Ability4,
    Ability5,
    Ability6,
}

const ACTION_COUNT: usize = 12;

pub const ABILITY_SLOTS: [InputAction; 6] = [
    InputAction::Ability1,
    InputAction::Ability2,
    InputAction::Ability3,
    InputAction::Ability4,
    InputAction::Ability5,
    InputAction::Ability6,
];

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveUp => 0,
            InputAction::MoveDown => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::Attack => 4,
            InputAction::Cancel => 5,
            InputAction::Ability1 => 6,
            InputAction::Ability2 => 7,
            InputAction::Ability3 => 8,
            InputAction::Ability4 => 9,
            InputAction::Ability5 => 10,
            InputAction::Ability6 => 11,
        }
    }

    pub const fn for_direction(direction: Direction) -> Self {
        match direction {
            Direction::Up => InputAction::MoveUp,
            Direction::Down => InputAction::MoveDown,
            Direction::Left => InputAction::MoveLeft,
            Direction::Right => InputAction::MoveRight,
        }
    }
}

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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Primary,
    Secondary,
}

/// Input state sampled once per frame: held keys, keys pressed since the
/// previous frame, and the cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputSnapshot {
    held: ActionStates,
    pressed: ActionStates,
    cursor_position_px: Option<Vec2>,
    primary_click_pressed: bool,
    secondary_click_pressed: bool,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.held.is_down(action)
    }

    pub fn was_pressed(&self, action: InputAction) -> bool {
        self.pressed.is_down(action)
    }

    /// First held direction in Up, Down, Left, Right order.
    pub fn held_direction(&self) -> Option<Direction> {
        Direction::PRIORITY
            .into_iter()
            .find(|direction| self.is_down(InputAction::for_direction(*direction)))
    }

    pub fn cursor_position_px(&self) -> Option<Vec2> {
        self.cursor_position_px
    }

    pub fn primary_click_pressed(&self) -> bool {
        self.primary_click_pressed
    }

    pub fn secondary_click_pressed(&self) -> bool {
        self.secondary_click_pressed
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.held.set(action, is_down);
        self
    }

    /// Marks `action` as pressed this frame (and held).
    pub fn with_action_pressed(mut self, action: InputAction) -> Self {
        self.held.set(action, true);
        self.pressed.set(action, true);
        self
    }

    pub fn with_cursor_position_px(mut self, cursor_position_px: Option<Vec2>) -> Self {
        self.cursor_position_px = cursor_position_px;
        self
    }

    pub fn with_primary_click_pressed(mut self, pressed: bool) -> Self {
        self.primary_click_pressed = pressed;
        self
    }

    pub fn with_secondary_click_pressed(mut self, pressed: bool) -> Self {
        self.secondary_click_pressed = pressed;
        self
    }
}

/// Accumulates raw key and mouse events between frames.
#[derive(Debug, Default)]
pub struct InputCollector {
    held: ActionStates,
    pressed_edges: ActionStates,
    cursor_position_px: Option<Vec2>,
    primary_is_down: bool,
    primary_pressed_edge: bool,
    secondary_is_down: bool,
    secondary_pressed_edge: bool,
}

impl InputCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_action(&mut self, action: InputAction, is_down: bool) {
        if is_down && !self.held.is_down(action) {
            self.pressed_edges.set(action, true);
        }
        self.held.set(action, is_down);
    }

    pub fn handle_mouse_button(&mut self, button: MouseButton, is_down: bool) {
        let (was_down, edge) = match button {
            MouseButton::Primary => (&mut self.primary_is_down, &mut self.primary_pressed_edge),
            MouseButton::Secondary => {
                (&mut self.secondary_is_down, &mut self.secondary_pressed_edge)
            }
        };
        if is_down && !*was_down {
            *edge = true;
        }
        *was_down = is_down;
    }

    pub fn set_cursor_position_px(&mut self, cursor_position_px: Option<Vec2>) {
        self.cursor_position_px = cursor_position_px;
    }

    /// Returns this frame's snapshot and clears the pressed edges.
    pub fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot {
            held: self.held,
            pressed: self.pressed_edges,
            cursor_position_px: self.cursor_position_px,
            primary_click_pressed: self.primary_pressed_edge,
            secondary_click_pressed: self.secondary_pressed_edge,
        };
        self.pressed_edges = ActionStates::default();
        self.primary_pressed_edge = false;
        self.secondary_pressed_edge = false;
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_priority_is_up_down_left_right() {
        let snapshot = InputSnapshot::empty()
            .with_action_down(InputAction::MoveRight, true)
            .with_action_down(InputAction::MoveLeft, true);
        assert_eq!(snapshot.held_direction(), Some(Direction::Left));

        let snapshot = snapshot.with_action_down(InputAction::MoveDown, true);
        assert_eq!(snapshot.held_direction(), Some(Direction::Down));

        let snapshot = snapshot.with_action_down(InputAction::MoveUp, true);
        assert_eq!(snapshot.held_direction(), Some(Direction::Up));

        assert_eq!(InputSnapshot::empty().held_direction(), None);
    }

    #[test]
    fn key_press_edge_reported_once() {
        let mut collector = InputCollector::new();
        collector.handle_action(InputAction::Attack, true);
        let first = collector.snapshot_for_tick();
        assert!(first.was_pressed(InputAction::Attack));
        assert!(first.is_down(InputAction::Attack));

        collector.handle_action(InputAction::Attack, true);
        let second = collector.snapshot_for_tick();
        assert!(!second.was_pressed(InputAction::Attack));
        assert!(second.is_down(InputAction::Attack));

        collector.handle_action(InputAction::Attack, false);
        collector.handle_action(InputAction::Attack, true);
        assert!(collector.snapshot_for_tick().was_pressed(InputAction::Attack));
    }

    #[test]
    fn tap_between_frames_still_registers() {
        let mut collector = InputCollector::new();
        collector.handle_action(InputAction::Ability2, true);
        collector.handle_action(InputAction::Ability2, false);
        let snapshot = collector.snapshot_for_tick();
        assert!(snapshot.was_pressed(InputAction::Ability2));
        assert!(!snapshot.is_down(InputAction::Ability2));
    }

    #[test]
    fn mouse_clicks_are_edges() {
        let mut collector = InputCollector::new();
        collector.set_cursor_position_px(Some(Vec2::new(5.0, 6.0)));
        collector.handle_mouse_button(MouseButton::Secondary, true);
        let snapshot = collector.snapshot_for_tick();
        assert!(snapshot.secondary_click_pressed());
        assert!(!snapshot.primary_click_pressed());
        assert_eq!(snapshot.cursor_position_px(), Some(Vec2::new(5.0, 6.0)));

        collector.handle_mouse_button(MouseButton::Secondary, true);
        assert!(!collector.snapshot_for_tick().secondary_click_pressed());
    }
}
