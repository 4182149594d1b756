#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Run,
    Walk,
    Interact,
    ToggleCollisionDebug,
    Quit,
}

const ACTION_COUNT: usize = 9;

/// Held state per action plus a press edge that survives until the next tick snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
    pressed: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        let index = action.index();
        if is_down && !self.down[index] {
            self.pressed[index] = true;
        }
        self.down[index] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    pub(crate) fn was_pressed(&self, action: InputAction) -> bool {
        self.pressed[action.index()]
    }

    pub(crate) fn clear_pressed(&mut self) {
        self.pressed = [false; ACTION_COUNT];
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveUp => 0,
            InputAction::MoveDown => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::Run => 4,
            InputAction::Walk => 5,
            InputAction::Interact => 6,
            InputAction::ToggleCollisionDebug => 7,
            InputAction::Quit => 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_edge_only_on_transition_to_down() {
        let mut states = ActionStates::default();
        states.set(InputAction::Interact, true);
        assert!(states.was_pressed(InputAction::Interact));

        states.clear_pressed();
        states.set(InputAction::Interact, true);
        assert!(states.is_down(InputAction::Interact));
        assert!(!states.was_pressed(InputAction::Interact));

        states.set(InputAction::Interact, false);
        states.set(InputAction::Interact, true);
        assert!(states.was_pressed(InputAction::Interact));
    }
}
