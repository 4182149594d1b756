use std::time::Duration;

use crate::world::DrawTarget;

use super::input::ActionStates;
use super::InputAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
    window_width: u32,
    window_height: u32,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(
        quit_requested: bool,
        actions: ActionStates,
        window_width: u32,
        window_height: u32,
    ) -> Self {
        Self {
            quit_requested,
            actions,
            window_width,
            window_height,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    /// True only on the tick the action went down.
    pub fn pressed(&self, action: InputAction) -> bool {
        self.actions.was_pressed(action)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_width = width;
        self.window_height = height;
        self
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }
}

/// A game state driven by the fixed-step loop.
pub trait Scene {
    fn update(&mut self, dt: Duration, input: &InputSnapshot) -> SceneCommand;
    fn render(&mut self, target: &mut dyn DrawTarget);
    fn debug_title(&self) -> Option<String> {
        None
    }
    /// Extra lines for the debug overlay.
    fn debug_lines(&self) -> Vec<String> {
        Vec::new()
    }
    fn shutdown(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_marks_press_edge_with_down_state() {
        let snapshot = InputSnapshot::empty()
            .with_action_down(InputAction::MoveLeft, true)
            .with_window_size(800, 600);
        assert!(snapshot.is_down(InputAction::MoveLeft));
        assert!(snapshot.pressed(InputAction::MoveLeft));
        assert!(!snapshot.is_down(InputAction::Run));
        assert_eq!(snapshot.window_size(), (800, 600));
        assert!(!snapshot.quit_requested());
    }
}
