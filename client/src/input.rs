//! Keyboard sampling for the frame loop.

use crate::sync::MoveIntent;
use macroquad::prelude::*;
use shared::Direction;

/// Input captured for one frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameInput {
    pub intent: MoveIntent,
    pub chat_pressed: bool,
}

/// Samples macroquad key state once per frame and tracks edges.
pub struct InputManager {
    chat_was_down: bool,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            chat_was_down: false,
        }
    }

    pub fn capture(&mut self) -> FrameInput {
        let left = is_key_down(KeyCode::A) || is_key_down(KeyCode::Left);
        let right = is_key_down(KeyCode::D) || is_key_down(KeyCode::Right);
        let up = is_key_down(KeyCode::W) || is_key_down(KeyCode::Up);
        let down = is_key_down(KeyCode::S) || is_key_down(KeyCode::Down);

        let mut dx = 0.0;
        let mut dy = 0.0;
        if left {
            dx -= 1.0;
        }
        if right {
            dx += 1.0;
        }
        if up {
            dy -= 1.0;
        }
        if down {
            dy += 1.0;
        }

        // Diagonal movement stays at unit speed
        if dx != 0.0 && dy != 0.0 {
            let inv = 1.0 / (2.0_f32).sqrt();
            dx *= inv;
            dy *= inv;
        }

        let facing = Self::facing(dx, dy);

        let chat_down = is_key_down(KeyCode::Enter);
        let chat_pressed = chat_down && !self.chat_was_down;
        self.chat_was_down = chat_down;

        FrameInput {
            intent: MoveIntent { dx, dy, facing },
            chat_pressed,
        }
    }

    /// Vertical motion wins the facing when both axes are active.
    fn facing(dx: f32, dy: f32) -> Option<Direction> {
        if dy < 0.0 {
            Some(Direction::Up)
        } else if dy > 0.0 {
            Some(Direction::Down)
        } else if dx < 0.0 {
            Some(Direction::Left)
        } else if dx > 0.0 {
            Some(Direction::Right)
        } else {
            None
        }
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facing_vertical_wins() {
        assert_eq!(InputManager::facing(1.0, -1.0), Some(Direction::Up));
        assert_eq!(InputManager::facing(-1.0, 1.0), Some(Direction::Down));
        assert_eq!(InputManager::facing(-1.0, 0.0), Some(Direction::Left));
        assert_eq!(InputManager::facing(1.0, 0.0), Some(Direction::Right));
        assert_eq!(InputManager::facing(0.0, 0.0), None);
    }
}
