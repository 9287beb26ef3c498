/// Platform-agnostic input handling system
use glam::Vec2;

/// Platform-independent input events, positions in client coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerMove { x: f32, y: f32 },
    PointerLeave,
    PointerDown { button: MouseButton, x: f32, y: f32 },
    PointerUp { button: MouseButton },
    Wheel { delta_y: f32 },

    TouchStart { x: f32, y: f32 },
    TouchMove { x: f32, y: f32 },
    TouchEnd,

    FocusLost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    pub fn from_web_button(button: i16) -> Self {
        match button {
            0 => MouseButton::Left,
            1 => MouseButton::Middle,
            2 => MouseButton::Right,
            _ => MouseButton::Left,
        }
    }
}

/// What a processed event means for the pick tracker
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerUpdate {
    Moved(Vec2),
    Cleared,
}

/// Accumulated orbit input between two frames
#[derive(Debug, Default)]
pub struct InputState {
    pub dragging: bool,
    pub drag_delta: Vec2,
    pub zoom_delta: f32,
    last_pointer: Option<Vec2>,
    /// Set while the debug UI owns the pointer
    pub ui_wants_pointer: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process an input event and update state. The returned update is
    /// forwarded to the pick tracker by the caller.
    pub fn process_event(&mut self, event: &InputEvent) -> Option<PointerUpdate> {
        match *event {
            InputEvent::PointerMove { x, y } | InputEvent::TouchMove { x, y } => {
                let pos = Vec2::new(x, y);
                if self.dragging {
                    if let Some(last) = self.last_pointer {
                        self.drag_delta += pos - last;
                    }
                }
                self.last_pointer = Some(pos);
                Some(PointerUpdate::Moved(pos))
            }
            InputEvent::TouchStart { x, y } => {
                let pos = Vec2::new(x, y);
                self.last_pointer = Some(pos);
                Some(PointerUpdate::Moved(pos))
            }
            InputEvent::PointerDown { button, x, y } => {
                if button == MouseButton::Left && !self.ui_wants_pointer {
                    self.dragging = true;
                    self.last_pointer = Some(Vec2::new(x, y));
                }
                None
            }
            InputEvent::PointerUp { button } => {
                if button == MouseButton::Left {
                    self.dragging = false;
                }
                None
            }
            InputEvent::Wheel { delta_y } => {
                if !self.ui_wants_pointer {
                    self.zoom_delta += delta_y;
                }
                None
            }
            InputEvent::PointerLeave | InputEvent::TouchEnd => {
                self.last_pointer = None;
                Some(PointerUpdate::Cleared)
            }
            InputEvent::FocusLost => {
                self.dragging = false;
                self.last_pointer = None;
                None
            }
        }
    }

    pub fn consume_drag(&mut self) -> Vec2 {
        std::mem::take(&mut self.drag_delta)
    }

    pub fn consume_zoom(&mut self) -> f32 {
        std::mem::take(&mut self.zoom_delta)
    }
}

pub mod wasm {
    use super::*;
    use web_sys::{MouseEvent, TouchEvent, WheelEvent};

    pub fn pointer_move_to_input(e: &MouseEvent) -> InputEvent {
        InputEvent::PointerMove { x: e.client_x() as f32, y: e.client_y() as f32 }
    }

    pub fn pointer_down_to_input(e: &MouseEvent) -> InputEvent {
        InputEvent::PointerDown {
            button: MouseButton::from_web_button(e.button()),
            x: e.client_x() as f32,
            y: e.client_y() as f32,
        }
    }

    pub fn pointer_up_to_input(e: &MouseEvent) -> InputEvent {
        InputEvent::PointerUp { button: MouseButton::from_web_button(e.button()) }
    }

    pub fn wheel_to_input(e: &WheelEvent) -> InputEvent {
        InputEvent::Wheel { delta_y: e.delta_y() as f32 }
    }

    /// Touch start/move from the first active touch point
    pub fn touch_to_input(e: &TouchEvent, is_start: bool) -> Option<InputEvent> {
        let touch = e.touches().get(0)?;
        let (x, y) = (touch.client_x() as f32, touch.client_y() as f32);
        Some(if is_start {
            InputEvent::TouchStart { x, y }
        } else {
            InputEvent::TouchMove { x, y }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_moves_forward_position() {
        let mut input = InputState::new();
        let update = input.process_event(&InputEvent::PointerMove { x: 10.0, y: 20.0 });
        assert_eq!(update, Some(PointerUpdate::Moved(Vec2::new(10.0, 20.0))));
        assert_eq!(input.consume_drag(), Vec2::ZERO);
    }

    #[test]
    fn test_leave_and_touch_end_clear() {
        let mut input = InputState::new();
        assert_eq!(input.process_event(&InputEvent::PointerLeave), Some(PointerUpdate::Cleared));
        assert_eq!(input.process_event(&InputEvent::TouchEnd), Some(PointerUpdate::Cleared));
    }

    #[test]
    fn test_drag_accumulates_until_consumed() {
        let mut input = InputState::new();
        input.process_event(&InputEvent::PointerDown { button: MouseButton::Left, x: 0.0, y: 0.0 });
        input.process_event(&InputEvent::PointerMove { x: 5.0, y: 1.0 });
        input.process_event(&InputEvent::PointerMove { x: 8.0, y: -1.0 });
        assert_eq!(input.consume_drag(), Vec2::new(8.0, -1.0));
        assert_eq!(input.consume_drag(), Vec2::ZERO);

        input.process_event(&InputEvent::PointerUp { button: MouseButton::Left });
        input.process_event(&InputEvent::PointerMove { x: 20.0, y: 20.0 });
        assert_eq!(input.consume_drag(), Vec2::ZERO);
    }

    #[test]
    fn test_ui_owned_pointer_does_not_orbit() {
        let mut input = InputState::new();
        input.ui_wants_pointer = true;
        input.process_event(&InputEvent::PointerDown { button: MouseButton::Left, x: 0.0, y: 0.0 });
        input.process_event(&InputEvent::Wheel { delta_y: 100.0 });
        assert!(!input.dragging);
        assert_eq!(input.consume_zoom(), 0.0);
    }
}
