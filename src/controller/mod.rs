// CONTROLLER: Input, picking and the per-frame update
pub mod input;
pub mod pick;
pub mod camera_controller;
pub mod frame_loop;

pub use input::{InputEvent, InputState, MouseButton, PointerUpdate};
pub use pick::{CanvasRect, PickTracker, NO_PICK};
pub use camera_controller::OrbitController;
pub use frame_loop::{FrameLoopContext, FrameReport, FrameStats, ViewportState};
