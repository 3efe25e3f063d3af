//! Terminal front end
//!
//! - `app`: keystroke/refresh loop and its state machine
//! - `terminal`: stdin polling and input-mode guard
//! - `renderer`: frame output

pub mod app;
pub mod renderer;
pub mod terminal;

pub use app::{ControllerState, InteractiveController};
pub use terminal::{Console, ModeControl, ModeGuard, StdinConsole, Termios};
