pub mod controller;
pub mod state;

pub use controller::{SessionController, SAVE_UNAVAILABLE};
pub use state::{SessionState, SessionStatus, INITIAL_CANVAS_KEY};
