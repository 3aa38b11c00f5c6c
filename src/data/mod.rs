pub mod launch_state;

pub use launch_state::{LaunchState, StateStore};
