//! Step and distance goals.
//!
//! Goals are independent of sessions; their progress is recomputed from
//! completed activities.

pub mod manager;
pub mod types;

pub use manager::{GoalError, GoalManager};
pub use types::{Goal, GoalType};
