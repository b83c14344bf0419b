//! Data models for the broadcast backend.
//!
//! Upstream records are deserialized leniently; response models match the admin page's JSON.

mod broadcast;
mod installation;
mod lenient;
mod store;
mod task;

pub use broadcast::*;
pub use installation::*;
pub use store::*;
pub use task::*;
