//! Command job domain entities.

pub mod exit_state;
pub mod model;
pub mod update;

pub use exit_state::JobState;
pub use model::Job;
pub use update::JobUpdate;
