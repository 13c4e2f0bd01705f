//! Temporary blob cleanup.

pub mod engine;
pub mod report;

pub use engine::{COMMAND_GRACE_PERIOD_HOURS, CleanupEngine};
pub use report::{
    AgeHistogram, BlobSummary, CleanupPhase, CleanupPreview, CleanupReport, CleanupStats,
    FullCleanupReport, OrphanReport,
};
