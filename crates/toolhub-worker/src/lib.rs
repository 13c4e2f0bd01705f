//! Job lifecycle and temporary file cleanup for Toolhub.
//!
//! This crate provides:
//! - A dispatcher that claims a job, runs the executor out of process, and
//!   records the outcome
//! - The command executor and its immutable handler registry
//! - The built-in `MergePdfs` command
//! - A cleanup engine for temporary blobs and a cron scheduler that runs it

pub mod cleanup;
pub mod commands;
pub mod dispatcher;
pub mod executor;
pub mod launcher;
pub mod scheduler;

pub use cleanup::CleanupEngine;
pub use dispatcher::{Dispatcher, JobResult};
pub use executor::{CommandExecutor, CommandHandler, HandlerRegistry};
pub use launcher::{CommandLauncher, InProcessLauncher, SubprocessLauncher};
pub use scheduler::CronScheduler;
