//! Route handlers organized by domain.

pub mod cleanup;
pub mod command;
pub mod health;
pub mod merge;
