//! Core type definitions used across the Toolhub workspace.

pub mod id;

pub use id::*;
