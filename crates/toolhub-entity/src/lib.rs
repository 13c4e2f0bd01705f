//! # toolhub-entity
//!
//! Domain entity models shared by the stores, the dispatcher, the command
//! executor, and the cleanup engine.

pub mod blob;
pub mod job;
