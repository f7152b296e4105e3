//! Command implementations for the Enigma CLI.

pub mod batch;
pub mod models;
pub mod predict;
pub mod train;
pub mod types;

pub use types::{Command, ModelsCommand};
