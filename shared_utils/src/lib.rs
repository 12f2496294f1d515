//! Small helpers shared by the workspace crates.

pub mod env;
