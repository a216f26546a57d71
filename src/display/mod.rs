// src/display/mod.rs
//! Display modules for the walk-tracker binary

pub mod terminal;

pub use terminal::WalkDisplay;
