// src/gps/mod.rs
//! Position fix data, geodesy, and fix providers

pub mod data;
pub mod geodesy;
pub mod gpsd;
pub mod replay;

pub use data::{FixRequest, PositionFix};
