#![warn(clippy::all, rust_2018_idioms)]

pub mod common;
pub mod force;
pub mod hit;
pub mod palette;
pub mod render;
pub mod scene;
pub mod viewport;
