#![warn(clippy::all, rust_2018_idioms)]

pub mod decomposition;
pub mod engine;
pub mod format;
pub mod graph;
pub mod layout;
pub mod reconcile;
pub mod samples;
pub mod selection;
pub mod session;
pub mod upload;
