#![warn(clippy::all, rust_2018_idioms)]
mod app;
mod bags_ui;
mod graph_ui;
mod settings;

pub use app::App;
pub use settings::Settings;
