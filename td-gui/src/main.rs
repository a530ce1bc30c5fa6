#![warn(clippy::all, rust_2018_idioms)]
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

use anyhow::anyhow;
use clap::Parser;
use td_gui::{App, Settings};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Log to stdout (if you run with `RUST_LOG=debug`).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let settings = Settings::parse();

    if settings.version {
        println!("td visualiser: {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let mut app = App::new(&settings);
    app.load_initial(&settings)?;

    eframe::run_native(
        "TD Visualiser",
        eframe::NativeOptions::default(),
        Box::new(|_cc| Ok(Box::new(app))),
    )
    .map_err(|err| anyhow!("{}", err))?;

    Ok(())
}
