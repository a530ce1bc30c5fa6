use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use td_core::{
    engine::{ProcessEngine, Runner},
    session::Action,
};
use td_graphics::viewport::Viewport;

#[derive(Parser, Clone, Debug, PartialEq)]
#[command(name = "td-visualiser", about = "Tree decomposition visualiser")]
pub struct Settings {
    /// Print version of the tool
    #[arg(short, long)]
    pub version: bool,

    /// Decomposition engine, a program reading a graph as JSON on stdin
    #[arg(long, env = "TD_ENGINE", value_name = "PROGRAM")]
    pub engine: Option<String>,

    /// Argument passed to the engine, may be repeated
    #[arg(long = "engine-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub engine_args: Vec<String>,

    /// Start with a bundled sample graph
    #[arg(long, value_name = "NAME", conflicts_with = "graph")]
    pub sample: Option<String>,

    /// Read in a .gr file
    #[arg(long, value_name = "FILE")]
    pub graph: Option<PathBuf>,

    #[arg(long, default_value_t = 0.1)]
    pub min_zoom: f32,

    #[arg(long, default_value_t = 10.0)]
    pub max_zoom: f32,
}

impl Settings {
    /// A runner for the configured engine, if there is one.
    #[must_use]
    pub fn runner(&self) -> Option<Runner> {
        self.engine.as_ref().map(|program| {
            let engine = ProcessEngine::new(program.clone(), self.engine_args.clone());
            Runner::new(Box::new(engine))
        })
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.min_zoom, self.max_zoom)
    }

    /// What to load before the first frame.
    ///
    /// # Errors
    /// Returns an error if `--graph` names a file that cannot be read.
    pub fn initial_action(&self) -> anyhow::Result<Option<Action>> {
        if let Some(path) = &self.graph {
            let bytes =
                std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            return Ok(Some(Action::Upload { file_name, bytes }));
        }
        Ok(self.sample.clone().map(Action::LoadSample))
    }
}
