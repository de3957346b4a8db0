// teshima: water on procedurally generated concrete
// grids, noise, height/fluid fields and the per-frame simulation step
pub mod config;
pub mod fluid;
pub mod grid;
pub mod heightfield;
pub mod noise;
pub mod render;
pub mod sim;

pub use config::{ConfigError, FluidConfig, HeightConfig, SimConfig};
pub use fluid::{Emitter, FlowRule, FluidField};
pub use grid::{Grid, Rect};
pub use heightfield::HeightField;
pub use noise::{OctaveCombine, Simplex2D};
pub use render::{RenderError, render_rgba, save_png};
pub use sim::Simulation;

// 2D coherent noise source sampled by the height field
pub trait NoiseGenerator {
    fn get2(&self, x: f64, y: f64) -> f64;
}
