use log::{debug, trace};

use crate::config::{ConfigError, SimConfig};
use crate::fluid::{FlowRule, FluidField};
use crate::heightfield::HeightField;
use crate::render::{RenderError, render_rgba};

/// Concrete and water driven one frame at a time by the host.
///
/// The host calls `frame` from its display callback with the elapsed time and
/// forwards pointer events, already translated into cell coordinates.
pub struct Simulation {
    config: SimConfig,
    heights: HeightField,
    fluid: FluidField,
    frames: u64,
}

impl Simulation {
    pub fn new(config: SimConfig, width: usize, height: usize) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut sim = Self {
            heights: HeightField::new(&config.height),
            fluid: FluidField::new(config.fluid.rule),
            config,
            frames: 0,
        };
        sim.resize(width, height);
        Ok(sim)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn heights(&self) -> &HeightField {
        &self.heights
    }

    pub fn fluid(&self) -> &FluidField {
        &self.fluid
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn width(&self) -> usize {
        self.fluid.width()
    }

    pub fn height(&self) -> usize {
        self.fluid.height()
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.heights.resize(width, height);
        self.fluid.resize(width, height);
    }

    pub fn frame(&mut self, dt: f32) {
        self.fluid.tick(&self.heights, dt);
        self.frames += 1;
        trace!("frame {} done", self.frames);
    }

    /// Start an emitter for a pointer. `radius` overrides the configured one,
    /// e.g. when derived from pen pressure.
    pub fn pointer_down(&mut self, id: impl Into<String>, x: i32, y: i32, radius: Option<u32>) {
        let radius = radius.unwrap_or(self.config.fluid.emitter_radius);
        self.fluid
            .add_emitter(id, x, y, radius, self.config.fluid.flow_rate);
    }

    /// Follow a pointer. Without a new radius the emitter keeps its own.
    pub fn pointer_move(&mut self, id: &str, x: i32, y: i32, radius: Option<u32>) -> bool {
        let Some(current) = self.fluid.emitter(id).map(|e| e.radius) else {
            return false;
        };
        self.fluid
            .update_emitter(id, x, y, radius.unwrap_or(current))
    }

    pub fn pointer_up(&mut self, id: &str) {
        self.fluid.remove_emitter(id);
    }

    pub fn drip(&mut self, x: usize, y: usize) {
        self.fluid.drip(x, y);
    }

    pub fn set_scales(&mut self, scales: Vec<f64>) {
        self.config.height.scales = scales.clone();
        self.heights.set_scales(scales);
    }

    pub fn set_rule(&mut self, rule: FlowRule) {
        debug!("flow rule {:?} -> {:?}", self.fluid.rule(), rule);
        self.config.fluid.rule = rule;
        self.fluid.set_rule(rule);
    }

    pub fn render_rgba(&self) -> Result<Vec<u8>, RenderError> {
        render_rgba(&self.heights, &self.fluid)
    }
}
