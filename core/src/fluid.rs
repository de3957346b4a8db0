use std::collections::HashMap;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::grid::{Grid, neighbors8};
use crate::heightfield::HeightField;

pub const VOLUME: usize = 0;
pub const MAX_VOLUME: u8 = u8::MAX;

// tan(22.5°): a bias component this large relative to the major one counts
const DIAGONAL_RATIO: f64 = std::f64::consts::SQRT_2 - 1.0;

/// Per-tick redistribution rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlowRule {
    /// Each wet cell repeatedly averages with its lowest neighbor.
    /// Conserves total volume.
    #[default]
    Leveling,
    /// Dry cells below `threshold` elevation flood when touching water.
    /// Volume only ever grows.
    Contagion { threshold: u8 },
    /// Wet cells pass half their excess along the baked downhill bias.
    BiasFlow,
}

/// Point source tied to an external pointer id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Emitter {
    pub x: i32,
    pub y: i32,
    pub radius: u32,
    // volume per second
    pub flow_rate: f32,
}

impl Emitter {
    pub fn new(x: i32, y: i32, radius: u32, flow_rate: f32) -> Self {
        Self {
            x,
            y,
            radius,
            flow_rate,
        }
    }

    /// Cells covered by the emitter, unclipped.
    pub fn footprint(&self) -> impl Iterator<Item = (i64, i64)> {
        disk(self.x, self.y, self.radius)
    }

    /// Footprint cells that land on a `width` x `height` grid.
    pub fn footprint_on(
        &self,
        width: usize,
        height: usize,
    ) -> impl Iterator<Item = (usize, usize)> {
        let last_x = i64::try_from(width).unwrap_or(i64::MAX) - 1;
        let last_y = i64::try_from(height).unwrap_or(i64::MAX) - 1;
        disk_within(self.x, self.y, self.radius, (0, last_x), (0, last_y))
            .map(|(x, y)| (x as usize, y as usize))
    }
}

/// Rasterized disk: for each column offset `dx` the chord half height is
/// `round(r * cos(asin(dx / r)))`. Radius 0 is the center cell alone.
///
/// Coordinates are `i64` so a disk centered near the `i32` limits, or with
/// a radius past `i32::MAX`, never overflows.
pub fn disk(cx: i32, cy: i32, radius: u32) -> impl Iterator<Item = (i64, i64)> {
    disk_within(cx, cy, radius, (i64::MIN, i64::MAX), (i64::MIN, i64::MAX))
}

// Columns and rows are clamped to the inclusive bounds before iterating
fn disk_within(
    cx: i32,
    cy: i32,
    radius: u32,
    (min_x, max_x): (i64, i64),
    (min_y, max_y): (i64, i64),
) -> impl Iterator<Item = (i64, i64)> {
    let (cx, cy, r) = (i64::from(cx), i64::from(cy), i64::from(radius));
    let first = (cx - r).max(min_x);
    let last = (cx + r).min(max_x);
    (first..=last).flat_map(move |x| {
        let half = chord_half_height(radius, x - cx);
        let top = (cy - half).max(min_y);
        let bottom = (cy + half).min(max_y);
        (top..=bottom).map(move |y| (x, y))
    })
}

fn chord_half_height(radius: u32, dx: i64) -> i64 {
    if radius == 0 {
        return 0;
    }
    let r = f64::from(radius);
    (r * (dx as f64 / r).asin().cos()).round() as i64
}

/// Water volume per cell plus the emitters feeding it.
#[derive(Debug, Clone, Default)]
pub struct FluidField {
    grid: Grid<3>,
    emitters: HashMap<String, Emitter>,
    rule: FlowRule,
}

impl FluidField {
    pub fn new(rule: FlowRule) -> Self {
        Self {
            grid: Grid::new(),
            emitters: HashMap::new(),
            rule,
        }
    }

    pub fn width(&self) -> usize {
        self.grid.width()
    }

    pub fn height(&self) -> usize {
        self.grid.height()
    }

    pub fn grid(&self) -> &Grid<3> {
        &self.grid
    }

    pub fn rule(&self) -> FlowRule {
        self.rule
    }

    pub fn set_rule(&mut self, rule: FlowRule) {
        self.rule = rule;
    }

    /// Resize, keeping water in the overlap. New cells start dry.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.grid.resize(width, height);
    }

    pub fn volume(&self, x: usize, y: usize) -> u8 {
        self.grid.get(x, y, VOLUME)
    }

    pub fn set_volume(&mut self, x: usize, y: usize, value: u8) {
        self.grid.set(x, y, VOLUME, value);
    }

    pub fn total_volume(&self) -> u64 {
        self.grid.channel(VOLUME).map(u64::from).sum()
    }

    /// Fill one cell to the brim immediately.
    pub fn drip(&mut self, x: usize, y: usize) {
        self.grid.set(x, y, VOLUME, MAX_VOLUME);
    }

    /// Insert an emitter, returning the one it replaced under the same id.
    pub fn add_emitter(
        &mut self,
        id: impl Into<String>,
        x: i32,
        y: i32,
        radius: u32,
        flow_rate: f32,
    ) -> Option<Emitter> {
        self.emitters
            .insert(id.into(), Emitter::new(x, y, radius, flow_rate))
    }

    /// Move an emitter. Unknown ids are ignored and report `false`.
    pub fn update_emitter(&mut self, id: &str, x: i32, y: i32, radius: u32) -> bool {
        match self.emitters.get_mut(id) {
            Some(emitter) => {
                emitter.x = x;
                emitter.y = y;
                emitter.radius = radius;
                true
            }
            None => false,
        }
    }

    /// Remove an emitter. Removing an unknown id does nothing.
    pub fn remove_emitter(&mut self, id: &str) -> Option<Emitter> {
        self.emitters.remove(id)
    }

    pub fn emitter(&self, id: &str) -> Option<&Emitter> {
        self.emitters.get(id)
    }

    /// Active emitters, in no particular order.
    pub fn emitters(&self) -> impl Iterator<Item = (&str, &Emitter)> {
        self.emitters.iter().map(|(id, e)| (id.as_str(), e))
    }

    /// Inject `dt * flow_rate` (rounded) into every cell under every emitter.
    /// Footprint cells off the grid are skipped; cells saturate at 255.
    pub fn flow(&mut self, dt: f32) {
        let (width, height) = (self.width(), self.height());
        for emitter in self.emitters.values() {
            let delta = (dt * emitter.flow_rate).round() as i32;
            if delta == 0 {
                continue;
            }
            for (x, y) in emitter.footprint_on(width, height) {
                self.grid.incr(x, y, VOLUME, delta);
            }
        }
    }

    /// Advance one step: run the emitters, then redistribute with the
    /// configured rule.
    ///
    /// `heights` must have the same dimensions as this field.
    pub fn tick(&mut self, heights: &HeightField, dt: f32) {
        assert!(
            heights.width() == self.width() && heights.height() == self.height(),
            "height field {}x{} does not cover fluid field {}x{}",
            heights.width(),
            heights.height(),
            self.width(),
            self.height()
        );

        self.flow(dt);
        let snapshot: Vec<u8> = self.grid.channel(VOLUME).collect();

        match self.rule {
            FlowRule::Leveling => self.level(&snapshot),
            FlowRule::Contagion { threshold } => self.spread(&snapshot, heights, threshold),
            FlowRule::BiasFlow => self.follow_bias(&snapshot, heights),
        }

        trace!(
            "tick dt={dt:.4} rule={:?} emitters={} volume={}",
            self.rule,
            self.emitters.len(),
            self.total_volume()
        );
    }

    // Cells wet at tick start are visited in row-major order. Each trades with
    // its lowest live neighbor until the pair is within one unit; the cell keeps
    // the rounded-up half, so every trade preserves the pair sum.
    fn level(&mut self, snapshot: &[u8]) {
        let (width, height) = (self.width(), self.height());

        for (index, &before) in snapshot.iter().enumerate() {
            if before == 0 {
                continue;
            }
            let (x, y) = (index % width, index / width);
            let mut current = self.grid.get_by_index(index, VOLUME);

            loop {
                let lowest = neighbors8(x, y, width, height)
                    .map(|n| (n, self.grid.get(n.x, n.y, VOLUME)))
                    .min_by_key(|&(_, v)| v);
                // No neighbors at all on a 1x1 field
                let Some((n, lower)) = lowest else { break };
                if lower >= current {
                    break;
                }

                let sum = u16::from(current) + u16::from(lower);
                let raised = sum.div_ceil(2) as u8;
                if raised == current {
                    break;
                }
                current = raised;
                self.grid.set_by_index(index, VOLUME, current);
                self.grid.set(n.x, n.y, VOLUME, (sum / 2) as u8);
            }
        }
    }

    // Reads only the snapshot, so the result does not depend on scan order
    fn spread(&mut self, snapshot: &[u8], heights: &HeightField, threshold: u8) {
        let (width, height) = (self.width(), self.height());

        for (index, &before) in snapshot.iter().enumerate() {
            if before != 0 {
                continue;
            }
            let (x, y) = (index % width, index / width);
            if heights.elevation(x, y) >= threshold {
                continue;
            }
            let touches_water =
                neighbors8(x, y, width, height).any(|n| snapshot[n.y * width + n.x] > 0);
            if touches_water {
                self.grid.set_by_index(index, VOLUME, MAX_VOLUME);
            }
        }
    }

    fn follow_bias(&mut self, snapshot: &[u8], heights: &HeightField) {
        let (width, height) = (self.width(), self.height());

        for (index, &before) in snapshot.iter().enumerate() {
            if before == 0 {
                continue;
            }
            let (x, y) = (index % width, index / width);
            let Some((dx, dy)) = downhill_direction(heights.flow_bias(x, y)) else {
                continue;
            };
            let (Some(tx), Some(ty)) = (
                x.checked_add_signed(dx as isize),
                y.checked_add_signed(dy as isize),
            ) else {
                continue;
            };
            if tx >= width || ty >= height {
                continue;
            }

            let here = self.grid.get_by_index(index, VOLUME);
            let there = self.grid.get(tx, ty, VOLUME);
            if there >= here {
                continue;
            }
            let amount = i32::from(here - there) / 2;
            if amount == 0 {
                continue;
            }

            let moved = -self.grid.incr_by_index(index, VOLUME, -amount);
            let received = self.grid.incr(tx, ty, VOLUME, moved);
            if received < moved {
                self.grid.incr_by_index(index, VOLUME, moved - received);
            }
        }
    }
}

// Snap a bias vector to one of the 8 neighbor directions
fn downhill_direction((bx, by): (i16, i16)) -> Option<(i32, i32)> {
    let (bx, by) = (f64::from(bx), f64::from(by));
    let major = bx.abs().max(by.abs());
    if major == 0.0 {
        return None;
    }
    let step = |v: f64| {
        if v.abs() >= major * DIAGONAL_RATIO {
            v.signum() as i32
        } else {
            0
        }
    };
    Some((step(bx), step(by)))
}
