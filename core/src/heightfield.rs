use std::f64::consts::{FRAC_1_SQRT_2, SQRT_2};

use log::debug;

use crate::config::HeightConfig;
use crate::grid::{Grid, Rect, neighbors8};
use crate::noise::{OctaveCombine, Simplex2D, combine_octaves};

pub const ELEVATION: usize = 0;
pub const BIAS_X: usize = 1;
pub const BIAS_Y: usize = 2;

// Stored bias byte meaning "no pull along this axis"
pub const BIAS_ZERO: u8 = 128;

// Largest bias magnitude on one axis: three fully-low neighbors on one side
const MAX_BIAS: f64 = 255.0 * (1.0 + SQRT_2);

/// Concrete elevation map generated from layered simplex noise.
///
/// Channel 0 holds elevation in [0, 255]. Channels 1 and 2 hold the baked
/// downhill bias (x, y), stored around `BIAS_ZERO`.
#[derive(Debug, Clone)]
pub struct HeightField {
    grid: Grid<3>,
    noise: Simplex2D,
    scales: Vec<f64>,
    combine: OctaveCombine,
}

impl HeightField {
    pub fn new(config: &HeightConfig) -> Self {
        Self {
            grid: Grid::new(),
            noise: Simplex2D::new(config.seed),
            scales: config.scales.clone(),
            combine: config.combine,
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

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    pub fn combine(&self) -> OctaveCombine {
        self.combine
    }

    /// Resize, generating concrete only for the newly exposed cells.
    pub fn resize(&mut self, width: usize, height: usize) {
        let (old_width, old_height) = (self.width(), self.height());
        let exposed = self.grid.resize(width, height);

        for rect in &exposed {
            self.generate(rect.x, rect.y, rect.width, rect.height);
        }
        // Cells bordering new ground gained neighbors, so their bias is stale too
        for rect in &exposed {
            let r = rect.expand_clipped(1, width, height);
            self.bake_flow_bias(r.x, r.y, r.right(), r.bottom());
        }
        // And cells on a pulled-in edge lost some
        if width < old_width && width > 0 {
            self.bake_flow_bias(width - 1, 0, width, height);
        }
        if height < old_height && height > 0 {
            self.bake_flow_bias(0, height - 1, width, height);
        }

        if old_width != width || old_height != height {
            debug!(
                "height field {}x{} -> {}x{}, {} rect(s) generated",
                old_width,
                old_height,
                width,
                height,
                exposed.len()
            );
        }
    }

    /// Fill the elevation channel of a rectangle from the noise octaves.
    pub fn generate(&mut self, x: usize, y: usize, width: usize, height: usize) {
        let rect = Rect::new(x, y, width, height);
        for cy in rect.y..rect.bottom() {
            for cx in rect.x..rect.right() {
                let v = combine_octaves(
                    &self.noise,
                    cx as f64,
                    cy as f64,
                    &self.scales,
                    self.combine,
                );
                self.grid.set(cx, cy, ELEVATION, elevation_byte(v));
            }
        }
    }

    /// Replace the octave scales and regenerate the whole field.
    pub fn set_scales(&mut self, scales: Vec<f64>) {
        self.scales = scales;
        self.regenerate();
    }

    pub fn set_combine(&mut self, combine: OctaveCombine) {
        self.combine = combine;
        self.regenerate();
    }

    fn regenerate(&mut self) {
        let (width, height) = (self.width(), self.height());
        self.generate(0, 0, width, height);
        self.bake_flow_bias(0, 0, width, height);
        debug!(
            "height field regenerated: {}x{}, scales {:?}, {:?}",
            width, height, self.scales, self.combine
        );
    }

    /// Recompute the downhill bias for cells in `[x, x2) × [y, y2)`.
    ///
    /// Each in-bounds neighbor pulls towards itself with strength
    /// `255 - elevation`, axis neighbors at full weight and diagonals at
    /// 1/√2. The bounds are clipped to the field.
    pub fn bake_flow_bias(&mut self, x: usize, y: usize, x2: usize, y2: usize) {
        let (width, height) = (self.width(), self.height());
        let (x2, y2) = (x2.min(width), y2.min(height));

        for cy in y..y2 {
            for cx in x..x2 {
                let (mut vx, mut vy) = (0.0f64, 0.0f64);
                for n in neighbors8(cx, cy, width, height) {
                    let weight = if n.is_diagonal() { FRAC_1_SQRT_2 } else { 1.0 };
                    let pull = f64::from(u8::MAX - self.grid.get(n.x, n.y, ELEVATION)) * weight;
                    vx += pull * f64::from(n.dx);
                    vy += pull * f64::from(n.dy);
                }
                self.grid.set(cx, cy, BIAS_X, bias_byte(vx));
                self.grid.set(cx, cy, BIAS_Y, bias_byte(vy));
            }
        }
    }

    pub fn elevation(&self, x: usize, y: usize) -> u8 {
        self.grid.get(x, y, ELEVATION)
    }

    /// Overwrite one cell's elevation. The bias around it is not refreshed
    /// until `bake_flow_bias` covers it.
    pub fn set_elevation(&mut self, x: usize, y: usize, value: u8) {
        self.grid.set(x, y, ELEVATION, value);
    }

    /// Baked bias with `BIAS_ZERO` subtracted, so (0, 0) means flat.
    pub fn flow_bias(&self, x: usize, y: usize) -> (i16, i16) {
        let bx = i16::from(self.grid.get(x, y, BIAS_X)) - i16::from(BIAS_ZERO);
        let by = i16::from(self.grid.get(x, y, BIAS_Y)) - i16::from(BIAS_ZERO);
        (bx, by)
    }
}

// [-1, 1] -> [0, 255]
fn elevation_byte(v: f64) -> u8 {
    ((v.clamp(-1.0, 1.0) + 1.0) * 127.5).round() as u8
}

fn bias_byte(v: f64) -> u8 {
    (f64::from(BIAS_ZERO) + v * 127.0 / MAX_BIAS)
        .round()
        .clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::{BIAS_ZERO, HeightField, elevation_byte};
    use crate::config::HeightConfig;
    use crate::noise::OctaveCombine;

    fn flat() -> HeightConfig {
        HeightConfig {
            scales: Vec::new(),
            ..HeightConfig::default()
        }
    }

    #[test]
    fn elevation_mapping_endpoints() {
        assert_eq!(elevation_byte(-1.0), 0);
        assert_eq!(elevation_byte(0.0), 128);
        assert_eq!(elevation_byte(1.0), 255);
        assert_eq!(elevation_byte(3.0), 255);
    }

    #[test]
    fn heightfield_determinism() {
        let config = HeightConfig::default();
        let mut a = HeightField::new(&config);
        let mut b = HeightField::new(&config);
        a.resize(48, 32);
        b.resize(48, 32);
        assert_eq!(a.grid().as_bytes(), b.grid().as_bytes());
    }

    #[test]
    fn heightfield_has_relief() {
        let mut f = HeightField::new(&HeightConfig::default());
        f.resize(64, 64);
        let min = f.grid().channel(0).min().unwrap();
        let max = f.grid().channel(0).max().unwrap();
        assert!(max > min, "expected varied concrete, got flat {min}");
    }

    #[test]
    fn growing_keeps_existing_elevation() {
        let mut f = HeightField::new(&HeightConfig::default());
        f.resize(20, 20);
        let before: Vec<u8> = (0..20)
            .flat_map(|y| (0..20).map(move |x| (x, y)))
            .map(|(x, y)| f.elevation(x, y))
            .collect();
        f.resize(30, 25);
        let after: Vec<u8> = (0..20)
            .flat_map(|y| (0..20).map(move |x| (x, y)))
            .map(|(x, y)| f.elevation(x, y))
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn incremental_growth_matches_fresh_generation() {
        let config = HeightConfig::default();
        let mut grown = HeightField::new(&config);
        grown.resize(16, 12);
        grown.resize(24, 20);
        let mut fresh = HeightField::new(&config);
        fresh.resize(24, 20);
        assert_eq!(grown.grid().as_bytes(), fresh.grid().as_bytes());
    }

    #[test]
    fn set_scales_regenerates() {
        let mut f = HeightField::new(&HeightConfig::default());
        f.resize(10, 10);
        f.set_scales(Vec::new());
        assert!(f.grid().channel(0).all(|e| e == 128));
        f.set_scales(vec![0.2]);
        assert!(f.grid().channel(0).any(|e| e != 128));
    }

    #[test]
    fn set_combine_regenerates() {
        let mut f = HeightField::new(&HeightConfig::default());
        f.resize(16, 16);
        let summed = f.grid().as_bytes().to_vec();
        f.set_combine(OctaveCombine::Max);
        assert_ne!(summed, f.grid().as_bytes());
    }

    #[test]
    fn flat_interior_has_no_bias() {
        let mut f = HeightField::new(&flat());
        f.resize(5, 5);
        assert_eq!(f.flow_bias(2, 2), (0, 0));
        // Edge cells only see neighbors on one side and lean inwards
        let (bx, _) = f.flow_bias(0, 2);
        assert!(bx > 0);
    }

    #[test]
    fn bias_points_downhill() {
        let mut f = HeightField::new(&flat());
        f.resize(3, 3);
        for y in 0..3 {
            f.set_elevation(0, y, 250);
            f.set_elevation(1, y, 150);
            f.set_elevation(2, y, 10);
        }
        f.bake_flow_bias(0, 0, 3, 3);
        let (bx, by) = f.flow_bias(1, 1);
        assert!(bx > 0, "expected pull towards low x, got {bx}");
        assert_eq!(by, 0);
    }

    #[test]
    fn huge_scale_still_generates() {
        let mut f = HeightField::new(&HeightConfig {
            scales: vec![1e18],
            ..HeightConfig::default()
        });
        f.resize(20, 20);
        f.bake_flow_bias(0, 0, 20, 20);
        assert_eq!(f.grid().as_bytes().len(), 20 * 20 * 3);
    }

    #[test]
    fn clone_is_independent() {
        let mut a = HeightField::new(&HeightConfig::default());
        a.resize(12, 9);
        let mut b = a.clone();
        assert_eq!(a.grid(), b.grid());
        assert_eq!(b.scales(), a.scales());

        let before = a.elevation(3, 3);
        b.set_elevation(3, 3, before.wrapping_add(1));
        assert_eq!(a.elevation(3, 3), before);
        assert_ne!(a.grid(), b.grid());
        assert!(format!("{b:?}").starts_with("HeightField"));
    }

    #[test]
    fn bias_bytes_stay_centered_on_zero() {
        let mut f = HeightField::new(&flat());
        f.resize(4, 4);
        assert_eq!(f.grid().get(1, 1, 1), BIAS_ZERO);
        assert_eq!(f.grid().get(2, 2, 2), BIAS_ZERO);
    }
}
