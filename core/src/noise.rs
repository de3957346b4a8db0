use serde::{Deserialize, Serialize};

use crate::NoiseGenerator;

// Skew/unskew factors for the 2D simplex lattice
const SQRT_3: f64 = 1.732_050_807_568_877_293_5;
const F2: f64 = 0.5 * (SQRT_3 - 1.0);
const G2: f64 = (3.0 - SQRT_3) / 6.0;

// Brings the summed corner contributions to roughly [-1, 1]
const OUTPUT_SCALE: f64 = 70.0;

// 3D edge gradients projected onto the xy plane; keeps the output inside [-1, 1]
const GRADIENTS: [(i8, i8); 12] = [
    (1, 1),
    (-1, 1),
    (1, -1),
    (-1, -1),
    (1, 0),
    (-1, 0),
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (0, 1),
    (0, -1),
];

/// Seeded single-octave 2D simplex noise.
///
/// The lattice hash is a 256-entry permutation shuffled by a xorshift
/// generator, so equal seeds always give equal noise.
#[derive(Debug, Clone)]
pub struct Simplex2D {
    seed: u64,
    perm: [u8; 512],
}

impl Simplex2D {
    pub fn new(seed: u64) -> Self {
        let mut table: Vec<u8> = (0..=255).collect();
        let mut state = seed ^ 0x1234_5678_9ABC_DEF0_u64;
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state & 0xFF) as usize
        };
        // Fisher–Yates
        for i in (1..256).rev() {
            table.swap(i, next() % (i + 1));
        }

        // Doubled so corner lookups never need a modulo
        let mut perm = [0u8; 512];
        for (i, slot) in perm.iter_mut().enumerate() {
            *slot = table[i & 255];
        }

        Self { seed, perm }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[inline]
    fn gradient_index(&self, i: usize, j: usize) -> usize {
        self.perm[i + self.perm[j] as usize] as usize % GRADIENTS.len()
    }

    #[inline]
    fn corner(&self, grad: usize, x: f64, y: f64) -> f64 {
        let t = 0.5 - x * x - y * y;
        if t <= 0.0 {
            return 0.0;
        }
        let (gx, gy) = GRADIENTS[grad];
        let t2 = t * t;
        t2 * t2 * (f64::from(gx) * x + f64::from(gy) * y)
    }
}

impl NoiseGenerator for Simplex2D {
    fn get2(&self, x: f64, y: f64) -> f64 {
        let s = (x + y) * F2;
        // Cell coordinates stay in f64 so far-off samples cannot overflow
        let i = (x + s).floor();
        let j = (y + s).floor();

        let t = (i + j) * G2;
        let x0 = x - (i - t);
        let y0 = y - (j - t);

        // Lower or upper triangle of the skewed cell
        let (i1, j1) = if x0 > y0 { (1, 0) } else { (0, 1) };

        let x1 = x0 - i1 as f64 + G2;
        let y1 = y0 - j1 as f64 + G2;
        let x2 = x0 - 1.0 + 2.0 * G2;
        let y2 = y0 - 1.0 + 2.0 * G2;

        let ii = i.rem_euclid(256.0) as usize;
        let jj = j.rem_euclid(256.0) as usize;

        let n0 = self.corner(self.gradient_index(ii, jj), x0, y0);
        let n1 = self.corner(self.gradient_index(ii + i1, jj + j1), x1, y1);
        let n2 = self.corner(self.gradient_index(ii + 1, jj + 1), x2, y2);

        // Past 2^52 the offsets lose precision and can land off the cell
        let v = OUTPUT_SCALE * (n0 + n1 + n2);
        if v.is_nan() { 0.0 } else { v.clamp(-1.0, 1.0) }
    }
}

/// How per-octave samples are merged into one value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OctaveCombine {
    /// Mean of the samples, clamped to [-1, 1].
    #[default]
    Sum,
    Product,
    Max,
}

impl OctaveCombine {
    fn merge(self, samples: impl Iterator<Item = f64>) -> f64 {
        let mut count = 0usize;
        let merged = match self {
            OctaveCombine::Sum => {
                let total: f64 = samples.inspect(|_| count += 1).sum();
                if count == 0 { 0.0 } else { total / count as f64 }
            }
            OctaveCombine::Product => {
                let product: f64 = samples.inspect(|_| count += 1).product();
                if count == 0 { 0.0 } else { product }
            }
            OctaveCombine::Max => samples.fold(None, |acc: Option<f64>, v| {
                Some(acc.map_or(v, |a| a.max(v)))
            })
            .unwrap_or(0.0),
        };
        merged.clamp(-1.0, 1.0)
    }
}

/// Sample `noise` once per scale at `(x * scale, y * scale)` and merge.
///
/// An empty scale list yields 0.0.
pub fn combine_octaves(
    noise: &dyn NoiseGenerator,
    x: f64,
    y: f64,
    scales: &[f64],
    combine: OctaveCombine,
) -> f64 {
    combine.merge(scales.iter().map(|&s| noise.get2(x * s, y * s)))
}
