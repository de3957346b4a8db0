use std::path::Path;

use palette::{Gradient, LinSrgb};
use thiserror::Error;

use crate::fluid::{FluidField, VOLUME};
use crate::heightfield::{ELEVATION, HeightField};

const WATER_RGB: [u8; 3] = [28, 92, 196];
// Opacity of the thinnest film of water; a full cell is opaque
const MIN_WATER_ALPHA: f32 = 0.3;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("height field is {0}x{1} but fluid field is {2}x{3}")]
    DimensionMismatch(usize, usize, usize, usize),
    #[error("pixel buffer holds {len} bytes, {width}x{height} RGBA needs {expected}")]
    BufferSize {
        len: usize,
        width: usize,
        height: usize,
        expected: usize,
    },
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

fn lerp_color(a: [u8; 3], b: [u8; 3], t: f32) -> [u8; 3] {
    [
        (a[0] as f32 + (b[0] as f32 - a[0] as f32) * t) as u8,
        (a[1] as f32 + (b[1] as f32 - a[1] as f32) * t) as u8,
        (a[2] as f32 + (b[2] as f32 - a[2] as f32) * t) as u8,
    ]
}

// One color per elevation byte, dark low concrete to pale high concrete
fn concrete_palette() -> Vec<[u8; 3]> {
    let gradient = Gradient::with_domain(vec![
        (0.00, LinSrgb::new(0.05, 0.05, 0.06)),
        (0.45, LinSrgb::new(0.25, 0.24, 0.22)),
        (0.75, LinSrgb::new(0.50, 0.48, 0.45)),
        (1.00, LinSrgb::new(0.85, 0.84, 0.80)),
    ]);
    (0..=u8::MAX)
        .map(|e| {
            let col: LinSrgb = gradient.get(f32::from(e) / 255.0);
            let rgb = col.into_format::<u8>();
            [rgb.red, rgb.green, rgb.blue]
        })
        .collect()
}

/// Paint concrete and water into a row-major RGBA8 buffer, one pixel per cell.
pub fn render_rgba(heights: &HeightField, fluid: &FluidField) -> Result<Vec<u8>, RenderError> {
    if heights.width() != fluid.width() || heights.height() != fluid.height() {
        return Err(RenderError::DimensionMismatch(
            heights.width(),
            heights.height(),
            fluid.width(),
            fluid.height(),
        ));
    }

    let palette = concrete_palette();
    let mut buf = Vec::with_capacity(heights.grid().cell_count() * 4);
    let cells = heights
        .grid()
        .channel(ELEVATION)
        .zip(fluid.grid().channel(VOLUME));

    for (elevation, volume) in cells {
        let ground = palette[elevation as usize];
        let [r, g, b] = if volume == 0 {
            ground
        } else {
            let depth = f32::from(volume) / 255.0;
            let alpha = MIN_WATER_ALPHA + (1.0 - MIN_WATER_ALPHA) * depth;
            lerp_color(ground, WATER_RGB, alpha)
        };
        buf.extend_from_slice(&[r, g, b, u8::MAX]);
    }
    Ok(buf)
}

pub fn save_png(
    path: impl AsRef<Path>,
    width: usize,
    height: usize,
    rgba: &[u8],
) -> Result<(), RenderError> {
    let expected = width * height * 4;
    if rgba.len() != expected {
        return Err(RenderError::BufferSize {
            len: rgba.len(),
            width,
            height,
            expected,
        });
    }
    image::save_buffer(
        path,
        rgba,
        width as u32,
        height as u32,
        image::ExtendedColorType::Rgba8,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{RenderError, WATER_RGB, render_rgba, save_png};
    use crate::config::HeightConfig;
    use crate::fluid::{FlowRule, FluidField};
    use crate::heightfield::HeightField;

    fn fields(width: usize, height: usize) -> (HeightField, FluidField) {
        let mut h = HeightField::new(&HeightConfig::default());
        h.resize(width, height);
        let mut f = FluidField::new(FlowRule::Leveling);
        f.resize(width, height);
        (h, f)
    }

    #[test]
    fn render_has_one_opaque_pixel_per_cell() {
        let (h, f) = fields(6, 4);
        let px = render_rgba(&h, &f).unwrap();
        assert_eq!(px.len(), 6 * 4 * 4);
        assert!(px.chunks_exact(4).all(|p| p[3] == 255));
    }

    #[test]
    fn full_water_is_water_colored() {
        let (h, mut f) = fields(3, 3);
        f.drip(1, 1);
        let px = render_rgba(&h, &f).unwrap();
        // cell (1, 1) of a 3-wide field
        let i = 4 * 4;
        assert_eq!(&px[i..i + 3], &WATER_RGB);
    }

    #[test]
    fn dry_cells_follow_elevation() {
        let mut h = HeightField::new(&HeightConfig {
            scales: Vec::new(),
            ..HeightConfig::default()
        });
        h.resize(2, 1);
        h.set_elevation(0, 0, 10);
        h.set_elevation(1, 0, 240);
        let mut f = FluidField::new(FlowRule::Leveling);
        f.resize(2, 1);
        let px = render_rgba(&h, &f).unwrap();
        assert!(px[4] > px[0], "high concrete should be lighter");
    }

    #[test]
    fn mismatched_fields_error() {
        let (h, _) = fields(3, 3);
        let (_, f) = fields(4, 3);
        assert!(matches!(
            render_rgba(&h, &f),
            Err(RenderError::DimensionMismatch(3, 3, 4, 3))
        ));
    }

    #[test]
    fn save_png_checks_buffer_length() {
        let err = save_png("unused.png", 2, 2, &[0u8; 15]);
        assert!(matches!(err, Err(RenderError::BufferSize { expected: 16, .. })));
    }
}
