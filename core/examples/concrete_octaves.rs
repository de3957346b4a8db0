use image::{GrayImage, Luma};
use std::path::Path;
use teshima::{HeightConfig, HeightField, OctaveCombine};

fn save_elevation(field: &HeightField, filename: &str) {
    let mut img = GrayImage::new(field.width() as u32, field.height() as u32);
    for y in 0..field.height() {
        for x in 0..field.width() {
            img.put_pixel(x as u32, y as u32, Luma([field.elevation(x, y)]));
        }
    }
    img.save(Path::new(filename)).unwrap();
    println!("Saved {}", filename);
}

fn main() {
    let size = 256;
    let mut field = HeightField::new(&HeightConfig::default());
    field.resize(size, size);

    // Same octaves, each way of merging them
    for (combine, name) in [
        (OctaveCombine::Sum, "sum"),
        (OctaveCombine::Product, "product"),
        (OctaveCombine::Max, "max"),
    ] {
        field.set_combine(combine);
        save_elevation(&field, &format!("concrete_{name}.png"));
    }

    // A single fine octave on its own
    field.set_combine(OctaveCombine::Sum);
    field.set_scales(vec![0.15]);
    save_elevation(&field, "concrete_fine.png");
}
