// Runs the water-on-concrete simulation headless and writes a PNG every
// half second of simulated time.
//
//   cargo run -p teshima --example teshima_frames [config.json]

use teshima::{SimConfig, Simulation, save_png};

const WIDTH: usize = 256;
const HEIGHT: usize = 192;
const DT: f32 = 1.0 / 60.0;
const FRAMES: u64 = 300;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => SimConfig::load(&path).unwrap(),
        None => SimConfig::default(),
    };
    let mut sim = Simulation::new(config, WIDTH, HEIGHT).unwrap();

    // One pointer held still, one dragged across the field, plus a single drip
    sim.pointer_down("still", 64, 96, None);
    sim.pointer_down("drag", 20, 20, Some(4));
    sim.drip(200, 150);

    for frame in 1..=FRAMES {
        let t = frame as f32 / FRAMES as f32;
        let x = 20 + (t * (WIDTH - 40) as f32) as i32;
        let y = 20 + (t * (HEIGHT - 40) as f32) as i32;
        sim.pointer_move("drag", x, y, None);
        if frame == FRAMES / 2 {
            sim.pointer_up("still");
        }

        sim.frame(DT);

        if frame % 30 == 0 {
            let rgba = sim.render_rgba().unwrap();
            let filename = format!("teshima_{frame:04}.png");
            save_png(&filename, WIDTH, HEIGHT, &rgba).unwrap();
            println!(
                "Saved {} (volume {})",
                filename,
                sim.fluid().total_volume()
            );
        }
    }
}
