//! Bryte headless simulator
//!
//! Loads a map, runs the fixed-step loop and logs what happened.
//!
//! ```text
//! bryte-sim <map.json> [steps] [config.json] [seed]
//! ```
//!
//! Without a seed every player walks the way it faces. With one, players
//! wander, picking a new direction from a seeded generator now and then.

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use bryte_core::SimConfig;
    use bryte_core::sim::{Direction, MapData, TickInput, World, tally_events};
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    const DEFAULT_STEPS: usize = 600;
    /// Steps between direction changes when wandering
    const WANDER_INTERVAL: usize = 30;

    pub fn run(args: &[String]) -> Result<(), String> {
        let Some(map_path) = args.get(1) else {
            return Err("usage: bryte-sim <map.json> [steps] [config.json] [seed]".to_string());
        };
        let steps = match args.get(2) {
            Some(arg) => arg.parse().map_err(|e| format!("bad step count {arg:?}: {e}"))?,
            None => DEFAULT_STEPS,
        };
        let config = args.get(3).map(SimConfig::load).unwrap_or_default();
        let mut rng = match args.get(4) {
            Some(arg) => Some(Pcg32::seed_from_u64(arg.parse().map_err(|e| format!("bad seed {arg:?}: {e}"))?)),
            None => None,
        };

        let map = MapData::load(map_path).map_err(|e| format!("failed to load {map_path}: {e}"))?;
        let dt = config.dt;
        let mut world = World::new(&map, config);

        let mut inputs: Vec<TickInput> = world
            .players
            .iter()
            .map(|p| TickInput { move_dir: Some(p.face), ..Default::default() })
            .collect();
        let mut events = Vec::new();
        let mut resets = 0;
        for step in 0..steps {
            if let Some(rng) = rng.as_mut() {
                if step % WANDER_INTERVAL == 0 {
                    for input in &mut inputs {
                        let pick = rng.random_range(0..=Direction::ALL.len());
                        input.move_dir = Direction::ALL.get(pick).copied();
                    }
                }
            }

            let report = world.step(dt, &inputs);
            if report.resetting {
                resets += 1;
                log::info!("Step {step}: squished, resetting map");
                world.reset_map(&map);
            }
            events.extend(report.events);
        }

        log::info!("Ran {steps} steps ({:.1}s simulated), {resets} resets", steps as f32 * dt);
        for (name, count) in tally_events(&events) {
            log::info!("  {name}: {count}");
        }
        for index in 0..world.players.len() {
            log::info!("{}", world.describe_player(index));
        }
        for index in 0..world.blocks.len() {
            log::debug!("{}", world.describe_block(index));
        }
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Bryte simulator starting...");

    let args: Vec<String> = std::env::args().collect();
    if let Err(err) = native::run(&args) {
        log::error!("{err}");
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The library is driven by its host on the web; nothing to run here
}
