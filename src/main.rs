//! Naubino entry point
//!
//! Headless driver for the naub world. By default two long chains are hunted
//! into each other until they pop; `--arena` runs the spawner for a minute of
//! simulated time instead. An optional JSON config path overrides the world
//! defaults.

#[cfg(not(target_arch = "wasm32"))]
use naubino::{ArenaConfig, ArenaMode, Hunter, Naubino, NaubinoConfig, NaubinoResult};

#[cfg(not(target_arch = "wasm32"))]
const MAX_STEPS: usize = 2000;
#[cfg(not(target_arch = "wasm32"))]
const ARENA_STEPS: usize = 3600;

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Naubino (headless) starting...");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let arena = args.iter().any(|a| a == "--arena");
    let config = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .map(String::as_str)
        .map(load_config)
        .unwrap_or_default();

    let result = if arena { run_arena(config) } else { run_hunt(config) };
    match result {
        Ok(report) => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => log::error!("Failed to encode report: {}", e),
        },
        Err(e) => {
            log::error!("Simulation aborted: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The library is embedded by a host; there is no standalone web entry
}

#[cfg(not(target_arch = "wasm32"))]
fn load_config(path: &str) -> NaubinoConfig {
    let parsed = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|json| NaubinoConfig::from_json(&json).map_err(|e| e.to_string()));
    match parsed {
        Ok(config) => {
            log::info!("Loaded config from {}", path);
            config
        }
        Err(e) => {
            log::warn!("Using default config, {} is unusable: {}", path, e);
            NaubinoConfig::default()
        }
    }
}

/// Two 100-naub chains, one hunter per end
#[cfg(not(target_arch = "wasm32"))]
fn run_hunt(config: NaubinoConfig) -> NaubinoResult<naubino::StepReport> {
    use glam::Vec2;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    let mut rng = Pcg32::seed_from_u64(0x6e61_7562);
    let mut naubino = Naubino::new(config)?;
    let a = naubino.create_naub_chain(100, Some(Vec2::new(0.0, -10.0)), None)?;
    let b = naubino.create_naub_chain(100, Some(Vec2::new(0.0, 10.0)), None)?;
    let mut hunters = [
        Hunter::new(&mut naubino, a[0], b[0], &mut rng),
        Hunter::new(&mut naubino, a[99], b[99], &mut rng),
    ];

    let mut report = naubino.snapshot();
    for step in 0..MAX_STEPS {
        for hunter in &mut hunters {
            hunter.step(&mut naubino);
        }
        report = naubino.step()?;
        naubino.drain_events();
        if report.score_delta > 0.0 {
            log::info!("Step {}: +{:.2} points", step, report.score_delta);
        }
        if hunters.iter().all(Hunter::is_finished) && naubino.pointer_count() == 0 {
            log::info!("Hunt finished after {} steps", step + 1);
            break;
        }
    }

    log::info!(
        "{} naubs and {} joints left, score {:.2}",
        naubino.naub_count(),
        naubino.joint_count(),
        naubino.score()
    );
    Ok(report)
}

/// Spawner only; the population grows up to the cap
#[cfg(not(target_arch = "wasm32"))]
fn run_arena(config: NaubinoConfig) -> NaubinoResult<naubino::StepReport> {
    let mut naubino = Naubino::new(config)?;
    let mut arena = ArenaMode::new(&naubino, ArenaConfig::default())?;

    let mut report = naubino.snapshot();
    for _ in 0..ARENA_STEPS {
        arena.step(&mut naubino)?;
        report = naubino.step()?;
        for event in naubino.drain_events() {
            arena.on_event(&mut naubino, &event);
        }
    }

    log::info!(
        "Arena: {} naubs after {} steps (spawn interval {:.2}s)",
        naubino.naub_count(),
        ARENA_STEPS,
        arena.spawn_interval()
    );
    Ok(report)
}
