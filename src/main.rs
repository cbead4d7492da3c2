//! Range Drill entry point
//!
//! The browser build is driven from JavaScript through `platform::web`.
//! Natively this runs a headless session with the autoplay driver and logs
//! the result.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use range_drill::config::{GameplayConfig, ModeConfig};
    use range_drill::platform::{Autoplay, InputSource};
    use range_drill::sim::{GameEvent, PrimitiveVisuals, Session, SessionOptions};
    use range_drill::Settings;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Range Drill (native, headless) starting...");

    // Optional args: mode name, gameplay config path
    let mut args = std::env::args().skip(1);
    let mode_name = args.next().unwrap_or_else(|| "prototype".to_string());
    let mode = ModeConfig::by_name(&mode_name).unwrap_or_else(|err| {
        log::warn!("{err}; using prototype");
        ModeConfig::default()
    });
    let gameplay = match args.next() {
        Some(path) => match std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|json| GameplayConfig::from_json(&json).map_err(|e| e.to_string()))
        {
            Ok(config) => config,
            Err(err) => {
                log::warn!("could not load {path}: {err}; using defaults");
                GameplayConfig::default()
            }
        },
        None => GameplayConfig::default(),
    };

    let settings = Settings::load();
    let seed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    log::info!("seed {seed}");

    let mut session = Session::new(
        gameplay,
        mode,
        SessionOptions::from_settings(&settings, seed),
        Box::new(PrimitiveVisuals::new()),
    );
    session.start();

    let mut bot = Autoplay::new();
    let dt = range_drill::consts::PHYSICS_DT;
    let mut ended = false;
    while !ended {
        bot.observe(&session, dt);
        let input = bot.poll();
        for event in session.frame(dt, input.as_ref()) {
            match event {
                GameEvent::WaveStarted { wave } => log::info!("wave {wave}"),
                GameEvent::TargetKilled { id, .. } => log::debug!("killed {id}"),
                GameEvent::SessionEnded => ended = true,
                _ => {}
            }
        }
    }

    if let Some(summary) = session.summary() {
        println!(
            "score {}  hits {}/{}  accuracy {:.1}%  wave {}",
            summary.score,
            summary.hits,
            summary.shots,
            summary.accuracy,
            summary
                .wave_reached
                .map_or_else(|| "∞".to_string(), |w| w.to_string())
        );
        log::info!("{} score samples", summary.history.len());
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is platform::web::init, this is just to satisfy the compiler
}
