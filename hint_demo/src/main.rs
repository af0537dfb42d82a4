//! Hint engine demo
//!
//! Runs one viewer session for a few seconds with a clock, a couple of
//! static banners, two floating labels fighting over the same spot and a
//! message through the compatibility shim. Payloads are written to the log.
//!
//! Usage: `hint_demo [config.toml|config.ron]`

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam::channel::tick;
use hint_engine::prelude::*;
use rand::Rng;

const RUN_TIME: Duration = Duration::from_secs(6);
const UPDATE_PERIOD: Duration = Duration::from_millis(250);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    hint_engine::foundation::logging::init_with_level(log::LevelFilter::Info);

    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading configuration from {}", path);
            HintConfig::load_validated(path)?
        }
        None => HintConfig::default(),
    };

    let registry = Registry::new(config)?;
    let session = registry.create_session("demo-viewer", LogSink::default())?;
    let shim = CompatShim::for_registry(&registry)?;

    let started = Instant::now();
    let clock = ElementState::static_text("")
        .with_id("clock")
        .with_position(1150.0, 40.0)
        .with_align(HorizontalAlign::Right)
        .with_anchor(VerticalAnchor::Top)
        .with_sync_speed(SyncSpeed::Fast)
        .with_callback(move |ctx| Ok(format!("{} | <b>{:.1}s</b>", ctx.viewer, started.elapsed().as_secs_f32())))
        .build();
    session.add("clock", Arc::clone(&clock))?;

    let banners = [
        ElementState::static_text("<size=150%><b>ROUND 1</b></size>").with_position(0.0, 120.0),
        ElementState::static_text("<i>Objective:</i> hold the point").with_position(0.0, 160.0),
        ElementState::static_text("<color=#ff4040>LOW AMMO</color>")
            .with_position(-1150.0, 1040.0)
            .with_align(HorizontalAlign::Left)
            .with_hidden(true),
    ];
    let banners: Vec<Arc<Element>> = banners.into_iter().map(ElementState::build).collect();
    session.add_all("banners", banners.iter().cloned())?;

    let floating: Vec<Arc<Element>> = ["Enemy spotted", "Teammate down"]
        .into_iter()
        .enumerate()
        .map(|(index, text)| {
            ElementState::dynamic_text(text)
                .with_id(format!("callout-{}", index))
                .with_position(0.0, 540.0)
                .with_sync_speed(SyncSpeed::Slow)
                .with_dynamic(|layout| {
                    layout.margin = Some(Margin { top: 4.0, bottom: 4.0, ..Margin::default() });
                    layout.overflow = OverflowStrategy::StayInPosition;
                })
                .build()
        })
        .collect();
    session.add_all("callouts", floating.iter().cloned())?;

    shim.show(&session, "legacy-plugin", "Welcome!\nPress <b>F1</b> for help", None)?;

    let mut rng = rand::thread_rng();
    let ticker = tick(UPDATE_PERIOD);
    while started.elapsed() < RUN_TIME {
        ticker.recv()?;
        clock.touch();

        if rng.gen_bool(0.3) {
            let ammo = &banners[2];
            ammo.set_hidden(!ammo.is_hidden());
        }
        if rng.gen_bool(0.5) {
            let callout = &floating[rng.gen_range(0..floating.len())];
            callout.set_position(rng.gen_range(-200.0..200.0), rng.gen_range(480.0..600.0));
        }
    }

    session.force_update();
    std::thread::sleep(Duration::from_millis(200));
    log::info!("Demo finished after {:.1}s", started.elapsed().as_secs_f32());
    registry.shutdown();
    Ok(())
}
