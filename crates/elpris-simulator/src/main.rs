//! Desktop simulator for the elpris e-paper spot price display.
//!
//! Runs the same wake cycle as the device and shows the resulting frame in an
//! SDL2 window via `embedded-graphics-simulator`. Window state is kept on
//! disk between runs like the device keeps it in flash.
//!
//! # Environment
//!
//! | Variable          | Meaning                                          |
//! |-------------------|--------------------------------------------------|
//! | `ELPRIS_CONFIG`   | Config file path (default `elpris.json`)         |
//! | `ELPRIS_STATE`    | Directory for persisted state (default `.elpris`)|
//! | `ELPRIS_NOW`      | Start the clock at `YYYY-MM-DDTHH:MM:SS`         |
//! | `ELPRIS_OFFLINE`  | `1` to serve generated prices instead of the API |
//!
//! A `.env` file in the working directory is read first.
//!
//! # Key bindings
//!
//! | Key | Action                               |
//! |-----|--------------------------------------|
//! | R   | Wake now                             |
//! | H   | Advance the clock one hour and wake  |
//! | D   | Advance the clock one day and wake   |
//! | Q   | Quit                                 |

mod clock;
mod file_store;
mod http;

use std::env;
use std::fs;
use std::io::ErrorKind;
use std::time::{Duration as StdDuration, Instant};

use anyhow::{Context, Result, anyhow};
use chrono::Duration;
use embedded_graphics::pixelcolor::Gray4;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::{
    OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window, sdl2::Keycode,
};
use log::{error, info};

use elpris_core::chart::constants::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX};
use elpris_core::config::Config;
use elpris_core::cycle::WakeCycle;
use elpris_core::framebuffer::FrameBuffer;
use elpris_core::source::PriceSource;
use elpris_core::time::{Clock, parse_api_timestamp};

use clock::SimClock;
use file_store::FileStore;
use http::{OfflineProvider, SimHttp};

/// Pixel scale factor for the simulator window.
const WINDOW_SCALE: u32 = 1;

/// Target frame duration (~30 FPS).
const FRAME_DURATION: StdDuration = StdDuration::from_millis(33);

const DEFAULT_CONFIG_PATH: &str = "elpris.json";
const DEFAULT_STATE_DIR: &str = ".elpris";

/// Battery reading shown in the header (a charged Li-ion cell).
const SIMULATED_BATTERY_VOLTS: f32 = 4.12;

type SimCycle<'a> = WakeCycle<'a, FileStore, SimHttp>;

/// Read the config file, `None` when there is none.
fn read_config_text() -> Result<Option<String>> {
    let path = env::var("ELPRIS_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    match fs::read_to_string(&path) {
        Ok(text) => {
            info!("Using config from {}", path);
            Ok(Some(text))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read {path}")),
    }
}

fn clock_from_env() -> Result<SimClock> {
    match env::var("ELPRIS_NOW") {
        Ok(text) => {
            let start = parse_api_timestamp(&text).map_err(|e| anyhow!("ELPRIS_NOW={text}: {e}"))?;
            Ok(SimClock::pinned(start))
        }
        Err(_) => Ok(SimClock::system()),
    }
}

/// One device wake: refresh the stored window and redraw the panel.
fn wake(
    cycle: &mut SimCycle<'_>,
    clock: &SimClock,
    framebuffer: &mut FrameBuffer,
    display: &mut SimulatorDisplay<Gray4>,
) {
    let now = clock.now();
    info!("Waking at {}", now);
    cycle.source_mut().client_mut().set_now(now);

    let mut window = cycle.load(now);
    let report = cycle.refresh(&mut window, now);
    info!(
        "Missing {} day(s), fetched {}, persisted: {}",
        report.reconcile.missing.len(),
        report.fetched.len(),
        report.persisted
    );

    let plan = cycle.render_or_notice(&window, now, Some(SIMULATED_BATTERY_VOLTS));
    if let Err(e) = plan.draw(framebuffer) {
        match e {}
    }
    if let Err(e) = framebuffer.flush(display) {
        error!("Flush error: {:?}", e);
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();
    info!("Starting elpris simulator");

    let config_text = read_config_text()?;
    let config: Config = match &config_text {
        Some(text) => serde_json::from_str(text).context("Invalid config")?,
        None => Config::default(),
    };
    info!(
        "Prices for {} from {}",
        config.prices.region.code(),
        config.prices.host
    );

    let mut clock = clock_from_env()?;

    let offline = env::var("ELPRIS_OFFLINE").is_ok_and(|v| v == "1");
    let http = if offline {
        info!("Offline mode, serving generated prices");
        SimHttp::Offline(OfflineProvider::new(clock.now()))
    } else {
        SimHttp::live()?
    };

    let state_dir = env::var("ELPRIS_STATE").unwrap_or_else(|_| DEFAULT_STATE_DIR.to_string());
    let store = FileStore::open(&state_dir).with_context(|| format!("Failed to open {state_dir}"))?;
    info!("State in {}", store.dir().display());

    let canvas = Size::new(DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX);
    let mut cycle = WakeCycle::new(store, PriceSource::new(http, &config.prices), canvas);
    let mut framebuffer = FrameBuffer::new();

    let mut display = SimulatorDisplay::<Gray4>::new(canvas);
    let output_settings = OutputSettingsBuilder::new().scale(WINDOW_SCALE).build();
    let mut window = Window::new("Elpris Simulator", &output_settings);

    info!("Keys: R=Wake  H=+1 hour  D=+1 day  Q=Quit");

    // The SDL window is lazily initialized on the first `update()` call.
    // We must call `update()` once before `events()` or it will panic.
    wake(&mut cycle, &clock, &mut framebuffer, &mut display);
    window.update(&display);

    'running: loop {
        let frame_start = Instant::now();

        for event in window.events() {
            match event {
                SimulatorEvent::Quit => break 'running,
                SimulatorEvent::KeyDown { keycode, .. } => {
                    let step = match keycode {
                        Keycode::Q | Keycode::Escape => break 'running,
                        Keycode::R => Some(Duration::zero()),
                        Keycode::H => Some(Duration::hours(1)),
                        Keycode::D => Some(Duration::days(1)),
                        _ => None,
                    };
                    if let Some(step) = step {
                        clock.advance(step);
                        wake(&mut cycle, &clock, &mut framebuffer, &mut display);
                    }
                }
                _ => {}
            }
        }

        window.update(&display);

        let elapsed = frame_start.elapsed();
        if elapsed < FRAME_DURATION {
            std::thread::sleep(FRAME_DURATION - elapsed);
        }
    }

    info!("Simulator exiting");
    Ok(())
}
