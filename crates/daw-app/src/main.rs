//! DAW prototype - headless audio/MIDI engine host
//!
//! Starts the audio and MIDI engines, creates one track observing both, plays
//! for a fixed time while draining the track's MIDI queue, then shuts down.
//!
//! ## Command line flags
//!
//! - `--list-devices`: print audio devices and MIDI input ports, then exit
//! - `--midi-port N`: open MIDI input port N (overrides the config file)
//! - `--config PATH`: config file (default: `<config dir>/daw/config.yaml`)
//! - `--seconds N`: main loop run time (default 10)

mod cli;
mod context;

use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;

use daw_core::audio::{CpalDeviceCatalog, DeviceCatalog};
use daw_core::config::{self, DawConfig};
use daw_midi::{MidiInputBackend, MidirBackend};

use cli::Args;
use context::AppContext;

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const STATS_INTERVAL: Duration = Duration::from_secs(1);

fn main() -> Result<()> {
    // Set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse(std::env::args().skip(1))?;

    if args.list_devices {
        return list_devices();
    }

    let config_path = args
        .config_path
        .clone()
        .unwrap_or_else(config::default_config_path);
    let mut config: DawConfig = config::load_config(&config_path);
    if args.midi_port.is_some() {
        config.midi.input_port = args.midi_port;
    }

    log::info!("daw starting up (config: {:?})", config_path);

    let mut ctx = AppContext::new(config);
    let (track_id, track) = ctx.add_track()?;
    log::info!("Created track {} '{}'", track_id, track.name());

    match track.add_default_audio_output() {
        Ok(device) => log::info!("Track '{}' routed to output device {}", track.name(), device),
        Err(e) => log::warn!("Track '{}' has no output device: {}", track.name(), e),
    }

    ctx.start()?;
    ctx.open_output();
    ctx.audio().play()?;

    run(&ctx, args.run_time);

    if let Err(e) = ctx.audio().stop() {
        log::warn!("AudioEngine: stop command not queued: {}", e);
    }
    let stats = ctx.audio().get_statistics();
    log::info!(
        "Processed {} frames on {} track(s), {} MIDI messages received",
        stats.total_frames_processed,
        ctx.tracks().track_count(),
        ctx.midi().messages_received()
    );

    ctx.shutdown();
    Ok(())
}

/// Drain track MIDI and report statistics until `run_time` has elapsed
fn run(ctx: &AppContext, run_time: Duration) {
    let start = Instant::now();
    let mut last_report = start;

    while start.elapsed() < run_time {
        ctx.drain_midi();

        if last_report.elapsed() >= STATS_INTERVAL {
            let stats = ctx.audio().get_statistics();
            log::info!(
                "AudioEngine: {} | tracks playing: {} | frames: {}",
                ctx.audio().get_state(),
                stats.tracks_playing,
                stats.total_frames_processed
            );
            last_report = Instant::now();
        }

        thread::sleep(POLL_INTERVAL);
    }
}

fn list_devices() -> Result<()> {
    println!("Audio devices:");
    match CpalDeviceCatalog::new().audio_devices() {
        Ok(devices) if devices.is_empty() => println!("  (none)"),
        Ok(devices) => {
            for device in devices {
                println!("  {}", device);
            }
        }
        Err(e) => println!("  unavailable: {}", e),
    }

    println!("MIDI input ports:");
    match MidirBackend::new().ports() {
        Ok(ports) if ports.is_empty() => println!("  (none)"),
        Ok(ports) => {
            for port in ports {
                println!("  {}", port);
            }
        }
        Err(e) => println!("  unavailable: {}", e),
    }
    Ok(())
}
