//! Headless trajectory player.
//!
//! `trajview [--preset NAME] [--save-options] [TRAJECTORY] [FRAMES]` loads
//! a trajectory on the background loader (or generates a synthetic random
//! walk when no path is given), drains one upload per frame, then plays it
//! back for `FRAMES` frames and logs frame rate, phase and a sampled atom
//! once per second.
//!
//! Options come from `presets/NAME.toml` with `--preset`, otherwise from
//! `trajview.toml` in the working directory when present.
//! `--save-options` writes the effective options to `trajview.toml` and
//! exits.

use std::path::{Path, PathBuf};

use glam::Vec3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use trajview::loader::{
    CpuSink, Drained, LoadSettings, LoadSource, LoadStage, TrajectoryLoader,
};
use trajview::options::Options;
use trajview::playback::{PlaybackClock, PlaybackCommand};
use trajview::trajectory::synthetic;
use trajview::util::frame_timing::FrameTiming;
use trajview::TrajviewError;

const OPTIONS_FILE: &str = "trajview.toml";
const PRESET_DIR: &str = "presets";
const DEFAULT_FRAMES: u64 = 600;

#[derive(Default)]
struct Args {
    preset: Option<String>,
    save_options: bool,
    trajectory: Option<String>,
    frames: Option<u64>,
}

fn parse_args() -> Args {
    let mut parsed = Args::default();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--preset" => parsed.preset = args.next(),
            "--save-options" => parsed.save_options = true,
            _ if parsed.trajectory.is_none() => parsed.trajectory = Some(arg),
            _ => parsed.frames = arg.parse().ok(),
        }
    }
    parsed
}

fn load_options(preset: Option<&str>) -> Options {
    let path = match preset {
        Some(name) => {
            let dir = Path::new(PRESET_DIR);
            let available = Options::list_presets(dir);
            if !available.iter().any(|p| p == name) {
                log::warn!(
                    "unknown preset {name:?}, available: {}",
                    available.join(", ")
                );
                return Options::default();
            }
            Options::preset_path(dir, name)
        }
        None => PathBuf::from(OPTIONS_FILE),
    };
    if preset.is_none() && !path.exists() {
        return Options::default();
    }
    match Options::load(&path) {
        Ok(options) => {
            log::info!("using options from {}", path.display());
            options
        }
        Err(e) => {
            log::warn!("ignoring {}: {e}", path.display());
            Options::default()
        }
    }
}

fn source_from_arg(arg: Option<String>) -> LoadSource {
    if let Some(path) = arg {
        return LoadSource::File(PathBuf::from(path));
    }
    log::info!("no trajectory given, playing a synthetic random walk");
    let mut rng = StdRng::seed_from_u64(7);
    LoadSource::Memory {
        name: "synthetic random walk".to_owned(),
        trajectory: synthetic::random_walk(
            &mut rng,
            256,
            200,
            Vec3::splat(20.0),
            0.8,
        ),
    }
}

fn run(
    options: &Options,
    source: LoadSource,
    frames: u64,
) -> Result<(), TrajviewError> {
    let (mut loader, mut queue) = TrajectoryLoader::spawn()?;
    loader.submit(source, LoadSettings::from(options))?;

    let mut clock = PlaybackClock::new(&options.playback);
    let mut timing = FrameTiming::new(options.playback.target_fps);
    let mut sink = CpuSink::new();
    let mut stage = LoadStage::Idle;
    let mut played = 0u64;

    while played < frames {
        if !timing.should_render() {
            std::thread::sleep(timing.time_until_next_frame());
            continue;
        }

        match queue.drain_one(&mut sink) {
            Some(Drained::Published(summary)) => {
                if summary.segments > 0 {
                    clock.set_step_increment(1.0 / summary.segments as f32);
                }
                clock.reset();
            }
            Some(Drained::LoadFailed { error, .. }) => return Err(error),
            Some(Drained::SinkFailed(error)) => return Err(error),
            Some(Drained::Uploaded(_)) | None => {}
        }

        let progress = loader.progress();
        if progress.stage != stage {
            stage = progress.stage;
            log::info!(
                "load stage {stage:?} ({:.0}%)",
                progress.fraction * 100.0
            );
        }

        let dt = timing.end_frame();
        let phase = clock.advance(dt);
        if let Some(motion) = queue.motion() {
            let _ = motion.evaluate_into(phase, sink.positions_mut());
            played += 1;
            if played == frames / 2 {
                clock.execute(PlaybackCommand::Reverse);
            }
        }

        if let Some(fps) = timing.take_second_report() {
            log::info!(
                "{fps} fps (smoothed {:.1}), t = {:.4}, atom 0 at {:?}",
                timing.fps(),
                phase.value(),
                sink.positions().get(..3)
            );
        }
    }

    log::info!("played {played} frames, final t = {:.4}", clock.phase().value());
    Ok(())
}

fn main() {
    env_logger::init();

    let args = parse_args();
    let options = load_options(args.preset.as_deref());
    if args.save_options {
        match options.save(Path::new(OPTIONS_FILE)) {
            Ok(()) => log::info!("wrote {OPTIONS_FILE}"),
            Err(e) => {
                log::error!("could not write {OPTIONS_FILE}: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    let source = source_from_arg(args.trajectory);
    let frames = args.frames.unwrap_or(DEFAULT_FRAMES);
    if let Err(e) = run(&options, source, frames) {
        log::error!("{e}");
        std::process::exit(1);
    }
}
