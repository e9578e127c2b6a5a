use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use effect_sync_core::{
    BindReport, PlaybackLoop, RecordingEngine, SceneFile, Scheduler, ScriptAction, ScriptEvent,
};
use tracing_subscriber::EnvFilter;

fn main() -> effect_sync_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            scene,
            until,
            fps,
            seek,
            pause,
        } => {
            let script: Vec<ScriptEvent> = seek.into_iter().chain(pause).collect();
            run_simulate(&scene, until, fps, &script)
        }
        Commands::Inspect { scene } => run_inspect(&scene),
    }
}

fn bind_scene(path: &Path) -> effect_sync_core::Result<(SceneFile, Scheduler<RecordingEngine>, BindReport)> {
    let scene = SceneFile::load(path)?;
    let library = scene.library();
    let schedule = scene.schedule();
    let (scheduler, report) = Scheduler::bind(
        &library,
        &schedule,
        RecordingEngine::new(),
        scene.config.clone(),
    );
    Ok((scene, scheduler, report))
}

fn run_simulate(
    path: &Path,
    until: Option<f64>,
    fps: Option<f64>,
    script: &[ScriptEvent],
) -> effect_sync_core::Result<()> {
    tracing::info!(?path, "simulating playback");

    let (scene, mut scheduler, _) = bind_scene(path)?;
    for &cue in &scene.cues {
        scheduler.register_callback(cue, move || tracing::info!(cue, "cue reached"));
    }

    let until = until.unwrap_or_else(|| {
        scheduler
            .index()
            .instances()
            .iter()
            .map(|instance| instance.ends_at())
            .fold(0.0, f64::max)
            + 1.0
    });
    let mut driver = scene.driver.clone();
    if let Some(fps) = fps {
        driver.frame_rate = fps;
    }

    let mut playback = PlaybackLoop::new(scheduler, driver);
    let report = playback.simulate(until, script);

    for call in playback.scheduler().engine().calls() {
        tracing::debug!(?call, "render call");
    }
    tracing::info!(
        frames = report.frames,
        started = report.started,
        completed = report.completed,
        seeks = report.seeks,
        pauses = report.pauses,
        paused_frames = report.paused_frames,
        "simulation finished"
    );
    println!("{}", format_report(&report));
    Ok(())
}

fn format_report(report: &effect_sync_core::SimulationReport) -> String {
    format!(
        "frames={} started={} completed={} seeks={} pauses={} paused_frames={}",
        report.frames,
        report.started,
        report.completed,
        report.seeks,
        report.pauses,
        report.paused_frames
    )
}

fn run_inspect(path: &Path) -> effect_sync_core::Result<()> {
    let (_, scheduler, report) = bind_scene(path)?;
    let index = scheduler.index();
    let quantizer = index.quantizer();

    println!("start buckets:");
    for key in index.start_keys() {
        let entries: Vec<String> = index
            .starting_at(key)
            .iter()
            .map(|id| {
                let instance = index.get(*id);
                format!("{}@{}", instance.name(), instance.target())
            })
            .collect();
        println!("  {:>8.1}s  {}", quantizer.seconds(key), entries.join(", "));
    }

    println!("end order:");
    for id in index.by_end_time() {
        let instance = index.get(*id);
        println!(
            "  {:>8.1}s  {}@{} (starts {:.1}s)",
            instance.ends_at(),
            instance.name(),
            instance.target(),
            instance.starts_at()
        );
    }

    if !report.is_clean() {
        println!("skipped:");
        for skipped in &report.skipped {
            println!("  {}: {}", skipped.effect, skipped.error);
        }
    }

    println!(
        "early-exit seek is {}",
        if index.is_start_ordered() { "sound" } else { "unsound" }
    );
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

fn parse_seek(raw: &str) -> Result<ScriptEvent, String> {
    let (at, to) = parse_pair(raw)?;
    Ok(ScriptEvent {
        at,
        action: ScriptAction::Seek(to),
    })
}

fn parse_pause(raw: &str) -> Result<ScriptEvent, String> {
    let (at, frames) = parse_pair(raw)?;
    if frames < 0.0 || frames.fract() != 0.0 {
        return Err(format!("`{raw}`: pause length must be a whole number of frames"));
    }
    Ok(ScriptEvent {
        at,
        action: ScriptAction::Pause(frames as u32),
    })
}

fn parse_pair(raw: &str) -> Result<(f64, f64), String> {
    let (left, right) = raw
        .split_once(':')
        .ok_or_else(|| format!("`{raw}`: expected AT:VALUE"))?;
    let left = left
        .trim()
        .parse()
        .map_err(|_| format!("`{raw}`: `{left}` is not a number"))?;
    let right = right
        .trim()
        .parse()
        .map_err(|_| format!("`{raw}`: `{right}` is not a number"))?;
    Ok((left, right))
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Time-synchronised effect scheduler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a scene against a simulated clock and report what happened.
    Simulate {
        /// Path to the JSON scene file.
        scene: PathBuf,
        /// Stop playback at this position. Defaults to one second after the
        /// last effect ends.
        #[arg(short, long)]
        until: Option<f64>,
        /// Frames per second of the simulated host loop.
        #[arg(long)]
        fps: Option<f64>,
        /// Jump to TO once playback reaches AT, written `AT:TO`.
        #[arg(long, value_parser = parse_seek)]
        seek: Vec<ScriptEvent>,
        /// Pause for FRAMES host frames once playback reaches AT, written
        /// `AT:FRAMES`. The clock does not move while paused.
        #[arg(long, value_parser = parse_pause)]
        pause: Vec<ScriptEvent>,
    },
    /// Bind a scene and print its instance index.
    Inspect {
        /// Path to the JSON scene file.
        scene: PathBuf,
    },
}
