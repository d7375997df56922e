use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use visualiser_editor_core::{
    analyse_buffer, format_timecode, AppConfig, AudioOutput, ManualTimeBase, Project,
    RecordedSignals, Resolver, TrackKind,
};
use tracing_subscriber::EnvFilter;

fn main() -> visualiser_editor_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::New { output } => run_new(&output),
        Commands::Inspect { project } => run_inspect(&project, &config),
        Commands::Resolve {
            project,
            time,
            signals,
        } => run_resolve(&project, time, signals.as_deref(), &config),
        Commands::Sweep {
            project,
            fps,
            from,
            to,
            signals,
        } => run_sweep(&project, fps, from, to, signals.as_deref(), &config),
        Commands::Analyse {
            input,
            output,
            track_id,
        } => run_analyse(&input, &output, &track_id, &config),
    }
}

fn run_new(output: &Path) -> visualiser_editor_core::Result<()> {
    tracing::info!(?output, "writing demo project");
    Project::demo().save(output)
}

fn run_inspect(path: &Path, config: &AppConfig) -> visualiser_editor_core::Result<()> {
    let project = load_project(path, config)?;
    let fps = config.timeline.fps;

    for kind in TrackKind::ALL {
        let spans = project.spans(kind);
        println!("{kind} ({} items)", spans.len());
        for (id, span) in spans {
            match span.end {
                Some(end) => println!(
                    "  {id}  {} - {}",
                    format_timecode(span.start, fps),
                    format_timecode(end, fps)
                ),
                None => println!("  {id}  {}", format_timecode(span.start, fps)),
            }
        }
    }
    for track in project.audio_tracks.tracks() {
        println!(
            "audio `{}` {}{}{}",
            track.id,
            format_timecode(track.duration_seconds, fps),
            if track.active { " active" } else { "" },
            if track.usable { "" } else { " unusable" },
        );
    }
    Ok(())
}

fn run_resolve(
    path: &Path,
    time: f64,
    signals: Option<&Path>,
    config: &AppConfig,
) -> visualiser_editor_core::Result<()> {
    let project = load_project(path, config)?;
    let signals = load_signals(signals)?;
    let fps = config.timeline.fps.max(1.0);
    tracing::info!(?path, time, "resolving frame");

    // Automated events depend on the frames before `time`, so replay them.
    let mut resolver = Resolver::new();
    let mut frame = 0u64;
    loop {
        let t = frame as f64 / fps;
        if t >= time {
            break;
        }
        resolver.resolve(&project, &project.audio_tracks, t, &signals.frame_at(t));
        frame += 1;
    }
    let resolved = resolver.resolve(&project, &project.audio_tracks, time, &signals.frame_at(time));
    println!("{}", serde_json::to_string_pretty(&resolved)?);
    Ok(())
}

fn run_sweep(
    path: &Path,
    fps: Option<f64>,
    from: Option<f64>,
    to: Option<f64>,
    signals: Option<&Path>,
    config: &AppConfig,
) -> visualiser_editor_core::Result<()> {
    let project = load_project(path, config)?;
    let signals = load_signals(signals)?;
    let fps = fps.unwrap_or(config.timeline.fps).max(1.0);

    let clock = ManualTimeBase::new();
    let mut session = project.restore(Box::new(clock.clone()), config.playback.duration_seconds);
    let usable: Vec<String> = session
        .tracks()
        .usable()
        .map(|track| track.id.clone())
        .collect();
    for id in usable {
        session.attach_output(&id, Box::new(LoggedOutput { track: id.clone() }))?;
    }

    if let Some(from) = from {
        session.seek(from);
    }
    let end = to.unwrap_or_else(|| session.duration()).min(session.duration());
    tracing::info!(?path, fps, from = session.current_time(), end, "sweeping timeline");

    let mut resolver = Resolver::new();
    session.play();
    loop {
        let time = session.tick();
        let frame = resolver.resolve(&project, session.tracks(), time, &signals.frame_at(time));
        let line = serde_json::json!({
            "time": time,
            "updates": frame.parameter_updates(),
        });
        println!("{line}");
        if !session.is_playing() || time >= end {
            break;
        }
        clock.advance(1000.0 / fps);
    }
    session.pause();
    Ok(())
}

fn run_analyse(
    input: &Path,
    output: &Path,
    track_id: &str,
    config: &AppConfig,
) -> visualiser_editor_core::Result<()> {
    tracing::info!(?input, ?output, track_id, "running band analysis");
    let bytes = std::fs::read(input)?;
    let samples: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    let timeline = analyse_buffer(&samples, &config.analysis)?;

    let mut recorded = if output.exists() {
        load_signals(Some(output))?
    } else {
        RecordedSignals::default()
    };
    tracing::info!(frames = timeline.frames().len(), "analysis finished");
    recorded.insert(track_id, timeline);
    std::fs::write(output, serde_json::to_string_pretty(&recorded)?)?;
    Ok(())
}

fn load_project(path: &Path, config: &AppConfig) -> visualiser_editor_core::Result<Project> {
    let mut project = Project::load(path)?;
    project.set_min_clip_duration(config.timeline.min_clip_duration);
    Ok(project)
}

fn load_signals(path: Option<&Path>) -> visualiser_editor_core::Result<RecordedSignals> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&text)?)
        }
        None => Ok(RecordedSignals::default()),
    }
}

/// Stands in for a real audio device and reports transport calls.
struct LoggedOutput {
    track: String,
}

impl AudioOutput for LoggedOutput {
    fn start(&mut self, offset_seconds: f64) {
        tracing::debug!(track = %self.track, offset_seconds, "output started");
    }

    fn stop(&mut self) {
        tracing::debug!(track = %self.track, "output stopped");
    }

    fn set_gain(&mut self, gain: f64) {
        tracing::debug!(track = %self.track, gain, "output gain");
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Keyframe timeline tools for the visualiser", long_about = None)]
struct Cli {
    /// Optional JSON configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a small project that uses every track kind.
    New {
        /// Destination of the project file.
        output: PathBuf,
    },
    /// List every track with its items and timecodes.
    Inspect {
        /// Project file to read.
        project: PathBuf,
    },
    /// Evaluate all tracks at a single time and print the frame as JSON.
    Resolve {
        project: PathBuf,
        /// Time in seconds.
        #[arg(short, long, default_value_t = 0.0)]
        time: f64,
        /// Recorded band energies produced by `analyse`.
        #[arg(short, long)]
        signals: Option<PathBuf>,
    },
    /// Play the project on a simulated clock and print one line of
    /// parameter updates per frame.
    Sweep {
        project: PathBuf,
        /// Frames per second. Defaults to the configured rate.
        #[arg(long)]
        fps: Option<f64>,
        /// Start time. Defaults to where the project was saved.
        #[arg(long)]
        from: Option<f64>,
        /// Stop time. Defaults to the end of the timeline.
        #[arg(long)]
        to: Option<f64>,
        #[arg(short, long)]
        signals: Option<PathBuf>,
    },
    /// Analyse raw little-endian f32 mono samples into band energies.
    Analyse {
        /// Raw sample file.
        input: PathBuf,
        /// Recorded signals file. Existing tracks are kept.
        output: PathBuf,
        /// Audio track id the analysis belongs to.
        #[arg(long, default_value = "music")]
        track_id: String,
    },
}
