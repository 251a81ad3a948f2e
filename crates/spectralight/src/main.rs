//! SpectraLight - Audio spectrum driven LED lighting
//!
//! Decodes an audio file, splits each frame's spectrum into bass, mid and
//! treble, and drives three LED groups either directly or through a
//! publish/subscribe relay.

mod cli;
mod logging_setup;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use spectralight_control::{
    connect, create_sink, run_direct, run_loopback, run_publisher, ActuationGuard, ControlError,
    RelayConsumer, Role, SessionStats, ShutdownSignal, TransportGuard,
};
use spectralight_core::{IntensityMapper, SampleBuffer, SpectraConfig};
use spectralight_media::{load_samples, DecodeOptions, MediaError};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Exit status for a failed session
fn exit_code(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if cause.downcast_ref::<MediaError>().is_some() {
            return 2;
        }
        if let Some(ControlError::TransportConnect(_)) = cause.downcast_ref::<ControlError>() {
            return 3;
        }
    }
    1
}

/// Signals "stop" when audible playback finishes
#[derive(Clone, Default)]
struct PlaybackWatch(Option<Arc<AtomicBool>>);

impl PlaybackWatch {
    fn keep_going(&self) -> bool {
        self.0
            .as_ref()
            .map_or(true, |finished| !finished.load(Ordering::Acquire))
    }
}

#[cfg(feature = "playback")]
type Playback = spectralight_media::AudioPlayback;
#[cfg(not(feature = "playback"))]
type Playback = ();

/// Start audible playback if requested; failures only cost the audio
#[cfg(feature = "playback")]
fn start_playback(buffer: &SampleBuffer, audible: bool) -> (Option<Playback>, PlaybackWatch) {
    if !audible {
        return (None, PlaybackWatch::default());
    }
    match Playback::start(buffer) {
        Ok(playback) => {
            let watch = PlaybackWatch(Some(playback.finished_flag()));
            (Some(playback), watch)
        }
        Err(e) => {
            warn!("Audio playback unavailable, continuing silently: {}", e);
            (None, PlaybackWatch::default())
        }
    }
}

#[cfg(not(feature = "playback"))]
fn start_playback(_buffer: &SampleBuffer, audible: bool) -> (Option<Playback>, PlaybackWatch) {
    if audible {
        warn!("Built without the `playback` feature; running silently");
    }
    (None, PlaybackWatch::default())
}

async fn decode(file: PathBuf, config: &SpectraConfig) -> Result<SampleBuffer> {
    let options = DecodeOptions::with_rate(config.analysis.sample_rate);
    let file_label = file.display().to_string();
    let buffer = tokio::task::spawn_blocking(move || load_samples(&file, &options))
        .await?
        .with_context(|| format!("Failed to decode {}", file_label))?;

    info!(
        "Loaded {} ({:.1}s at {} Hz)",
        file_label,
        buffer.duration_secs(),
        buffer.sample_rate()
    );
    Ok(buffer)
}

async fn play(
    file: PathBuf,
    relay: bool,
    audible: bool,
    config: SpectraConfig,
    shutdown: ShutdownSignal,
) -> Result<SessionStats> {
    let buffer = decode(file, &config).await?;
    let sink = create_sink(&config.output, config.leds.channel_count())
        .context("Failed to create LED output")?;

    let (_playback, watch) = start_playback(&buffer, audible);
    let stats = tokio::task::spawn_blocking(move || {
        let mut sink = ActuationGuard::new(sink);
        if relay {
            run_loopback(&buffer, &config, &mut *sink, &shutdown, move || watch.keep_going())
        } else {
            run_direct(&buffer, &config, &mut *sink, &shutdown, || watch.keep_going())
        }
    })
    .await??;
    Ok(stats)
}

async fn publish(
    file: PathBuf,
    audible: bool,
    config: SpectraConfig,
    shutdown: ShutdownSignal,
) -> Result<SessionStats> {
    let buffer = decode(file, &config).await?;
    let transport = connect(&config.relay, Role::Publisher)
        .with_context(|| format!("Failed to reach relay at {}", config.relay.peer_address))?;

    let (_playback, watch) = start_playback(&buffer, audible);
    let stats = tokio::task::spawn_blocking(move || {
        let transport = TransportGuard::new(transport);
        run_publisher(&buffer, &config, &*transport, &shutdown, || watch.keep_going())
    })
    .await??;
    Ok(stats)
}

async fn render(config: SpectraConfig, shutdown: ShutdownSignal) -> Result<SessionStats> {
    let mut transport = TransportGuard::new(
        connect(&config.relay, Role::Subscriber)
            .with_context(|| format!("Failed to listen on {}", config.relay.bind_address))?,
    );
    let mapper = IntensityMapper::new(config.mapping.clone(), config.leds.leds_per_group);
    let mut consumer = RelayConsumer::new(&config.relay, mapper);
    consumer.attach(&mut *transport)?;

    let sink = create_sink(&config.output, config.leds.channel_count())
        .context("Failed to create LED output")?;

    let stats = tokio::task::spawn_blocking(move || -> Result<SessionStats> {
        let mut sink = ActuationGuard::new(sink);
        let consumed = consumer.run(&mut *sink, &shutdown)?;
        // Zero the LEDs before the transport goes away
        drop(sink);
        drop(transport);
        Ok(SessionStats {
            frames_rendered: consumed.renders,
            ..Default::default()
        })
    })
    .await??;
    Ok(stats)
}

async fn run(command: Command, config: SpectraConfig, shutdown: ShutdownSignal) -> Result<()> {
    let (mode, stats) = match command {
        Command::Play {
            file,
            relay,
            audible,
            ..
        } => {
            let mode = if relay { "Loopback" } else { "Direct" };
            (mode, play(file, relay, audible, config, shutdown).await?)
        }
        Command::Publish { file, audible, .. } => {
            ("Publish", publish(file, audible, config, shutdown).await?)
        }
        Command::Render { .. } => ("Render", render(config, shutdown).await?),
    };
    stats.log_summary(mode);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(1);
        }
    };

    let _log_guard = match logging_setup::init(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(1);
        }
    };

    info!("=== SpectraLight session started ===");

    let shutdown = ShutdownSignal::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => shutdown.trigger(),
                Err(e) => warn!("Could not listen for Ctrl-C: {}", e),
            }
        });
    }

    match run(cli.command, config, shutdown).await {
        Ok(()) => {
            info!("=== SpectraLight session ended ===");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let decode = anyhow::Error::new(MediaError::Empty).context("Failed to decode a.wav");
        assert_eq!(exit_code(&decode), 2);

        let connect = anyhow::Error::new(ControlError::TransportConnect("refused".to_string()))
            .context("Failed to reach relay");
        assert_eq!(exit_code(&connect), 3);

        let sink = anyhow::Error::new(ControlError::Actuation("bad target".to_string()));
        assert_eq!(exit_code(&sink), 1);
        assert_eq!(exit_code(&anyhow::anyhow!("other")), 1);
    }

    #[test]
    fn test_watch_without_playback_never_stops() {
        assert!(PlaybackWatch::default().keep_going());

        let finished = Arc::new(AtomicBool::new(false));
        let watch = PlaybackWatch(Some(Arc::clone(&finished)));
        assert!(watch.keep_going());
        finished.store(true, Ordering::Release);
        assert!(!watch.keep_going());
    }
}
