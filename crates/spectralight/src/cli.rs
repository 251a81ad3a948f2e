//! Command-line argument parsing.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use spectralight_core::{MappingPolicy, SinkKind, SpectraConfig, WindowFunction};
use std::path::PathBuf;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "spectralight", version)]
#[command(about = "Drive bass/mid/treble LED groups from an audio file", long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze a file and drive the LEDs from this process
    Play {
        /// Audio file to analyze
        file: PathBuf,

        /// Route readings through an in-process relay instead of mapping directly
        #[arg(long)]
        relay: bool,

        /// Play the audio on the default output device
        #[arg(long)]
        audible: bool,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Analyze a file and publish band readings to a relay
    Publish {
        /// Audio file to analyze
        file: PathBuf,

        /// Consumer address (host:port)
        #[arg(long, value_name = "ADDR")]
        peer: Option<String>,

        /// Play the audio on the default output device
        #[arg(long)]
        audible: bool,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Subscribe to a relay and drive the LEDs
    Render {
        /// Local address to listen on (host:port)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,

        #[command(flatten)]
        overrides: Overrides,
    },
}

/// Settings that override the configuration file
#[derive(Args, Debug, Default, Clone)]
pub struct Overrides {
    /// LEDs per band group
    #[arg(long, value_name = "N")]
    pub leds: Option<usize>,

    /// Intensity mapping policy
    #[arg(long, value_enum)]
    pub policy: Option<PolicyArg>,

    /// Window applied before the FFT
    #[arg(long, value_enum)]
    pub window: Option<WindowArg>,

    /// LED output
    #[arg(long, value_enum)]
    pub sink: Option<SinkArg>,

    /// Art-Net destination (host:port)
    #[arg(long, value_name = "ADDR")]
    pub artnet_target: Option<String>,

    /// Sleep the full frame duration instead of subtracting processing time
    #[arg(long)]
    pub no_latency_compensation: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyArg {
    Energy,
    Threshold,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowArg {
    Rectangular,
    Hann,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkArg {
    Log,
    Artnet,
    Memory,
}

impl From<PolicyArg> for MappingPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Energy => MappingPolicy::Energy,
            PolicyArg::Threshold => MappingPolicy::Threshold,
        }
    }
}

impl From<WindowArg> for WindowFunction {
    fn from(arg: WindowArg) -> Self {
        match arg {
            WindowArg::Rectangular => WindowFunction::Rectangular,
            WindowArg::Hann => WindowFunction::Hann,
        }
    }
}

impl From<SinkArg> for SinkKind {
    fn from(arg: SinkArg) -> Self {
        match arg {
            SinkArg::Log => SinkKind::Log,
            SinkArg::Artnet => SinkKind::Artnet,
            SinkArg::Memory => SinkKind::Memory,
        }
    }
}

impl Overrides {
    fn apply(&self, config: &mut SpectraConfig) {
        if let Some(leds) = self.leds {
            config.leds.leds_per_group = leds;
        }
        if let Some(policy) = self.policy {
            config.mapping.policy = policy.into();
        }
        if let Some(window) = self.window {
            config.analysis.window = window.into();
        }
        if let Some(sink) = self.sink {
            config.output.sink = sink.into();
        }
        if let Some(target) = &self.artnet_target {
            config.output.artnet_target = target.clone();
        }
        if self.no_latency_compensation {
            config.pacer.compensate_latency = false;
        }
    }
}

impl Cli {
    /// Configuration file (or defaults) with command-line overrides applied
    pub fn load_config(&self) -> Result<SpectraConfig> {
        let mut config = match &self.config {
            Some(path) => SpectraConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => SpectraConfig::default(),
        };

        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }

        match &self.command {
            Command::Play { overrides, .. } => overrides.apply(&mut config),
            Command::Publish {
                peer, overrides, ..
            } => {
                overrides.apply(&mut config);
                if let Some(peer) = peer {
                    config.relay.peer_address = peer.clone();
                }
            }
            Command::Render { bind, overrides } => {
                overrides.apply(&mut config);
                if let Some(bind) = bind {
                    config.relay.bind_address = bind.clone();
                }
            }
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_play_with_overrides() {
        let cli = Cli::try_parse_from([
            "spectralight",
            "play",
            "song.mp3",
            "--relay",
            "--leds",
            "8",
            "--policy",
            "threshold",
            "--window",
            "hann",
            "--sink",
            "memory",
        ])
        .unwrap();

        let config = cli.load_config().unwrap();
        assert_eq!(config.leds.leds_per_group, 8);
        assert_eq!(config.mapping.policy, MappingPolicy::Threshold);
        assert_eq!(config.analysis.window, WindowFunction::Hann);
        assert_eq!(config.output.sink, SinkKind::Memory);
        assert!(matches!(cli.command, Command::Play { relay: true, .. }));
    }

    #[test]
    fn test_relay_addresses() {
        let cli = Cli::try_parse_from(["spectralight", "render", "--bind", "0.0.0.0:7000"]).unwrap();
        assert_eq!(cli.load_config().unwrap().relay.bind_address, "0.0.0.0:7000");

        let cli = Cli::try_parse_from([
            "spectralight",
            "publish",
            "a.wav",
            "--peer",
            "10.0.0.2:7000",
        ])
        .unwrap();
        assert_eq!(cli.load_config().unwrap().relay.peer_address, "10.0.0.2:7000");
    }

    #[test]
    fn test_config_file_then_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[leds]\nleds_per_group = 3\n\n[pacer]\ncompensate_latency = true").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = Cli::try_parse_from([
            "spectralight",
            "--config",
            &path,
            "play",
            "a.wav",
            "--no-latency-compensation",
            "--log-level",
            "debug",
        ])
        .unwrap();

        let config = cli.load_config().unwrap();
        assert_eq!(config.leds.leds_per_group, 3);
        assert!(!config.pacer.compensate_latency);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_invalid_override_rejected() {
        let cli = Cli::try_parse_from(["spectralight", "play", "a.wav", "--leds", "0"]).unwrap();
        assert!(cli.load_config().is_err());
    }

    #[test]
    fn test_file_is_required() {
        assert!(Cli::try_parse_from(["spectralight", "play"]).is_err());
    }
}
