//! Command-line interface.

use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

use crate::config::Options;

/// fbtris - falling blocks straight onto the Linux framebuffer
#[derive(Parser, Debug)]
#[command(name = "fbtris")]
#[command(version)]
#[command(about = "Falling-block game rendered directly to /dev/fb0", long_about = None)]
pub struct Cli {
    /// Framebuffer device node
    #[arg(value_name = "DEVICE")]
    pub device: Option<PathBuf>,

    /// Tick interval in milliseconds
    #[arg(long, value_name = "MS")]
    pub tick: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Skip the decorative side panels
    #[arg(long)]
    pub plain: bool,
}

impl Cli {
    /// Merge the parsed arguments over the defaults.
    pub fn merge_into_options(self, mut options: Options) -> Options {
        if let Some(device) = self.device {
            options.device = device;
        }
        if let Some(tick) = self.tick {
            options.tick_ms = tick.max(1);
        }
        options.log_level = match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };
        if self.plain {
            options.decorations = false;
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_survive_empty_cli() {
        let cli = Cli::parse_from(["fbtris"]);
        let opts = cli.merge_into_options(Options::default());
        assert_eq!(opts.device, PathBuf::from("/dev/fb0"));
        assert_eq!(opts.tick_ms, 40);
        assert!(opts.decorations);
        assert_eq!(opts.log_level, LevelFilter::Warn);
    }

    #[test]
    fn arguments_override_defaults() {
        let cli = Cli::parse_from(["fbtris", "/dev/fb1", "--tick", "25", "-vv", "--plain"]);
        let opts = cli.merge_into_options(Options::default());
        assert_eq!(opts.device, PathBuf::from("/dev/fb1"));
        assert_eq!(opts.tick_ms, 25);
        assert!(!opts.decorations);
        assert_eq!(opts.log_level, LevelFilter::Debug);
    }

    #[test]
    fn zero_tick_is_clamped() {
        let cli = Cli::parse_from(["fbtris", "--tick", "0"]);
        let opts = cli.merge_into_options(Options::default());
        assert_eq!(opts.tick_ms, 1);
    }
}
