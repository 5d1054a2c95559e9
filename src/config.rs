//! Runtime options, merged from defaults and the command line.

use std::path::PathBuf;

use log::LevelFilter;

/// Everything the binaries need to know at startup.
#[derive(Debug, Clone)]
pub struct Options {
    /// Framebuffer device node.
    pub device: PathBuf,
    /// Repaint/gravity tick interval in milliseconds.
    pub tick_ms: u64,
    /// Stderr log verbosity.
    pub log_level: LevelFilter,
    /// Draw the one-time decorative side panels.
    pub decorations: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            device: PathBuf::from("/dev/fb0"),
            tick_ms: 40,
            log_level: LevelFilter::Warn,
            decorations: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = Options::default();
        assert_eq!(opts.device, PathBuf::from("/dev/fb0"));
        assert_eq!(opts.tick_ms, 40);
        assert!(opts.decorations);
    }
}
