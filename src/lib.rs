//! fbtris: a 2D rendering engine for the Linux framebuffer and the
//! falling-block game built on top of it.
//!
//! The [`fb`] module is the engine proper — device binding, double
//! buffering, pixel-format abstraction, raster primitives and bitmap
//! fonts. [`game`] and [`input`] are its consumers: the game rules and
//! the raw-terminal key decoding that drive it.

pub mod cli;
pub mod config;
pub mod fb;
pub mod game;
pub mod input;
pub mod logging;

pub use cli::Cli;
pub use config::Options;
pub use fb::Fb;
