//! Direct-to-hardware 2D rendering engine for the Linux framebuffer.
//!
//! Layered bottom-up: [`pixel`] knows the device's bit layout, [`canvas`]
//! owns the off-screen back buffer and rasterizes every primitive into
//! it, [`device`] binds `/dev/fb*` and maps the hardware surface,
//! [`font`] expands and blends the embedded glyph bitmaps, and
//! [`surface`] ties them into the [`Fb`] engine the game talks to.

pub mod canvas;
pub mod device;
pub mod font;
pub mod pixel;
pub mod surface;

pub use canvas::Canvas;
pub use device::{Device, DeviceError, Geometry};
pub use font::{Font, FontFamily, FontStore};
pub use pixel::{Channel, Color, PixelFormat};
pub use surface::{Fb, SurfaceError};
