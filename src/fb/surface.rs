//! The framebuffer engine: device binding, back buffer, screen snapshot
//! and the drawing facade collaborators call.
//!
//! One [`Fb`] instance owns everything: the bound device, the off-screen
//! back buffer all primitives draw into, the optional snapshot of the
//! pre-existing screen contents, and the decompressed font families with
//! the active selection. Drawing never touches the hardware; only
//! [`Fb::sync`] copies the back buffer out, scanline by scanline, and the
//! two strides differ whenever the virtual resolution exceeds the visible
//! one — mixing them up shears the image diagonally.

use std::collections::TryReserveError;
use std::path::Path;

use log::info;
use thiserror::Error;

use crate::fb::canvas::Canvas;
use crate::fb::device::{Device, DeviceError};
use crate::fb::font::{FontFamily, FontStore};
use crate::fb::pixel::{Color, PixelFormat};

/// Buffer-lifecycle errors outside the device binding itself.
#[derive(Debug, Error)]
pub enum SurfaceError {
    /// Snapshot allocation failed. Recoverable: the caller may proceed
    /// without save/restore.
    #[error("screen snapshot allocation failed: {0}")]
    SnapshotAlloc(#[from] TryReserveError),

    /// `restore` called with no snapshot taken.
    #[error("no saved screen contents to restore")]
    NoSnapshot,
}

/// The rendering engine bound to one framebuffer device.
pub struct Fb {
    device: Device,
    canvas: Canvas,
    /// Visible rows of the mapped surface as they were at `save` time.
    /// At most one snapshot exists; a later `save` replaces it.
    snapshot: Option<Vec<u8>>,
    fonts: FontStore,
    active_font: FontFamily,
}

impl Fb {
    /// Bind the device at `path` and set up a zeroed back buffer and the
    /// font store. The engine is ready to draw on return.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DeviceError> {
        let device = Device::open(path)?;
        let geometry = device.geometry();
        let canvas = Canvas::new(
            geometry.width as i32,
            geometry.height as i32,
            device.format(),
        );
        info!(
            "engine ready: {}x{} at {} bpp",
            geometry.width, geometry.height, geometry.bits_per_pixel
        );
        Ok(Self {
            device,
            canvas,
            snapshot: None,
            fonts: FontStore::load(),
            active_font: FontFamily::default(),
        })
    }

    /// Visible width in pixels.
    pub fn width(&self) -> i32 {
        self.canvas.width()
    }

    /// Visible height in pixels.
    pub fn height(&self) -> i32 {
        self.canvas.height()
    }

    /// Pixel depth in bits.
    pub fn bits_per_pixel(&self) -> u32 {
        self.device.geometry().bits_per_pixel
    }

    /// The device's pixel format descriptor.
    pub fn format(&self) -> PixelFormat {
        self.device.format()
    }

    /// The off-screen back buffer.
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// The off-screen back buffer, writable.
    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    /// Pack an 8-bit-domain red/green/blue triple for this device.
    pub fn color(&self, red: u32, green: u32, blue: u32) -> Color {
        self.device.format().pack(red, green, blue)
    }

    /// Brighten (`delta > 0`) or darken (`delta < 0`) a packed color.
    pub fn color_add(&self, color: Color, delta: i32) -> Color {
        self.device.format().add(color, delta)
    }

    /// Copy the back buffer onto the mapped hardware surface.
    ///
    /// Plain sequential copy, not synchronized with scanout; tearing is
    /// an accepted trade-off of this engine.
    pub fn sync(&mut self) {
        let geometry = self.device.geometry();
        blit_rows(
            self.device.surface_mut(),
            geometry.virtual_stride(),
            self.canvas.data(),
            geometry.visible_stride(),
            geometry.visible_stride(),
            geometry.height as usize,
        );
    }

    /// Snapshot the visible rows of the mapped surface so `restore` can
    /// put the original screen contents back. Replaces any prior
    /// snapshot.
    pub fn save(&mut self) -> Result<(), SurfaceError> {
        let geometry = self.device.geometry();
        let len = geometry.visible_stride() * geometry.height as usize;
        let mut snap = Vec::new();
        snap.try_reserve_exact(len)?;
        snap.resize(len, 0);
        blit_rows(
            &mut snap,
            geometry.visible_stride(),
            self.device.surface(),
            geometry.virtual_stride(),
            geometry.visible_stride(),
            geometry.height as usize,
        );
        self.snapshot = Some(snap);
        Ok(())
    }

    /// Write the snapshot back onto the mapped surface and drop it.
    pub fn restore(&mut self) -> Result<(), SurfaceError> {
        let snap = self.snapshot.take().ok_or(SurfaceError::NoSnapshot)?;
        let geometry = self.device.geometry();
        blit_rows(
            self.device.surface_mut(),
            geometry.virtual_stride(),
            &snap,
            geometry.visible_stride(),
            geometry.visible_stride(),
            geometry.height as usize,
        );
        Ok(())
    }

    /// Select the active font family for subsequent [`Fb::text`] calls.
    pub fn set_font(&mut self, family: FontFamily) {
        self.active_font = family;
    }

    /// Horizontal cursor advance of the active font at scale 1.
    pub fn font_width(&self) -> i32 {
        self.fonts.get(self.active_font).width()
    }

    /// Line advance of the active font at scale 1.
    pub fn font_height(&self) -> i32 {
        self.fonts.get(self.active_font).height()
    }

    /// Draw `text` with the active font. See
    /// [`Font::draw_text`](crate::fb::font::Font::draw_text) for the
    /// blending and bounds semantics.
    pub fn text(&mut self, x: i32, y: i32, text: &str, color: Color, bold: bool, scale: i32) {
        self.fonts
            .get(self.active_font)
            .draw_text(&mut self.canvas, x, y, text, color, bold, scale);
    }

    // The raster primitives, delegated to the back buffer. All operate
    // in device-space pixel coordinates, origin top-left.

    pub fn draw_point(&mut self, x: i32, y: i32, color: Color) {
        self.canvas.draw_point(x, y, color);
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: Color) {
        self.canvas.fill_rect(x, y, width, height, color);
    }

    pub fn draw_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: Color, weight: i32) {
        self.canvas.draw_rect(x, y, width, height, color, weight);
    }

    pub fn draw_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, color: Color, weight: i32) {
        self.canvas.draw_line(x1, y1, x2, y2, color, weight);
    }

    pub fn fill_oval(&mut self, x: i32, y: i32, width: i32, height: i32, color: Color) {
        self.canvas.fill_oval(x, y, width, height, color);
    }

    pub fn draw_oval(&mut self, x: i32, y: i32, width: i32, height: i32, color: Color, weight: i32) {
        self.canvas.draw_oval(x, y, width, height, color, weight);
    }

    pub fn fill_circle(&mut self, cx: i32, cy: i32, radius: i32, color: Color) {
        self.canvas.fill_circle(cx, cy, radius, color);
    }

    pub fn draw_circle(&mut self, cx: i32, cy: i32, radius: i32, color: Color, weight: i32) {
        self.canvas.draw_circle(cx, cy, radius, color, weight);
    }

    pub fn fill_round_rect(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        color: Color,
        corner: i32,
    ) {
        self.canvas.fill_round_rect(x, y, width, height, color, corner);
    }

    pub fn draw_round_rect(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        color: Color,
        weight: i32,
        corner: i32,
    ) {
        self.canvas
            .draw_round_rect(x, y, width, height, color, weight, corner);
    }
}

impl std::fmt::Debug for Fb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fb")
            .field("geometry", &self.device.geometry())
            .field("active_font", &self.active_font)
            .field("has_snapshot", &self.snapshot.is_some())
            .finish()
    }
}

/// Copy `rows` scanlines of `row_len` bytes each, stepping the
/// destination and source by their own strides.
///
/// The strides differ whenever one side is the mapped surface (virtual
/// stride) and the other a tightly packed buffer (visible stride).
fn blit_rows(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[u8],
    src_stride: usize,
    row_len: usize,
    rows: usize,
) {
    for row in 0..rows {
        let d = row * dst_stride;
        let s = row * src_stride;
        dst[d..d + row_len].copy_from_slice(&src[s..s + row_len]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blit_rows_respects_both_strides() {
        // 3 rows of 4 visible bytes inside a 6-byte virtual stride.
        let src: Vec<u8> = (0u8..12).collect(); // packed, stride 4
        let mut dst = vec![0xEEu8; 6 * 3];
        blit_rows(&mut dst, 6, &src, 4, 4, 3);
        #[rustfmt::skip]
        assert_eq!(dst, vec![
            0, 1, 2, 3, 0xEE, 0xEE,
            4, 5, 6, 7, 0xEE, 0xEE,
            8, 9, 10, 11, 0xEE, 0xEE,
        ]);
    }

    #[test]
    fn blit_rows_round_trip_is_identity() {
        // save-then-restore law at the stride-math level: packing the
        // visible rows out of a padded surface and writing them back
        // reproduces the original visible bytes and never touches the
        // padding.
        let virtual_stride = 10;
        let visible = 7;
        let rows = 5;
        let original: Vec<u8> = (0..virtual_stride * rows).map(|i| i as u8).collect();

        let mut surface = original.clone();
        let mut snapshot = vec![0u8; visible * rows];
        blit_rows(&mut snapshot, visible, &surface, virtual_stride, visible, rows);

        // Scribble over the visible area, then restore.
        for b in surface.iter_mut() {
            *b = 0xAB;
        }
        blit_rows(&mut surface, virtual_stride, &snapshot, visible, visible, rows);

        for row in 0..rows {
            let at = row * virtual_stride;
            assert_eq!(&surface[at..at + visible], &original[at..at + visible]);
            // Padding was scribbled and intentionally left alone.
            assert!(surface[at + visible..at + virtual_stride]
                .iter()
                .all(|&b| b == 0xAB));
        }
    }
}
