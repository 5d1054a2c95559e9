//! Framebuffer device binding.
//!
//! Opens the device node read-write, queries the current video mode with
//! the `FBIOGET_VSCREENINFO` ioctl, and establishes a shared read-write
//! memory mapping over the virtual resolution. The returned [`Device`]
//! owns the descriptor and the mapping; both are released on drop.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use std::ptr;

use log::debug;
use thiserror::Error;

use crate::fb::pixel::{Channel, PixelFormat};

/// `FBIOGET_VSCREENINFO` from `<linux/fb.h>`.
const FBIOGET_VSCREENINFO: libc::c_ulong = 0x4600;

/// Per-channel bit layout as reported by the driver.
///
/// Mirrors `struct fb_bitfield` from `<linux/fb.h>`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct FbBitfield {
    pub offset: u32,
    pub length: u32,
    pub msb_right: u32,
}

/// Variable screen information, the ioctl result describing the current
/// video mode. Mirrors `struct fb_var_screeninfo` from `<linux/fb.h>`;
/// field order and widths must match the kernel exactly.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct FbVarScreeninfo {
    pub xres: u32,
    pub yres: u32,
    pub xres_virtual: u32,
    pub yres_virtual: u32,
    pub xoffset: u32,
    pub yoffset: u32,
    pub bits_per_pixel: u32,
    pub grayscale: u32,
    pub red: FbBitfield,
    pub green: FbBitfield,
    pub blue: FbBitfield,
    pub transp: FbBitfield,
    pub nonstd: u32,
    pub activate: u32,
    pub height: u32,
    pub width: u32,
    pub accel_flags: u32,
    pub pixclock: u32,
    pub left_margin: u32,
    pub right_margin: u32,
    pub upper_margin: u32,
    pub lower_margin: u32,
    pub hsync_len: u32,
    pub vsync_len: u32,
    pub sync: u32,
    pub vmode: u32,
    pub rotate: u32,
    pub colorspace: u32,
    pub reserved: [u32; 4],
}

/// Errors binding the framebuffer device. All are fatal to the caller:
/// the device node is assumed stable for the process lifetime, so no
/// retry logic exists anywhere downstream.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("open framebuffer device {} failed: {source}", path.display())]
    OpenFailed { path: PathBuf, source: io::Error },

    #[error("FBIOGET_VSCREENINFO on {} failed: {source}", path.display())]
    QueryFailed { path: PathBuf, source: io::Error },

    #[error("mmap of {len} framebuffer bytes failed: {source}")]
    MapFailed { len: usize, source: io::Error },
}

/// Hardware-reported geometry, immutable after bind.
///
/// Virtual resolution may exceed the visible one (drivers allocate extra
/// backing store for panning or page flips); the scanline stride of the
/// mapped surface follows the virtual width, never the visible one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
    pub virtual_width: u32,
    pub virtual_height: u32,
    pub bits_per_pixel: u32,
}

impl Geometry {
    pub const fn bytes_per_pixel(&self) -> usize {
        (self.bits_per_pixel / 8) as usize
    }

    /// Bytes per visible scanline (back-buffer stride).
    pub const fn visible_stride(&self) -> usize {
        self.width as usize * self.bytes_per_pixel()
    }

    /// Bytes per mapped scanline (hardware stride).
    pub const fn virtual_stride(&self) -> usize {
        self.virtual_width as usize * self.bytes_per_pixel()
    }

    /// Total size of the mapped region.
    pub const fn map_len(&self) -> usize {
        self.virtual_stride() * self.virtual_height as usize
    }
}

/// The memory-mapped hardware surface. Unmapped on drop.
struct Mapping {
    ptr: ptr::NonNull<u8>,
    len: usize,
}

// Single-threaded engine; the mapping is only ever touched through
// &mut Device.
unsafe impl Send for Mapping {}

impl Mapping {
    fn new(file: &File, len: usize) -> Result<Self, DeviceError> {
        let ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(DeviceError::MapFailed {
                len,
                source: io::Error::last_os_error(),
            });
        }
        Ok(Self {
            // MAP_FAILED was ruled out above, and mmap never returns null.
            ptr: ptr::NonNull::new(ptr.cast()).expect("mmap returned null"),
            len,
        })
    }

    fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr.as_ptr().cast(), self.len);
        }
    }
}

/// A bound framebuffer device: open descriptor, queried mode, and the
/// established memory mapping.
pub struct Device {
    /// Declared first so the mapping is torn down before the descriptor
    /// closes (fields drop in declaration order).
    map: Mapping,
    /// Owns the descriptor; closed on drop.
    _file: File,
    geometry: Geometry,
    format: PixelFormat,
}

impl Device {
    /// Open the device node, query the video mode, and map the surface.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DeviceError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| DeviceError::OpenFailed {
                path: path.to_owned(),
                source,
            })?;

        let vinfo = query_mode(&file).map_err(|source| DeviceError::QueryFailed {
            path: path.to_owned(),
            source,
        })?;

        let geometry = Geometry {
            width: vinfo.xres,
            height: vinfo.yres,
            virtual_width: vinfo.xres_virtual,
            virtual_height: vinfo.yres_virtual,
            bits_per_pixel: vinfo.bits_per_pixel,
        };
        let format = PixelFormat {
            bits_per_pixel: vinfo.bits_per_pixel,
            red: Channel::new(vinfo.red.offset, vinfo.red.length),
            green: Channel::new(vinfo.green.offset, vinfo.green.length),
            blue: Channel::new(vinfo.blue.offset, vinfo.blue.length),
            transp: Channel::new(vinfo.transp.offset, vinfo.transp.length),
        };

        let map = Mapping::new(&file, geometry.map_len())?;

        debug!(
            "bound framebuffer {}: {}x{} ({}x{} virtual), {} bpp, format {:?}",
            path.display(),
            geometry.width,
            geometry.height,
            geometry.virtual_width,
            geometry.virtual_height,
            geometry.bits_per_pixel,
            format
        );

        Ok(Self {
            map,
            _file: file,
            geometry,
            format,
        })
    }

    /// Hardware geometry, fixed for the lifetime of the binding.
    pub const fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Pixel layout, fixed for the lifetime of the binding.
    pub const fn format(&self) -> PixelFormat {
        self.format
    }

    /// The mapped hardware bytes. Read only by save/restore.
    pub(crate) fn surface(&self) -> &[u8] {
        self.map.as_slice()
    }

    /// The mapped hardware bytes, writable.
    pub(crate) fn surface_mut(&mut self) -> &mut [u8] {
        self.map.as_mut_slice()
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("geometry", &self.geometry)
            .field("format", &self.format)
            .finish()
    }
}

fn query_mode(file: &File) -> io::Result<FbVarScreeninfo> {
    let mut vinfo = FbVarScreeninfo::default();
    // The request parameter is c_ulong on glibc but c_int on musl.
    let ret = unsafe { libc::ioctl(file.as_raw_fd(), FBIOGET_VSCREENINFO as _, &mut vinfo) };
    if ret != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(vinfo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn open_missing_node_is_open_failed() {
        let err = Device::open("/nonexistent/fb-device").unwrap_err();
        assert!(matches!(err, DeviceError::OpenFailed { .. }), "{err}");
    }

    #[test]
    fn open_regular_file_is_query_failed() {
        // A regular file accepts open(2) but rejects the mode ioctl.
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&[0u8; 64]).unwrap();
        let err = Device::open(tmp.path()).unwrap_err();
        assert!(matches!(err, DeviceError::QueryFailed { .. }), "{err}");
    }

    #[test]
    fn geometry_strides_follow_their_own_widths() {
        let g = Geometry {
            width: 800,
            height: 600,
            virtual_width: 1024,
            virtual_height: 600,
            bits_per_pixel: 32,
        };
        assert_eq!(g.bytes_per_pixel(), 4);
        assert_eq!(g.visible_stride(), 3200);
        assert_eq!(g.virtual_stride(), 4096);
        assert_eq!(g.map_len(), 4096 * 600);
    }

    #[test]
    fn var_screeninfo_matches_kernel_layout() {
        // 6 mode words + bpp + grayscale + 4 bitfields + 20 trailing
        // words, all u32. 160 bytes total, as the kernel defines it.
        assert_eq!(std::mem::size_of::<FbBitfield>(), 12);
        assert_eq!(std::mem::size_of::<FbVarScreeninfo>(), 160);
    }
}
