//! Test-pattern binary: exercises every raster primitive once, then
//! keeps flipping the back buffer until interrupted. Handy for checking
//! a panel's pixel layout and the engine's geometry handling by eye.
//!
//! Expects a screen of at least 640x480; the primitives assert their
//! geometry, so a tiny panel fails fast rather than drawing garbage.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use log::warn;

use fbtris::logging;
use fbtris::Fb;

static RUNNING: AtomicBool = AtomicBool::new(true);

extern "C" fn on_signal(_sig: libc::c_int) {
    RUNNING.store(false, Ordering::Relaxed);
}

fn main() -> Result<()> {
    logging::init(log::LevelFilter::Info);

    let device = std::env::args().nth(1).unwrap_or_else(|| "/dev/fb0".into());
    let mut fb = Fb::open(&device)
        .with_context(|| format!("binding framebuffer device {device}"))?;

    let handler = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
    unsafe {
        libc::signal(libc::SIGINT, handler);
        libc::signal(libc::SIGTERM, handler);
        libc::signal(libc::SIGPIPE, handler);
    }

    if let Err(err) = fb.save() {
        warn!("screen save failed: {err}");
    }

    draw_pattern(&mut fb);

    while RUNNING.load(Ordering::Relaxed) {
        fb.sync();
        std::thread::sleep(Duration::from_millis(40));
    }

    if let Err(err) = fb.restore() {
        warn!("screen restore failed: {err}");
    }
    Ok(())
}

fn draw_pattern(fb: &mut Fb) {
    let w = fb.width();
    let h = fb.height();
    let white = fb.color(0xFF, 0xFF, 0xFF);
    let red = fb.color(0xFF, 0, 0);
    let yellow = fb.color(0xFF, 0xFF, 0);
    let blue = fb.color(0, 0, 0xFF);
    let green = fb.color(0, 0xFF, 0);
    let cyan = fb.color(0, 0xFF, 0xFF);

    fb.fill_rect(0, 0, w, h, white);

    // Corner and center slabs.
    fb.fill_rect(0, 0, 100, 100, red);
    fb.fill_rect(0, h - 100, 100, 100, red);
    fb.fill_rect(w - 100, 0, 100, 100, red);
    fb.fill_rect(w - 100, h - 100, 100, 100, red);
    fb.fill_rect(100, 100, w - 200, h - 200, red);
    fb.draw_rect(150, 150, w - 300, h - 300, yellow, 2);
    fb.draw_rect((w - 300) / 2, h - 100, 300, 100, blue, 2);

    fb.fill_circle(w / 2, h / 2, 100, white);
    fb.draw_circle(w / 2, h / 2, 120, white, 2);

    fb.draw_oval((w - 300) / 2, (h - 400) / 2, 300, 400, white, 2);
    fb.draw_oval((w - 400) / 2, (h - 300) / 2, 400, 300, white, 2);
    fb.draw_oval(120, 120, w - 240, h - 240, cyan, 1);
    fb.fill_oval((w - 200) / 2, 0, 200, 100, cyan);
    fb.fill_oval(0, (h - 200) / 2, 100, 200, cyan);
    fb.fill_oval((w - 100) / 2, (h - 100) / 2, 100, 100, cyan);
    fb.draw_oval((w - 150) / 2, (h - 150) / 2, 150, 150, cyan, 2);

    fb.fill_round_rect(20, h / 2 - 60, 120, 50, yellow, 12);
    fb.draw_round_rect(20, h / 2 + 10, 120, 50, blue, 2, 12);

    // Line fan from the origin.
    fb.draw_line(0, 0, 100, 100, blue, 2);
    fb.draw_line(0, 0, 100, 200, blue, 2);
    fb.draw_line(0, 0, 100, 300, blue, 2);
    fb.draw_line(0, 0, 200, 100, blue, 2);
    fb.draw_line(0, 0, 300, 100, blue, 2);

    // Crosshairs with offset green twins.
    fb.draw_line(0, h / 2, w - 1, h / 2, blue, 2);
    fb.draw_line(w / 2, 0, w / 2, h - 1, blue, 2);
    fb.draw_line(0, h / 2 + 2, w - 1, h / 2 + 2, green, 2);
    fb.draw_line(w / 2 + 2, 0, w / 2 + 2, h - 1, green, 2);

    // Five-point star inscribed in a third of the screen.
    {
        let cx = w / 2;
        let cy = h / 2;
        let r = (w / 3).min(h / 3) as f64;
        let mut x1 = cx;
        let mut y1 = cy - r as i32;
        let mut i = 144;
        while i <= 720 {
            let rad = (90 + i) as f64 * std::f64::consts::PI / 180.0;
            let x2 = (r * rad.cos()) as i32 + cx;
            let y2 = (-r * rad.sin()) as i32 + cy;
            fb.draw_line(x1, y1, x2, y2, green, 1);
            x1 = x2;
            y1 = y2;
            i += 144;
        }
    }

    fb.text(100, 75, "Hello World!", fb.color(0, 0, 0), false, 1);
    fb.text(100, 100, "Hello World!", fb.color(0, 0, 0), true, 2);

    // Archimedean spiral of single points out to the screen corner.
    {
        let cx = w / 2;
        let cy = h / 2;
        let magenta = fb.color(0xFF, 0, 0xFF);
        let max_r = ((cx * cx + cy * cy) as f64).sqrt();
        let mut angle = 1.0f64;
        let mut r = 1.0f64;
        while r < max_r {
            let rad = angle * std::f64::consts::PI / 180.0;
            r = 5.0 * rad;
            let x = cx as f64 + r * rad.cos();
            let y = cy as f64 - r * rad.sin();
            let (px, py) = (x.round() as i32, y.round() as i32);
            if px >= 0 && px < w && py >= 0 && py < h {
                fb.draw_point(px, py, magenta);
            }
            let step = 360.0 / (2.0 * std::f64::consts::PI * r);
            angle += step.min(10.0);
        }
    }
}
