//! Game binary: bind the framebuffer, take over the terminal, run the
//! key/tick loop, and put everything back the way it was on exit.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};

use fbtris::config::Options;
use fbtris::game::Game;
use fbtris::input::{self, RawTerminal};
use fbtris::{logging, Cli, Fb};

/// Cleared by the signal handler; the main loop polls it every pass.
static RUNNING: AtomicBool = AtomicBool::new(true);

extern "C" fn on_signal(_sig: libc::c_int) {
    RUNNING.store(false, Ordering::Relaxed);
}

fn install_signal_handlers() {
    let handler = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
    unsafe {
        libc::signal(libc::SIGINT, handler);
        libc::signal(libc::SIGTERM, handler);
        libc::signal(libc::SIGPIPE, handler);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let options = cli.merge_into_options(Options::default());
    logging::init(options.log_level);

    let mut fb = Fb::open(&options.device)
        .with_context(|| format!("binding framebuffer device {}", options.device.display()))?;
    info!("bound {} at {}x{}", options.device.display(), fb.width(), fb.height());

    install_signal_handlers();

    // Keep whatever was on screen so we can put it back on the way out.
    if let Err(err) = fb.save() {
        warn!("screen save failed: {err}");
    }

    let raw = RawTerminal::enter().context("entering raw terminal mode")?;
    print!("\x1b[?25l"); // hide cursor
    io::stdout().flush().ok();

    let mut game = Game::new(options.decorations);
    game.init(&mut fb);

    let tick = Duration::from_millis(options.tick_ms);
    let mut next_tick = Instant::now() + tick;
    while RUNNING.load(Ordering::Relaxed) {
        let now = Instant::now();
        if now >= next_tick {
            game.tick(&mut fb);
            next_tick += tick;
            if next_tick < now {
                // A long stall happened; don't replay the missed ticks.
                next_tick = now + tick;
            }
            continue;
        }
        match input::read_key(next_tick - now) {
            Ok(Some(key)) => {
                if !game.handle_key(&mut fb, key) {
                    break;
                }
            }
            Ok(None) => {}
            Err(err) => {
                error!("stdin read failed: {err}");
                break;
            }
        }
    }

    print!("\x1b[?25h"); // show cursor
    io::stdout().flush().ok();
    drop(raw);

    if let Err(err) = fb.restore() {
        warn!("screen restore failed: {err}");
    }
    Ok(())
}
