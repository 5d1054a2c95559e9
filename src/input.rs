//! Terminal input: raw mode and escape-sequence decoding.
//!
//! The game runs on a Linux console with no windowing system, so key
//! input arrives as raw bytes on stdin. [`RawTerminal`] switches the
//! terminal out of canonical mode (and back on drop), and [`read_key`]
//! waits on stdin with a `select(2)` timeout — the same timeout doubles
//! as the game's tick timer.

use std::io;
use std::mem;
use std::time::Duration;

use log::trace;

/// A decoded key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// A plain byte: printable characters, control codes, ESC itself.
    Char(u8),
    /// Alt chord: ESC followed by one byte.
    Alt(u8),
    ShiftTab,
    Left,
    Right,
    Up,
    Down,
    /// Function keys F1..=F12.
    Function(u8),
    /// A sequence this decoder does not recognize.
    Ignore,
}

/// Guard that holds the terminal in raw non-blocking mode.
///
/// Captures the current `termios` settings and file-status flags on
/// entry; both are restored on drop so the shell gets its terminal back
/// even on abnormal exit paths.
pub struct RawTerminal {
    saved_termios: libc::termios,
    saved_flags: libc::c_int,
}

impl RawTerminal {
    /// Switch stdin to raw, non-echoing, non-blocking mode.
    pub fn enter() -> io::Result<Self> {
        let mut saved: libc::termios = unsafe { mem::zeroed() };
        if unsafe { libc::tcgetattr(libc::STDIN_FILENO, &mut saved) } != 0 {
            return Err(io::Error::last_os_error());
        }

        let mut raw = saved;
        raw.c_lflag &= !(libc::ICANON
            | libc::ECHO
            | libc::ECHOE
            | libc::ECHOK
            | libc::ECHOPRT
            | libc::ECHOKE);
        raw.c_iflag &= !libc::ICRNL;
        raw.c_cc[libc::VTIME] = 0;
        raw.c_cc[libc::VMIN] = 1;
        if unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &raw) } != 0 {
            return Err(io::Error::last_os_error());
        }

        let flags = unsafe { libc::fcntl(libc::STDIN_FILENO, libc::F_GETFL) };
        if flags >= 0 {
            unsafe { libc::fcntl(libc::STDIN_FILENO, libc::F_SETFL, flags | libc::O_NONBLOCK) };
        }

        Ok(Self {
            saved_termios: saved,
            saved_flags: flags,
        })
    }
}

impl Drop for RawTerminal {
    fn drop(&mut self) {
        unsafe {
            libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &self.saved_termios);
            if self.saved_flags >= 0 {
                libc::fcntl(libc::STDIN_FILENO, libc::F_SETFL, self.saved_flags);
            }
        }
    }
}

/// Wait up to `timeout` for a key on stdin.
///
/// Returns `Ok(None)` when the timeout elapses or the wait is
/// interrupted by a signal (the caller's tick handler runs either way).
pub fn read_key(timeout: Duration) -> io::Result<Option<Key>> {
    let mut set: libc::fd_set = unsafe { mem::zeroed() };
    unsafe {
        libc::FD_ZERO(&mut set);
        libc::FD_SET(libc::STDIN_FILENO, &mut set);
    }
    let mut tv = libc::timeval {
        tv_sec: timeout.as_secs() as libc::time_t,
        tv_usec: timeout.subsec_micros() as libc::suseconds_t,
    };

    let ready = unsafe {
        libc::select(
            libc::STDIN_FILENO + 1,
            &mut set,
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            &mut tv,
        )
    };
    if ready == 0 {
        return Ok(None);
    }
    if ready < 0 {
        let err = io::Error::last_os_error();
        return match err.raw_os_error() {
            Some(libc::EINTR) | Some(libc::EINVAL) => Ok(None),
            _ => Err(err),
        };
    }

    let mut buf = [0u8; 16];
    let n = unsafe {
        libc::read(
            libc::STDIN_FILENO,
            buf.as_mut_ptr().cast(),
            buf.len(),
        )
    };
    if n <= 0 {
        return Err(io::Error::last_os_error());
    }

    let key = decode(&buf[..n as usize]);
    trace!("key bytes {:02x?} -> {:?}", &buf[..n as usize], key);
    Ok(Some(key))
}

/// Decode one terminal read into a [`Key`].
///
/// Covers the sequences Linux consoles and common terminal emulators
/// emit: plain bytes, `ESC x` alt chords, `ESC O P..S` and `ESC [ [ A..E`
/// function keys, `ESC [ A..D` arrows, `ESC [ Z` shift-tab, and the
/// `ESC [ 1 7~`-style extended function keys.
pub fn decode(buf: &[u8]) -> Key {
    const ESC: u8 = 0x1B;
    match buf.len() {
        1 => Key::Char(buf[0]),
        2 => {
            if buf[0] != ESC {
                return Key::Ignore;
            }
            Key::Alt(buf[1])
        }
        3 => {
            if buf[0] != ESC {
                return Key::Ignore;
            }
            match (buf[1], buf[2]) {
                (b'O', b'P') => Key::Function(1),
                (b'O', b'Q') => Key::Function(2),
                (b'O', b'R') => Key::Function(3),
                (b'O', b'S') => Key::Function(4),
                (b'[', b'A') => Key::Up,
                (b'[', b'B') => Key::Down,
                (b'[', b'C') => Key::Right,
                (b'[', b'D') => Key::Left,
                (b'[', b'Z') => Key::ShiftTab,
                _ => Key::Ignore,
            }
        }
        4 | 5 => {
            if buf[0] != ESC || buf[1] != b'[' {
                return Key::Ignore;
            }
            match buf[2] {
                b'[' => match buf[3] {
                    b'A' => Key::Function(1),
                    b'B' => Key::Function(2),
                    b'C' => Key::Function(3),
                    b'D' => Key::Function(4),
                    b'E' => Key::Function(5),
                    _ => Key::Ignore,
                },
                b'1' => {
                    if buf.len() == 5 && buf[4] != b'~' {
                        return Key::Ignore;
                    }
                    match buf[3] {
                        b'7' => Key::Function(6),
                        b'8' => Key::Function(7),
                        b'9' => Key::Function(8),
                        _ => Key::Ignore,
                    }
                }
                b'2' => {
                    if buf.len() == 5 && buf[4] != b'~' {
                        return Key::Ignore;
                    }
                    match buf[3] {
                        b'0' => Key::Function(9),
                        b'1' => Key::Function(10),
                        b'3' => Key::Function(11),
                        b'4' => Key::Function(12),
                        _ => Key::Ignore,
                    }
                }
                _ => Key::Ignore,
            }
        }
        _ => Key::Ignore,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn plain_bytes_decode_to_themselves() {
        assert_eq!(decode(b"q"), Key::Char(b'q'));
        assert_eq!(decode(&[0x1B]), Key::Char(0x1B));
        assert_eq!(decode(b" "), Key::Char(b' '));
    }

    #[test]
    fn alt_chords() {
        assert_eq!(decode(&[0x1B, b'x']), Key::Alt(b'x'));
        assert_eq!(decode(&[b'a', b'b']), Key::Ignore);
    }

    #[rstest]
    #[case(b"\x1b[A", Key::Up)]
    #[case(b"\x1b[B", Key::Down)]
    #[case(b"\x1b[C", Key::Right)]
    #[case(b"\x1b[D", Key::Left)]
    #[case(b"\x1b[Z", Key::ShiftTab)]
    fn arrows_and_shift_tab(#[case] bytes: &[u8], #[case] expected: Key) {
        assert_eq!(decode(bytes), expected);
    }

    #[rstest]
    #[case(b"\x1bOP", 1)]
    #[case(b"\x1bOQ", 2)]
    #[case(b"\x1bOR", 3)]
    #[case(b"\x1bOS", 4)]
    #[case(b"\x1b[[A", 1)]
    #[case(b"\x1b[[E", 5)]
    #[case(b"\x1b[17~", 6)]
    #[case(b"\x1b[19~", 8)]
    #[case(b"\x1b[20~", 9)]
    #[case(b"\x1b[24~", 12)]
    fn function_keys(#[case] bytes: &[u8], #[case] f: u8) {
        assert_eq!(decode(bytes), Key::Function(f));
    }

    #[test]
    fn unknown_sequences_are_ignored() {
        assert_eq!(decode(b"\x1b[Q"), Key::Ignore);
        assert_eq!(decode(b"\x1b[25~"), Key::Ignore);
        assert_eq!(decode(b"\x1b[17x"), Key::Ignore);
        assert_eq!(decode(b"\x1bXY"), Key::Ignore);
        assert_eq!(decode(b"\x1b[200~abc"), Key::Ignore);
    }
}
