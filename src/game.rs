//! The falling-block game built on the framebuffer engine.
//!
//! Pure consumer of the [`Fb`] drawing API: board state, piece movement,
//! scoring and the side panels (next-piece preview, score box, analog
//! clock, help text and the one-time decorative panels). All timing is
//! driven from the outside through [`Game::tick`] at the main loop's
//! 40 ms cadence.

use chrono::Timelike;
use log::debug;
use rand::Rng;

use crate::fb::{Color, Fb, FontFamily};
use crate::input::Key;

/// Board height in cells.
pub const BOARD_ROWS: i32 = 20;
/// Board width in cells.
pub const BOARD_COLS: i32 = 10;
/// Slowest gravity period, in ticks; also the number of speed grades.
pub const MAX_GRADE: i32 = 25;

/// The seven tetromino shapes as 4x4 bit masks (row-major, bit 15 the
/// top-left cell's neighbor — see [`shape_point`]).
const SHAPES: [u16; 7] = [0x4444, 0x4460, 0x2260, 0x0C60, 0x06C0, 0x0660, 0x04E0];

/// Channel intensities pieces are colored from.
const COLOR_LEVELS: [u32; 4] = [0x33, 0x66, 0x99, 0xCC];

const HELP: [&str; 10] = [
    "      HELP    ",
    "--------------",
    "Start: [ F1",
    "Pause: ] F2",
    "Trans: 8 w i Up",
    " Left: 4 a j Left",
    "Right: 6 d l Right",
    " Down: 5 s k Down",
    " Fall: 0 Space",
    " Quit: q Q ESC",
];

/// Test a cell of a 4x4 shape mask.
fn shape_point(shape: u16, x: i32, y: i32) -> bool {
    shape as u32 & (1 << (16 - (x + 1 + y * 4))) != 0
}

/// Rotate a shape mask a quarter turn.
fn rotate_shape(shape: u16) -> u16 {
    let mut out = 0u16;
    for y in 0..4 {
        for x in 0..4 {
            if shape_point(shape, 4 - y - 1, x) {
                out |= 1 << (16 - (x + 1 + y * 4));
            }
        }
    }
    out
}

/// Game state and the render routine over it.
pub struct Game {
    /// Falling piece position, in cells; y may be negative while a piece
    /// enters from above the board.
    piece_x: i32,
    piece_y: i32,
    score: i32,
    lines: i32,
    occupied: [[bool; BOARD_COLS as usize]; BOARD_ROWS as usize],
    colors: [[Color; BOARD_COLS as usize]; BOARD_ROWS as usize],
    cur_shape: u16,
    next_shape: u16,
    cur_color: Color,
    next_color: Color,
    begun: bool,
    over: bool,
    paused: bool,
    /// Gravity period in ticks; shrinks as the score grows.
    grade_period: i32,
    grade_tick: i32,
    /// Banner animation state for the pause/over overlay.
    banner_color: Color,
    banner_offset: i32,
    banner_step: i32,
    /// Draw the help panel and decorations on the next render.
    panels_pending: bool,
    decorations: bool,
}

impl Game {
    pub fn new(decorations: bool) -> Self {
        Self {
            piece_x: 0,
            piece_y: 0,
            score: 0,
            lines: 0,
            occupied: [[false; BOARD_COLS as usize]; BOARD_ROWS as usize],
            colors: [[Color(0); BOARD_COLS as usize]; BOARD_ROWS as usize],
            cur_shape: 0,
            next_shape: 0,
            cur_color: Color(0),
            next_color: Color(0),
            begun: false,
            over: false,
            paused: false,
            grade_period: MAX_GRADE,
            grade_tick: 0,
            banner_color: Color(0),
            banner_offset: 0,
            banner_step: 1,
            panels_pending: true,
            decorations,
        }
    }

    fn rand_color(fb: &Fb) -> Color {
        let mut rng = rand::rng();
        fb.color(
            COLOR_LEVELS[rng.random_range(0..COLOR_LEVELS.len())],
            COLOR_LEVELS[rng.random_range(0..COLOR_LEVELS.len())],
            COLOR_LEVELS[rng.random_range(0..COLOR_LEVELS.len())],
        )
    }

    fn rand_shape() -> u16 {
        SHAPES[rand::rng().random_range(0..SHAPES.len())]
    }

    fn reset(&mut self, fb: &Fb) {
        self.begun = false;
        self.over = false;
        self.paused = false;
        self.grade_period = MAX_GRADE;
        self.grade_tick = 0;
        self.piece_x = 0;
        self.piece_y = 0;
        self.cur_shape = 0;
        self.cur_color = Color(0);
        if self.next_shape == 0 {
            self.next_shape = Self::rand_shape();
        }
        if self.next_color == Color(0) {
            self.next_color = Self::rand_color(fb);
        }
        self.score = 0;
        self.lines = 0;
        self.occupied = [[false; BOARD_COLS as usize]; BOARD_ROWS as usize];
        self.colors = [[Color(0); BOARD_COLS as usize]; BOARD_ROWS as usize];
        self.banner_color = Color(0);
        self.banner_offset = 0;
        self.banner_step = 1;
    }

    /// First render after the engine is up.
    pub fn init(&mut self, fb: &mut Fb) {
        self.reset(fb);
        self.render(fb);
        fb.sync();
    }

    /// One 40 ms tick: gravity when due, repaint, flip.
    pub fn tick(&mut self, fb: &mut Fb) {
        if self.begun && (self.over || self.paused) {
            // Keep the banner animation and clock moving.
            self.render(fb);
        } else {
            self.grade_tick += 1;
            if self.grade_tick >= self.grade_period {
                self.grade_tick = 0;
                if !self.begun || self.paused || self.over {
                    self.render(fb);
                } else {
                    self.step_down(fb);
                }
            }
        }
        fb.sync();
    }

    /// Dispatch one key. Returns false when the player quits.
    pub fn handle_key(&mut self, fb: &mut Fb, key: Key) -> bool {
        match key {
            Key::Char(0x1B) | Key::Char(b'q') | Key::Char(b'Q') => return false,
            Key::Function(1) | Key::Char(b'[') => self.start(fb),
            Key::Function(2) | Key::Char(b']') => self.toggle_pause(fb),
            Key::Left | Key::Char(b'4' | b'a' | b'A' | b'j' | b'J') => self.shift(fb, -1),
            Key::Right | Key::Char(b'6' | b'd' | b'D' | b'l' | b'L') => self.shift(fb, 1),
            Key::Down | Key::Char(b'5' | b's' | b'S' | b'k' | b'K') => self.soft_drop(fb),
            Key::Up | Key::Char(b'8' | b'w' | b'W' | b'i' | b'I') => self.transpose(fb),
            Key::Char(b' ' | b'0') => self.hard_drop(fb),
            _ => {}
        }
        true
    }

    fn start(&mut self, fb: &mut Fb) {
        if self.begun {
            self.reset(fb);
        }
        self.begun = true;
        self.spawn_next(fb);
        self.render(fb);
    }

    fn toggle_pause(&mut self, fb: &mut Fb) {
        if !self.begun {
            return;
        }
        self.paused = !self.paused;
        self.grade_tick = 0;
        self.banner_color = Color(0);
        self.banner_offset = 0;
        self.banner_step = 1;
        self.render(fb);
        fb.sync();
    }

    fn playing(&self) -> bool {
        self.begun && !self.paused && !self.over
    }

    fn shift(&mut self, fb: &mut Fb, dx: i32) {
        if !self.playing() {
            return;
        }
        if self.movable(self.cur_shape, self.piece_x + dx, self.piece_y) {
            self.piece_x += dx;
            self.render(fb);
            fb.sync();
        }
    }

    fn transpose(&mut self, fb: &mut Fb) {
        if !self.playing() {
            return;
        }
        let rotated = rotate_shape(self.cur_shape);
        if self.movable(rotated, self.piece_x, self.piece_y) {
            self.cur_shape = rotated;
            self.render(fb);
            fb.sync();
        }
    }

    fn soft_drop(&mut self, fb: &mut Fb) {
        if !self.playing() {
            return;
        }
        self.step_down(fb);
        self.grade_tick = 0;
    }

    fn step_down(&mut self, fb: &mut Fb) {
        if self.movable(self.cur_shape, self.piece_x, self.piece_y + 1) {
            self.piece_y += 1;
        } else {
            self.lock_piece();
            self.spawn_next(fb);
        }
        self.render(fb);
        fb.sync();
    }

    fn hard_drop(&mut self, fb: &mut Fb) {
        if !self.playing() {
            return;
        }
        while self.movable(self.cur_shape, self.piece_x, self.piece_y + 1) {
            self.piece_y += 1;
        }
        self.lock_piece();
        self.spawn_next(fb);
        self.render(fb);
        fb.sync();
    }

    /// Can `shape` sit at board position (x, y)? Cells above the board
    /// (negative y) are always free.
    fn movable(&self, shape: u16, x: i32, y: i32) -> bool {
        for cy in 0..4 {
            for cx in 0..4 {
                if !shape_point(shape, cx, cy) {
                    continue;
                }
                let bx = x + cx;
                let by = y + cy;
                if bx < 0 || bx >= BOARD_COLS || by >= BOARD_ROWS {
                    return false;
                }
                if by >= 0 && self.occupied[by as usize][bx as usize] {
                    return false;
                }
            }
        }
        true
    }

    /// Capture the falling piece into the board and clear any rows it
    /// completed, sliding everything above down.
    fn lock_piece(&mut self) {
        let mut full_rows: Vec<i32> = Vec::new();
        for cy in 0..4 {
            let by = self.piece_y + cy;
            if by < 0 {
                continue;
            }
            for cx in 0..4 {
                if shape_point(self.cur_shape, cx, cy) {
                    self.occupied[by as usize][(self.piece_x + cx) as usize] = true;
                    self.colors[by as usize][(self.piece_x + cx) as usize] = self.cur_color;
                }
            }
            if (0..BOARD_COLS).all(|x| self.occupied[by as usize][x as usize]) {
                full_rows.push(by);
            }
        }
        if full_rows.is_empty() {
            return;
        }

        let cleared = full_rows.len() as i32;
        self.score += cleared * 2 - 1;
        self.lines += cleared;
        debug!("cleared rows {full_rows:?}, score {}", self.score);

        // Walk bottom-up, widening the slide distance at every cleared
        // row encountered, then blank what remains at the top.
        let mut idx = full_rows.len() as i32 - 1;
        let mut y = full_rows[idx as usize];
        idx -= 1;
        let mut size = 1;
        loop {
            while idx >= 0 && y - size == full_rows[idx as usize] {
                size += 1;
                idx -= 1;
            }
            for x in 0..BOARD_COLS as usize {
                self.occupied[y as usize][x] = self.occupied[(y - size) as usize][x];
                self.colors[y as usize][x] = self.colors[(y - size) as usize][x];
            }
            y -= 1;
            if y - size < 0 {
                break;
            }
        }
        while y >= 0 {
            for x in 0..BOARD_COLS as usize {
                self.occupied[y as usize][x] = false;
            }
            y -= 1;
        }
    }

    /// Promote the preview piece to falling, or end the game when it has
    /// no room to enter.
    fn spawn_next(&mut self, fb: &Fb) {
        if self.over {
            return;
        }
        // A piece that locked above the top ends the game outright.
        let mut blocked = self.piece_y < 0;

        if !blocked {
            let mut max_y = 0;
            for cy in (0..4).rev() {
                if (0..4).any(|cx| shape_point(self.next_shape, cx, cy)) {
                    max_y = max_y.max(cy);
                    break;
                }
            }
            self.piece_x = (BOARD_COLS - 4) / 2;
            self.piece_y = -max_y - 1;
            blocked = !self.movable(self.next_shape, self.piece_x, self.piece_y + 1);
        }

        if blocked {
            self.cur_shape = 0;
            self.paused = false;
            self.over = true;
            self.banner_color = Color(0);
            self.banner_offset = 0;
            self.banner_step = 1;
            return;
        }

        self.cur_shape = self.next_shape;
        self.next_shape = Self::rand_shape();
        self.cur_color = self.next_color;
        self.next_color = Self::rand_color(fb);

        self.grade_period = (MAX_GRADE - self.score / MAX_GRADE).max(1);
        self.grade_tick = 0;
    }

    /// One beveled cell: lighter top/left rim, darker bottom/right rim.
    fn draw_cell(fb: &mut Fb, x: i32, y: i32, side: i32, color: Color) {
        let light = fb.color_add(color, 0x33);
        let dark = fb.color_add(color, -0x33);
        fb.fill_rect(x, y, 1, side, light);
        fb.fill_rect(x, y, side, 1, light);
        fb.fill_rect(x + side - 1, y, 1, side, dark);
        fb.fill_rect(x, y + side - 1, side, 1, dark);
        fb.fill_rect(x + 1, y + 1, side - 2, side - 2, color);
    }

    fn render(&mut self, fb: &mut Fb) {
        let side = fb.height() / (BOARD_ROWS + 2);
        let origin_x = (fb.width() - (BOARD_COLS + 5) * side) / 2;
        let origin_y = (fb.height() - BOARD_ROWS * side) / 2;
        let panel_x = origin_x + (BOARD_COLS + 1) * side;
        let border = fb.color(0x66, 0x66, 0x66);
        let white = fb.color(0xFF, 0xFF, 0xFF);

        fb.draw_rect(
            origin_x - 3,
            origin_y - 3,
            BOARD_COLS * side + 6,
            BOARD_ROWS * side + 6,
            border,
            1,
        );

        for y in 0..BOARD_ROWS {
            for x in 0..BOARD_COLS {
                let px = origin_x + x * side;
                let py = origin_y + y * side;
                if self.occupied[y as usize][x as usize] {
                    Self::draw_cell(fb, px, py, side, self.colors[y as usize][x as usize]);
                } else if x >= self.piece_x
                    && x <= self.piece_x + 3
                    && y >= self.piece_y
                    && y <= self.piece_y + 3
                    && shape_point(self.cur_shape, x - self.piece_x, y - self.piece_y)
                {
                    Self::draw_cell(fb, px, py, side, self.cur_color);
                } else {
                    fb.fill_rect(px, py, side, side, white);
                }
            }
        }

        // Next-piece preview.
        let mut panel_y = origin_y;
        fb.draw_rect(panel_x - 3, panel_y - 3, 4 * side + 6, 4 * side + 6, border, 1);
        for y in 0..4 {
            for x in 0..4 {
                let px = panel_x + x * side;
                let py = panel_y + y * side;
                if shape_point(self.next_shape, x, y) {
                    Self::draw_cell(fb, px, py, side, self.next_color);
                } else {
                    fb.fill_rect(px, py, side, side, white);
                }
            }
        }
        panel_y += 4 * side;

        // Score / lines / grade box.
        fb.set_font(FontFamily::Font12x22);
        {
            let fh = fb.font_height();
            let fw = fb.font_width();
            let label = fb.color(0xCC, 0xCC, 0xCC);
            panel_y += side;
            fb.draw_rect(
                panel_x - 3,
                panel_y - 3,
                4 * side + 6,
                fh * 4 + 6,
                border,
                1,
            );

            panel_y += (fh as f64 * 0.2) as i32;
            fb.fill_rect(panel_x, panel_y, 4 * side, fh, Color(0));
            fb.text(panel_x + 3, panel_y, "SCORE:", label, false, 1);
            let value = fb.color(0xFF, 0x66, 0);
            fb.text(panel_x + fw * 7, panel_y, &self.score.to_string(), value, true, 1);

            panel_y += (fh as f64 * 1.2) as i32;
            fb.fill_rect(panel_x - 3, panel_y - 1, 4 * side + 6, 1, border);
            panel_y += (fh as f64 * 0.2) as i32;
            fb.fill_rect(panel_x, panel_y, 4 * side, fh - 1, Color(0));
            fb.text(panel_x + 3, panel_y, " LINE:", label, false, 1);
            let value = fb.color(0xFF, 0x33, 0);
            fb.text(panel_x + fw * 7, panel_y, &self.lines.to_string(), value, true, 1);

            panel_y += (fh as f64 * 1.2) as i32;
            fb.fill_rect(panel_x - 3, panel_y - 1, 4 * side + 6, 1, border);
            panel_y += (fh as f64 * 0.2) as i32;
            fb.fill_rect(panel_x, panel_y, 4 * side, fh - 1, Color(0));
            fb.text(panel_x + 3, panel_y, "GRADE:", label, false, 1);
            let grade = (MAX_GRADE + 1 - self.grade_period).to_string();
            fb.text(panel_x + fw * 7, panel_y, &grade, value, true, 1);

            panel_y += (fh as f64 * 1.2) as i32;
        }

        if self.panels_pending {
            self.panels_pending = false;
            self.draw_help(fb, side, origin_y, panel_x, panel_y);
            if self.decorations {
                self.draw_decorations(fb, side, origin_x, origin_y);
            }
        }

        self.draw_clock(fb, side, origin_y, panel_x);
        self.draw_banner(fb, side, origin_x, origin_y);
    }

    fn draw_help(&self, fb: &mut Fb, side: i32, origin_y: i32, panel_x: i32, panel_y: i32) {
        fb.set_font(FontFamily::Font8x14);
        let border = fb.color(0x66, 0x66, 0x66);
        let gray = fb.color(0x99, 0x99, 0x99);
        let fh = fb.font_height() + 1;
        let fw = fb.font_width();

        let longest = HELP.iter().map(|s| s.len()).max().unwrap_or(0) as i32;
        let panel_w = longest * fw;
        let panel_h = HELP.len() as i32 * fh;
        let x = panel_x + 4 * side - panel_w;
        let clock_top = origin_y + (BOARD_ROWS - 5) * side;
        let y = panel_y + (clock_top - panel_y - panel_h) / 2;

        fb.draw_rect(x - 3, y - 3, panel_w + 6, panel_h + 6, border, 1);
        for (i, line) in HELP.iter().enumerate() {
            fb.text(x, y + i as i32 * fh, line, gray, false, 1);
        }
    }

    /// Decorative side panels: a Mandelbrot rendering mirrored on both
    /// margins and color gradients along the edges. Drawn once.
    fn draw_decorations(&self, fb: &mut Fb, side: i32, origin_x: i32, origin_y: i32) {
        let width = fb.width();
        let height = fb.height();

        // Mandelbrot margins.
        let mandel_w = origin_x - origin_y / 2;
        if mandel_w > 0 {
            let mirror_x = width - mandel_w;
            let (real_min, real_max) = (0.32f32, 0.50f32);
            let (imag_min, imag_max) = (-0.45f32, 0.05f32);
            let scale_re = (real_max - real_min) / mandel_w as f32;
            let scale_im = (imag_max - imag_min) / height as f32;
            for y in 0..height {
                let ci = imag_min + y as f32 * scale_im;
                let r = ((y + 1) * 255 / height) & 0xFF;
                for x in 0..mandel_w {
                    let cr = real_min + x as f32 * scale_re;
                    let g = ((x + 1) * 255 / mandel_w) & 0xFF;
                    let b = 0xFF - mandel_count(cr, ci);
                    let color = fb.color(b as u32, g as u32, r as u32);
                    fb.draw_point(x, y, color);
                    fb.draw_point(mirror_x + mandel_w - 1 - x, y, color);
                }
            }
        }

        // Vertical gradients, red-to-green on the left and a channel
        // rotation of it on the right.
        let grad_w = origin_y / 2;
        if grad_w > 0 && origin_x - origin_y >= 0 && width - origin_x - 1 + grad_w + grad_w <= width
        {
            let (mut r, mut g, b) = (255.0f64, 0.0f64, 0.0f64);
            let rr = -255.0 / height as f64;
            let gg = 255.0 / height as f64;
            for i in 0..height {
                let left = fb.color(r as u32, g as u32, b as u32);
                let right = fb.color(g as u32, b as u32, r as u32);
                fb.fill_rect(origin_x - origin_y, i, grad_w, 1, left);
                fb.fill_rect(width - origin_x - 1 + grad_w, i, grad_w, 1, right);
                r += rr;
                g += gg;
            }
        }

        // Horizontal gradients along the top and bottom edges.
        let grad_h = origin_y / 2;
        let span = 2 * grad_h + (BOARD_COLS + 5) * side;
        if grad_h > 0 && origin_x - grad_h >= 0 && origin_x - grad_h + span <= width {
            let (mut r, g, mut b) = (255.0f64, 0.0f64, 0.0f64);
            let rr = -255.0 / span as f64;
            let bb = 255.0 / span as f64;
            for i in 0..span {
                let top = fb.color(r as u32, g as u32, b as u32);
                let bottom = fb.color(r as u32, b as u32, g as u32);
                fb.fill_rect(origin_x - grad_h + i, 0, 1, grad_h, top);
                fb.fill_rect(origin_x - grad_h + span - 1 - i, height - grad_h, 1, grad_h, bottom);
                r += rr;
                b += bb;
            }
        }
    }

    /// Digital readout plus an analog face with hour/minute/second hands.
    fn draw_clock(&self, fb: &mut Fb, side: i32, origin_y: i32, panel_x: i32) {
        fb.set_font(FontFamily::Font12x22);
        let border = fb.color(0x66, 0x66, 0x66);
        let white = fb.color(0xFF, 0xFF, 0xFF);
        let panel_y = origin_y + (BOARD_ROWS - 5) * side;

        fb.draw_rect(panel_x - 3, panel_y - 3, 4 * side + 6, 5 * side + 6, border, 1);

        let now = chrono::Local::now();
        let (hour, minute, second) = (now.hour() as f64, now.minute() as f64, now.second() as f64);

        {
            let digits = format!("{:02}:{:02}:{:02}", now.hour(), now.minute(), now.second());
            let x = panel_x + (4 * side - fb.font_width() * 8) / 2;
            let y = panel_y + (side - fb.font_height()) / 2;
            fb.fill_rect(panel_x, panel_y, 4 * side, side, Color(0));
            fb.text(x, y, &digits, white, false, 1);
            fb.draw_rect(panel_x, panel_y, 4 * side, side + 1, white, 1);
        }

        let radius = side * 2;
        let cx = panel_x + 2 * side;
        let cy = panel_y + 3 * side;

        fb.fill_circle(cx, cy, radius - 1, Color(0));
        fb.draw_circle(cx, cy, radius, white, 1);

        // Dial marks, heavier at the quarter hours.
        for i in 0..12 {
            let weight = if i % 3 == 0 { 5 } else { 1 };
            let angle = (i * 30) as f64 * std::f64::consts::PI / 180.0;
            let x1 = ((radius - weight) as f64 * angle.cos()) as i32 + cx;
            let y1 = (-(radius - weight) as f64 * angle.sin()) as i32 + cy;
            let x2 = (radius as f64 * 0.85 * angle.cos()) as i32 + cx;
            let y2 = (-(radius as f64) * 0.85 * angle.sin()) as i32 + cy;
            fb.draw_line(x2, y2, x1, y1, white, weight);
        }

        let deg = std::f64::consts::PI / 180.0;
        {
            let angle = (90.0 - hour * 30.0 - minute * 0.5 - second / 120.0) * deg;
            let x = (radius as f64 * 0.35 * angle.cos()) as i32 + cx;
            let y = (-(radius as f64) * 0.35 * angle.sin()) as i32 + cy;
            fb.draw_line(cx, cy, x, y, fb.color(0, 0, 0xFF), 5);
        }
        {
            let angle = (90.0 - minute * 6.0 - second / 10.0) * deg;
            let x = (radius as f64 * 0.6 * angle.cos()) as i32 + cx;
            let y = (-(radius as f64) * 0.55 * angle.sin()) as i32 + cy;
            fb.draw_line(cx, cy, x, y, fb.color(0, 0xFF, 0), 3);
        }
        {
            let angle = (90.0 - second * 6.0) * deg;
            let x = (radius as f64 * 0.75 * angle.cos()) as i32 + cx;
            let y = (-(radius as f64) * 0.75 * angle.sin()) as i32 + cy;
            fb.draw_line(cx, cy, x, y, fb.color(0xFF, 0, 0), 1);
        }
    }

    /// Bouncing OVER!/PAUSE overlay across the board.
    fn draw_banner(&mut self, fb: &mut Fb, side: i32, origin_x: i32, origin_y: i32) {
        fb.set_font(FontFamily::Font18x32);
        if !(self.begun && (self.over || self.paused)) {
            return;
        }
        let label = if self.over { "OVER!" } else { "PAUSE" };
        let fw = fb.font_width();
        let fh = fb.font_height();
        let scale = ((BOARD_COLS * side) / (fw * label.len() as i32)).max(1);
        let offset = (BOARD_ROWS * side - fh * scale) / 2;
        let step = (offset as f64 / 1.5 / MAX_GRADE as f64) as i32;

        if self.banner_offset == 0 {
            self.banner_color = Self::rand_color(fb);
        }

        let x = origin_x + (BOARD_COLS * side - fw * scale * label.len() as i32) / 2;
        let y = origin_y + offset + self.banner_offset;
        fb.text(x - 1, y - 1, label, fb.color_add(self.banner_color, 0x33), true, scale);
        fb.text(x + 1, y + 1, label, fb.color_add(self.banner_color, -0x33), true, scale);
        fb.text(x, y, label, self.banner_color, true, scale);

        self.banner_offset += step * self.banner_step;
        if self.banner_step > 0 {
            if self.banner_offset > offset {
                self.banner_step = -1;
                self.banner_offset += step * self.banner_step;
            }
        } else if self.banner_offset < -offset {
            self.banner_step = 1;
            self.banner_offset += step * self.banner_step;
        }
    }
}

/// Mandelbrot escape count shaped into a byte-ish range, as the original
/// decoration computed it.
fn mandel_count(cr: f32, ci: f32) -> i32 {
    let mut zr = 0.0f32;
    let mut zi = 0.0f32;
    let mut count = 0;
    loop {
        let tmp = zr * zr - zi * zi + cr;
        zi = 2.0 * zr * zi + ci;
        zr = tmp;
        count += 1;
        if zr * zr + zi * zi >= 4.0 || count >= 291 {
            break;
        }
    }
    count - 0x24
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_masks_have_four_cells() {
        for shape in SHAPES {
            let count: i32 = (0..4)
                .map(|y| (0..4).filter(|&x| shape_point(shape, x, y)).count() as i32)
                .sum();
            assert_eq!(count, 4, "shape {shape:#06x}");
        }
    }

    #[test]
    fn four_rotations_are_identity() {
        for shape in SHAPES {
            let mut s = shape;
            for _ in 0..4 {
                s = rotate_shape(s);
            }
            assert_eq!(s, shape, "shape {shape:#06x}");
        }
    }

    #[test]
    fn square_is_rotation_invariant() {
        // 0x0660 is the 2x2 square.
        assert_eq!(rotate_shape(0x0660), 0x0660);
    }

    fn game() -> Game {
        Game::new(false)
    }

    #[test]
    fn movable_respects_walls_and_floor() {
        let mut g = game();
        g.cur_shape = 0x0660; // square occupying columns 1-2, rows 1-2
        assert!(g.movable(0x0660, 0, 0));
        assert!(!g.movable(0x0660, -2, 0)); // through the left wall
        assert!(g.movable(0x0660, -1, 0)); // empty first column tolerated
        assert!(!g.movable(0x0660, BOARD_COLS - 2, 0)); // right wall
        assert!(g.movable(0x0660, 0, BOARD_ROWS - 3)); // resting on floor
        assert!(!g.movable(0x0660, 0, BOARD_ROWS - 2)); // through the floor
    }

    #[test]
    fn movable_sees_occupied_cells() {
        let mut g = game();
        g.occupied[5][2] = true;
        assert!(!g.movable(0x0660, 1, 3)); // square's (1,2) cell lands on (2,5)
        assert!(g.movable(0x0660, 3, 3));
    }

    #[test]
    fn movable_allows_cells_above_the_board() {
        let g = game();
        assert!(g.movable(0x0660, 3, -2));
    }

    #[test]
    fn lock_piece_clears_full_row_and_scores() {
        let mut g = game();
        // Bottom row full except the two columns the square will fill.
        for x in 0..BOARD_COLS as usize {
            g.occupied[BOARD_ROWS as usize - 1][x] = x != 4 && x != 5;
        }
        // Leave a marker in the second-to-bottom row.
        g.occupied[BOARD_ROWS as usize - 2][0] = true;

        g.cur_shape = 0x0660; // square cells at local (1..=2, 1..=2)
        g.cur_color = Color(7);
        g.piece_x = 3;
        g.piece_y = BOARD_ROWS - 3; // cells land on rows 18 and 19
        g.lock_piece();

        assert_eq!(g.score, 1); // one row: 2*1 - 1
        assert_eq!(g.lines, 1);
        // The marker slid down one row, and the square's upper half came
        // along with it.
        assert!(g.occupied[BOARD_ROWS as usize - 1][0]);
        assert!(g.occupied[BOARD_ROWS as usize - 1][4]);
        assert!(g.occupied[BOARD_ROWS as usize - 1][5]);
        // Top row is clear.
        assert!((0..BOARD_COLS as usize).all(|x| !g.occupied[0][x]));
    }

    #[test]
    fn lock_piece_scores_double_clear() {
        let mut g = game();
        for y in [BOARD_ROWS as usize - 1, BOARD_ROWS as usize - 2] {
            for x in 0..BOARD_COLS as usize {
                g.occupied[y][x] = x != 4 && x != 5;
            }
        }
        g.cur_shape = 0x0660;
        g.cur_color = Color(7);
        g.piece_x = 3;
        g.piece_y = BOARD_ROWS - 3;
        g.lock_piece();

        assert_eq!(g.score, 3); // 2*2 - 1
        assert_eq!(g.lines, 2);
        // Both rows emptied; nothing was above them to slide down.
        for y in [BOARD_ROWS as usize - 1, BOARD_ROWS as usize - 2] {
            assert!((0..BOARD_COLS as usize).all(|x| !g.occupied[y][x]));
        }
    }

    #[test]
    fn grade_period_floors_at_one() {
        assert_eq!((MAX_GRADE - 0 / MAX_GRADE).max(1), 25);
        assert_eq!((MAX_GRADE - 700 / MAX_GRADE).max(1), 1);
    }

    #[test]
    fn mandel_count_is_bounded() {
        // Interior points run to the iteration cap, exterior ones
        // escape immediately.
        assert_eq!(mandel_count(0.0, 0.0), 291 - 0x24);
        assert!(mandel_count(2.0, 2.0) < 0);
    }
}
