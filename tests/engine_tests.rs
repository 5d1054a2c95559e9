//! End-to-end engine behavior over an in-memory back buffer.
//!
//! Everything here runs headless: the canvas, pixel formats and fonts
//! need no device node. Device binding itself is covered by the unit
//! tests in `fb::device` (failure paths) since a real `/dev/fb0` is not
//! available on build machines.

use fbtris::fb::{Canvas, Color, FontFamily, FontStore, PixelFormat};

fn canvas_100() -> Canvas {
    Canvas::new(100, 100, PixelFormat::argb8888())
}

#[test]
fn fill_rect_end_to_end() {
    let fmt = PixelFormat::argb8888();
    let mut canvas = canvas_100();
    // A zeroed buffer reads back as 0x00000000 everywhere.
    canvas.fill_rect(0, 0, 100, 100, Color(0));
    canvas.fill_rect(10, 10, 20, 20, Color(0xFFFFFFFF));
    assert_eq!(canvas.pixel(15, 15), Color(0xFFFFFFFF));
    assert_eq!(canvas.pixel(5, 5), Color(0x00000000));
    // The packed white equals the format's own idea of white.
    assert_eq!(fmt.pack(0xFF, 0xFF, 0xFF), Color(0xFFFFFFFF));
}

#[test]
fn circle_stroke_end_to_end() {
    let mut canvas = canvas_100();
    let white = Color(0xFFFFFFFF);
    canvas.draw_circle(50, 50, 30, white, 1);
    // On the rim at distance exactly 30 along the x axis.
    assert_eq!(canvas.pixel(20, 50), white);
    // Distance 10 from the center: untouched interior.
    assert_eq!(canvas.pixel(40, 50), Color(0));
}

#[test]
fn fill_rect_touches_nothing_outside() {
    let mut canvas = canvas_100();
    let green = PixelFormat::argb8888().pack(0, 0xFF, 0);
    canvas.fill_rect(30, 40, 25, 10, green);
    let mut inside = 0;
    for y in 0..100 {
        for x in 0..100 {
            let expected_inside = (30..55).contains(&x) && (40..50).contains(&y);
            let is_green = canvas.pixel(x, y) == green;
            assert_eq!(is_green, expected_inside, "pixel ({x},{y})");
            if is_green {
                inside += 1;
            }
        }
    }
    assert_eq!(inside, 25 * 10);
}

#[test]
fn strokes_are_subsets_of_fills() {
    // Stroke weight equal to half the minor dimension must keep the
    // stroke's pixel set inside the corresponding fill's.
    let white = Color(0xFFFFFFFF);

    let cases: Vec<(Canvas, Canvas)> = vec![
        {
            let mut fill = canvas_100();
            fill.fill_rect(10, 10, 60, 30, white);
            let mut stroke = canvas_100();
            stroke.draw_rect(10, 10, 60, 30, white, 15);
            (fill, stroke)
        },
        {
            let mut fill = canvas_100();
            fill.fill_circle(50, 50, 24, white);
            let mut stroke = canvas_100();
            stroke.draw_circle(50, 50, 24, white, 12);
            (fill, stroke)
        },
        {
            let mut fill = canvas_100();
            fill.fill_oval(10, 20, 70, 40, white);
            let mut stroke = canvas_100();
            stroke.draw_oval(10, 20, 70, 40, white, 10);
            (fill, stroke)
        },
    ];

    for (i, (fill, stroke)) in cases.iter().enumerate() {
        for y in 0..100 {
            for x in 0..100 {
                if stroke.pixel(x, y) == white {
                    assert_eq!(
                        fill.pixel(x, y),
                        white,
                        "case {i}: stroke pixel ({x},{y}) outside fill"
                    );
                }
            }
        }
    }
}

#[test]
fn text_bounds_behavior_with_real_fonts() {
    let store = FontStore::load();
    let font = store.get(FontFamily::Font12x22);
    let white = Color(0xFFFFFFFF);

    // Fully outside: nothing drawn, no panic.
    let mut canvas = canvas_100();
    font.draw_text(&mut canvas, 200, 200, "OUT", white, false, 1);
    assert!(canvas.data().iter().all(|&b| b == 0));

    // Starts inside, last character would cross: stops before it.
    let mut canvas = canvas_100();
    // 100 / 12 = 8 full cells; the ninth would cross the right edge.
    font.draw_text(&mut canvas, 0, 0, "WWWWWWWWW", white, false, 1);
    for x in 96..100 {
        for y in 0..100 {
            assert_eq!(canvas.pixel(x, y), Color(0), "({x},{y}) past the bound");
        }
    }
    // But the leading characters did render something.
    assert!(canvas.data().iter().any(|&b| b != 0));
}

#[test]
fn engine_drawing_is_format_agnostic() {
    // The same drawing sequence lands correctly on a 16-bit canvas.
    let fmt = PixelFormat::rgb565();
    let mut canvas = Canvas::new(64, 64, fmt);
    let red = fmt.pack(0x1F, 0, 0);
    canvas.fill_rect(8, 8, 16, 16, red);
    canvas.draw_point(40, 40, red);
    assert_eq!(canvas.pixel(10, 10), red);
    assert_eq!(canvas.pixel(40, 40), red);
    assert_eq!(canvas.pixel(41, 40), Color(0));
    assert_eq!(canvas.stride(), 64 * 2);
}

#[test]
fn bevel_colors_derive_from_base() {
    let fmt = PixelFormat::argb8888();
    let base = fmt.pack(0x66, 0x99, 0x33);
    let light = fmt.add(base, 0x33);
    let dark = fmt.add(base, -0x33);
    assert_eq!(light, fmt.pack(0x99, 0xCC, 0x66));
    assert_eq!(dark, fmt.pack(0x33, 0x66, 0x00));
}

#[test]
fn glyph_scale_doubles_coverage_extent() {
    let store = FontStore::load();
    let font = store.get(FontFamily::Font8x14);
    let white = Color(0xFFFFFFFF);

    let mut small = canvas_100();
    font.draw_text(&mut small, 0, 0, "#", white, false, 1);
    let mut big = canvas_100();
    font.draw_text(&mut big, 0, 0, "#", white, false, 2);

    let count = |c: &Canvas| {
        let mut n = 0;
        for y in 0..100 {
            for x in 0..100 {
                if c.pixel(x, y) == white {
                    n += 1;
                }
            }
        }
        n
    };
    let small_count = count(&small);
    assert!(small_count > 0);
    // Nearest-neighbor replication: exactly four destination pixels per
    // source pixel at scale 2.
    assert_eq!(count(&big), small_count * 4);
}
