use std::sync::Arc;

use haloframe::{SourceImage, Theme, compose};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn digest_u64(bytes: &[u8]) -> u64 {
    let mut state = 0x9E37_79B9_7F4A_7C15u64;
    for chunk in bytes.chunks(8) {
        let mut v = 0u64;
        for (i, &b) in chunk.iter().enumerate() {
            v |= (b as u64) << (i * 8);
        }
        state = mix64(state ^ v);
    }
    state
}

fn solid_source(width: u32, height: u32, rgba: [u8; 4]) -> SourceImage {
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for _ in 0..width * height {
        data.extend_from_slice(&rgba);
    }
    SourceImage {
        width,
        height,
        rgba8_premul: Arc::new(data),
    }
}

#[test]
fn output_is_always_canvas_sized() {
    init_tracing();
    let theme = Theme::builtin("glow").unwrap();
    for (w, h) in [(300, 300), (1000, 1200), (800, 200), (1, 1)] {
        let source = solid_source(w, h, [10, 200, 30, 255]);
        let frame = compose(&source, &theme, 0).unwrap();
        assert_eq!((frame.width, frame.height), (500, 500), "source {w}x{h}");
        assert_eq!(frame.data.len(), 500 * 500 * 4);
        assert!(frame.premultiplied);
    }
}

#[test]
fn same_seed_same_pixels() {
    init_tracing();
    let theme = Theme::builtin("clouds").unwrap();
    let source = solid_source(640, 480, [120, 90, 200, 255]);
    let a = compose(&source, &theme, 7).unwrap();
    let b = compose(&source, &theme, 7).unwrap();
    assert_eq!(digest_u64(&a.data), digest_u64(&b.data));
}

#[test]
fn different_seeds_move_the_clouds() {
    let theme = Theme::builtin("clouds").unwrap();
    let source = solid_source(640, 480, [120, 90, 200, 255]);
    let a = compose(&source, &theme, 1).unwrap();
    let b = compose(&source, &theme, 2).unwrap();
    assert_ne!(a.data, b.data);
}

#[test]
fn glow_theme_ignores_the_seed() {
    // Nothing in the glow theme is procedural, so the seed must not matter.
    let theme = Theme::builtin("glow").unwrap();
    let source = solid_source(320, 320, [200, 200, 200, 255]);
    let a = compose(&source, &theme, 0).unwrap();
    let b = compose(&source, &theme, 12345).unwrap();
    assert_eq!(a.data, b.data);
}

#[test]
fn photo_covers_the_center_opaquely() {
    let theme = Theme::builtin("glow").unwrap();
    let source = solid_source(1000, 1200, [10, 200, 30, 255]);
    let frame = compose(&source, &theme, 0).unwrap();

    let idx = (250 * 500 + 250) * 4;
    let px = &frame.data[idx..idx + 4];
    assert_eq!(px[3], 255, "center must be fully opaque");
    // Cover-crop keeps the uniform photo color unchanged at the center.
    assert_eq!(&px[..3], &[10, 200, 30]);
}

#[test]
fn corners_keep_the_translucent_glow() {
    let theme = Theme::builtin("glow").unwrap();
    let source = solid_source(400, 400, [10, 200, 30, 255]);
    let frame = compose(&source, &theme, 0).unwrap();

    // Top-right corner: outside photo, border, caption, and badge.
    let idx = (2 * 500 + 497) * 4;
    let a = frame.data[idx + 3];
    assert!(a > 0, "glow background must reach the corner");
    assert!(a < 255, "corner must stay translucent");
}

#[test]
fn photo_fills_the_clip_bounding_square() {
    // Canvas 500, inset 40: the photo maps onto the 420px square at (40, 40),
    // not onto the full canvas. A 100px source scales by 4.2, so a stripe
    // boundary at source y=25 lands at canvas y = 40 + 25 * 4.2 = 145.
    let theme = Theme::builtin("glow").unwrap();

    let mut data = Vec::with_capacity(100 * 100 * 4);
    for y in 0..100u32 {
        let px: [u8; 4] = if y < 25 { [0, 0, 0, 255] } else { [255, 255, 255, 255] };
        for _ in 0..100 {
            data.extend_from_slice(&px);
        }
    }
    let source = SourceImage {
        width: 100,
        height: 100,
        rgba8_premul: Arc::new(data),
    };

    let frame = compose(&source, &theme, 0).unwrap();

    // Above the stripe boundary: black. (Canvas-cover scaling would put the
    // boundary at y=125 and make this pixel white.)
    let above = (135 * 500 + 250) * 4;
    assert!(frame.data[above] < 50, "y=135 should be black, got {}", frame.data[above]);

    // Below the boundary: white under either mapping.
    let below = (160 * 500 + 250) * 4;
    assert!(frame.data[below] > 200, "y=160 should be white, got {}", frame.data[below]);
}

#[test]
fn border_ring_sits_at_the_photo_radius() {
    // Canvas 500, photo inset 40: the 8px border is centered on radius 210.
    // Sample the ring at the bottom of the circle, clear of caption and badge.
    let theme = Theme::builtin("glow").unwrap();
    let source = solid_source(1000, 1200, [10, 200, 30, 255]);
    let frame = compose(&source, &theme, 0).unwrap();

    let idx = (460 * 500 + 250) * 4;
    let px = &frame.data[idx..idx + 4];
    // Pink border (236, 72, 153) at 0.8 alpha over the glow: red-dominant.
    assert!(px[3] > 200, "ring must be close to opaque, alpha {}", px[3]);
    assert!(px[0] > 150, "red channel {}", px[0]);
    assert!(px[0] > px[1] + 50, "red {} must dominate green {}", px[0], px[1]);
}

#[test]
fn invalid_theme_is_rejected_before_rendering() {
    let mut theme = Theme::builtin("glow").unwrap();
    theme.photo_inset = -1.0;
    let source = solid_source(100, 100, [0, 0, 0, 255]);
    assert!(compose(&source, &theme, 0).is_err());
}
