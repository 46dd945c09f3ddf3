use haloframe::{FrameRgba, Theme};

fn tiny_frame() -> FrameRgba {
    // 2x2 checker with one translucent pixel, premultiplied.
    let data = vec![
        255, 0, 0, 255, //
        0, 255, 0, 255, //
        0, 0, 255, 255, //
        64, 64, 64, 128,
    ];
    FrameRgba {
        width: 2,
        height: 2,
        data,
        premultiplied: true,
    }
}

#[test]
fn write_png_roundtrips_pixels() {
    let dir = tempfile::tempdir().unwrap();
    let theme = Theme::builtin("glow").unwrap();
    let path = haloframe::output_path(dir.path(), &theme);

    haloframe::write_png(&tiny_frame(), &path).unwrap();
    assert!(path.exists());

    let img = image::open(&path).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (2, 2));
    assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0, 255]);
    // The translucent pixel comes back with straight alpha.
    let px = img.get_pixel(1, 1).0;
    assert_eq!(px[3], 128);
    assert!(px[0] > 100, "unpremultiplied channel, got {}", px[0]);
}

#[test]
fn file_name_is_fixed_per_theme() {
    let dir = tempfile::tempdir().unwrap();
    for (name, expected) in [
        ("glow", "glow-profile-enhanced.png"),
        ("clouds", "clouds-profile-enhanced.png"),
    ] {
        let theme = Theme::builtin(name).unwrap();
        let path = haloframe::output_path(dir.path(), &theme);
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), expected);
    }
}

#[test]
fn write_png_creates_missing_directories() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("a").join("b");
    let theme = Theme::builtin("glow").unwrap();
    let path = haloframe::output_path(&nested, &theme);

    haloframe::write_png(&tiny_frame(), &path).unwrap();
    assert!(path.exists());
}

#[test]
fn share_url_is_stable_for_a_theme() {
    let theme = Theme::builtin("glow").unwrap();
    let a = haloframe::share_url(&theme);
    let b = haloframe::share_url(&theme);
    assert_eq!(a, b);
    assert!(a.starts_with("https://x.com/intent/tweet?text="));
}
