use std::io::Cursor;
use std::path::PathBuf;

fn bin() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_haloframe")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "haloframe.exe"
            } else {
                "haloframe"
            });
            p
        })
}

#[test]
fn cli_render_writes_the_fixed_filename() {
    let dir = tempfile::tempdir().unwrap();
    let photo = dir.path().join("my-cool-selfie.png");

    let mut img = image::RgbaImage::new(40, 60);
    for px in img.pixels_mut() {
        *px = image::Rgba([180, 40, 90, 255]);
    }
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    std::fs::write(&photo, buf).unwrap();

    let status = std::process::Command::new(bin())
        .args(["render", "--in"])
        .arg(&photo)
        .args(["--theme", "glow", "--out"])
        .arg(dir.path())
        .status()
        .unwrap();
    assert!(status.success());

    // Output name comes from the theme, not from the photo's filename.
    let out = dir.path().join("glow-profile-enhanced.png");
    assert!(out.exists());
    let rendered = image::open(&out).unwrap();
    assert_eq!((rendered.width(), rendered.height()), (500, 500));
}

#[test]
fn cli_themes_lists_builtins() {
    let output = std::process::Command::new(bin())
        .arg("themes")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("glow"));
    assert!(stdout.contains("clouds"));
}

#[test]
fn cli_share_prints_an_intent_url() {
    let output = std::process::Command::new(bin())
        .args(["share", "--theme", "clouds"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.trim().starts_with("https://x.com/intent/tweet?text="));
}
