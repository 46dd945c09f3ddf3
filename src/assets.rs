use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;

use crate::error::{HaloError, HaloResult};

/// Decoded user photo: premultiplied RGBA8, replaced wholesale on re-upload.
#[derive(Clone, Debug)]
pub struct SourceImage {
    pub width: u32,
    pub height: u32,
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// The bundled brand logo, shipped with the binary.
pub const LOGO_SVG: &[u8] = include_bytes!("../assets/logo.svg");

/// Media-type gate for the loader: `true` when the path's declared format is
/// an image format the decoder knows. Non-image selections are a no-op
/// upstream, not an error.
pub fn is_image_path(path: &Path) -> bool {
    image::ImageFormat::from_path(path).is_ok()
}

/// Decode encoded image bytes into a premultiplied RGBA8 source.
pub fn decode_image(bytes: &[u8]) -> HaloResult<SourceImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(SourceImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

/// Read and decode a photo from disk. Callers gate with [`is_image_path`]
/// first; a path that passes the gate but fails to decode is an error and
/// leaves any previously loaded source untouched.
pub fn load_source(path: &Path) -> HaloResult<SourceImage> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read image '{}'", path.display()))?;
    decode_image(&bytes)
}

/// Parse the bundled logo SVG.
pub fn logo_tree() -> HaloResult<usvg::Tree> {
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(LOGO_SVG, &opts).context("parse bundled logo svg")?;
    Ok(tree)
}

/// Rasterize `tree` to fit a `box_px` square, preserving aspect ratio.
/// Returns premultiplied RGBA8 plus the raster's pixel dimensions.
pub fn rasterize_logo(tree: &usvg::Tree, box_px: f64) -> HaloResult<(Vec<u8>, u32, u32)> {
    let size = tree.size();
    let (base_w, base_h) = (f64::from(size.width()), f64::from(size.height()));
    if !(base_w.is_finite() && base_h.is_finite() && base_w > 0.0 && base_h > 0.0) {
        return Err(HaloError::decode("logo svg has invalid width/height"));
    }
    if !(box_px.is_finite() && box_px > 0.0) {
        return Err(HaloError::render("logo box must be finite and > 0"));
    }

    let scale = (box_px / base_w).min(box_px / base_h);
    let w = ((base_w * scale).ceil().max(1.0)) as u32;
    let h = ((base_h * scale).ceil().max(1.0)) as u32;

    const MAX_DIM: u32 = 16_384;
    if w > MAX_DIM || h > MAX_DIM {
        return Err(HaloError::render(format!(
            "logo raster size too large: {w}x{h} (max {MAX_DIM}x{MAX_DIM})"
        )));
    }

    let mut pixmap = resvg::tiny_skia::Pixmap::new(w, h)
        .ok_or_else(|| HaloError::render("failed to allocate logo pixmap"))?;
    let sx = (w as f32) / size.width();
    let sy = (h as f32) / size.height();
    let xform = resvg::tiny_skia::Transform::from_scale(sx, sy);
    resvg::render(tree, xform, &mut pixmap.as_mut());

    Ok((pixmap.data().to_vec(), w, h))
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}
