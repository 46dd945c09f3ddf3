//! The frame pipeline: background effect, clipped photo, border, highlight
//! ring, arc caption, and logo badge, rendered on the CPU in one pass.

use kurbo::Shape as _;
use rand::{Rng as _, SeedableRng as _};
use tracing::instrument;

use crate::arc_text::TextEngine;
use crate::assets::{self, SourceImage};
use crate::error::{HaloError, HaloResult};
use crate::theme::{
    Badge, Border, BorderStyle, CloudPass, Color, EffectKind, GradientStop, Harmonic, Highlight,
    Theme,
};

/// A rendered frame: square RGBA8 pixels, always `width == height ==
/// theme.canvas_size` regardless of the source photo's dimensions.
#[derive(Clone, Debug)]
pub struct FrameRgba {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    /// Pixels straight off the renderer are premultiplied.
    pub premultiplied: bool,
}

impl FrameRgba {
    pub fn unpremultiplied(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        if self.premultiplied {
            for px in out.chunks_exact_mut(4) {
                let a = px[3] as u16;
                if a == 0 || a == 255 {
                    continue;
                }
                px[0] = ((px[0] as u16 * 255 + a / 2) / a).min(255) as u8;
                px[1] = ((px[1] as u16 * 255 + a / 2) / a).min(255) as u8;
                px[2] = ((px[2] as u16 * 255 + a / 2) / a).min(255) as u8;
            }
        }
        out
    }
}

/// Render `source` inside `theme`'s frame. `seed` drives every random-looking
/// element (cloud blobs, border scallop discs), so equal inputs give
/// byte-identical output.
#[instrument(skip_all, fields(theme = %theme.name, src_w = source.width, src_h = source.height))]
pub fn compose(source: &SourceImage, theme: &Theme, seed: u64) -> HaloResult<FrameRgba> {
    theme.validate()?;

    let size = theme.canvas_size;
    let side: u16 = size
        .try_into()
        .map_err(|_| HaloError::render("canvas size exceeds u16"))?;
    let canvas = f64::from(size);
    let center = kurbo::Point::new(canvas / 2.0, canvas / 2.0);

    let mut ctx = vello_cpu::RenderContext::new(side, side);
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);

    draw_background(&mut ctx, &theme.background, canvas, center, &mut rng);
    draw_photo(&mut ctx, source, center, theme.photo_radius())?;
    draw_border(&mut ctx, &theme.border, center, theme.photo_radius(), &mut rng);
    draw_highlight(&mut ctx, &theme.highlight, center, theme.photo_radius());

    let mut text = TextEngine::new();
    text.draw_arc_text(&mut ctx, &theme.caption, center, theme.caption_radius())?;

    draw_badge(&mut ctx, &theme.badge, canvas)?;

    ctx.flush();
    let mut pixmap = vello_cpu::Pixmap::new(side, side);
    ctx.render_to_pixmap(&mut pixmap);

    Ok(FrameRgba {
        width: size,
        height: size,
        data: pixmap.data_as_u8_slice().to_vec(),
        premultiplied: true,
    })
}

fn draw_background(
    ctx: &mut vello_cpu::RenderContext,
    effect: &EffectKind,
    canvas: f64,
    center: kurbo::Point,
    rng: &mut rand::rngs::StdRng,
) {
    match effect {
        EffectKind::Glow { stops, inner_inset } => {
            let half = canvas / 2.0;
            reset_transforms(ctx);
            ctx.set_paint(radial_gradient(
                center,
                (half - inner_inset).max(0.0),
                half,
                stops,
            ));
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, canvas, canvas));
        }
        EffectKind::CloudField {
            base,
            blob_color,
            passes,
        } => {
            reset_transforms(ctx);
            ctx.set_paint(linear_gradient(
                kurbo::Point::new(0.0, 0.0),
                kurbo::Point::new(0.0, canvas),
                base,
            ));
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, canvas, canvas));

            for pass in passes {
                draw_cloud_pass(ctx, pass, *blob_color, canvas, rng);
            }
        }
    }
}

fn draw_cloud_pass(
    ctx: &mut vello_cpu::RenderContext,
    pass: &CloudPass,
    blob_color: Color,
    canvas: f64,
    rng: &mut rand::rngs::StdRng,
) {
    for _ in 0..pass.count {
        let x = rng.gen_range(0.0..canvas);
        let y = rng.gen_range(0.0..canvas);
        let r = rng.gen_range(pass.radius[0]..=pass.radius[1]);
        let a = rng.gen_range(pass.alpha[0]..=pass.alpha[1]);
        soft_disc(ctx, kurbo::Point::new(x, y), r, blob_color.with_alpha(a));
    }
}

/// A blob with a soft edge: radial gradient from the color to transparent.
fn soft_disc(ctx: &mut vello_cpu::RenderContext, center: kurbo::Point, radius: f64, color: Color) {
    let stops = [
        GradientStop {
            offset: 0.0,
            color,
        },
        GradientStop {
            offset: 1.0,
            color: color.with_alpha(0.0),
        },
    ];
    reset_transforms(ctx);
    ctx.set_paint(radial_gradient(center, 0.0, radius, &stops));
    let circle = kurbo::Circle::new(center, radius).to_path(0.1);
    ctx.fill_path(&bezpath_to_cpu(&circle));
}

/// Clip to the photo circle and cover-crop the source into the clip's
/// bounding square: uniform scale to fill `2 * radius`, centered on the
/// circle, never squashed.
fn draw_photo(
    ctx: &mut vello_cpu::RenderContext,
    source: &SourceImage,
    center: kurbo::Point,
    radius: f64,
) -> HaloResult<()> {
    let (sw, sh) = (f64::from(source.width), f64::from(source.height));
    let side = 2.0 * radius;
    let scale = (side / sw).max(side / sh);
    let offset = center.to_vec2() - kurbo::Vec2::new(sw * scale / 2.0, sh * scale / 2.0);
    let transform = kurbo::Affine::translate(offset) * kurbo::Affine::scale(scale);

    let clip = kurbo::Circle::new(center, radius).to_path(0.1);
    reset_transforms(ctx);
    ctx.push_clip_layer(&bezpath_to_cpu(&clip));

    let pixmap = image_premul_bytes_to_pixmap(&source.rgba8_premul, source.width, source.height)?;
    ctx.set_transform(affine_to_cpu(transform));
    ctx.set_paint(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(std::sync::Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    });
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, sw, sh));

    ctx.pop_layer();
    Ok(())
}

fn draw_border(
    ctx: &mut vello_cpu::RenderContext,
    border: &Border,
    center: kurbo::Point,
    radius: f64,
    rng: &mut rand::rngs::StdRng,
) {
    reset_transforms(ctx);
    match &border.style {
        BorderStyle::Plain => {
            let circle = kurbo::Circle::new(center, radius).to_path(0.1);
            ctx.set_stroke(vello_cpu::kurbo::Stroke::new(border.width));
            ctx.set_paint(border.color.to_peniko());
            ctx.stroke_path(&bezpath_to_cpu(&circle));
        }
        BorderStyle::Wavy {
            harmonics,
            blobs,
            blob_radius,
        } => {
            let path = wavy_ring(center, radius, harmonics);
            ctx.set_stroke(vello_cpu::kurbo::Stroke::new(border.width));
            ctx.set_paint(border.color.to_peniko());
            ctx.stroke_path(&bezpath_to_cpu(&path));

            // Soft discs straddling the ring fluff up the scallop.
            for _ in 0..*blobs {
                let theta = rng.gen_range(0.0..std::f64::consts::TAU);
                let wobble = rng.gen_range(-border.width..=border.width);
                let r = radius + harmonic_sum(harmonics, theta) + wobble;
                let pos = kurbo::Point::new(
                    center.x + r * theta.cos(),
                    center.y + r * theta.sin(),
                );
                let blob_r = rng.gen_range(blob_radius[0]..=blob_radius[1]);
                soft_disc(ctx, pos, blob_r, border.color);
            }
        }
    }
}

fn harmonic_sum(harmonics: &[Harmonic], theta: f64) -> f64 {
    harmonics
        .iter()
        .map(|h| h.amplitude * (h.frequency * theta + h.phase).sin())
        .sum()
}

/// Closed polyline around the circle with the harmonic sum added to the
/// radius. 720 samples keeps the highest builtin frequency smooth.
fn wavy_ring(center: kurbo::Point, radius: f64, harmonics: &[Harmonic]) -> kurbo::BezPath {
    const SAMPLES: usize = 720;
    let mut path = kurbo::BezPath::new();
    for i in 0..SAMPLES {
        let theta = std::f64::consts::TAU * (i as f64) / (SAMPLES as f64);
        let r = radius + harmonic_sum(harmonics, theta);
        let p = kurbo::Point::new(center.x + r * theta.cos(), center.y + r * theta.sin());
        if i == 0 {
            path.move_to(p);
        } else {
            path.line_to(p);
        }
    }
    path.close_path();
    path
}

fn draw_highlight(
    ctx: &mut vello_cpu::RenderContext,
    highlight: &Highlight,
    center: kurbo::Point,
    border_radius: f64,
) {
    let radius = border_radius - highlight.inset;
    if radius <= 0.0 {
        return;
    }
    let circle = kurbo::Circle::new(center, radius).to_path(0.1);
    reset_transforms(ctx);
    ctx.set_stroke(vello_cpu::kurbo::Stroke::new(highlight.width));
    ctx.set_paint(highlight.color.to_peniko());
    ctx.stroke_path(&bezpath_to_cpu(&circle));
}

fn draw_badge(ctx: &mut vello_cpu::RenderContext, badge: &Badge, canvas: f64) -> HaloResult<()> {
    let center = badge.center(canvas);
    let half = badge.size / 2.0;

    let disc = kurbo::Circle::new(center, half).to_path(0.1);
    reset_transforms(ctx);
    ctx.set_paint(badge.disc_color.to_peniko());
    ctx.fill_path(&bezpath_to_cpu(&disc));

    ctx.set_stroke(vello_cpu::kurbo::Stroke::new(badge.ring_width));
    ctx.set_paint(badge.ring_color.to_peniko());
    ctx.stroke_path(&bezpath_to_cpu(&disc));

    let content_half = half - badge.content_inset;
    let tree = assets::logo_tree()?;
    let (rgba, w, h) = assets::rasterize_logo(&tree, content_half * 2.0)?;
    let pixmap = image_premul_bytes_to_pixmap(&rgba, w, h)?;

    let clip = kurbo::Circle::new(center, content_half).to_path(0.1);
    ctx.push_clip_layer(&bezpath_to_cpu(&clip));

    let offset = kurbo::Vec2::new(
        center.x - f64::from(w) / 2.0,
        center.y - f64::from(h) / 2.0,
    );
    ctx.set_transform(affine_to_cpu(kurbo::Affine::translate(offset)));
    ctx.set_paint(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(std::sync::Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    });
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
        0.0,
        0.0,
        f64::from(w),
        f64::from(h),
    ));

    ctx.pop_layer();
    Ok(())
}

fn reset_transforms(ctx: &mut vello_cpu::RenderContext) {
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
}

fn radial_gradient(
    center: kurbo::Point,
    start_radius: f64,
    end_radius: f64,
    stops: &[GradientStop],
) -> vello_cpu::peniko::Gradient {
    let center = point_to_cpu(center);
    let stops: Vec<vello_cpu::peniko::ColorStop> = stops
        .iter()
        .map(|s| vello_cpu::peniko::ColorStop::from((s.offset, s.color.to_peniko())))
        .collect();
    vello_cpu::peniko::Gradient {
        kind: vello_cpu::peniko::GradientKind::Radial(
            vello_cpu::peniko::RadialGradientPosition {
                start_center: center,
                start_radius: start_radius as f32,
                end_center: center,
                end_radius: end_radius as f32,
            },
        ),
        ..Default::default()
    }
    .with_stops(stops.as_slice())
}

fn linear_gradient(
    start: kurbo::Point,
    end: kurbo::Point,
    stops: &[GradientStop],
) -> vello_cpu::peniko::Gradient {
    let stops: Vec<vello_cpu::peniko::ColorStop> = stops
        .iter()
        .map(|s| vello_cpu::peniko::ColorStop::from((s.offset, s.color.to_peniko())))
        .collect();
    vello_cpu::peniko::Gradient {
        kind: vello_cpu::peniko::GradientKind::Linear(
            vello_cpu::peniko::LinearGradientPosition {
                start: point_to_cpu(start),
                end: point_to_cpu(end),
            },
        ),
        ..Default::default()
    }
    .with_stops(stops.as_slice())
}

pub(crate) fn affine_to_cpu(a: kurbo::Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

pub(crate) fn point_to_cpu(p: kurbo::Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

pub(crate) fn bezpath_to_cpu(path: &kurbo::BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn image_premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> HaloResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| HaloError::render("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| HaloError::render("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(HaloError::render("image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}
