//! Caption text bent along a circular arc, one character per slot.
//!
//! Layout is split from drawing: [`placements`] is pure geometry, and
//! [`TextEngine`] turns placements into glyph runs on a render context.

use std::borrow::Cow;
use std::collections::HashMap;
use std::f64::consts::PI;

use crate::compose::affine_to_cpu;
use crate::error::{HaloError, HaloResult};
use crate::theme::{Caption, CaptionStyle, Color};

/// Angular step between adjacent character slots for a caption of `len`
/// characters. The caption always spans half the circle, so the step is
/// `pi / len` regardless of glyph widths.
pub fn arc_step(len: usize) -> f64 {
    PI / len as f64
}

/// Where one character sits on the arc.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CharPlacement {
    pub ch: char,
    pub index: usize,
    /// Slot angle in radians, measured from the circle center.
    pub angle: f64,
    /// Character anchor point on the circle.
    pub pos: kurbo::Point,
    /// Glyph rotation: tangent to the circle, upright at the arc's top.
    pub rotation: f64,
}

/// Compute per-character slots for `text` along the circle of `radius` around
/// `center`, starting at `start_angle`. Empty text yields no placements.
pub fn placements(
    text: &str,
    center: kurbo::Point,
    radius: f64,
    start_angle: f64,
) -> Vec<CharPlacement> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }
    let step = arc_step(chars.len());

    chars
        .into_iter()
        .enumerate()
        .map(|(index, ch)| {
            let angle = start_angle + index as f64 * step;
            let pos = kurbo::Point::new(
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
            );
            CharPlacement {
                ch,
                index,
                angle,
                pos,
                rotation: angle + PI / 2.0,
            }
        })
        .collect()
}

/// RGBA8 brush color carried through Parley layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextBrush {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl From<Color> for TextBrush {
    fn from(c: Color) -> Self {
        let ch = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self {
            r: ch(c.r),
            g: ch(c.g),
            b: ch(c.b),
            a: ch(c.a),
        }
    }
}

/// Shapes and draws arc captions. Owns the Parley font and layout contexts,
/// which are expensive to build, so callers keep one engine per pipeline.
pub struct TextEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrush>,
    font_cache: HashMap<u64, vello_cpu::peniko::FontData>,
}

impl Default for TextEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextEngine {
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::new(),
            layout_ctx: parley::LayoutContext::new(),
            font_cache: HashMap::new(),
        }
    }

    /// Draw `caption` along the circle of `radius` around `center`.
    ///
    /// Each character is shaped on its own and centered on its slot, rotated
    /// tangent to the circle. Whitespace keeps its slot but draws nothing.
    pub fn draw_arc_text(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        caption: &Caption,
        center: kurbo::Point,
        radius: f64,
    ) -> HaloResult<()> {
        let slots = placements(&caption.text, center, radius, caption.start_angle);
        if slots.is_empty() {
            return Ok(());
        }

        // BoldPrefix only applies when the caption actually starts with it.
        let bold_chars = match &caption.style {
            CaptionStyle::BoldPrefix { prefix, .. } if caption.text.starts_with(prefix.as_str()) => {
                prefix.chars().count()
            }
            _ => 0,
        };

        let mut buf = [0u8; 4];
        for slot in &slots {
            if slot.ch.is_whitespace() {
                continue;
            }

            let bold = slot.index < bold_chars;
            let fill = match (&caption.style, bold) {
                (CaptionStyle::BoldPrefix { color, .. }, true) => *color,
                _ => caption.fill,
            };

            let s = slot.ch.encode_utf8(&mut buf);
            let layout = self.layout_char(s, caption, bold, TextBrush::from(fill));
            let (w, h) = (f64::from(layout.width()), f64::from(layout.height()));

            let transform = kurbo::Affine::translate(slot.pos.to_vec2())
                * kurbo::Affine::rotate(slot.rotation)
                * kurbo::Affine::translate(kurbo::Vec2::new(-w / 2.0, -h / 2.0));
            ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.set_transform(affine_to_cpu(transform));

            if let CaptionStyle::Outlined { stroke, width } = &caption.style {
                ctx.set_stroke(vello_cpu::kurbo::Stroke::new(*width));
                ctx.set_paint(stroke.to_peniko());
                self.draw_glyph_runs(ctx, &layout, GlyphPass::Stroke)?;
            }
            self.draw_glyph_runs(ctx, &layout, GlyphPass::Fill)?;
        }

        Ok(())
    }

    fn layout_char(
        &mut self,
        text: &str,
        caption: &Caption,
        bold: bool,
        brush: TextBrush,
    ) -> parley::Layout<TextBrush> {
        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(caption.font_stack.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(caption.font_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));
        if bold {
            builder.push_default(parley::style::StyleProperty::FontWeight(
                parley::style::FontWeight::BOLD,
            ));
        }

        let mut layout: parley::Layout<TextBrush> = builder.build(text);
        layout.break_all_lines(None);
        layout
    }

    fn draw_glyph_runs(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        layout: &parley::Layout<TextBrush>,
        pass: GlyphPass,
    ) -> HaloResult<()> {
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };

                if pass == GlyphPass::Fill {
                    let brush = run.style().brush;
                    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                        brush.r, brush.g, brush.b, brush.a,
                    ));
                }

                let font = self.cpu_font_for(run.run().font())?;
                let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                let builder = ctx.glyph_run(&font).font_size(run.run().font_size());
                match pass {
                    GlyphPass::Fill => builder.fill_glyphs(glyphs),
                    GlyphPass::Stroke => builder.stroke_glyphs(glyphs),
                }
            }
        }
        Ok(())
    }

    /// Rewrap the layout's font blob for the renderer, cached by blob id.
    fn cpu_font_for(&mut self, font: &parley::FontData) -> HaloResult<vello_cpu::peniko::FontData> {
        let key = font.data.id();
        if let Some(cached) = self.font_cache.get(&key) {
            return Ok(cached.clone());
        }

        let bytes: &[u8] = font.data.as_ref();
        if bytes.is_empty() {
            return Err(HaloError::render("resolved font has empty data"));
        }
        let cpu_font = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(bytes.to_vec()),
            font.index,
        );
        self.font_cache.insert(key, cpu_font.clone());
        Ok(cpu_font)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GlyphPass {
    Fill,
    Stroke,
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn step_divides_half_circle_evenly() {
        assert!((arc_step(1) - PI).abs() < EPS);
        assert!((arc_step(2) - PI / 2.0).abs() < EPS);
        assert!((arc_step(27) - PI / 27.0).abs() < EPS);
    }

    #[test]
    fn empty_text_has_no_placements() {
        assert!(placements("", kurbo::Point::new(250.0, 250.0), 225.0, 0.0).is_empty());
    }

    #[test]
    fn placements_follow_slot_angles() {
        let center = kurbo::Point::new(250.0, 250.0);
        let radius = 225.0;
        let start = -0.75 * PI;
        let text = "abcdefghijklmnopqrstuvwxyz!";
        assert_eq!(text.chars().count(), 27);

        let slots = placements(text, center, radius, start);
        assert_eq!(slots.len(), 27);

        let step = arc_step(27);
        assert!((slots[0].angle - start).abs() < EPS);
        assert!((slots[26].angle - (start + 26.0 * step)).abs() < EPS);

        for slot in &slots {
            assert!((slot.rotation - (slot.angle + PI / 2.0)).abs() < EPS);
            let d = slot.pos.distance(center);
            assert!((d - radius).abs() < 1e-9, "slot {} off circle: {d}", slot.index);
        }
    }

    #[test]
    fn first_slot_position_matches_start_angle() {
        let center = kurbo::Point::new(250.0, 250.0);
        let slots = placements("x", center, 225.0, -0.75 * PI);
        let expected = kurbo::Point::new(
            250.0 + 225.0 * (-0.75 * PI).cos(),
            250.0 + 225.0 * (-0.75 * PI).sin(),
        );
        assert!((slots[0].pos.x - expected.x).abs() < 1e-9);
        assert!((slots[0].pos.y - expected.y).abs() < 1e-9);
    }

    #[test]
    fn brush_from_color_rounds_channels() {
        let b = TextBrush::from(Color::rgba8(236, 72, 153, 0.8));
        assert_eq!((b.r, b.g, b.b), (236, 72, 153));
        assert_eq!(b.a, 204);
    }
}
