use std::f64::consts::PI;
use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::error::{HaloError, HaloResult};

/// sRGB color with straight (non-premultiplied) alpha, components in `0..=1`.
///
/// Deserializes from `"#RRGGBB"` / `"#RRGGBBAA"`, `[r, g, b]` / `[r, g, b, a]`,
/// or `{ "r": .., "g": .., "b": .., "a": .. }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub fn rgba8(r: u8, g: u8, b: u8, a: f64) -> Self {
        Self::rgba(
            f64::from(r) / 255.0,
            f64::from(g) / 255.0,
            f64::from(b) / 255.0,
            a,
        )
    }

    pub fn with_alpha(self, a: f64) -> Self {
        Self { a, ..self }
    }

    pub(crate) fn to_peniko(self) -> vello_cpu::peniko::Color {
        vello_cpu::peniko::Color::new([
            self.r.clamp(0.0, 1.0) as f32,
            self.g.clamp(0.0, 1.0) as f32,
            self.b.clamp(0.0, 1.0) as f32,
            self.a.clamp(0.0, 1.0) as f32,
        ])
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Hex(String),
            RgbaObj {
                r: f64,
                g: f64,
                b: f64,
                #[serde(default = "one")]
                a: f64,
            },
            Arr(Vec<f64>),
        }

        fn one() -> f64 {
            1.0
        }

        match Repr::deserialize(deserializer)? {
            Repr::Hex(s) => parse_hex(&s).map_err(serde::de::Error::custom),
            Repr::RgbaObj { r, g, b, a } => Ok(Self::rgba(r, g, b, a)),
            Repr::Arr(v) => {
                if v.len() == 3 {
                    Ok(Self::rgba(v[0], v[1], v[2], 1.0))
                } else if v.len() == 4 {
                    Ok(Self::rgba(v[0], v[1], v[2], v[3]))
                } else {
                    Err(serde::de::Error::custom(
                        "rgba array must have len 3 ([r,g,b]) or 4 ([r,g,b,a])",
                    ))
                }
            }
        }
    }
}

fn parse_hex(s: &str) -> Result<Color, String> {
    let s = s.trim();
    let s = s.strip_prefix('#').unwrap_or(s);

    fn hex_byte(pair: &str) -> Result<u8, String> {
        u8::from_str_radix(pair, 16).map_err(|_| format!("invalid hex byte \"{pair}\""))
    }

    let (r, g, b, a) = match s.len() {
        6 => {
            let r = hex_byte(&s[0..2])?;
            let g = hex_byte(&s[2..4])?;
            let b = hex_byte(&s[4..6])?;
            (r, g, b, 255)
        }
        8 => {
            let r = hex_byte(&s[0..2])?;
            let g = hex_byte(&s[2..4])?;
            let b = hex_byte(&s[4..6])?;
            let a = hex_byte(&s[6..8])?;
            (r, g, b, a)
        }
        _ => {
            return Err("hex color must be #RRGGBB or #RRGGBBAA (case-insensitive)".to_owned());
        }
    };

    Ok(Color::rgba(
        (r as f64) / 255.0,
        (g as f64) / 255.0,
        (b as f64) / 255.0,
        (a as f64) / 255.0,
    ))
}

/// One stop of a radial gradient, `offset` in `0..=1` from center to edge.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GradientStop {
    pub offset: f32,
    pub color: Color,
}

/// One layering pass of the procedural cloud field. `radius` and `alpha` are
/// inclusive `[min, max]` sampling ranges for each blob in the pass.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CloudPass {
    pub count: u32,
    pub radius: [f64; 2],
    pub alpha: [f64; 2],
}

/// Background effect painted before the photo.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum EffectKind {
    /// Single radial gradient from `canvas/2 - inner_inset` out to the edge.
    Glow {
        stops: Vec<GradientStop>,
        inner_inset: f64,
    },
    /// Base gradient plus many seeded soft blobs, layered per pass from
    /// largest/softest to smallest/sharpest.
    CloudField {
        base: Vec<GradientStop>,
        blob_color: Color,
        passes: Vec<CloudPass>,
    },
}

/// One sine harmonic of the wavy border: `amplitude * sin(frequency * theta + phase)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Harmonic {
    pub amplitude: f64,
    pub frequency: f64,
    pub phase: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum BorderStyle {
    Plain,
    /// Scalloped outline: the stroke radius is perturbed by the harmonic sum,
    /// plus `blobs` soft discs straddling the ring for a fluffy edge.
    Wavy {
        harmonics: Vec<Harmonic>,
        blobs: u32,
        blob_radius: [f64; 2],
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Border {
    pub style: BorderStyle,
    pub color: Color,
    pub width: f64,
}

/// Thin ring stroked `inset` pixels inside the border radius.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Highlight {
    pub color: Color,
    pub width: f64,
    pub inset: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum CaptionStyle {
    Plain,
    /// Characters covered by `prefix` render bold in `color` when the caption
    /// starts with `prefix`; otherwise the whole caption renders plain.
    BoldPrefix { prefix: String, color: Color },
    /// Stroke each glyph behind its fill, for contrast on busy backgrounds.
    Outlined { stroke: Color, width: f64 },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Caption {
    pub text: String,
    /// Arc radius is `canvas/2 - radius_inset`.
    pub radius_inset: f64,
    /// Radians; the arc always spans pi from here.
    pub start_angle: f64,
    pub font_stack: String,
    pub font_px: f32,
    pub fill: Color,
    pub style: CaptionStyle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Circular logo badge near one corner.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Badge {
    pub corner: Corner,
    pub size: f64,
    pub margin: f64,
    pub disc_color: Color,
    pub ring_color: Color,
    pub ring_width: f64,
    /// Gap between the disc edge and the logo's clip circle.
    pub content_inset: f64,
}

impl Badge {
    /// Badge disc center for a square canvas of side `canvas`.
    pub fn center(&self, canvas: f64) -> kurbo::Point {
        let half = self.size / 2.0;
        let near = self.margin + half;
        let far = canvas - self.margin - half;
        match self.corner {
            Corner::TopLeft => kurbo::Point::new(near, near),
            Corner::TopRight => kurbo::Point::new(far, near),
            Corner::BottomLeft => kurbo::Point::new(near, far),
            Corner::BottomRight => kurbo::Point::new(far, far),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Fixed output filename; never derived from the source filename.
    pub file_name: String,
    pub share_text: String,
    pub share_tags: String,
}

/// A complete style bundle. One parameterized pipeline consumes this; there is
/// no per-theme drawing code.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    /// Output is always `canvas_size` x `canvas_size`.
    pub canvas_size: u32,
    /// Photo clip radius is `canvas_size/2 - photo_inset`.
    pub photo_inset: f64,
    pub background: EffectKind,
    pub border: Border,
    pub highlight: Highlight,
    pub caption: Caption,
    pub badge: Badge,
    pub export: ExportSettings,
}

impl Theme {
    pub fn validate(&self) -> HaloResult<()> {
        if self.name.trim().is_empty() {
            return Err(HaloError::validation("theme name must be non-empty"));
        }
        if self.canvas_size == 0 || self.canvas_size > u32::from(u16::MAX) {
            return Err(HaloError::validation(format!(
                "canvas_size must be in 1..={}",
                u16::MAX
            )));
        }
        let half = f64::from(self.canvas_size) / 2.0;
        if !(self.photo_inset > 0.0 && self.photo_inset < half) {
            return Err(HaloError::validation(
                "photo_inset must be > 0 and < canvas_size/2",
            ));
        }
        if self.border.width <= 0.0 {
            return Err(HaloError::validation("border width must be > 0"));
        }
        if let BorderStyle::Wavy {
            harmonics,
            blob_radius,
            ..
        } = &self.border.style
        {
            if harmonics.is_empty() {
                return Err(HaloError::validation(
                    "wavy border needs at least one harmonic",
                ));
            }
            for h in harmonics {
                if h.amplitude < 0.0 || h.frequency <= 0.0 {
                    return Err(HaloError::validation(
                        "harmonic amplitude must be >= 0 and frequency > 0",
                    ));
                }
            }
            if !(blob_radius[0] > 0.0 && blob_radius[0] <= blob_radius[1]) {
                return Err(HaloError::validation(
                    "wavy border blob_radius must satisfy 0 < min <= max",
                ));
            }
        }
        validate_effect(&self.background)?;
        if self.caption.text.is_empty() {
            return Err(HaloError::validation("caption text must be non-empty"));
        }
        if !(self.caption.font_px.is_finite() && self.caption.font_px > 0.0) {
            return Err(HaloError::validation(
                "caption font_px must be finite and > 0",
            ));
        }
        if self.caption.radius_inset <= 0.0 || self.caption.radius_inset >= half {
            return Err(HaloError::validation(
                "caption radius_inset must be > 0 and < canvas_size/2",
            ));
        }
        if self.badge.size <= 0.0
            || self.badge.size + self.badge.margin > f64::from(self.canvas_size)
        {
            return Err(HaloError::validation(
                "badge size/margin must be > 0 and fit inside the canvas",
            ));
        }
        if self.badge.content_inset < 0.0 || self.badge.content_inset * 2.0 >= self.badge.size {
            return Err(HaloError::validation(
                "badge content_inset must leave room for the logo",
            ));
        }
        if self.export.file_name.trim().is_empty() {
            return Err(HaloError::validation("export file_name must be non-empty"));
        }
        Ok(())
    }

    /// Photo clip radius in pixels.
    pub fn photo_radius(&self) -> f64 {
        f64::from(self.canvas_size) / 2.0 - self.photo_inset
    }

    /// Caption arc radius in pixels.
    pub fn caption_radius(&self) -> f64 {
        f64::from(self.canvas_size) / 2.0 - self.caption.radius_inset
    }

    /// Look up a built-in theme by name.
    pub fn builtin(name: &str) -> Option<Theme> {
        match name {
            "glow" => Some(glow()),
            "clouds" => Some(clouds()),
            _ => None,
        }
    }

    pub fn builtin_names() -> &'static [&'static str] {
        &["glow", "clouds"]
    }

    /// Load and validate a theme from a JSON file.
    pub fn from_path(path: &Path) -> HaloResult<Theme> {
        let f =
            std::fs::File::open(path).with_context(|| format!("open theme '{}'", path.display()))?;
        let theme: Theme = serde_json::from_reader(std::io::BufReader::new(f))
            .with_context(|| format!("parse theme JSON '{}'", path.display()))?;
        theme.validate()?;
        Ok(theme)
    }
}

fn validate_effect(effect: &EffectKind) -> HaloResult<()> {
    fn validate_stops(stops: &[GradientStop], what: &str) -> HaloResult<()> {
        if stops.len() < 2 {
            return Err(HaloError::validation(format!(
                "{what} needs at least two gradient stops"
            )));
        }
        for s in stops {
            if !(0.0..=1.0).contains(&s.offset) {
                return Err(HaloError::validation(format!(
                    "{what} stop offsets must be in 0..=1"
                )));
            }
        }
        if stops.windows(2).any(|w| w[0].offset > w[1].offset) {
            return Err(HaloError::validation(format!(
                "{what} stop offsets must be non-decreasing"
            )));
        }
        Ok(())
    }

    match effect {
        EffectKind::Glow { stops, inner_inset } => {
            validate_stops(stops, "glow")?;
            if *inner_inset < 0.0 {
                return Err(HaloError::validation("glow inner_inset must be >= 0"));
            }
        }
        EffectKind::CloudField { base, passes, .. } => {
            validate_stops(base, "cloud base")?;
            if passes.is_empty() {
                return Err(HaloError::validation("cloud field needs at least one pass"));
            }
            for p in passes {
                if p.count == 0 {
                    return Err(HaloError::validation("cloud pass count must be > 0"));
                }
                if !(p.radius[0] > 0.0 && p.radius[0] <= p.radius[1]) {
                    return Err(HaloError::validation(
                        "cloud pass radius must satisfy 0 < min <= max",
                    ));
                }
                for a in p.alpha {
                    if !(0.0..=1.0).contains(&a) {
                        return Err(HaloError::validation("cloud pass alpha must be in 0..=1"));
                    }
                }
            }
        }
    }
    Ok(())
}

const FONT_STACK: &str = "Inter, system-ui, sans-serif";

fn glow() -> Theme {
    Theme {
        name: "glow".to_string(),
        canvas_size: 500,
        photo_inset: 40.0,
        background: EffectKind::Glow {
            stops: vec![
                GradientStop {
                    offset: 0.0,
                    color: Color::rgba8(236, 72, 153, 0.4),
                },
                GradientStop {
                    offset: 0.7,
                    color: Color::rgba8(147, 51, 234, 0.3),
                },
                GradientStop {
                    offset: 1.0,
                    color: Color::rgba8(147, 51, 234, 0.1),
                },
            ],
            inner_inset: 60.0,
        },
        border: Border {
            style: BorderStyle::Plain,
            color: Color::rgba8(236, 72, 153, 0.8),
            width: 8.0,
        },
        highlight: Highlight {
            color: Color::rgba(1.0, 1.0, 1.0, 0.3),
            width: 3.0,
            inset: 5.0,
        },
        caption: Caption {
            text: "Prove the world's software".to_string(),
            radius_inset: 25.0,
            start_angle: -0.75 * PI,
            font_stack: FONT_STACK.to_string(),
            font_px: 16.0,
            fill: Color::rgba(1.0, 1.0, 1.0, 0.95),
            style: CaptionStyle::BoldPrefix {
                prefix: "Prove".to_string(),
                color: Color::rgba8(236, 72, 153, 1.0),
            },
        },
        badge: Badge {
            corner: Corner::BottomLeft,
            size: 80.0,
            margin: 50.0,
            disc_color: Color::rgba(1.0, 1.0, 1.0, 0.95),
            ring_color: Color::rgba8(236, 72, 153, 0.3),
            ring_width: 3.0,
            content_inset: 8.0,
        },
        export: ExportSettings {
            file_name: "glow-profile-enhanced.png".to_string(),
            share_text: "Just gave my profile picture the signature glow \u{2728}".to_string(),
            share_tags: "#succinct @SuccinctLabs".to_string(),
        },
    }
}

fn clouds() -> Theme {
    Theme {
        name: "clouds".to_string(),
        canvas_size: 500,
        photo_inset: 40.0,
        background: EffectKind::CloudField {
            base: vec![
                GradientStop {
                    offset: 0.0,
                    color: Color::rgba8(125, 211, 252, 1.0),
                },
                GradientStop {
                    offset: 1.0,
                    color: Color::rgba8(14, 165, 233, 1.0),
                },
            ],
            blob_color: Color::rgba(1.0, 1.0, 1.0, 1.0),
            passes: vec![
                CloudPass {
                    count: 18,
                    radius: [60.0, 110.0],
                    alpha: [0.05, 0.12],
                },
                CloudPass {
                    count: 24,
                    radius: [30.0, 70.0],
                    alpha: [0.08, 0.18],
                },
                CloudPass {
                    count: 30,
                    radius: [12.0, 36.0],
                    alpha: [0.12, 0.25],
                },
            ],
        },
        border: Border {
            style: BorderStyle::Wavy {
                harmonics: vec![
                    Harmonic {
                        amplitude: 6.0,
                        frequency: 5.0,
                        phase: 0.0,
                    },
                    Harmonic {
                        amplitude: 3.5,
                        frequency: 9.0,
                        phase: 1.3,
                    },
                    Harmonic {
                        amplitude: 2.0,
                        frequency: 13.0,
                        phase: 2.1,
                    },
                ],
                blobs: 14,
                blob_radius: [8.0, 20.0],
            },
            color: Color::rgba(1.0, 1.0, 1.0, 0.9),
            width: 10.0,
        },
        highlight: Highlight {
            color: Color::rgba(1.0, 1.0, 1.0, 0.35),
            width: 3.0,
            inset: 6.0,
        },
        caption: Caption {
            text: "Head in the clouds".to_string(),
            radius_inset: 25.0,
            start_angle: -0.75 * PI,
            font_stack: FONT_STACK.to_string(),
            font_px: 16.0,
            fill: Color::rgba(1.0, 1.0, 1.0, 1.0),
            style: CaptionStyle::Outlined {
                stroke: Color::rgba8(2, 132, 199, 1.0),
                width: 3.0,
            },
        },
        badge: Badge {
            corner: Corner::BottomLeft,
            size: 80.0,
            margin: 50.0,
            disc_color: Color::rgba(1.0, 1.0, 1.0, 0.95),
            ring_color: Color::rgba8(14, 165, 233, 0.35),
            ring_width: 3.0,
            content_inset: 8.0,
        },
        export: ExportSettings {
            file_name: "clouds-profile-enhanced.png".to_string(),
            share_text: "Floating my profile picture into the clouds \u{2601}\u{fe0f}".to_string(),
            share_tags: "#succinct @SuccinctLabs".to_string(),
        },
    }
}
