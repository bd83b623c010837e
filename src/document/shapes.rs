//! Procedural shape-layer animations.
//!
//! Every pattern is a static table of [`ShapeElement`] rows fed through one builder
//! ([`build_pattern_document`]); there is no per-pattern code path. Tables are authored
//! on a 512 x 512 design canvas centred on the origin and scaled to the requested size.

use std::{fmt, str::FromStr};

use kurbo::{Affine, BezPath, Circle, Point, Rect, Shape as _};

use crate::{
    document::model::{
        AnimationDocument, Asset, Bezier, EaseHandle, Keyframe, Layer, PathProperty, Property,
        ShapeItem, Transform,
    },
    encode::still::{StillFormat, encode_frame},
    foundation::{
        error::{CastError, CastResult},
        frame::Frame,
    },
    process::remove::BackgroundRemover,
};

/// Side of the square canvas the pattern tables are authored on.
pub const DESIGN_CANVAS: f64 = 512.0;

const BLACK: [f64; 4] = [0.0, 0.0, 0.0, 1.0];
const WHITE: [f64; 4] = [1.0, 1.0, 1.0, 1.0];
const EYE_WHITE: [f64; 4] = [0.95, 0.95, 0.95, 1.0];
const IRIS_RED: [f64; 4] = [0.768, 0.118, 0.227, 1.0];
const DEEP_RED: [f64; 4] = [0.545, 0.0, 0.0, 1.0];

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ShapeKind {
    /// Filled circle of the given diameter.
    Disc { diameter: f64 },
    /// Axis-aligned ellipse.
    Ellipse { width: f64, height: f64 },
    /// Circle drawn with a stroke only.
    Ring { diameter: f64, stroke: f64 },
    /// Closed straight-edged outline, vertices relative to the element offset.
    Polygon(&'static [[f64; 2]]),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Spin {
    Static,
    Clockwise,
    CounterClockwise,
}

/// One row of a pattern table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeElement {
    pub name: &'static str,
    pub shape: ShapeKind,
    /// Position of the shape in the layer's local space (layer origin = canvas centre).
    pub offset: [f64; 2],
    /// RGBA in 0..=1; for rings this is the stroke colour.
    pub color: [f64; 4],
    /// 0..=100.
    pub opacity: f64,
    /// Copies distributed evenly around the centre, one layer each.
    pub copies: u32,
    pub spin: Spin,
    /// Rotation of the first copy, degrees.
    pub phase_deg: f64,
}

impl ShapeElement {
    const fn fixed(name: &'static str, shape: ShapeKind, color: [f64; 4]) -> Self {
        Self {
            name,
            shape,
            offset: [0.0, 0.0],
            color,
            opacity: 100.0,
            copies: 1,
            spin: Spin::Static,
            phase_deg: 0.0,
        }
    }

    const fn at(mut self, x: f64, y: f64) -> Self {
        self.offset = [x, y];
        self
    }

    const fn faded(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    const fn spinning(mut self, copies: u32, spin: Spin, phase_deg: f64) -> Self {
        self.copies = copies;
        self.spin = spin;
        self.phase_deg = phase_deg;
        self
    }
}

/// Available procedural patterns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShapePattern {
    /// Three orbiting discs.
    Tomoe,
    /// Three triangular blades.
    Pinwheel,
    /// Six radial bars.
    Star,
    /// Four curved blades.
    Spiral,
    /// Four mirrored blades turning the other way.
    Vortex,
}

impl ShapePattern {
    pub const ALL: [ShapePattern; 5] = [
        Self::Tomoe,
        Self::Pinwheel,
        Self::Star,
        Self::Spiral,
        Self::Vortex,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tomoe => "tomoe",
            Self::Pinwheel => "pinwheel",
            Self::Star => "star",
            Self::Spiral => "spiral",
            Self::Vortex => "vortex",
        }
    }
}

impl fmt::Display for ShapePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShapePattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<_> = Self::ALL.iter().map(|p| p.as_str()).collect();
                format!("unknown pattern '{s}' (expected one of {})", names.join(", "))
            })
    }
}

const BLADE: &[[f64; 2]] = &[[0.0, -40.0], [-25.0, 120.0], [25.0, 120.0]];
const BAR: &[[f64; 2]] = &[[-15.0, 30.0], [15.0, 30.0], [15.0, 130.0], [-15.0, 130.0]];
const CURL: &[[f64; 2]] = &[[0.0, -30.0], [40.0, 50.0], [0.0, 150.0], [-20.0, 80.0]];
const CURL_MIRRORED: &[[f64; 2]] = &[[0.0, -30.0], [20.0, 80.0], [0.0, 150.0], [-40.0, 50.0]];

const EYE: ShapeElement =
    ShapeElement::fixed("Eye White", ShapeKind::Disc { diameter: 480.0 }, EYE_WHITE);
const IRIS: ShapeElement = ShapeElement::fixed("Iris", ShapeKind::Disc { diameter: 400.0 }, IRIS_RED);
const PUPIL: ShapeElement = ShapeElement::fixed("Pupil", ShapeKind::Disc { diameter: 80.0 }, BLACK);
const GLINT: ShapeElement =
    ShapeElement::fixed("Highlight", ShapeKind::Disc { diameter: 20.0 }, WHITE)
        .at(-10.0, 10.0)
        .faded(60.0);
const OUTER_RING: ShapeElement = ShapeElement::fixed(
    "Outer Ring",
    ShapeKind::Ring {
        diameter: 440.0,
        stroke: 12.0,
    },
    BLACK,
);

// Bottom-most first.
const TOMOE: &[ShapeElement] = &[
    ShapeElement::fixed("Iris", ShapeKind::Disc { diameter: 440.0 }, IRIS_RED),
    ShapeElement::fixed(
        "Inner Ring",
        ShapeKind::Ring {
            diameter: 200.0,
            stroke: 3.0,
        },
        DEEP_RED,
    ),
    ShapeElement::fixed("Tomoe", ShapeKind::Disc { diameter: 70.0 }, BLACK)
        .at(120.0, 0.0)
        .spinning(3, Spin::Clockwise, 0.0),
    PUPIL,
    GLINT,
    OUTER_RING,
];

const PINWHEEL: &[ShapeElement] = &[
    EYE,
    IRIS,
    ShapeElement::fixed("Blade", ShapeKind::Polygon(BLADE), BLACK).spinning(
        3,
        Spin::Clockwise,
        0.0,
    ),
    PUPIL,
    GLINT,
    OUTER_RING,
];

const STAR: &[ShapeElement] = &[
    EYE,
    IRIS,
    ShapeElement::fixed("Star Point", ShapeKind::Polygon(BAR), BLACK).spinning(
        6,
        Spin::Clockwise,
        0.0,
    ),
    PUPIL,
    GLINT,
    OUTER_RING,
];

const SPIRAL: &[ShapeElement] = &[
    EYE,
    IRIS,
    ShapeElement::fixed("Spiral", ShapeKind::Polygon(CURL), BLACK).spinning(
        4,
        Spin::Clockwise,
        0.0,
    ),
    PUPIL,
    GLINT,
    OUTER_RING,
];

const VORTEX: &[ShapeElement] = &[
    EYE,
    IRIS,
    ShapeElement::fixed("Vortex Blade", ShapeKind::Polygon(CURL_MIRRORED), BLACK).spinning(
        4,
        Spin::CounterClockwise,
        45.0,
    ),
    PUPIL,
    GLINT,
    OUTER_RING,
];

/// Layout table of `pattern`, bottom-most element first.
pub fn pattern_elements(pattern: ShapePattern) -> &'static [ShapeElement] {
    match pattern {
        ShapePattern::Tomoe => TOMOE,
        ShapePattern::Pinwheel => PINWHEEL,
        ShapePattern::Star => STAR,
        ShapePattern::Spiral => SPIRAL,
        ShapePattern::Vortex => VORTEX,
    }
}

/// Timing and canvas for generated documents.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PatternOptions {
    /// Square canvas side in pixels.
    pub size: u32,
    pub frame_rate: u32,
    /// Length of one full turn.
    pub duration_s: f64,
}

impl Default for PatternOptions {
    fn default() -> Self {
        Self {
            size: 512,
            frame_rate: 30,
            duration_s: 3.0,
        }
    }
}

impl PatternOptions {
    pub fn validate(&self) -> CastResult<()> {
        validate_timing(self.size, self.frame_rate, self.duration_s)
    }

    fn total_ticks(&self) -> f64 {
        (self.duration_s * f64::from(self.frame_rate)).round().max(1.0)
    }
}

fn validate_timing(size: u32, frame_rate: u32, duration_s: f64) -> CastResult<()> {
    if size == 0 {
        return Err(CastError::validation("canvas size must be >= 1"));
    }
    if !(1..=240).contains(&frame_rate) {
        return Err(CastError::validation("frame_rate must be in 1..=240"));
    }
    if !duration_s.is_finite() || duration_s <= 0.0 {
        return Err(CastError::validation("duration must be finite and > 0"));
    }
    Ok(())
}

/// Bounding box of every copy of `element` on the design canvas.
pub(crate) fn element_bounds(element: &ShapeElement) -> Rect {
    let copies = element.copies.max(1);
    let step = 360.0 / f64::from(copies);
    (0..copies)
        .map(|k| {
            let rot = Affine::rotate((element.phase_deg + step * f64::from(k)).to_radians());
            local_outline(element, rot).bounding_box()
        })
        .reduce(|a, b| a.union(b))
        .unwrap_or(Rect::ZERO)
}

fn local_outline(element: &ShapeElement, xf: Affine) -> BezPath {
    let origin = Point::new(element.offset[0], element.offset[1]);
    match element.shape {
        ShapeKind::Disc { diameter } => xf * Circle::new(origin, diameter / 2.0).to_path(0.1),
        ShapeKind::Ellipse { width, height } => {
            let e = kurbo::Ellipse::new(origin, (width / 2.0, height / 2.0), 0.0);
            xf * e.to_path(0.1)
        }
        ShapeKind::Ring { diameter, stroke } => {
            xf * Circle::new(origin, (diameter + stroke) / 2.0).to_path(0.1)
        }
        ShapeKind::Polygon(vertices) => {
            let mut path = BezPath::new();
            for (i, v) in vertices.iter().enumerate() {
                let p = origin + kurbo::Vec2::new(v[0], v[1]);
                if i == 0 {
                    path.move_to(p);
                } else {
                    path.line_to(p);
                }
            }
            path.close_path();
            xf * path
        }
    }
}

fn static_pair(p: Point) -> Property {
    Property::fixed_vec(vec![p.x, p.y])
}

fn element_items(element: &ShapeElement, scale: f64) -> Vec<ShapeItem> {
    let to_canvas = Affine::scale(scale);
    let origin = to_canvas * Point::new(element.offset[0], element.offset[1]);
    let color = Property::fixed_vec(element.color.to_vec());
    let opacity = Property::fixed(element.opacity);

    let mut items = Vec::with_capacity(3);
    match element.shape {
        ShapeKind::Disc { diameter } => {
            items.push(ShapeItem::Ellipse {
                position: static_pair(origin),
                size: Property::fixed_vec(vec![diameter * scale, diameter * scale]),
            });
            items.push(ShapeItem::Fill { color, opacity });
        }
        ShapeKind::Ellipse { width, height } => {
            items.push(ShapeItem::Ellipse {
                position: static_pair(origin),
                size: Property::fixed_vec(vec![width * scale, height * scale]),
            });
            items.push(ShapeItem::Fill { color, opacity });
        }
        ShapeKind::Ring { diameter, stroke } => {
            items.push(ShapeItem::Ellipse {
                position: static_pair(origin),
                size: Property::fixed_vec(vec![diameter * scale, diameter * scale]),
            });
            items.push(ShapeItem::Stroke {
                color,
                opacity,
                width: Property::fixed(stroke * scale),
            });
        }
        ShapeKind::Polygon(vertices) => {
            let placed = vertices
                .iter()
                .map(|v| {
                    let p = to_canvas
                        * Point::new(element.offset[0] + v[0], element.offset[1] + v[1]);
                    [p.x, p.y]
                })
                .collect();
            items.push(ShapeItem::Path {
                path: PathProperty {
                    animated: 0,
                    bezier: Bezier::polygon(placed),
                },
            });
            items.push(ShapeItem::Fill { color, opacity });
        }
    }
    items.push(ShapeItem::GroupTransform {
        position: Property::fixed_vec(vec![0.0, 0.0]),
        anchor: Property::fixed_vec(vec![0.0, 0.0]),
        scale: Property::fixed_vec(vec![100.0, 100.0]),
        rotation: Property::fixed(0.0),
        opacity: Property::fixed(100.0),
    });
    items
}

fn full_turn(from_deg: f64, to_deg: f64, ticks: f64) -> Property {
    Property::keyframed(vec![
        Keyframe::at(0.0, from_deg).eased(EaseHandle::new(0.667, 1.0), EaseHandle::new(0.333, 0.0)),
        Keyframe::at(ticks, to_deg),
    ])
}

/// Build a shape-layer document for `pattern`.
///
/// Layers are emitted top-most first; elements with copies get one layer per copy.
#[tracing::instrument]
pub fn build_pattern_document(
    pattern: ShapePattern,
    opts: &PatternOptions,
) -> CastResult<AnimationDocument> {
    opts.validate()?;
    let size = f64::from(opts.size);
    let scale = size / DESIGN_CANVAS;
    let centre = [size / 2.0, size / 2.0];
    let ticks = opts.total_ticks();

    let mut doc = AnimationDocument::new(
        format!("{} pattern", pattern.as_str()),
        opts.frame_rate,
        opts.size,
        opts.size,
    );
    doc.out_tick = ticks;

    let mut index = 1u32;
    for element in pattern_elements(pattern).iter().rev() {
        let copies = element.copies.max(1);
        let step = 360.0 / f64::from(copies);
        for k in 0..copies {
            let phase = element.phase_deg + step * f64::from(k);
            let rotation = match element.spin {
                Spin::Static => Property::fixed(phase),
                Spin::Clockwise => full_turn(phase, phase + 360.0, ticks),
                Spin::CounterClockwise => full_turn(-phase, -phase - 360.0, ticks),
            };
            let name = if copies > 1 {
                format!("{} {}", element.name, k + 1)
            } else {
                element.name.to_string()
            };
            let group = ShapeItem::Group {
                name: name.clone(),
                items: element_items(element, scale),
                blend_mode: 0,
            };
            doc.layers.push(
                Layer::shape(
                    index,
                    name,
                    vec![group],
                    Transform::at(centre, [0.0, 0.0]).with_rotation(rotation),
                )
                .spanning(0.0, ticks),
            );
            index += 1;
        }
    }

    let extent = pattern_elements(pattern)
        .iter()
        .map(element_bounds)
        .reduce(|a, b| a.union(b))
        .unwrap_or(Rect::ZERO)
        .scale_from_origin(scale);
    tracing::debug!(
        layers = doc.layers.len(),
        extent = ?(extent.width(), extent.height()),
        "built pattern document"
    );
    doc.validate()?;
    Ok(doc)
}

/// Options for [`spin_document`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SpinOptions {
    /// Square canvas side in pixels.
    pub canvas: u32,
    pub frame_rate: u32,
    /// Length of one full turn.
    pub duration_s: f64,
    pub format: StillFormat,
    pub quality: u8,
}

impl Default for SpinOptions {
    fn default() -> Self {
        Self {
            canvas: 512,
            frame_rate: 30,
            duration_s: 3.0,
            format: StillFormat::Png,
            quality: 90,
        }
    }
}

/// Letterbox `frame` into a transparent square canvas of side `canvas`.
///
/// The image is scaled (up or down) until its larger side matches the canvas.
pub fn letterbox(frame: Frame, canvas: u32) -> CastResult<Frame> {
    if canvas == 0 {
        return Err(CastError::validation("canvas size must be >= 1"));
    }
    let (w, h) = frame.dimensions();
    if (w, h) == (canvas, canvas) {
        return Ok(frame);
    }
    let fit = f64::from(canvas) / f64::from(w.max(h));
    let nw = ((f64::from(w) * fit) as u32).clamp(1, canvas);
    let nh = ((f64::from(h) * fit) as u32).clamp(1, canvas);
    let resized = image::imageops::resize(
        &frame.into_rgba_image()?,
        nw,
        nh,
        image::imageops::FilterType::Lanczos3,
    );
    let mut square = image::RgbaImage::new(canvas, canvas);
    image::imageops::overlay(
        &mut square,
        &resized,
        i64::from((canvas - nw) / 2),
        i64::from((canvas - nh) / 2),
    );
    Frame::from_rgba_image(square)
}

/// One still rotating a full turn about the canvas centre.
pub fn spin_document(
    frame: Frame,
    remover: Option<&dyn BackgroundRemover>,
    opts: &SpinOptions,
) -> CastResult<AnimationDocument> {
    validate_timing(opts.canvas, opts.frame_rate, opts.duration_s)?;
    let frame = match remover {
        Some(r) => r.remove(frame)?,
        None => frame,
    };
    let frame = letterbox(frame, opts.canvas)?;
    let still = encode_frame(&frame, opts.format, opts.quality)?;

    let ticks = (opts.duration_s * f64::from(opts.frame_rate)).round().max(1.0);
    let mut doc =
        AnimationDocument::new("Rotating image", opts.frame_rate, opts.canvas, opts.canvas);
    doc.out_tick = ticks;
    doc.assets
        .push(Asset::embedded("spin_image", opts.canvas, opts.canvas, still.data_uri()));
    doc.layers.push(
        Layer::image(
            1,
            "Rotating image".to_string(),
            "spin_image".to_string(),
            Transform::centered(opts.canvas, opts.canvas)
                .with_rotation(full_turn(0.0, 360.0, ticks)),
        )
        .spanning(0.0, ticks),
    );
    doc.validate()?;
    Ok(doc)
}

#[cfg(test)]
#[path = "../../tests/unit/document/shapes.rs"]
mod tests;
