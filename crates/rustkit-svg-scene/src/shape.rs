//! Output model: styled shapes for a renderer.

use crate::clip::ClipGeometry;
use crate::filter::Filter;
use crate::geometry::{Geometry, Rect};
use crate::paint::Paint;
use crate::transform::Transform2D;
use std::rc::Rc;

/// `stroke-linecap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

impl LineCap {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "butt" => Some(LineCap::Butt),
            "round" => Some(LineCap::Round),
            "square" => Some(LineCap::Square),
            _ => None,
        }
    }
}

/// `stroke-linejoin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

impl LineJoin {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "miter" | "miter-clip" => Some(LineJoin::Miter),
            "round" => Some(LineJoin::Round),
            "bevel" => Some(LineJoin::Bevel),
            _ => None,
        }
    }
}

/// `fill-rule` / `clip-rule`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

impl FillRule {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "nonzero" => Some(FillRule::NonZero),
            "evenodd" => Some(FillRule::EvenOdd),
            _ => None,
        }
    }
}

/// Fill of a shape. `opacity` combines `fill-opacity` with every
/// enclosing `opacity`.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub paint: Paint,
    pub rule: FillRule,
    pub opacity: f64,
}

/// Stroke of a shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub paint: Paint,
    pub width: f64,
    /// Dash lengths; empty for a solid stroke. Always of even length.
    pub dash_array: Vec<f64>,
    pub dash_offset: f64,
    pub line_cap: LineCap,
    pub line_join: LineJoin,
    pub miter_limit: f64,
    pub opacity: f64,
}

impl Default for Stroke {
    fn default() -> Self {
        Self {
            paint: Paint::None,
            width: 1.0,
            dash_array: Vec::new(),
            dash_offset: 0.0,
            line_cap: LineCap::Butt,
            line_join: LineJoin::Miter,
            miter_limit: 4.0,
            opacity: 1.0,
        }
    }
}

/// Why a shape was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShapeRole {
    /// Outline of a document element.
    #[default]
    Geometry,
    /// Content of a marker placed on a vertex.
    Marker,
    /// Hairline emitted for `emit_debug_path_segments`.
    DebugSegment,
}

/// One renderable primitive.
///
/// `clip` is expressed in the same space as the output of `transform`, so a
/// renderer applies `transform` to the geometry and uses `clip` as is.
#[derive(Debug, Clone, PartialEq)]
pub struct StyledShape {
    pub id: Option<String>,
    pub geometry: Geometry,
    pub fill: Option<Fill>,
    pub stroke: Option<Stroke>,
    pub clip: Option<ClipGeometry>,
    pub transform: Option<Transform2D>,
    /// Filters to apply, innermost element first.
    pub filters: Vec<Rc<Filter>>,
    pub role: ShapeRole,
}

impl StyledShape {
    /// An unpainted shape.
    pub fn new(geometry: Geometry) -> Self {
        Self {
            id: None,
            geometry,
            fill: None,
            stroke: None,
            clip: None,
            transform: None,
            filters: Vec::new(),
            role: ShapeRole::Geometry,
        }
    }

    /// Transform, identity when unset.
    pub fn effective_transform(&self) -> Transform2D {
        self.transform.unwrap_or_default()
    }

    /// Geometry bounds after `transform`, ignoring stroke width and clip.
    pub fn bounds(&self, tolerance: f64) -> Option<Rect> {
        self.geometry.transformed_bounds(&self.effective_transform(), tolerance)
    }

    /// Place this shape inside a container whose transform is `t`.
    pub fn place_in(&mut self, t: &Transform2D) {
        if t.is_identity() {
            return;
        }
        self.transform = Some(t.multiply(&self.effective_transform()));
        if let Some(clip) = &self.clip {
            self.clip = Some(clip.transformed(t));
        }
    }

    /// Multiply a container opacity into fill and stroke.
    pub fn fade(&mut self, opacity: f64) {
        if let Some(fill) = &mut self.fill {
            fill.opacity *= opacity;
        }
        if let Some(stroke) = &mut self.stroke {
            stroke.opacity *= opacity;
        }
    }

    /// Intersect with `clip`, given in the output space of `transform`.
    pub fn clip_to(&mut self, clip: ClipGeometry) {
        self.clip = Some(match self.clip.take() {
            Some(own) => own.intersect(clip),
            None => clip,
        });
    }

    /// True for outlines of document elements, as opposed to markers and
    /// debug hairlines. Only these count toward bounding boxes and clips.
    pub fn is_geometry(&self) -> bool {
        self.role == ShapeRole::Geometry
    }

    /// True when neither fill nor stroke would paint anything.
    pub fn is_invisible(&self) -> bool {
        let fill_visible = self.fill.as_ref().is_some_and(|f| !f.paint.is_none() && f.opacity > 0.0);
        let stroke_visible = self
            .stroke
            .as_ref()
            .is_some_and(|s| !s.paint.is_none() && s.opacity > 0.0 && s.width > 0.0);
        !fill_visible && !stroke_visible
    }
}
