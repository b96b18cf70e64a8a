//! Shape builder: walks the indexed tree and emits styled shapes.
//!
//! ## Coordinate spaces
//!
//! Every builder produces shapes in the user space of the element it was
//! called for, *before* that element's own `transform`. The element's
//! effects are then applied in one place, `apply_element_effects`, which
//! keeps each shape's clip in the output space of the shape's transform.

use crate::clip::{ClipGeometry, ResolvedClip};
use crate::config::InterpreterConfig;
use crate::filter::{read_filter, Filter};
use crate::geometry::{Geometry, Rect};
use crate::index::{iri_target, ElementId, ElementIndex, Tag};
use crate::measure::{PathMeasure, SegmentEnd};
use crate::paint::{Color, GradientUnits, Paint, PaintResolver};
use crate::parse::{parse_length_list, parse_number_list, parse_opacity, parse_points, Axis, Cursor, Length};
use crate::path::PathData;
use crate::shape::{Fill, FillRule, LineCap, LineJoin, ShapeRole, Stroke, StyledShape};
use crate::text::{
    normalize_whitespace, BoxFontProvider, FontDescriptor, FontProvider, LengthAdjust, RunLayout, TextAnchor,
    TextLayoutEngine, TextRun, TextSpan,
};
use crate::transform::{parse_transform, Transform2D};
use crate::tree::DocumentNode;
use crate::Warning;
use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;
use std::rc::Rc;
use tracing::{debug, trace, warn};

/// Attributes of a `use` element that belong to the `use` itself and are
/// never copied onto the referenced content.
const USE_LOCAL_ATTRIBUTES: &[&str] = &[
    "id",
    "x",
    "y",
    "width",
    "height",
    "href",
    "xlink:href",
    "transform",
    "style",
    "opacity",
    "clip-path",
    "filter",
    "mask",
    "display",
];

/// Pieces of a text element, in document order.
enum TextItem {
    Span { element: ElementId, span: TextSpan },
    OnPath { element: ElementId },
}

// ==================== Interpreter ====================

/// Interprets one document into styled shapes.
///
/// Owns the per-document caches: the element arena with its attribute
/// memo, resolved gradients, clip paths and filters.
pub struct Interpreter {
    config: InterpreterConfig,
    index: ElementIndex,
    paint: PaintResolver,
    fonts: Rc<dyn FontProvider>,
    clips: HashMap<String, Option<Rc<ResolvedClip>>>,
    clips_in_progress: HashSet<String>,
    filters: HashMap<String, Option<Rc<Filter>>>,
    viewport: (f64, f64),
    depth_limit: usize,
    /// Subtrees skipped at the depth limit so far.
    truncations: usize,
    scene: Option<Vec<StyledShape>>,
    warnings: Vec<Warning>,
}

impl Interpreter {
    /// Index `root` and prepare an interpreter for it.
    pub fn from_tree<N: DocumentNode>(root: N, config: InterpreterConfig) -> Self {
        let mut index = ElementIndex::build(root);
        let warnings = index.take_warnings();
        let viewport = document_viewport(&index, config.viewport);
        let depth_limit = config.depth_limit(index.tree_depth());
        debug!(
            width = viewport.0,
            height = viewport.1,
            depth_limit,
            "interpreter ready"
        );

        Self {
            paint: PaintResolver::new(viewport),
            fonts: Rc::new(BoxFontProvider),
            clips: HashMap::new(),
            clips_in_progress: HashSet::new(),
            filters: HashMap::new(),
            viewport,
            depth_limit,
            truncations: 0,
            scene: None,
            warnings,
            index,
            config,
        }
    }

    /// Use `provider` for glyph outlines instead of `.notdef` boxes.
    pub fn with_font_provider(mut self, provider: impl FontProvider + 'static) -> Self {
        self.fonts = Rc::new(provider);
        self
    }

    /// Walk the document and return its shapes in document order. Later
    /// calls return the same scene without walking again.
    pub fn build(&mut self) -> Vec<StyledShape> {
        if let Some(scene) = &self.scene {
            return scene.clone();
        }
        let shapes = match self.index.root() {
            Some(root) => self.build_element(root, 0),
            None => Vec::new(),
        };
        self.collect_warnings();
        self.scene = Some(shapes.clone());
        debug!(
            shapes = shapes.len(),
            elements = self.index.len(),
            warnings = self.warnings.len(),
            "scene built"
        );
        shapes
    }

    /// Resolve the paint server with `id` in its own units. Unknown ids
    /// resolve to [`Paint::None`].
    pub fn resolve_paint(&mut self, id: &str) -> Paint {
        let paint = match self.paint.resolve_gradient(&self.index, id) {
            Some(gradient) => Paint::Gradient(gradient),
            None => {
                self.record(Warning::UnresolvedReference(id.to_string()));
                Paint::None
            }
        };
        self.collect_warnings();
        paint
    }

    /// Resolve the `clipPath` with `id` into one geometry, in its own units.
    pub fn resolve_clip_path(&mut self, id: &str) -> Option<ClipGeometry> {
        let clip = self.resolved_clip(id, 0).map(|c| c.geometry.clone());
        self.collect_warnings();
        clip
    }

    /// Warnings recorded so far.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// The element index, including reference copies made so far.
    pub fn index(&self) -> &ElementIndex {
        &self.index
    }

    /// Viewport size used for percentages.
    pub fn viewport(&self) -> (f64, f64) {
        self.viewport
    }

    fn record(&mut self, warning: Warning) {
        warn!(%warning, "interpreter");
        self.warnings.push(warning);
    }

    fn collect_warnings(&mut self) {
        let paint = self.paint.take_warnings();
        self.warnings.extend(paint);
    }

    // ==================== Dispatch ====================

    fn build_element(&mut self, el: ElementId, depth: usize) -> Vec<StyledShape> {
        if depth > self.depth_limit {
            self.truncations += 1;
            let tag = format!("{:?}", self.index.element(el).tag);
            self.record(Warning::RecursionLimit {
                tag,
                limit: self.depth_limit,
            });
            return Vec::new();
        }
        if self.attr(el, "display").is_some_and(|d| d.trim() == "none") {
            return Vec::new();
        }

        let tag = self.index.element(el).tag.clone();
        trace!(?tag, element = el.raw(), depth, "build element");
        match tag {
            Tag::Svg => {
                let nested = Some(el) != self.index.root();
                let viewport = self.viewport_transform(el, nested);
                self.build_container(el, depth, viewport)
            }
            Tag::G | Tag::A => self.build_container(el, depth, Transform2D::identity()),
            // Symbols only render through `use`.
            Tag::Symbol if self.is_use_instance(el) => {
                let viewport = self.viewport_transform(el, true);
                self.build_container(el, depth, viewport)
            }
            Tag::Use => self.build_use(el, depth),
            Tag::Text => self.build_text(el, depth),
            ref t if t.is_shape() => self.build_leaf(el, depth),
            ref t if t.is_never_rendered() => Vec::new(),
            Tag::Unknown(name) => {
                self.record(Warning::UnknownElement(name));
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn build_container(&mut self, el: ElementId, depth: usize, viewport: Transform2D) -> Vec<StyledShape> {
        let children = self.index.element(el).children().to_vec();
        let mut shapes = Vec::new();
        for child in children {
            shapes.extend(self.build_element(child, depth + 1));
        }
        self.apply_element_effects(el, shapes, viewport, depth)
    }

    /// Apply `el`'s opacity, clip, filter and transform to shapes built in
    /// its user space. `extra` places the shapes inside that user space
    /// (viewport mapping, `use` offset) before the clip is applied.
    fn apply_element_effects(
        &mut self,
        el: ElementId,
        mut shapes: Vec<StyledShape>,
        extra: Transform2D,
        depth: usize,
    ) -> Vec<StyledShape> {
        if shapes.is_empty() {
            return shapes;
        }
        for shape in &mut shapes {
            shape.place_in(&extra);
        }
        let bbox = union_bounds(&shapes, self.tolerance());
        let opacity = self.opacity_value(el, "opacity", false);
        let clip = self.clip_for(el, bbox, depth);
        let filter = self.filter_for(el);
        let transform = self.transform_of(el);

        for shape in &mut shapes {
            if opacity < 1.0 {
                shape.fade(opacity);
            }
            if let Some(clip) = &clip {
                shape.clip_to(clip.clone());
            }
            if let Some(filter) = &filter {
                shape.filters.push(Rc::clone(filter));
            }
            shape.place_in(&transform);
        }
        shapes
    }

    // ==================== Leaf Shapes ====================

    fn build_leaf(&mut self, el: ElementId, depth: usize) -> Vec<StyledShape> {
        if self.is_hidden(el) {
            return Vec::new();
        }
        let Some(geometry) = self.geometry_of(el) else {
            return Vec::new();
        };
        let tolerance = self.tolerance();
        let bbox = geometry.bounds(tolerance);

        let mut shape = StyledShape::new(geometry.clone());
        shape.id = self.index.element(el).id().map(str::to_string);
        self.paint_shape(el, &mut shape, bbox);

        let mut shapes = vec![shape];
        if self.config.emit_debug_path_segments {
            shapes.extend(debug_segments(&geometry, tolerance));
        }
        if geometry.is_path_like() {
            shapes.extend(self.build_markers(el, &geometry, depth));
        }
        self.apply_element_effects(el, shapes, Transform2D::identity(), depth)
    }

    /// Outline of a basic shape, or `None` when it would not render.
    fn geometry_of(&self, el: ElementId) -> Option<Geometry> {
        let h = Axis::Horizontal;
        let v = Axis::Vertical;
        match self.index.element(el).tag {
            Tag::Rect => {
                let width = self.length(el, "width", h, 0.0);
                let height = self.length(el, "height", v, 0.0);
                if width <= 0.0 || height <= 0.0 {
                    return None;
                }
                let rx = self.optional_length(el, "rx", h);
                let ry = self.optional_length(el, "ry", v);
                let (rx, ry) = match (rx, ry) {
                    (Some(rx), Some(ry)) => (rx, ry),
                    (Some(r), None) | (None, Some(r)) => (r, r),
                    (None, None) => (0.0, 0.0),
                };
                Some(Geometry::Rect {
                    x: self.length(el, "x", h, 0.0),
                    y: self.length(el, "y", v, 0.0),
                    width,
                    height,
                    rx: rx.clamp(0.0, width / 2.0),
                    ry: ry.clamp(0.0, height / 2.0),
                })
            }
            Tag::Circle => {
                let r = self.length(el, "r", Axis::Diagonal, 0.0);
                (r > 0.0).then(|| Geometry::Ellipse {
                    cx: self.length(el, "cx", h, 0.0),
                    cy: self.length(el, "cy", v, 0.0),
                    rx: r,
                    ry: r,
                })
            }
            Tag::Ellipse => {
                let rx = self.optional_length(el, "rx", h);
                let ry = self.optional_length(el, "ry", v);
                let (rx, ry) = match (rx, ry) {
                    (Some(rx), Some(ry)) => (rx, ry),
                    (Some(r), None) | (None, Some(r)) => (r, r),
                    (None, None) => return None,
                };
                (rx > 0.0 && ry > 0.0).then(|| Geometry::Ellipse {
                    cx: self.length(el, "cx", h, 0.0),
                    cy: self.length(el, "cy", v, 0.0),
                    rx,
                    ry,
                })
            }
            Tag::Line => Some(Geometry::Line {
                x1: self.length(el, "x1", h, 0.0),
                y1: self.length(el, "y1", v, 0.0),
                x2: self.length(el, "x2", h, 0.0),
                y2: self.length(el, "y2", v, 0.0),
            }),
            Tag::Polyline | Tag::Polygon => {
                let points = parse_points(&self.attr(el, "points")?);
                if points.len() < 2 {
                    return None;
                }
                let closed = self.index.element(el).tag == Tag::Polygon;
                Some(Geometry::Path(PathData::from_points(&points, closed)))
            }
            Tag::Path => {
                let path = PathData::parse(&self.attr(el, "d")?);
                (!path.is_empty()).then_some(Geometry::Path(path))
            }
            _ => None,
        }
    }

    fn paint_shape(&mut self, el: ElementId, shape: &mut StyledShape, bbox: Option<Rect>) {
        shape.fill = self.fill_for(el, bbox);
        shape.stroke = self.stroke_for(el, bbox);
    }

    fn fill_for(&mut self, el: ElementId, bbox: Option<Rect>) -> Option<Fill> {
        let raw = self.inherited(el, "fill").unwrap_or_else(|| "black".to_string());
        let paint = self
            .paint
            .resolve_paint(&self.index, el, &raw, 1.0, Paint::Color(Color::BLACK));
        let paint = bind_paint(paint, bbox)?;
        Some(Fill {
            paint,
            rule: self
                .inherited(el, "fill-rule")
                .and_then(|r| FillRule::parse(&r))
                .unwrap_or_default(),
            opacity: self.opacity_value(el, "fill-opacity", true),
        })
    }

    fn stroke_for(&mut self, el: ElementId, bbox: Option<Rect>) -> Option<Stroke> {
        let raw = self.inherited(el, "stroke")?;
        let paint = self.paint.resolve_paint(&self.index, el, &raw, 1.0, Paint::None);
        let paint = bind_paint(paint, bbox)?;
        let width = self.stroke_width(el);
        if width <= 0.0 {
            return None;
        }
        let diagonal = self.reference(Axis::Diagonal);

        let dash_array = self
            .inherited(el, "stroke-dasharray")
            .filter(|d| d.trim() != "none")
            .and_then(|d| parse_length_list(&d))
            .map(|list| list.iter().map(|l| l.to_pixels(Some(diagonal))).collect::<Vec<f64>>())
            .filter(|d| !d.is_empty() && d.iter().all(|v| *v >= 0.0) && d.iter().sum::<f64>() > 0.0)
            .map(|mut d| {
                if d.len() % 2 == 1 {
                    d.extend_from_within(..);
                }
                d
            })
            .unwrap_or_default();

        Some(Stroke {
            paint,
            width,
            dash_array,
            dash_offset: self
                .inherited(el, "stroke-dashoffset")
                .and_then(|o| Length::parse(&o))
                .map_or(0.0, |l| l.to_pixels(Some(diagonal))),
            line_cap: self
                .inherited(el, "stroke-linecap")
                .and_then(|c| LineCap::parse(&c))
                .unwrap_or_default(),
            line_join: self
                .inherited(el, "stroke-linejoin")
                .and_then(|j| LineJoin::parse(&j))
                .unwrap_or_default(),
            miter_limit: self
                .inherited(el, "stroke-miterlimit")
                .and_then(|m| m.trim().parse::<f64>().ok())
                .filter(|m| *m >= 1.0)
                .unwrap_or(4.0),
            opacity: self.opacity_value(el, "stroke-opacity", true),
        })
    }

    fn stroke_width(&self, el: ElementId) -> f64 {
        self.inherited(el, "stroke-width")
            .and_then(|w| Length::parse(&w))
            .map_or(1.0, |l| l.to_pixels(Some(self.reference(Axis::Diagonal))))
    }

    // ==================== Markers ====================

    fn build_markers(&mut self, el: ElementId, geometry: &Geometry, depth: usize) -> Vec<StyledShape> {
        let ids: Vec<Option<String>> = ["marker-start", "marker-mid", "marker-end"]
            .iter()
            .map(|name| self.inherited(el, name).and_then(|v| iri_target(&v)))
            .collect();
        if ids.iter().all(Option::is_none) {
            return Vec::new();
        }

        let measure = PathMeasure::new(&geometry.to_path(), self.tolerance());
        if measure.total_length() <= 0.0 {
            return Vec::new();
        }
        let ends = measure.segment_ends();
        let last = ends.len().saturating_sub(1);
        let stroke_width = self.stroke_width(el);

        let mut shapes = Vec::new();
        for (i, vertex) in ends.iter().enumerate() {
            let slot = match i {
                0 => 0,
                i if i == last => 2,
                _ => 1,
            };
            let Some(id) = &ids[slot] else {
                continue;
            };
            shapes.extend(self.place_marker(id, vertex, slot == 0, stroke_width, depth));
        }
        shapes
    }

    fn place_marker(
        &mut self,
        id: &str,
        vertex: &SegmentEnd,
        at_start: bool,
        stroke_width: f64,
        depth: usize,
    ) -> Vec<StyledShape> {
        let Some(marker) = self.index.lookup(id).filter(|m| self.index.element(*m).tag == Tag::Marker) else {
            self.record(Warning::UnresolvedReference(id.to_string()));
            return Vec::new();
        };

        let angle = match self.attr(marker, "orient").as_deref().map(str::trim) {
            Some("auto") => vertex.angle(),
            Some("auto-start-reverse") if at_start => vertex.angle() + PI,
            Some("auto-start-reverse") => vertex.angle(),
            Some(value) => Cursor::new(value).next_angle().unwrap_or(0.0),
            None => 0.0,
        };
        let units_scale = match self.attr(marker, "markerUnits").as_deref() {
            Some("userSpaceOnUse") => 1.0,
            _ => stroke_width,
        };
        let view_box_scale = match parse_view_box(self.attr(marker, "viewBox").as_deref()) {
            Some([_, _, vw, vh]) => {
                let mw = self.length(marker, "markerWidth", Axis::Horizontal, 3.0);
                let mh = self.length(marker, "markerHeight", Axis::Vertical, 3.0);
                (mw / vw).min(mh / vh)
            }
            None => 1.0,
        };
        let ref_x = self.length(marker, "refX", Axis::Horizontal, 0.0);
        let ref_y = self.length(marker, "refY", Axis::Vertical, 0.0);

        let scale = units_scale * view_box_scale;
        let placement = Transform2D::from_translate(vertex.x, vertex.y)
            .rotate(angle)
            .scale(scale, scale)
            .translate(-ref_x, -ref_y);

        let children = self.index.element(marker).children().to_vec();
        let mut shapes = Vec::new();
        for child in children {
            shapes.extend(self.build_element(child, depth + 1));
        }
        for shape in &mut shapes {
            shape.place_in(&placement);
            shape.role = ShapeRole::Marker;
        }
        trace!(marker = id, shapes = shapes.len(), "marker placed");
        shapes
    }

    // ==================== Use ====================

    fn build_use(&mut self, el: ElementId, depth: usize) -> Vec<StyledShape> {
        let element = self.index.element(el);
        let Some(href) = element
            .local_value("href")
            .or_else(|| element.local_value("xlink:href"))
            .map(str::to_string)
        else {
            return Vec::new();
        };
        let Some(target) = self.index.lookup_iri(&href) else {
            self.record(Warning::UnresolvedReference(href));
            return Vec::new();
        };
        if self.references_ancestor(el, target) {
            self.record(Warning::ReferenceCycle(href));
            return Vec::new();
        }

        let overrides = self.use_overrides(el, target);
        let copy = self.index.instantiate(target, el, overrides);
        trace!(href = %href, copy = copy.raw(), "use instantiated");

        let shapes = self.build_element(copy, depth + 1);
        let offset = Transform2D::from_translate(
            self.length(el, "x", Axis::Horizontal, 0.0),
            self.length(el, "y", Axis::Vertical, 0.0),
        );
        self.apply_element_effects(el, shapes, offset, depth)
    }

    /// Attributes and style of the `use` element, restricted to names the
    /// target does not set itself.
    fn use_overrides(&self, el: ElementId, target: ElementId) -> HashMap<String, String> {
        let use_el = self.index.element(el);
        let target_el = self.index.element(target);
        let mut overrides = HashMap::new();
        let candidates = use_el
            .style_map()
            .iter()
            .chain(use_el.overrides().iter())
            .chain(use_el.attributes().iter());
        for (name, value) in candidates {
            if USE_LOCAL_ATTRIBUTES.contains(&name.as_str()) || target_el.has_own_value(name) {
                continue;
            }
            overrides.entry(name.clone()).or_insert_with(|| value.clone());
        }
        if target_el.tag == Tag::Symbol {
            for dimension in ["width", "height"] {
                if let Some(value) = use_el.attribute(dimension) {
                    overrides.insert(dimension.to_string(), value.to_string());
                }
            }
        }
        overrides
    }

    /// True for the root of a `use` reference copy.
    fn is_use_instance(&self, el: ElementId) -> bool {
        let element = self.index.element(el);
        element.copy_of().is_some()
            && element
                .parent()
                .is_some_and(|p| self.index.element(p).tag == Tag::Use)
    }

    /// True if `target` is `el`, one of its ancestors, or the source of one
    /// of their copies.
    fn references_ancestor(&self, el: ElementId, target: ElementId) -> bool {
        let mut current = Some(el);
        while let Some(id) = current {
            let element = self.index.element(id);
            if id == target || element.copy_of() == Some(target) {
                return true;
            }
            current = element.parent();
        }
        false
    }

    // ==================== Text ====================

    fn build_text(&mut self, el: ElementId, depth: usize) -> Vec<StyledShape> {
        let preserve = self.inherited(el, "xml:space").as_deref() == Some("preserve");
        let origin = (
            self.first_length(el, "x", Axis::Horizontal).unwrap_or(0.0)
                + self.first_length(el, "dx", Axis::Horizontal).unwrap_or(0.0),
            self.first_length(el, "y", Axis::Vertical).unwrap_or(0.0)
                + self.first_length(el, "dy", Axis::Vertical).unwrap_or(0.0),
        );

        let mut items = Vec::new();
        for child in self.index.element(el).children().to_vec() {
            let child_el = self.index.element(child);
            match child_el.tag {
                Tag::TextNode => {
                    let text = normalize_whitespace(child_el.text().unwrap_or_default(), preserve);
                    let span = self.text_span(el, text, false);
                    items.push(TextItem::Span { element: el, span });
                }
                Tag::Tspan => {
                    if self.attr(child, "display").is_some_and(|d| d.trim() == "none") {
                        continue;
                    }
                    let text = normalize_whitespace(&self.text_content(child), preserve);
                    let span = self.text_span(child, text, true);
                    items.push(TextItem::Span { element: child, span });
                }
                Tag::TextPath => items.push(TextItem::OnPath { element: child }),
                _ => {}
            }
        }
        if !preserve {
            trim_spans(&mut items);
        }

        let fonts = Rc::clone(&self.fonts);
        let engine = TextLayoutEngine::new(fonts.as_ref());
        let mut runs: Vec<(ElementId, TextRun)> = Vec::new();
        let mut batch: Vec<(ElementId, TextSpan)> = Vec::new();
        let mut pen = origin;
        for item in items {
            match item {
                TextItem::Span { element, span } => batch.push((element, span)),
                TextItem::OnPath { element } => {
                    self.flush_spans(&engine, &mut batch, &mut pen, &mut runs);
                    if let Some(run) = self.layout_text_path(&engine, element, preserve) {
                        runs.push((element, run));
                    }
                }
            }
        }
        self.flush_spans(&engine, &mut batch, &mut pen, &mut runs);

        let tolerance = self.tolerance();
        let mut shapes = Vec::new();
        for (element, run) in runs {
            if run.is_empty() || self.is_hidden(element) {
                continue;
            }
            let geometry = Geometry::Path(run.outline());
            let bbox = geometry.bounds(tolerance);
            let mut shape = StyledShape::new(geometry);
            shape.id = self.index.element(element).id().map(str::to_string);
            self.paint_shape(element, &mut shape, bbox);
            if element != el {
                shape.fade(self.opacity_value(element, "opacity", false));
            }
            shapes.push(shape);
        }
        self.apply_element_effects(el, shapes, Transform2D::identity(), depth)
    }

    fn text_span(&self, el: ElementId, text: String, positioned: bool) -> TextSpan {
        let h = Axis::Horizontal;
        let v = Axis::Vertical;
        TextSpan {
            text,
            font: self.font_for(el),
            x: positioned.then(|| self.first_length(el, "x", h)).flatten(),
            y: positioned.then(|| self.first_length(el, "y", v)).flatten(),
            dx: if positioned { self.first_length(el, "dx", h).unwrap_or(0.0) } else { 0.0 },
            dy: if positioned { self.first_length(el, "dy", v).unwrap_or(0.0) } else { 0.0 },
            layout: self.run_layout(el),
        }
    }

    fn flush_spans(
        &mut self,
        engine: &TextLayoutEngine<'_>,
        batch: &mut Vec<(ElementId, TextSpan)>,
        pen: &mut (f64, f64),
        runs: &mut Vec<(ElementId, TextRun)>,
    ) {
        if batch.is_empty() {
            return;
        }
        let spans: Vec<TextSpan> = batch.iter().map(|(_, span)| span.clone()).collect();
        let results = engine.layout_spans(&spans, *pen);
        for ((element, _), result) in batch.drain(..).zip(results) {
            match result {
                Ok(run) => {
                    *pen = run.pen;
                    runs.push((element, run));
                }
                Err(e) => self.record(Warning::FontFailure(e)),
            }
        }
    }

    fn layout_text_path(&mut self, engine: &TextLayoutEngine<'_>, el: ElementId, preserve: bool) -> Option<TextRun> {
        let element = self.index.element(el);
        let href = element
            .local_value("href")
            .or_else(|| element.local_value("xlink:href"))
            .unwrap_or_default()
            .to_string();
        let Some(target) = self
            .index
            .lookup_iri(&href)
            .filter(|t| self.index.element(*t).tag == Tag::Path)
        else {
            self.record(Warning::UnresolvedReference(href));
            return None;
        };

        let geometry = self.geometry_of(target)?;
        let path = geometry.to_path().transformed(&self.transform_of(target));
        let measure = PathMeasure::new(&path, self.tolerance());
        let start_offset = self
            .attr(el, "startOffset")
            .and_then(|o| Length::parse(&o))
            .map_or(0.0, |l| l.to_pixels(Some(measure.total_length())));

        let text = normalize_whitespace(&self.text_content(el), preserve);
        let text = if preserve { text } else { text.trim().to_string() };
        let font = self.font_for(el);
        let layout = self.run_layout(el);
        match engine.layout_on_path(&font, &text, &measure, start_offset, &layout) {
            Ok(run) => Some(run),
            Err(e) => {
                self.record(Warning::FontFailure(e));
                None
            }
        }
    }

    /// Character data of `el` and its `tspan` descendants.
    fn text_content(&self, el: ElementId) -> String {
        let mut out = String::new();
        for &child in self.index.element(el).children() {
            let child_el = self.index.element(child);
            match child_el.tag {
                Tag::TextNode => out.push_str(child_el.text().unwrap_or_default()),
                Tag::Tspan => out.push_str(&self.text_content(child)),
                _ => {}
            }
        }
        out
    }

    /// Computed font of `el`: its own `font-*` values applied on top of the
    /// parent's computed font, so relative sizes and weights chain.
    ///
    /// `use` overrides are skipped; the `use` element itself is already in
    /// the ancestor chain.
    fn font_for(&self, el: ElementId) -> FontDescriptor {
        let element = self.index.element(el);
        let base = match element.parent() {
            Some(parent) => self.font_for(parent),
            None => self.config.default_font.clone(),
        };
        let own = |name: &str| {
            element
                .attribute(name)
                .or_else(|| element.style_value(name))
                .filter(|v| v.trim() != "inherit")
        };
        base.with_attributes(own("font-family"), own("font-size"), own("font-weight"), own("font-style"))
    }

    fn run_layout(&self, el: ElementId) -> RunLayout {
        RunLayout {
            anchor: self
                .inherited(el, "text-anchor")
                .and_then(|a| TextAnchor::parse(&a))
                .unwrap_or_default(),
            text_length: self.optional_length(el, "textLength", Axis::Horizontal),
            length_adjust: self
                .attr(el, "lengthAdjust")
                .and_then(|a| LengthAdjust::parse(&a))
                .unwrap_or_default(),
        }
    }

    // ==================== Clip Paths ====================

    /// Clip of `el` in its user space, or `None` when it has none.
    fn clip_for(&mut self, el: ElementId, bbox: Option<Rect>, depth: usize) -> Option<ClipGeometry> {
        let raw = self.attr(el, "clip-path")?;
        let id = iri_target(&raw)?;
        let clip = self.resolved_clip(&id, depth)?;
        Some(clip.for_bbox(bbox).unwrap_or_else(ClipGeometry::empty))
    }

    fn resolved_clip(&mut self, id: &str, depth: usize) -> Option<Rc<ResolvedClip>> {
        if let Some(cached) = self.clips.get(id) {
            return cached.clone();
        }
        if self.clips_in_progress.contains(id) {
            self.record(Warning::ReferenceCycle(id.to_string()));
            return None;
        }
        let truncations = self.truncations;
        let resolved = self.compute_clip(id, depth);
        // A clip cut short by the depth limit is only valid at this depth.
        if self.truncations == truncations {
            self.clips.insert(id.to_string(), resolved.clone());
        }
        resolved
    }

    fn compute_clip(&mut self, id: &str, depth: usize) -> Option<Rc<ResolvedClip>> {
        let Some(el) = self.index.lookup(id) else {
            self.record(Warning::UnresolvedReference(id.to_string()));
            return None;
        };
        if self.index.element(el).tag != Tag::ClipPath {
            self.record(Warning::InvalidClipPath(id.to_string()));
            return None;
        }

        self.clips_in_progress.insert(id.to_string());
        let mut members = Vec::new();
        for child in self.index.element(el).children().to_vec() {
            for shape in self.build_element(child, depth + 1) {
                if !shape.is_geometry() {
                    continue;
                }
                let StyledShape { geometry, transform, clip, .. } = shape;
                let outline = ClipGeometry::Shape {
                    geometry,
                    transform: transform.unwrap_or_default(),
                };
                members.push(match clip {
                    Some(own) => outline.intersect(own),
                    None => outline,
                });
            }
        }
        let mut geometry = ClipGeometry::Union(members).transformed(&self.transform_of(el));
        if let Some(outer) = self.clip_for(el, None, depth + 1) {
            geometry = geometry.intersect(outer);
        }
        self.clips_in_progress.remove(id);

        let units = self
            .attr(el, "clipPathUnits")
            .and_then(|u| GradientUnits::parse(&u))
            .unwrap_or(GradientUnits::UserSpaceOnUse);
        debug!(id, shapes = geometry.shape_count(), ?units, "clip path resolved");
        Some(Rc::new(ResolvedClip { geometry, units }))
    }

    // ==================== Filters ====================

    fn filter_for(&mut self, el: ElementId) -> Option<Rc<Filter>> {
        let raw = self.attr(el, "filter")?;
        let id = iri_target(&raw)?;
        if let Some(cached) = self.filters.get(&id) {
            return cached.clone();
        }
        let filter = self
            .index
            .lookup(&id)
            .and_then(|f| read_filter(&self.index, f, &id))
            .map(Rc::new);
        if filter.is_none() {
            self.record(Warning::UnresolvedReference(id.clone()));
        }
        self.filters.insert(id, filter.clone());
        filter
    }

    // ==================== Attribute Helpers ====================

    fn attr(&self, el: ElementId, name: &str) -> Option<String> {
        self.index.resolve_attribute(el, name, false)
    }

    fn inherited(&self, el: ElementId, name: &str) -> Option<String> {
        self.index.resolve_attribute(el, name, true)
    }

    fn tolerance(&self) -> f64 {
        self.config.path_flattening_tolerance
    }

    fn reference(&self, axis: Axis) -> f64 {
        axis.reference(self.viewport.0, self.viewport.1)
    }

    fn optional_length(&self, el: ElementId, name: &str, axis: Axis) -> Option<f64> {
        self.attr(el, name)
            .and_then(|v| Length::parse(&v))
            .map(|l| l.to_pixels(Some(self.reference(axis))))
    }

    fn length(&self, el: ElementId, name: &str, axis: Axis, default: f64) -> f64 {
        self.optional_length(el, name, axis).unwrap_or(default)
    }

    /// First entry of a length list such as text `x`.
    fn first_length(&self, el: ElementId, name: &str, axis: Axis) -> Option<f64> {
        let list = parse_length_list(&self.attr(el, name)?)?;
        list.first().map(|l| l.to_pixels(Some(self.reference(axis))))
    }

    fn opacity_value(&self, el: ElementId, name: &str, inherited: bool) -> f64 {
        self.index
            .resolve_attribute(el, name, inherited)
            .and_then(|o| parse_opacity(&o))
            .unwrap_or(1.0)
    }

    fn is_hidden(&self, el: ElementId) -> bool {
        matches!(
            self.inherited(el, "visibility").as_deref().map(str::trim),
            Some("hidden") | Some("collapse")
        )
    }

    fn transform_of(&mut self, el: ElementId) -> Transform2D {
        let Some(raw) = self.attr(el, "transform") else {
            return Transform2D::identity();
        };
        let list = parse_transform(&raw);
        for name in list.unsupported {
            self.record(Warning::UnsupportedTransform(name));
        }
        list.matrix
    }

    /// Placement of an `svg` or `symbol` viewport: its position (for nested
    /// viewports) and the `viewBox` mapping.
    fn viewport_transform(&self, el: ElementId, nested: bool) -> Transform2D {
        let (vw, vh) = self.viewport;
        let (x, y) = if nested {
            (
                self.length(el, "x", Axis::Horizontal, 0.0),
                self.length(el, "y", Axis::Vertical, 0.0),
            )
        } else {
            (0.0, 0.0)
        };
        let Some([min_x, min_y, box_w, box_h]) = parse_view_box(self.attr(el, "viewBox").as_deref()) else {
            return Transform2D::from_translate(x, y);
        };
        let width = self.length(el, "width", Axis::Horizontal, vw);
        let height = self.length(el, "height", Axis::Vertical, vh);
        let aspect = self.attr(el, "preserveAspectRatio").unwrap_or_default();
        let (sx, sy, tx, ty) = fit_view_box(&aspect, width, height, box_w, box_h);
        Transform2D::from_translate(x + tx, y + ty)
            .scale(sx, sy)
            .translate(-min_x, -min_y)
    }
}

// ==================== Helpers ====================

/// Size of the document viewport: the root's absolute `width`/`height`, or
/// `fallback`.
fn document_viewport(index: &ElementIndex, fallback: (f64, f64)) -> (f64, f64) {
    let Some(root) = index.root() else {
        return fallback;
    };
    let element = index.element(root);
    if element.tag != Tag::Svg {
        return fallback;
    }
    let dimension = |name: &str, reference: f64| {
        element
            .attribute(name)
            .and_then(Length::parse)
            .map(|l| l.to_pixels(Some(reference)))
            .filter(|v| *v > 0.0)
            .unwrap_or(reference)
    };
    (dimension("width", fallback.0), dimension("height", fallback.1))
}

fn parse_view_box(value: Option<&str>) -> Option<[f64; 4]> {
    let values = parse_number_list(value?);
    match values.as_slice() {
        &[x, y, w, h] if w > 0.0 && h > 0.0 => Some([x, y, w, h]),
        _ => None,
    }
}

/// Scale and alignment offset for `preserveAspectRatio`.
fn fit_view_box(aspect: &str, width: f64, height: f64, box_w: f64, box_h: f64) -> (f64, f64, f64, f64) {
    let mut tokens = aspect.split_whitespace();
    let align = tokens.next().unwrap_or("xMidYMid");
    let slice = tokens.next() == Some("slice");
    let (sx, sy) = (width / box_w, height / box_h);
    if align == "none" {
        return (sx, sy, 0.0, 0.0);
    }
    let s = if slice { sx.max(sy) } else { sx.min(sy) };
    let fx = if align.starts_with("xMin") {
        0.0
    } else if align.starts_with("xMax") {
        1.0
    } else {
        0.5
    };
    let fy = if align.ends_with("YMin") {
        0.0
    } else if align.ends_with("YMax") {
        1.0
    } else {
        0.5
    };
    (s, s, (width - box_w * s) * fx, (height - box_h * s) * fy)
}

/// Convert bounding-box paint to user space. `None` means nothing paints.
fn bind_paint(paint: Paint, bbox: Option<Rect>) -> Option<Paint> {
    match paint {
        Paint::None => None,
        Paint::Gradient(gradient) if gradient.units == GradientUnits::ObjectBoundingBox => {
            let bbox = bbox.filter(|b| b.width > 0.0 && b.height > 0.0)?;
            Some(Paint::Gradient(Rc::new(gradient.in_user_space(&bbox))))
        }
        paint => Some(paint),
    }
}

/// Bounds of the element outlines among `shapes`.
fn union_bounds(shapes: &[StyledShape], tolerance: f64) -> Option<Rect> {
    shapes
        .iter()
        .filter(|s| s.is_geometry())
        .filter_map(|s| s.bounds(tolerance))
        .reduce(|a, b| a.union(&b))
}

/// Each flattened segment as a zero-width (hairline) line.
fn debug_segments(geometry: &Geometry, tolerance: f64) -> Vec<StyledShape> {
    let mut shapes = Vec::new();
    for line in geometry.to_path().polylines(tolerance) {
        for pair in line.windows(2) {
            let mut shape = StyledShape::new(Geometry::Line {
                x1: pair[0].0,
                y1: pair[0].1,
                x2: pair[1].0,
                y2: pair[1].1,
            });
            shape.stroke = Some(Stroke {
                paint: Paint::Color(Color::from_rgb(255, 0, 255)),
                width: 0.0,
                ..Default::default()
            });
            shape.role = ShapeRole::DebugSegment;
            shapes.push(shape);
        }
    }
    shapes
}

/// Strip leading space from the first span and trailing space from the last.
fn trim_spans(items: &mut [TextItem]) {
    let mut spans = items.iter_mut().filter_map(|item| match item {
        TextItem::Span { span, .. } => Some(span),
        TextItem::OnPath { .. } => None,
    });
    if let Some(first) = spans.next() {
        first.text = first.text.trim_start().to_string();
    }
    if let Some(last) = items.iter_mut().rev().find_map(|item| match item {
        TextItem::Span { span, .. } => Some(span),
        TextItem::OnPath { .. } => None,
    }) {
        last.text = last.text.trim_end().to_string();
    }
}
