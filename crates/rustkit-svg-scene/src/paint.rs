//! Paint resolution: colors, paint references and gradients.
//!
//! Gradients are resolved in two stages. Each gradient element is first read
//! into a raw record whose fields stay unset when the element does not
//! specify them. A raw record's `href` is then taken (cleared) before the
//! template it points to is resolved, and any field still unset is copied
//! from the template. Clearing first means a cyclic chain revisits a node
//! with no pending href and stops there.

use crate::geometry::Rect;
use crate::index::{iri_target, ElementId, ElementIndex, Tag};
use crate::parse::{parse_opacity, Axis, Cursor, Length, Unit};
use crate::transform::Transform2D;
use crate::Warning;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use tracing::{debug, trace, warn};

// ==================== Colors ====================

/// An sRGB color with straight alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Color {
    pub const TRANSPARENT: Color = Color { r: 0, g: 0, b: 0, a: 0.0 };
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 1.0 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 1.0 };

    pub const fn new(r: u8, g: u8, b: u8, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Multiply `opacity` into the alpha channel.
    pub fn with_opacity(self, opacity: f64) -> Self {
        Self {
            a: (self.a * opacity).clamp(0.0, 1.0),
            ..self
        }
    }

    /// Convert to [f64; 4] for rendering.
    pub fn to_f64_array(&self) -> [f64; 4] {
        [
            self.r as f64 / 255.0,
            self.g as f64 / 255.0,
            self.b as f64 / 255.0,
            self.a,
        ]
    }

    /// Linear interpolation in sRGB space.
    pub fn lerp(&self, other: &Color, t: f64) -> Color {
        let channel = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round().clamp(0.0, 255.0) as u8;
        Color {
            r: channel(self.r, other.r),
            g: channel(self.g, other.g),
            b: channel(self.b, other.b),
            a: self.a + (other.a - self.a) * t,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

/// SVG color keywords, sorted by name.
const NAMED_COLORS: &[(&str, (u8, u8, u8))] = &[
    ("aliceblue", (240, 248, 255)),
    ("antiquewhite", (250, 235, 215)),
    ("aqua", (0, 255, 255)),
    ("aquamarine", (127, 255, 212)),
    ("azure", (240, 255, 255)),
    ("beige", (245, 245, 220)),
    ("bisque", (255, 228, 196)),
    ("black", (0, 0, 0)),
    ("blanchedalmond", (255, 235, 205)),
    ("blue", (0, 0, 255)),
    ("blueviolet", (138, 43, 226)),
    ("brown", (165, 42, 42)),
    ("burlywood", (222, 184, 135)),
    ("cadetblue", (95, 158, 160)),
    ("chartreuse", (127, 255, 0)),
    ("chocolate", (210, 105, 30)),
    ("coral", (255, 127, 80)),
    ("cornflowerblue", (100, 149, 237)),
    ("cornsilk", (255, 248, 220)),
    ("crimson", (220, 20, 60)),
    ("cyan", (0, 255, 255)),
    ("darkblue", (0, 0, 139)),
    ("darkcyan", (0, 139, 139)),
    ("darkgoldenrod", (184, 134, 11)),
    ("darkgray", (169, 169, 169)),
    ("darkgreen", (0, 100, 0)),
    ("darkgrey", (169, 169, 169)),
    ("darkkhaki", (189, 183, 107)),
    ("darkmagenta", (139, 0, 139)),
    ("darkolivegreen", (85, 107, 47)),
    ("darkorange", (255, 140, 0)),
    ("darkorchid", (153, 50, 204)),
    ("darkred", (139, 0, 0)),
    ("darksalmon", (233, 150, 122)),
    ("darkseagreen", (143, 188, 143)),
    ("darkslateblue", (72, 61, 139)),
    ("darkslategray", (47, 79, 79)),
    ("darkslategrey", (47, 79, 79)),
    ("darkturquoise", (0, 206, 209)),
    ("darkviolet", (148, 0, 211)),
    ("deeppink", (255, 20, 147)),
    ("deepskyblue", (0, 191, 255)),
    ("dimgray", (105, 105, 105)),
    ("dimgrey", (105, 105, 105)),
    ("dodgerblue", (30, 144, 255)),
    ("firebrick", (178, 34, 34)),
    ("floralwhite", (255, 250, 240)),
    ("forestgreen", (34, 139, 34)),
    ("fuchsia", (255, 0, 255)),
    ("gainsboro", (220, 220, 220)),
    ("ghostwhite", (248, 248, 255)),
    ("gold", (255, 215, 0)),
    ("goldenrod", (218, 165, 32)),
    ("gray", (128, 128, 128)),
    ("green", (0, 128, 0)),
    ("greenyellow", (173, 255, 47)),
    ("grey", (128, 128, 128)),
    ("honeydew", (240, 255, 240)),
    ("hotpink", (255, 105, 180)),
    ("indianred", (205, 92, 92)),
    ("indigo", (75, 0, 130)),
    ("ivory", (255, 255, 240)),
    ("khaki", (240, 230, 140)),
    ("lavender", (230, 230, 250)),
    ("lavenderblush", (255, 240, 245)),
    ("lawngreen", (124, 252, 0)),
    ("lemonchiffon", (255, 250, 205)),
    ("lightblue", (173, 216, 230)),
    ("lightcoral", (240, 128, 128)),
    ("lightcyan", (224, 255, 255)),
    ("lightgoldenrodyellow", (250, 250, 210)),
    ("lightgray", (211, 211, 211)),
    ("lightgreen", (144, 238, 144)),
    ("lightgrey", (211, 211, 211)),
    ("lightpink", (255, 182, 193)),
    ("lightsalmon", (255, 160, 122)),
    ("lightseagreen", (32, 178, 170)),
    ("lightskyblue", (135, 206, 250)),
    ("lightslategray", (119, 136, 153)),
    ("lightslategrey", (119, 136, 153)),
    ("lightsteelblue", (176, 196, 222)),
    ("lightyellow", (255, 255, 224)),
    ("lime", (0, 255, 0)),
    ("limegreen", (50, 205, 50)),
    ("linen", (250, 240, 230)),
    ("magenta", (255, 0, 255)),
    ("maroon", (128, 0, 0)),
    ("mediumaquamarine", (102, 205, 170)),
    ("mediumblue", (0, 0, 205)),
    ("mediumorchid", (186, 85, 211)),
    ("mediumpurple", (147, 112, 219)),
    ("mediumseagreen", (60, 179, 113)),
    ("mediumslateblue", (123, 104, 238)),
    ("mediumspringgreen", (0, 250, 154)),
    ("mediumturquoise", (72, 209, 204)),
    ("mediumvioletred", (199, 21, 133)),
    ("midnightblue", (25, 25, 112)),
    ("mintcream", (245, 255, 250)),
    ("mistyrose", (255, 228, 225)),
    ("moccasin", (255, 228, 181)),
    ("navajowhite", (255, 222, 173)),
    ("navy", (0, 0, 128)),
    ("oldlace", (253, 245, 230)),
    ("olive", (128, 128, 0)),
    ("olivedrab", (107, 142, 35)),
    ("orange", (255, 165, 0)),
    ("orangered", (255, 69, 0)),
    ("orchid", (218, 112, 214)),
    ("palegoldenrod", (238, 232, 170)),
    ("palegreen", (152, 251, 152)),
    ("paleturquoise", (175, 238, 238)),
    ("palevioletred", (219, 112, 147)),
    ("papayawhip", (255, 239, 213)),
    ("peachpuff", (255, 218, 185)),
    ("peru", (205, 133, 63)),
    ("pink", (255, 192, 203)),
    ("plum", (221, 160, 221)),
    ("powderblue", (176, 224, 230)),
    ("purple", (128, 0, 128)),
    ("red", (255, 0, 0)),
    ("rosybrown", (188, 143, 143)),
    ("royalblue", (65, 105, 225)),
    ("saddlebrown", (139, 69, 19)),
    ("salmon", (250, 128, 114)),
    ("sandybrown", (244, 164, 96)),
    ("seagreen", (46, 139, 87)),
    ("seashell", (255, 245, 238)),
    ("sienna", (160, 82, 45)),
    ("silver", (192, 192, 192)),
    ("skyblue", (135, 206, 235)),
    ("slateblue", (106, 90, 205)),
    ("slategray", (112, 128, 144)),
    ("slategrey", (112, 128, 144)),
    ("snow", (255, 250, 250)),
    ("springgreen", (0, 255, 127)),
    ("steelblue", (70, 130, 180)),
    ("tan", (210, 180, 140)),
    ("teal", (0, 128, 128)),
    ("thistle", (216, 191, 216)),
    ("tomato", (255, 99, 71)),
    ("turquoise", (64, 224, 208)),
    ("violet", (238, 130, 238)),
    ("wheat", (245, 222, 179)),
    ("white", (255, 255, 255)),
    ("whitesmoke", (245, 245, 245)),
    ("yellow", (255, 255, 0)),
    ("yellowgreen", (154, 205, 50)),
];

/// Look up a color keyword (case-insensitive).
pub fn named_color(name: &str) -> Option<Color> {
    let name = name.to_ascii_lowercase();
    NAMED_COLORS
        .binary_search_by(|(n, _)| (*n).cmp(name.as_str()))
        .ok()
        .map(|i| {
            let (r, g, b) = NAMED_COLORS[i].1;
            Color::from_rgb(r, g, b)
        })
}

/// Parse a color value: `#rgb`, `#rrggbb`, `rgb()`, `rgba()`, a keyword or
/// `transparent`. `currentColor` needs context and is not handled here.
pub fn parse_color(value: &str) -> Option<Color> {
    let value = value.trim();

    if let Some(hex) = value.strip_prefix('#') {
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok();
        let pair = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        return match hex.len() {
            3 => Some(Color::from_rgb(digit(0)? * 17, digit(1)? * 17, digit(2)? * 17)),
            6 => Some(Color::from_rgb(pair(0)?, pair(2)?, pair(4)?)),
            _ => None,
        };
    }

    let lower = value.to_ascii_lowercase();
    if let Some(args) = lower.strip_prefix("rgba(").or_else(|| lower.strip_prefix("rgb(")) {
        return parse_rgb_function(args.strip_suffix(')')?);
    }
    if lower == "transparent" {
        return Some(Color::TRANSPARENT);
    }
    named_color(&lower)
}

fn parse_rgb_function(args: &str) -> Option<Color> {
    let mut cursor = Cursor::new(args);
    let mut channels = [0u8; 3];
    for channel in channels.iter_mut() {
        let length = cursor.next_length_or_percentage()?;
        let value = match length.unit {
            Unit::Percent => length.value * 255.0 / 100.0,
            Unit::User => length.value,
            _ => return None,
        };
        *channel = value.round().clamp(0.0, 255.0) as u8;
        cursor.skip_separators();
    }
    let alpha = match cursor.next_length_or_percentage() {
        Some(a) if a.unit == Unit::Percent => a.value / 100.0,
        Some(a) => a.value,
        None => 1.0,
    };
    Some(Color::new(channels[0], channels[1], channels[2], alpha.clamp(0.0, 1.0)))
}

/// Parse a plain color and fold `opacity` into its alpha.
pub fn resolve_color(raw: &str, opacity: f64) -> Option<Color> {
    parse_color(raw).map(|c| c.with_opacity(opacity))
}

// ==================== Paint ====================

/// A `fill` or `stroke` value before references are resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum PaintSpec {
    None,
    Color(Color),
    CurrentColor,
    /// `url(#id) [fallback]`.
    Reference {
        id: String,
        fallback: Option<Box<PaintSpec>>,
    },
}

impl PaintSpec {
    /// Parse a paint value. Returns `None` for unparseable input.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value == "none" {
            return Some(PaintSpec::None);
        }
        if value.eq_ignore_ascii_case("currentcolor") {
            return Some(PaintSpec::CurrentColor);
        }
        if value.starts_with("url(") {
            let close = value.find(')')?;
            let id = iri_target(&value[..=close])?;
            let rest = value[close + 1..].trim();
            let fallback = if rest.is_empty() || rest.starts_with("url(") {
                None
            } else {
                PaintSpec::parse(rest).map(Box::new)
            };
            return Some(PaintSpec::Reference { id, fallback });
        }
        parse_color(value).map(PaintSpec::Color)
    }
}

/// A resolved paint.
#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    None,
    Color(Color),
    Gradient(Rc<Gradient>),
}

impl Paint {
    pub fn is_none(&self) -> bool {
        matches!(self, Paint::None)
    }

    /// The solid color, if this is one.
    pub fn as_color(&self) -> Option<Color> {
        match self {
            Paint::Color(c) => Some(*c),
            _ => None,
        }
    }
}

// ==================== Gradients ====================

/// How a gradient continues beyond its vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpreadMethod {
    #[default]
    Pad,
    Reflect,
    Repeat,
}

impl SpreadMethod {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "pad" => Some(SpreadMethod::Pad),
            "reflect" => Some(SpreadMethod::Reflect),
            "repeat" => Some(SpreadMethod::Repeat),
            _ => None,
        }
    }

    /// Map a gradient parameter into `[0, 1]`.
    pub fn apply(self, t: f64) -> f64 {
        match self {
            SpreadMethod::Pad => t.clamp(0.0, 1.0),
            SpreadMethod::Repeat => t - t.floor(),
            SpreadMethod::Reflect => {
                let t = t.abs();
                let period = t.floor();
                let frac = t - period;
                if period as u64 % 2 == 0 {
                    frac
                } else {
                    1.0 - frac
                }
            }
        }
    }
}

/// Coordinate system of gradient (and clip) geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GradientUnits {
    UserSpaceOnUse,
    #[default]
    ObjectBoundingBox,
}

impl GradientUnits {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "userSpaceOnUse" => Some(GradientUnits::UserSpaceOnUse),
            "objectBoundingBox" => Some(GradientUnits::ObjectBoundingBox),
            _ => None,
        }
    }
}

/// One color checkpoint. `stop-opacity` is already folded into `color`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub offset: f64,
    pub color: Color,
}

/// Gradient geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GradientKind {
    Linear { x1: f64, y1: f64, x2: f64, y2: f64 },
    Radial { cx: f64, cy: f64, r: f64, fx: f64, fy: f64, fr: f64 },
}

/// A fully resolved gradient paint server.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    pub id: String,
    pub kind: GradientKind,
    pub spread: SpreadMethod,
    pub units: GradientUnits,
    pub transform: Transform2D,
    pub stops: Vec<GradientStop>,
}

impl Gradient {
    /// Color at gradient parameter `t`, after applying the spread method.
    /// An empty gradient is transparent.
    pub fn color_at(&self, t: f64) -> Color {
        let Some(first) = self.stops.first() else {
            return Color::TRANSPARENT;
        };
        let t = self.spread.apply(t);
        if t <= first.offset {
            return first.color;
        }
        for pair in self.stops.windows(2) {
            let (lo, hi) = (&pair[0], &pair[1]);
            if t <= hi.offset {
                let span = hi.offset - lo.offset;
                let f = if span < 1e-12 { 1.0 } else { (t - lo.offset) / span };
                return lo.color.lerp(&hi.color, f);
            }
        }
        self.stops[self.stops.len() - 1].color
    }

    /// Rewrite an `objectBoundingBox` gradient into user space for a shape
    /// with bounding box `bbox`.
    pub fn in_user_space(&self, bbox: &Rect) -> Gradient {
        if self.units == GradientUnits::UserSpaceOnUse {
            return self.clone();
        }
        Gradient {
            units: GradientUnits::UserSpaceOnUse,
            transform: bbox.bbox_transform().multiply(&self.transform),
            ..self.clone()
        }
    }

    /// True when nothing would be painted.
    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum RawKind {
    Linear {
        x1: Option<Length>,
        y1: Option<Length>,
        x2: Option<Length>,
        y2: Option<Length>,
    },
    Radial {
        cx: Option<Length>,
        cy: Option<Length>,
        r: Option<Length>,
        fx: Option<Length>,
        fy: Option<Length>,
        fr: Option<Length>,
    },
}

/// A gradient element as written, before template resolution.
#[derive(Debug, Clone)]
struct RawGradient {
    kind: RawKind,
    href: Option<String>,
    spread: Option<SpreadMethod>,
    units: Option<GradientUnits>,
    transform: Option<Transform2D>,
    stops: Option<Vec<GradientStop>>,
}

impl RawGradient {
    /// Copy every field left unset here from `template`.
    fn inherit_from(&mut self, template: &RawGradient) {
        self.spread = self.spread.or(template.spread);
        self.units = self.units.or(template.units);
        self.transform = self.transform.or(template.transform);
        if self.stops.is_none() {
            self.stops = template.stops.clone();
        }
        match (&mut self.kind, &template.kind) {
            (
                RawKind::Linear { x1, y1, x2, y2 },
                RawKind::Linear { x1: tx1, y1: ty1, x2: tx2, y2: ty2 },
            ) => {
                *x1 = x1.or(*tx1);
                *y1 = y1.or(*ty1);
                *x2 = x2.or(*tx2);
                *y2 = y2.or(*ty2);
            }
            (
                RawKind::Radial { cx, cy, r, fx, fy, fr },
                RawKind::Radial { cx: tcx, cy: tcy, r: tr, fx: tfx, fy: tfy, fr: tfr },
            ) => {
                *cx = cx.or(*tcx);
                *cy = cy.or(*tcy);
                *r = r.or(*tr);
                *fx = fx.or(*tfx);
                *fy = fy.or(*tfy);
                *fr = fr.or(*tfr);
            }
            _ => {}
        }
    }
}

// ==================== Paint Resolver ====================

/// Per-document paint resolution state.
#[derive(Debug)]
pub struct PaintResolver {
    viewport: (f64, f64),
    raw: HashMap<String, RawGradient>,
    resolved: HashMap<String, Rc<Gradient>>,
    in_progress: HashSet<String>,
    warnings: Vec<Warning>,
}

impl PaintResolver {
    /// Create a resolver. `viewport` is the reference for user-space
    /// percentages.
    pub fn new(viewport: (f64, f64)) -> Self {
        Self {
            viewport,
            raw: HashMap::new(),
            resolved: HashMap::new(),
            in_progress: HashSet::new(),
            warnings: Vec::new(),
        }
    }

    /// Resolve a `fill`/`stroke` value for `element`. `default` is used
    /// when the value is unparseable or an unresolved reference has no
    /// fallback.
    pub fn resolve_paint(
        &mut self,
        index: &ElementIndex,
        element: ElementId,
        raw: &str,
        opacity: f64,
        default: Paint,
    ) -> Paint {
        match PaintSpec::parse(raw) {
            Some(spec) => self.paint_from_spec(index, element, &spec, opacity, default),
            None => {
                trace!(value = raw, "unparseable paint");
                default
            }
        }
    }

    fn paint_from_spec(
        &mut self,
        index: &ElementIndex,
        element: ElementId,
        spec: &PaintSpec,
        opacity: f64,
        default: Paint,
    ) -> Paint {
        match spec {
            PaintSpec::None => Paint::None,
            PaintSpec::Color(c) => Paint::Color(c.with_opacity(opacity)),
            PaintSpec::CurrentColor => {
                Paint::Color(current_color(index, element).with_opacity(opacity))
            }
            PaintSpec::Reference { id, fallback } => {
                if let Some(gradient) = self.resolve_gradient(index, id) {
                    return Paint::Gradient(gradient);
                }
                self.record(Warning::UnresolvedReference(id.clone()));
                match fallback {
                    Some(spec) => self.paint_from_spec(index, element, spec, opacity, default),
                    None => default,
                }
            }
        }
    }

    /// Resolve the gradient with `id`, or `None` if `id` is not a gradient.
    pub fn resolve_gradient(&mut self, index: &ElementIndex, id: &str) -> Option<Rc<Gradient>> {
        if let Some(gradient) = self.resolved.get(id) {
            return Some(gradient.clone());
        }
        let raw = self.resolve_raw(index, id)?;
        let gradient = Rc::new(self.finish(id, &raw));
        debug!(id, stops = gradient.stops.len(), "gradient resolved");
        self.resolved.insert(id.to_string(), gradient.clone());
        Some(gradient)
    }

    /// Read `id` and merge its template chain.
    fn resolve_raw(&mut self, index: &ElementIndex, id: &str) -> Option<RawGradient> {
        if !self.raw.contains_key(id) {
            let element = index.lookup(id)?;
            let raw = read_gradient(index, element)?;
            self.raw.insert(id.to_string(), raw);
        }

        let href = self.raw.get_mut(id).and_then(|raw| raw.href.take());
        if let Some(template_id) = href {
            if self.in_progress.contains(&template_id) {
                self.record(Warning::ReferenceCycle(template_id.clone()));
            }
            self.in_progress.insert(id.to_string());
            let template = self.resolve_raw(index, &template_id);
            self.in_progress.remove(id);
            match template {
                Some(template) => {
                    if let Some(raw) = self.raw.get_mut(id) {
                        raw.inherit_from(&template);
                    }
                }
                None => self.record(Warning::UnresolvedReference(template_id)),
            }
        }
        self.raw.get(id).cloned()
    }

    fn finish(&self, id: &str, raw: &RawGradient) -> Gradient {
        let units = raw.units.unwrap_or_default();
        let (w, h) = self.viewport;
        let resolve = |length: Option<Length>, default: Length, axis: Axis| {
            let length = length.unwrap_or(default);
            match units {
                GradientUnits::ObjectBoundingBox => match length.unit {
                    Unit::Percent => length.value / 100.0,
                    _ => length.to_pixels(None),
                },
                GradientUnits::UserSpaceOnUse => length.to_pixels(Some(axis.reference(w, h))),
            }
        };
        let zero = Length::user(0.0);
        let half = Length::new(50.0, Unit::Percent);

        let kind = match raw.kind {
            RawKind::Linear { x1, y1, x2, y2 } => GradientKind::Linear {
                x1: resolve(x1, zero, Axis::Horizontal),
                y1: resolve(y1, zero, Axis::Vertical),
                x2: resolve(x2, Length::new(100.0, Unit::Percent), Axis::Horizontal),
                y2: resolve(y2, zero, Axis::Vertical),
            },
            RawKind::Radial { cx, cy, r, fx, fy, fr } => {
                let cx_len = cx.unwrap_or(half);
                let cy_len = cy.unwrap_or(half);
                GradientKind::Radial {
                    cx: resolve(Some(cx_len), half, Axis::Horizontal),
                    cy: resolve(Some(cy_len), half, Axis::Vertical),
                    r: resolve(r, half, Axis::Diagonal),
                    fx: resolve(fx, cx_len, Axis::Horizontal),
                    fy: resolve(fy, cy_len, Axis::Vertical),
                    fr: resolve(fr, zero, Axis::Diagonal),
                }
            }
        };

        Gradient {
            id: id.to_string(),
            kind,
            spread: raw.spread.unwrap_or_default(),
            units,
            transform: raw.transform.unwrap_or_default(),
            stops: raw.stops.clone().unwrap_or_default(),
        }
    }

    fn record(&mut self, warning: Warning) {
        warn!(%warning, "paint");
        self.warnings.push(warning);
    }

    /// Hand over warnings recorded since the last call.
    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }
}

/// The inherited `color` property, black when unset.
pub fn current_color(index: &ElementIndex, element: ElementId) -> Color {
    index
        .resolve_attribute(element, "color", true)
        .and_then(|c| parse_color(&c))
        .unwrap_or(Color::BLACK)
}

fn read_gradient(index: &ElementIndex, element: ElementId) -> Option<RawGradient> {
    let el = index.element(element);
    let length = |name: &str| el.attribute(name).and_then(Length::parse);
    let kind = match el.tag {
        Tag::LinearGradient => RawKind::Linear {
            x1: length("x1"),
            y1: length("y1"),
            x2: length("x2"),
            y2: length("y2"),
        },
        Tag::RadialGradient => RawKind::Radial {
            cx: length("cx"),
            cy: length("cy"),
            r: length("r"),
            fx: length("fx"),
            fy: length("fy"),
            fr: length("fr"),
        },
        _ => return None,
    };

    let href = el
        .attribute("href")
        .or_else(|| el.attribute("xlink:href"))
        .and_then(iri_target);

    let stops = read_stops(index, element);
    Some(RawGradient {
        kind,
        href,
        spread: el.attribute("spreadMethod").and_then(SpreadMethod::parse),
        units: el.attribute("gradientUnits").and_then(GradientUnits::parse),
        transform: el.attribute("gradientTransform").map(Transform2D::parse),
        stops: (!stops.is_empty()).then_some(stops),
    })
}

fn read_stops(index: &ElementIndex, gradient: ElementId) -> Vec<GradientStop> {
    let mut stops: Vec<GradientStop> = Vec::new();
    for &child in index.element(gradient).children() {
        if index.element(child).tag != Tag::Stop {
            continue;
        }
        let offset = index
            .resolve_attribute(child, "offset", false)
            .and_then(|o| parse_opacity(&o))
            .unwrap_or(0.0);
        // Offsets never decrease.
        let offset = stops.last().map_or(offset, |prev| offset.max(prev.offset));

        let opacity = index
            .resolve_attribute(child, "stop-opacity", false)
            .and_then(|o| parse_opacity(&o))
            .unwrap_or(1.0);
        let color = match index.resolve_attribute(child, "stop-color", false) {
            Some(raw) if raw.trim().eq_ignore_ascii_case("currentcolor") => current_color(index, child),
            Some(raw) => parse_color(&raw).unwrap_or(Color::BLACK),
            None => Color::BLACK,
        };
        stops.push(GradientStop {
            offset,
            color: color.with_opacity(opacity),
        });
    }
    stops
}
