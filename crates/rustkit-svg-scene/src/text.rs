//! Text layout: plain runs, multi-span text and text-on-path.
//!
//! Glyph outlines come from a [`FontProvider`]. The engine only positions
//! them: along a baseline for plain text, or along an arc-length
//! parameterized outline for `textPath`.

use crate::measure::PathMeasure;
use crate::parse::{Length, DEFAULT_FONT_SIZE};
use crate::path::PathData;
use crate::transform::Transform2D;
use thiserror::Error;
use tracing::trace;

// ==================== Fonts ====================

/// Font slant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
    Oblique,
}

/// Font selection for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct FontDescriptor {
    pub family: String,
    /// CSS weight, 100..=900.
    pub weight: u16,
    pub style: FontStyle,
    /// Em size in user units.
    pub size: f64,
}

impl Default for FontDescriptor {
    fn default() -> Self {
        Self {
            family: "sans-serif".to_string(),
            weight: 400,
            style: FontStyle::Normal,
            size: DEFAULT_FONT_SIZE,
        }
    }
}

impl FontDescriptor {
    /// Apply `font-*` attribute values on top of `self`. Unparseable values
    /// keep the base value.
    pub fn with_attributes(
        &self,
        family: Option<&str>,
        size: Option<&str>,
        weight: Option<&str>,
        style: Option<&str>,
    ) -> FontDescriptor {
        let mut font = self.clone();
        if let Some(family) = family {
            let first = family.split(',').next().unwrap_or(family);
            let first = first.trim().trim_matches(|c| c == '"' || c == '\'');
            if !first.is_empty() {
                font.family = first.to_string();
            }
        }
        if let Some(size) = size.and_then(Length::parse) {
            let px = size.to_pixels_with_font(Some(self.size), self.size);
            if px > 0.0 {
                font.size = px;
            }
        }
        if let Some(weight) = weight {
            font.weight = match weight.trim() {
                "normal" => 400,
                "bold" => 700,
                "bolder" => (self.weight + 300).min(900),
                "lighter" => self.weight.saturating_sub(300).max(100),
                n => n.parse::<u16>().map(|w| w.clamp(1, 1000)).unwrap_or(self.weight),
            };
        }
        if let Some(style) = style {
            font.style = match style.trim() {
                "italic" => FontStyle::Italic,
                "oblique" => FontStyle::Oblique,
                "normal" => FontStyle::Normal,
                _ => self.style,
            };
        }
        font
    }
}

/// One glyph: its outline with the origin on the baseline at the pen
/// position, and its advance width.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub outline: PathData,
    pub advance: f64,
}

/// Errors from a font capability.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TextError {
    #[error("Font not found: {0}")]
    FontNotFound(String),
    #[error("Shaping failed: {0}")]
    ShapingFailed(String),
    #[error("Not implemented on this platform")]
    NotImplemented,
}

/// Glyph outline capability.
pub trait FontProvider {
    /// Shape `text` with `font`, one glyph per rendered character.
    fn glyphs(&self, font: &FontDescriptor, text: &str) -> Result<Vec<Glyph>, TextError>;
}

/// Renders every character as a `.notdef` box. Whitespace has an advance
/// but no outline.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoxFontProvider;

impl BoxFontProvider {
    /// Advance of every glyph, as a fraction of the em size.
    pub const ADVANCE: f64 = 0.5;
    /// Box height, as a fraction of the em size.
    pub const ASCENT: f64 = 0.7;
}

impl FontProvider for BoxFontProvider {
    fn glyphs(&self, font: &FontDescriptor, text: &str) -> Result<Vec<Glyph>, TextError> {
        let advance = font.size * Self::ADVANCE;
        let top = -font.size * Self::ASCENT;
        let glyphs = text
            .chars()
            .map(|c| {
                let mut outline = PathData::new();
                if !c.is_whitespace() {
                    let inset = advance * 0.15;
                    outline
                        .move_to(0.0, 0.0)
                        .line_to(0.0, top)
                        .line_to(advance, top)
                        .line_to(advance, 0.0)
                        .close()
                        .move_to(inset, -inset)
                        .line_to(advance - inset, -inset)
                        .line_to(advance - inset, top + inset)
                        .line_to(inset, top + inset)
                        .close();
                }
                Glyph { outline, advance }
            })
            .collect();
        Ok(glyphs)
    }
}

// ==================== Layout ====================

/// `text-anchor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAnchor {
    #[default]
    Start,
    Middle,
    End,
}

impl TextAnchor {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "start" => Some(TextAnchor::Start),
            "middle" => Some(TextAnchor::Middle),
            "end" => Some(TextAnchor::End),
            _ => None,
        }
    }

    /// Offset of the run start relative to the anchor point.
    fn shift(self, width: f64) -> f64 {
        match self {
            TextAnchor::Start => 0.0,
            TextAnchor::Middle => -width / 2.0,
            TextAnchor::End => -width,
        }
    }
}

/// `lengthAdjust`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthAdjust {
    #[default]
    Spacing,
    SpacingAndGlyphs,
}

impl LengthAdjust {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "spacing" => Some(LengthAdjust::Spacing),
            "spacingAndGlyphs" => Some(LengthAdjust::SpacingAndGlyphs),
            _ => None,
        }
    }
}

/// Run-level layout options.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RunLayout {
    pub anchor: TextAnchor,
    /// Requested advance of the whole run.
    pub text_length: Option<f64>,
    pub length_adjust: LengthAdjust,
}

/// One span of a multi-span text element.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    pub font: FontDescriptor,
    /// Absolute pen position; `None` continues from the previous span.
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub dx: f64,
    pub dy: f64,
    pub layout: RunLayout,
}

/// Placed glyph outlines of one run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextRun {
    pub glyphs: Vec<PathData>,
    /// Distance covered along the baseline or path.
    pub advance: f64,
    /// Pen position after the run.
    pub pen: (f64, f64),
}

impl TextRun {
    /// All glyph outlines as one path.
    pub fn outline(&self) -> PathData {
        let mut path = PathData::new();
        for glyph in &self.glyphs {
            path.extend(glyph);
        }
        path
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.iter().all(PathData::is_empty)
    }
}

/// Glyph scaling derived from `textLength` and `lengthAdjust`.
#[derive(Debug, Clone, Copy)]
struct Fit {
    /// Factor applied to advances.
    spacing: f64,
    /// Factor applied to outlines along the advance direction.
    glyph: f64,
    total: f64,
}

impl Fit {
    fn new(natural: f64, layout: &RunLayout) -> Self {
        let total = layout.text_length.filter(|l| *l >= 0.0).unwrap_or(natural);
        let scale = if natural > 0.0 { total / natural } else { 1.0 };
        let glyph = match layout.length_adjust {
            LengthAdjust::Spacing => 1.0,
            LengthAdjust::SpacingAndGlyphs => scale,
        };
        Self { spacing: scale, glyph, total }
    }
}

/// Positions glyph runs produced by a [`FontProvider`].
pub struct TextLayoutEngine<'a> {
    provider: &'a dyn FontProvider,
}

impl<'a> TextLayoutEngine<'a> {
    pub fn new(provider: &'a dyn FontProvider) -> Self {
        Self { provider }
    }

    /// Lay out `text` left to right from the anchor point `origin`.
    pub fn layout_run(
        &self,
        font: &FontDescriptor,
        text: &str,
        origin: (f64, f64),
        layout: &RunLayout,
    ) -> Result<TextRun, TextError> {
        let glyphs = self.provider.glyphs(font, text)?;
        let natural: f64 = glyphs.iter().map(|g| g.advance).sum();
        let fit = Fit::new(natural, layout);
        let start = origin.0 + layout.anchor.shift(fit.total);

        let mut pen = start;
        let mut placed = Vec::with_capacity(glyphs.len());
        for glyph in &glyphs {
            let slot = glyph.advance * fit.spacing;
            let width = glyph.advance * fit.glyph;
            // Center the (possibly narrower) outline in its slot.
            let t = Transform2D::from_translate(pen + (slot - width) / 2.0, origin.1)
                .multiply(&Transform2D::from_scale(fit.glyph, 1.0));
            placed.push(glyph.outline.transformed(&t));
            pen += slot;
        }
        trace!(glyphs = placed.len(), advance = fit.total, "text run");
        Ok(TextRun {
            glyphs: placed,
            advance: fit.total,
            pen: (start + fit.total, origin.1),
        })
    }

    /// Lay out consecutive spans, carrying the pen position from one to
    /// the next. Spans that fail to shape are returned as errors in place.
    ///
    /// `text-anchor` applies per text chunk: a chunk starts at the first
    /// span and at every span with an absolute `x` or `y`, and takes the
    /// anchor of its first span.
    pub fn layout_spans(&self, spans: &[TextSpan], origin: (f64, f64)) -> Vec<Result<TextRun, TextError>> {
        let mut pen = origin;
        let mut runs: Vec<Result<TextRun, TextError>> = Vec::with_capacity(spans.len());
        let mut chunk_start = 0;
        let mut chunk_x = origin.0;
        let mut chunk_anchor = TextAnchor::Start;

        for (i, span) in spans.iter().enumerate() {
            if i == 0 || span.x.is_some() || span.y.is_some() {
                pen.0 += anchor_chunk(&mut runs[chunk_start..], chunk_anchor, pen.0 - chunk_x);
                chunk_start = i;
                chunk_x = span.x.unwrap_or(pen.0) + span.dx;
                chunk_anchor = span.layout.anchor;
            }
            let x = span.x.unwrap_or(pen.0) + span.dx;
            let y = span.y.unwrap_or(pen.1) + span.dy;
            let layout = RunLayout {
                anchor: TextAnchor::Start,
                ..span.layout
            };
            let run = self.layout_run(&span.font, &span.text, (x, y), &layout);
            pen = match &run {
                Ok(run) => run.pen,
                Err(_) => (x, y),
            };
            runs.push(run);
        }
        anchor_chunk(&mut runs[chunk_start..], chunk_anchor, pen.0 - chunk_x);
        runs
    }

    /// Lay out `text` along `path`, starting at arc length `start_offset`.
    ///
    /// Each glyph is centered on the point at its mid-advance and rotated to
    /// the tangent there. Glyphs whose midpoint falls off the path are
    /// dropped.
    pub fn layout_on_path(
        &self,
        font: &FontDescriptor,
        text: &str,
        path: &PathMeasure,
        start_offset: f64,
        layout: &RunLayout,
    ) -> Result<TextRun, TextError> {
        if path.total_length() <= 0.0 || text.is_empty() {
            return Ok(TextRun::default());
        }
        let glyphs = self.provider.glyphs(font, text)?;
        let natural: f64 = glyphs.iter().map(|g| g.advance).sum();
        if glyphs.is_empty() || natural <= 0.0 {
            return Ok(TextRun::default());
        }
        let fit = Fit::new(natural, layout);
        let begin = start_offset + layout.anchor.shift(fit.total);

        let mut distance = begin;
        let mut placed = Vec::with_capacity(glyphs.len());
        let mut pen = (0.0, 0.0);
        for glyph in &glyphs {
            let slot = glyph.advance * fit.spacing;
            let width = glyph.advance * fit.glyph;
            let mid = distance + slot / 2.0;
            distance += slot;
            let Some(point) = path.point_at_length(mid) else {
                continue;
            };
            let t = Transform2D::from_translate(point.x, point.y)
                .multiply(&Transform2D::from_rotate(point.angle))
                .multiply(&Transform2D::from_translate(-width / 2.0, 0.0))
                .multiply(&Transform2D::from_scale(fit.glyph, 1.0));
            placed.push(glyph.outline.transformed(&t));
            pen = (point.x, point.y);
        }
        trace!(glyphs = placed.len(), of = glyphs.len(), advance = fit.total, "text on path");
        Ok(TextRun {
            glyphs: placed,
            advance: fit.total,
            pen,
        })
    }
}

/// Shift the runs of one text chunk by its anchor. Returns the shift.
fn anchor_chunk(runs: &mut [Result<TextRun, TextError>], anchor: TextAnchor, width: f64) -> f64 {
    let shift = anchor.shift(width);
    if shift == 0.0 {
        return 0.0;
    }
    let t = Transform2D::from_translate(shift, 0.0);
    for run in runs.iter_mut().flatten() {
        for glyph in &mut run.glyphs {
            *glyph = glyph.transformed(&t);
        }
        run.pen.0 += shift;
    }
    shift
}

/// Normalize character data. Without `preserve`, newlines are removed,
/// tabs become spaces and space runs collapse to one.
pub fn normalize_whitespace(text: &str, preserve: bool) -> String {
    if preserve {
        return text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }).collect();
    }
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' | '\r' => {}
            c if c.is_whitespace() => {
                if !out.ends_with(' ') {
                    out.push(' ');
                }
            }
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn font(size: f64) -> FontDescriptor {
        FontDescriptor {
            size,
            ..Default::default()
        }
    }

    fn run_bounds(run: &TextRun) -> crate::geometry::Rect {
        run.outline().bounds(0.1).unwrap()
    }

    #[test]
    fn test_box_provider_advances() {
        let glyphs = BoxFontProvider.glyphs(&font(20.0), "a b").unwrap();
        assert_eq!(glyphs.len(), 3);
        assert!(glyphs.iter().all(|g| g.advance == 10.0));
        assert!(glyphs[1].outline.is_empty());
    }

    #[test]
    fn test_plain_run_and_anchor() {
        let engine = TextLayoutEngine::new(&BoxFontProvider);
        let run = engine
            .layout_run(&font(20.0), "abcd", (10.0, 50.0), &RunLayout::default())
            .unwrap();
        assert_eq!(run.advance, 40.0);
        assert_eq!(run.pen, (50.0, 50.0));
        let b = run_bounds(&run);
        assert_eq!((b.x, b.right(), b.bottom()), (10.0, 50.0, 50.0));

        let centered = RunLayout { anchor: TextAnchor::Middle, ..Default::default() };
        let run = engine.layout_run(&font(20.0), "abcd", (10.0, 50.0), &centered).unwrap();
        assert_eq!(run_bounds(&run).x, -10.0);
    }

    #[test]
    fn test_spans_carry_pen() {
        let engine = TextLayoutEngine::new(&BoxFontProvider);
        let span = |text: &str, x: Option<f64>, dy: f64| TextSpan {
            text: text.to_string(),
            font: font(10.0),
            x,
            y: None,
            dx: 0.0,
            dy,
            layout: RunLayout::default(),
        };
        let runs = engine.layout_spans(&[span("ab", None, 0.0), span("c", None, 5.0), span("d", Some(0.0), 0.0)], (0.0, 20.0));
        let runs: Vec<TextRun> = runs.into_iter().map(Result::unwrap).collect();
        assert_eq!(runs[0].pen, (10.0, 20.0));
        assert_eq!(runs[1].pen, (15.0, 25.0));
        assert_eq!(runs[2].pen, (5.0, 25.0));
    }

    #[test]
    fn test_anchor_applies_per_chunk() {
        let engine = TextLayoutEngine::new(&BoxFontProvider);
        let middle = RunLayout { anchor: TextAnchor::Middle, ..Default::default() };
        let span = |text: &str, x: Option<f64>| TextSpan {
            text: text.to_string(),
            font: font(10.0),
            x,
            y: None,
            dx: 0.0,
            dy: 0.0,
            layout: middle,
        };
        let runs = engine.layout_spans(&[span("ab", None), span("cd", None), span("e", Some(100.0))], (50.0, 0.0));
        let runs: Vec<TextRun> = runs.into_iter().map(Result::unwrap).collect();

        // "abcd" is one 20-wide chunk centered on 50.
        assert_eq!(run_bounds(&runs[0]).x, 40.0);
        assert_eq!(run_bounds(&runs[1]).x, 50.0);
        assert_eq!(runs[1].pen, (60.0, 0.0));
        assert_eq!(run_bounds(&runs[2]).x, 97.5);
    }

    #[test]
    fn test_text_on_path_spacing_and_glyphs() {
        let engine = TextLayoutEngine::new(&BoxFontProvider);
        let path = PathMeasure::new(&PathData::parse("M0 0 L100 0"), 0.1);
        let layout = RunLayout {
            text_length: Some(50.0),
            length_adjust: LengthAdjust::SpacingAndGlyphs,
            ..Default::default()
        };
        let run = engine.layout_on_path(&font(16.0), "abcdefghij", &path, 0.0, &layout).unwrap();
        assert_eq!(run.glyphs.len(), 10);
        assert_eq!(run.advance, 50.0);
        let b = run_bounds(&run);
        assert!((b.width - 50.0).abs() < 0.1);
        assert!(b.x.abs() < 1e-9);
    }

    #[test]
    fn test_text_on_path_drops_overflow() {
        let engine = TextLayoutEngine::new(&BoxFontProvider);
        let path = PathMeasure::new(&PathData::parse("M0 0 L20 0"), 0.1);
        // Four 8-unit glyphs on a 20-unit path: midpoints at 4, 12, 20, 28.
        let run = engine
            .layout_on_path(&font(16.0), "abcd", &path, 0.0, &RunLayout::default())
            .unwrap();
        assert_eq!(run.glyphs.len(), 3);
    }

    #[test]
    fn test_text_on_path_follows_tangent() {
        let engine = TextLayoutEngine::new(&BoxFontProvider);
        let path = PathMeasure::new(&PathData::parse("M0 0 L0 100"), 0.1);
        let run = engine.layout_on_path(&font(10.0), "a", &path, 10.0, &RunLayout::default()).unwrap();
        // Rotated 90 degrees: the glyph's advance runs down the y axis.
        let b = run_bounds(&run);
        assert!((b.y - 10.0).abs() < 1e-9);
        assert!((b.height - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_text_on_path_degenerate() {
        let engine = TextLayoutEngine::new(&BoxFontProvider);
        let empty = PathMeasure::new(&PathData::parse("M5 5"), 0.1);
        let run = engine.layout_on_path(&font(10.0), "abc", &empty, 0.0, &RunLayout::default()).unwrap();
        assert!(run.glyphs.is_empty());
        let line = PathMeasure::new(&PathData::parse("M0 0 L10 0"), 0.1);
        let run = engine.layout_on_path(&font(10.0), "", &line, 0.0, &RunLayout::default()).unwrap();
        assert!(run.glyphs.is_empty());
    }

    #[test]
    fn test_font_attributes() {
        let base = FontDescriptor::default();
        let f = base.with_attributes(Some("'Fira Sans', serif"), Some("2em"), Some("bold"), Some("italic"));
        assert_eq!(f.family, "Fira Sans");
        assert_eq!(f.size, 32.0);
        assert_eq!(f.weight, 700);
        assert_eq!(f.style, FontStyle::Italic);
        let g = base.with_attributes(None, Some("-4"), Some("heavy"), None);
        assert_eq!(g, base);
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("a\n  b\tc", false), "a b c");
        assert_eq!(normalize_whitespace("a\n b", true), "a  b");
    }
}
