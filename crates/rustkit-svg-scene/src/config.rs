//! Interpreter configuration.

use crate::text::FontDescriptor;

/// Options for one interpretation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpreterConfig {
    /// Font used when no `font-*` attribute applies.
    pub default_font: FontDescriptor,
    /// Maximum distance between a curve and its flattened polyline.
    pub path_flattening_tolerance: f64,
    /// Nesting limit for groups, `use` copies, markers and clip paths.
    /// `None` derives it from the document (twice its depth, at least 16).
    pub max_reference_recursion_depth: Option<usize>,
    /// Also emit every flattened segment of a leaf shape as a hairline.
    pub emit_debug_path_segments: bool,
    /// Viewport used when the root element has no usable `width`/`height`.
    pub viewport: (f64, f64),
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            default_font: FontDescriptor::default(),
            path_flattening_tolerance: 0.25,
            max_reference_recursion_depth: None,
            emit_debug_path_segments: false,
            viewport: (300.0, 150.0),
        }
    }
}

impl InterpreterConfig {
    /// Lowest depth limit derived from a document.
    pub const MIN_DERIVED_DEPTH: usize = 16;

    /// Fine flattening and debug segments.
    pub fn debug() -> Self {
        Self {
            path_flattening_tolerance: 0.05,
            emit_debug_path_segments: true,
            ..Default::default()
        }
    }

    /// Coarse flattening for previews.
    pub fn draft() -> Self {
        Self {
            path_flattening_tolerance: 1.0,
            ..Default::default()
        }
    }

    pub fn with_default_font(mut self, font: FontDescriptor) -> Self {
        self.default_font = font;
        self
    }

    /// Set the flattening tolerance. Non-positive values are ignored.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        if tolerance > 0.0 && tolerance.is_finite() {
            self.path_flattening_tolerance = tolerance;
        }
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_reference_recursion_depth = Some(depth);
        self
    }

    pub fn with_debug_segments(mut self, enabled: bool) -> Self {
        self.emit_debug_path_segments = enabled;
        self
    }

    pub fn with_viewport(mut self, width: f64, height: f64) -> Self {
        self.viewport = (width, height);
        self
    }

    /// Depth limit for a document whose tree is `tree_depth` deep.
    pub fn depth_limit(&self, tree_depth: usize) -> usize {
        self.max_reference_recursion_depth
            .unwrap_or_else(|| (tree_depth * 2).max(Self::MIN_DERIVED_DEPTH))
    }
}
