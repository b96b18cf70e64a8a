//! # RustKit SVG Scene
//!
//! Interprets an SVG document tree into a flat list of styled shapes for the
//! RustKit browser engine.
//!
//! ## Features
//!
//! - **Element Index**: id lookup, cascading attributes, `use` reference copies
//! - **Basic Shapes**: rect, circle, ellipse, line, polyline, polygon, path
//! - **Paint Servers**: linear and radial gradients with `href` templates
//! - **Clipping**: `clipPath` folded into union/intersection geometry
//! - **Text**: multi-span text and `textPath` with `textLength` fitting
//! - **Markers**: start/mid/end markers with automatic orientation
//! - **Filters**: filter elements carried as data on each shape
//!
//! ## Architecture
//!
//! ```text
//! DocumentNode tree
//!    └── ElementIndex (arena, ids, attribute memo)
//!           └── Interpreter
//!                  ├── PaintResolver (gradients)
//!                  ├── clip paths / filters
//!                  ├── TextLayoutEngine (FontProvider)
//!                  └── Vec<StyledShape>
//! ```
//!
//! ## Example
//!
//! ```
//! use rustkit_svg_scene::{Interpreter, InterpreterConfig, SvgNode};
//!
//! let doc = SvgNode::element("svg").child(
//!     SvgNode::element("rect")
//!         .attr("width", "10")
//!         .attr("height", "5")
//!         .attr("fill", "red"),
//! );
//! let mut interpreter = Interpreter::from_tree(&doc, InterpreterConfig::default());
//! let shapes = interpreter.build();
//! assert_eq!(shapes.len(), 1);
//! ```

pub mod builder;
pub mod clip;
pub mod config;
pub mod filter;
pub mod geometry;
pub mod index;
pub mod measure;
pub mod paint;
pub mod parse;
pub mod path;
pub mod shape;
pub mod text;
pub mod transform;
pub mod tree;

pub use builder::Interpreter;
pub use clip::ClipGeometry;
pub use config::InterpreterConfig;
pub use filter::{Filter, FilterEffect, FilterPrimitive};
pub use geometry::{Geometry, Rect};
pub use index::{ElementId, ElementIndex, Tag};
pub use paint::{Color, Gradient, GradientKind, GradientStop, GradientUnits, Paint, SpreadMethod};
pub use path::PathData;
pub use shape::{Fill, FillRule, LineCap, LineJoin, ShapeRole, Stroke, StyledShape};
pub use text::{BoxFontProvider, FontDescriptor, FontProvider, FontStyle, Glyph, TextError};
pub use transform::Transform2D;
pub use tree::{DocumentNode, SvgNode};

use thiserror::Error;

// ==================== Errors ====================

/// Recoverable problems found while interpreting a document.
///
/// None of these abort interpretation; the affected element is skipped or
/// falls back to its default and the warning is collected on the
/// [`Interpreter`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Warning {
    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    #[error("Unknown element: {0}")]
    UnknownElement(String),

    #[error("Unresolved reference: {0}")]
    UnresolvedReference(String),

    #[error("Not a clipPath: {0}")]
    InvalidClipPath(String),

    #[error("Reference cycle through: {0}")]
    ReferenceCycle(String),

    #[error("Recursion limit {limit} reached at {tag}")]
    RecursionLimit { tag: String, limit: usize },

    #[error("Unsupported transform: {0}")]
    UnsupportedTransform(String),

    #[error("Font failure: {0}")]
    FontFailure(#[from] TextError),
}
