//! Shape outlines and bounding boxes.

use crate::path::PathData;
use crate::transform::Transform2D;

/// Cubic bezier handle length for a quarter circle.
const KAPPA: f64 = 0.552_284_749_830_793_4;

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Smallest rectangle containing every point, or `None` for no points.
    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        let mut iter = points.into_iter();
        let (x0, y0) = iter.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (x0, y0, x0, y0);
        for (x, y) in iter {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        Some(Rect::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    /// Union of two rectangles.
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect::new(x, y, self.right().max(other.right()) - x, self.bottom().max(other.bottom()) - y)
    }

    /// Transform mapping the unit square onto this rectangle. Used for
    /// `objectBoundingBox` units.
    pub fn bbox_transform(&self) -> Transform2D {
        Transform2D::new(self.width, 0.0, 0.0, self.height, self.x, self.y)
    }
}

/// Outline of a shape in its own user space.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// Rectangle with optional rounded corners.
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        rx: f64,
        ry: f64,
    },
    /// Ellipse (circles have `rx == ry`).
    Ellipse { cx: f64, cy: f64, rx: f64, ry: f64 },
    /// Straight line.
    Line { x1: f64, y1: f64, x2: f64, y2: f64 },
    /// Arbitrary outline.
    Path(PathData),
}

impl Geometry {
    /// Convert to path data.
    pub fn to_path(&self) -> PathData {
        match self {
            Geometry::Rect { x, y, width, height, rx, ry } => {
                rect_path(*x, *y, *width, *height, *rx, *ry)
            }
            Geometry::Ellipse { cx, cy, rx, ry } => ellipse_path(*cx, *cy, *rx, *ry),
            Geometry::Line { x1, y1, x2, y2 } => {
                let mut path = PathData::new();
                path.move_to(*x1, *y1).line_to(*x2, *y2);
                path
            }
            Geometry::Path(path) => path.clone(),
        }
    }

    /// Bounding box in the geometry's own coordinates.
    pub fn bounds(&self, tolerance: f64) -> Option<Rect> {
        match self {
            Geometry::Rect { x, y, width, height, .. } => Some(Rect::new(*x, *y, *width, *height)),
            Geometry::Ellipse { cx, cy, rx, ry } => {
                Some(Rect::new(cx - rx, cy - ry, rx * 2.0, ry * 2.0))
            }
            Geometry::Line { x1, y1, x2, y2 } => Rect::from_points([(*x1, *y1), (*x2, *y2)]),
            Geometry::Path(path) => path.bounds(tolerance),
        }
    }

    /// Bounding box after mapping through `transform`.
    pub fn transformed_bounds(&self, transform: &Transform2D, tolerance: f64) -> Option<Rect> {
        if transform.is_identity() {
            return self.bounds(tolerance);
        }
        self.to_path().transformed(transform).bounds(tolerance)
    }

    /// True for outlines that can carry markers.
    pub fn is_path_like(&self) -> bool {
        matches!(self, Geometry::Line { .. } | Geometry::Path(_))
    }
}

fn rect_path(x: f64, y: f64, w: f64, h: f64, rx: f64, ry: f64) -> PathData {
    let rx = rx.clamp(0.0, w / 2.0);
    let ry = ry.clamp(0.0, h / 2.0);
    let mut path = PathData::new();
    if rx <= 0.0 || ry <= 0.0 {
        path.move_to(x, y)
            .line_to(x + w, y)
            .line_to(x + w, y + h)
            .line_to(x, y + h)
            .close();
        return path;
    }
    let kx = rx * KAPPA;
    let ky = ry * KAPPA;
    path.move_to(x + rx, y)
        .line_to(x + w - rx, y)
        .cubic_to(x + w - rx + kx, y, x + w, y + ry - ky, x + w, y + ry)
        .line_to(x + w, y + h - ry)
        .cubic_to(x + w, y + h - ry + ky, x + w - rx + kx, y + h, x + w - rx, y + h)
        .line_to(x + rx, y + h)
        .cubic_to(x + rx - kx, y + h, x, y + h - ry + ky, x, y + h - ry)
        .line_to(x, y + ry)
        .cubic_to(x, y + ry - ky, x + rx - kx, y, x + rx, y)
        .close();
    path
}

fn ellipse_path(cx: f64, cy: f64, rx: f64, ry: f64) -> PathData {
    let kx = rx * KAPPA;
    let ky = ry * KAPPA;
    let mut path = PathData::new();
    path.move_to(cx + rx, cy)
        .cubic_to(cx + rx, cy + ky, cx + kx, cy + ry, cx, cy + ry)
        .cubic_to(cx - kx, cy + ry, cx - rx, cy + ky, cx - rx, cy)
        .cubic_to(cx - rx, cy - ky, cx - kx, cy - ry, cx, cy - ry)
        .cubic_to(cx + kx, cy - ry, cx + rx, cy - ky, cx + rx, cy)
        .close();
    path
}
