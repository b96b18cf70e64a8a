//! Clip geometry.
//!
//! A clip is kept symbolic: a tree of outlines combined by union and
//! intersection. The consumer decides how to evaluate it (path boolean ops,
//! stencil, mask).

use crate::geometry::{Geometry, Rect};
use crate::paint::GradientUnits;
use crate::transform::Transform2D;

/// A clip region.
#[derive(Debug, Clone, PartialEq)]
pub enum ClipGeometry {
    /// One outline placed by `transform`.
    Shape {
        geometry: Geometry,
        transform: Transform2D,
    },
    /// Points inside any member. An empty union clips everything away.
    Union(Vec<ClipGeometry>),
    /// Points inside both.
    Intersection(Box<ClipGeometry>, Box<ClipGeometry>),
}

impl ClipGeometry {
    /// Clip that removes everything.
    pub fn empty() -> Self {
        ClipGeometry::Union(Vec::new())
    }

    /// Intersect with `other`.
    pub fn intersect(self, other: ClipGeometry) -> Self {
        ClipGeometry::Intersection(Box::new(self), Box::new(other))
    }

    /// Map every outline through `t` (applied after the existing
    /// placement).
    pub fn transformed(&self, t: &Transform2D) -> Self {
        match self {
            ClipGeometry::Shape { geometry, transform } => ClipGeometry::Shape {
                geometry: geometry.clone(),
                transform: t.multiply(transform),
            },
            ClipGeometry::Union(members) => {
                ClipGeometry::Union(members.iter().map(|m| m.transformed(t)).collect())
            }
            ClipGeometry::Intersection(a, b) => {
                ClipGeometry::Intersection(Box::new(a.transformed(t)), Box::new(b.transformed(t)))
            }
        }
    }

    /// Conservative bounds: the union's hull, the intersection of an
    /// intersection's bounds.
    pub fn bounds(&self, tolerance: f64) -> Option<Rect> {
        match self {
            ClipGeometry::Shape { geometry, transform } => geometry.transformed_bounds(transform, tolerance),
            ClipGeometry::Union(members) => members
                .iter()
                .filter_map(|m| m.bounds(tolerance))
                .reduce(|a, b| a.union(&b)),
            ClipGeometry::Intersection(a, b) => {
                let (a, b) = (a.bounds(tolerance)?, b.bounds(tolerance)?);
                let x = a.x.max(b.x);
                let y = a.y.max(b.y);
                let right = a.right().min(b.right());
                let bottom = a.bottom().min(b.bottom());
                (right >= x && bottom >= y).then(|| Rect::new(x, y, right - x, bottom - y))
            }
        }
    }

    /// Number of outlines in the tree.
    pub fn shape_count(&self) -> usize {
        match self {
            ClipGeometry::Shape { .. } => 1,
            ClipGeometry::Union(members) => members.iter().map(ClipGeometry::shape_count).sum(),
            ClipGeometry::Intersection(a, b) => a.shape_count() + b.shape_count(),
        }
    }
}

/// A `clipPath` element folded into one geometry, still in its own units.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedClip {
    pub geometry: ClipGeometry,
    pub units: GradientUnits,
}

impl ResolvedClip {
    /// Geometry in the user space of a shape with bounding box `bbox`.
    /// Returns `None` when bounding-box units meet a missing box.
    pub fn for_bbox(&self, bbox: Option<Rect>) -> Option<ClipGeometry> {
        match self.units {
            GradientUnits::UserSpaceOnUse => Some(self.geometry.clone()),
            GradientUnits::ObjectBoundingBox => {
                let bbox = bbox.filter(|b| b.width > 0.0 && b.height > 0.0)?;
                Some(self.geometry.transformed(&bbox.bbox_transform()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, size: f64) -> ClipGeometry {
        ClipGeometry::Shape {
            geometry: Geometry::Rect { x, y: 0.0, width: size, height: size, rx: 0.0, ry: 0.0 },
            transform: Transform2D::identity(),
        }
    }

    #[test]
    fn test_bounds_of_union_and_intersection() {
        let union = ClipGeometry::Union(vec![square(0.0, 10.0), square(20.0, 10.0)]);
        assert_eq!(union.bounds(0.1), Some(Rect::new(0.0, 0.0, 30.0, 10.0)));
        let both = square(0.0, 10.0).intersect(square(5.0, 10.0));
        assert_eq!(both.bounds(0.1), Some(Rect::new(5.0, 0.0, 5.0, 10.0)));
        assert_eq!(square(0.0, 1.0).intersect(square(5.0, 1.0)).bounds(0.1), None);
        assert_eq!(ClipGeometry::empty().bounds(0.1), None);
    }

    #[test]
    fn test_transformed_composes_after() {
        let clip = square(0.0, 1.0).transformed(&Transform2D::from_scale(10.0, 10.0));
        let moved = clip.transformed(&Transform2D::from_translate(5.0, 0.0));
        assert_eq!(moved.bounds(0.1), Some(Rect::new(5.0, 0.0, 10.0, 10.0)));
    }

    #[test]
    fn test_bounding_box_units() {
        let clip = ResolvedClip { geometry: square(0.0, 0.5), units: GradientUnits::ObjectBoundingBox };
        let g = clip.for_bbox(Some(Rect::new(10.0, 10.0, 100.0, 40.0))).unwrap();
        assert_eq!(g.bounds(0.1), Some(Rect::new(10.0, 10.0, 50.0, 20.0)));
        assert!(clip.for_bbox(None).is_none());
    }
}
