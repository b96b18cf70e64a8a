//! Arc-length parameterization of outlines.
//!
//! A [`PathMeasure`] flattens an outline once and keeps the cumulative
//! length at every vertex, so text-on-path and marker placement can ask for
//! "the point 42 units along the path" without re-walking the curves.

use crate::path::{distance, FlatVertex, PathData};

/// A point on an outline with the direction of travel there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathPoint {
    pub x: f64,
    pub y: f64,
    /// Tangent angle in radians.
    pub angle: f64,
}

#[derive(Debug, Clone, Copy)]
struct MeasuredVertex {
    x: f64,
    y: f64,
    length: f64,
    segment: usize,
    move_to: bool,
}

/// Cumulative arc-length table for one outline.
#[derive(Debug, Clone)]
pub struct PathMeasure {
    vertices: Vec<MeasuredVertex>,
    total_length: f64,
}

impl PathMeasure {
    /// Flatten `path` at `tolerance` and measure it.
    pub fn new(path: &PathData, tolerance: f64) -> Self {
        Self::from_vertices(&path.flatten(tolerance))
    }

    fn from_vertices(flat: &[FlatVertex]) -> Self {
        let mut vertices = Vec::with_capacity(flat.len());
        let mut length = 0.0;
        for (i, v) in flat.iter().enumerate() {
            // A subpath jump contributes no length.
            if i > 0 && !v.move_to {
                let prev = &flat[i - 1];
                length += distance((prev.x, prev.y), (v.x, v.y));
            }
            vertices.push(MeasuredVertex {
                x: v.x,
                y: v.y,
                length,
                segment: v.segment,
                move_to: v.move_to,
            });
        }
        Self { vertices, total_length: length }
    }

    /// Total length of all subpaths.
    pub fn total_length(&self) -> f64 {
        self.total_length
    }

    /// Index of the first vertex of the drawable edge that contains `length`.
    fn edge_at_length(&self, length: f64) -> Option<usize> {
        if self.total_length <= 0.0 || !(0.0..=self.total_length).contains(&length) {
            return None;
        }
        // First vertex whose cumulative length reaches `length`.
        let upper = self.vertices.partition_point(|v| v.length < length);
        let mut end = upper.max(1);
        // Skip zero-length edges and subpath jumps.
        while end < self.vertices.len() {
            let a = &self.vertices[end - 1];
            let b = &self.vertices[end];
            if !b.move_to && b.length > a.length {
                return Some(end - 1);
            }
            end += 1;
        }
        // `length == total_length` lands after the last drawable edge; walk back.
        (1..self.vertices.len())
            .rev()
            .find(|&i| !self.vertices[i].move_to && self.vertices[i].length > self.vertices[i - 1].length)
            .map(|i| i - 1)
    }

    /// Point and tangent at `length` along the outline, or `None` outside
    /// `[0, total_length]`.
    pub fn point_at_length(&self, length: f64) -> Option<PathPoint> {
        let i = self.edge_at_length(length)?;
        let a = &self.vertices[i];
        let b = &self.vertices[i + 1];
        let span = b.length - a.length;
        let t = ((length - a.length) / span).clamp(0.0, 1.0);
        Some(PathPoint {
            x: a.x + (b.x - a.x) * t,
            y: a.y + (b.y - a.y) * t,
            angle: (b.y - a.y).atan2(b.x - a.x),
        })
    }

    /// First point on the outline whose x coordinate equals `x`, scanning
    /// edges in path order.
    pub fn point_at_x(&self, x: f64) -> Option<PathPoint> {
        if self.total_length <= 0.0 {
            return None;
        }
        self.vertices.windows(2).find_map(|pair| {
            let (a, b) = (&pair[0], &pair[1]);
            if b.move_to || b.length <= a.length {
                return None;
            }
            let (lo, hi) = if a.x <= b.x { (a.x, b.x) } else { (b.x, a.x) };
            if x < lo || x > hi {
                return None;
            }
            let t = if (b.x - a.x).abs() < 1e-12 { 0.0 } else { (x - a.x) / (b.x - a.x) };
            Some(PathPoint {
                x,
                y: a.y + (b.y - a.y) * t,
                angle: (b.y - a.y).atan2(b.x - a.x),
            })
        })
    }

    /// Vertex at the end of every source segment, in path order, with the
    /// tangents on either side. Marker placement uses these.
    pub fn segment_ends(&self) -> Vec<SegmentEnd> {
        let mut ends: Vec<SegmentEnd> = Vec::new();
        for (i, v) in self.vertices.iter().enumerate() {
            let next = self.vertices.get(i + 1);
            if next.is_some_and(|next| next.segment == v.segment) {
                continue;
            }
            let incoming = i
                .checked_sub(1)
                .filter(|_| !v.move_to)
                .and_then(|p| self.edge_angle(p));
            let outgoing = next.filter(|n| !n.move_to).and_then(|_| self.edge_angle(i));
            ends.push(SegmentEnd {
                x: v.x,
                y: v.y,
                length: v.length,
                incoming,
                outgoing,
            });
        }
        ends
    }

    /// Direction of the edge from vertex `i` to `i + 1`; `None` for a
    /// zero-length edge.
    fn edge_angle(&self, i: usize) -> Option<f64> {
        let a = self.vertices.get(i)?;
        let b = self.vertices.get(i + 1)?;
        (b.length > a.length).then(|| (b.y - a.y).atan2(b.x - a.x))
    }
}

/// A vertex where a source segment ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentEnd {
    pub x: f64,
    pub y: f64,
    /// Arc length from the start of the outline.
    pub length: f64,
    /// Direction arriving at the vertex; `None` at a subpath start.
    pub incoming: Option<f64>,
    /// Direction leaving the vertex; `None` at a subpath end.
    pub outgoing: Option<f64>,
}

impl SegmentEnd {
    /// Marker orientation: the bisector of both tangents, or whichever one
    /// exists.
    pub fn angle(&self) -> f64 {
        match (self.incoming, self.outgoing) {
            (Some(a), Some(b)) => {
                let (s, c) = (a.sin() + b.sin(), a.cos() + b.cos());
                if s.abs() < 1e-12 && c.abs() < 1e-12 {
                    a
                } else {
                    s.atan2(c)
                }
            }
            (Some(a), None) | (None, Some(a)) => a,
            (None, None) => 0.0,
        }
    }
}
