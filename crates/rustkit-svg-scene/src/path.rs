//! Path data: the `d` attribute parser, outline construction and
//! flattening into polylines.

use crate::geometry::Rect;
use crate::parse::Cursor;
use crate::transform::Transform2D;
use std::f64::consts::PI;

const MAX_BEZIER_DEPTH: u32 = 16;
const MAX_ARC_STEPS: f64 = 1024.0;

// ==================== Path Data ====================

/// One absolute path segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    MoveTo(f64, f64),
    LineTo(f64, f64),
    /// Control point 1, control point 2, end point.
    CubicTo(f64, f64, f64, f64, f64, f64),
    /// Control point, end point.
    QuadTo(f64, f64, f64, f64),
    ArcTo {
        rx: f64,
        ry: f64,
        x_axis_rotation: f64,
        large_arc: bool,
        sweep: bool,
        x: f64,
        y: f64,
    },
    ClosePath,
}

/// An outline made of absolute segments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathData {
    pub segments: Vec<PathSegment>,
}

/// A vertex of a flattened outline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatVertex {
    pub x: f64,
    pub y: f64,
    /// Index of the source segment that produced this vertex.
    pub segment: usize,
    /// True if this vertex starts a new subpath.
    pub move_to: bool,
}

impl PathData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn move_to(&mut self, x: f64, y: f64) -> &mut Self {
        self.segments.push(PathSegment::MoveTo(x, y));
        self
    }

    pub fn line_to(&mut self, x: f64, y: f64) -> &mut Self {
        self.segments.push(PathSegment::LineTo(x, y));
        self
    }

    pub fn cubic_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x: f64, y: f64) -> &mut Self {
        self.segments.push(PathSegment::CubicTo(x1, y1, x2, y2, x, y));
        self
    }

    pub fn quad_to(&mut self, x1: f64, y1: f64, x: f64, y: f64) -> &mut Self {
        self.segments.push(PathSegment::QuadTo(x1, y1, x, y));
        self
    }

    pub fn close(&mut self) -> &mut Self {
        self.segments.push(PathSegment::ClosePath);
        self
    }

    /// Append all segments of `other`.
    pub fn extend(&mut self, other: &PathData) {
        self.segments.extend_from_slice(&other.segments);
    }

    /// Closed polygon through `points`.
    pub fn from_points(points: &[(f64, f64)], closed: bool) -> Self {
        let mut path = PathData::new();
        for (i, &(x, y)) in points.iter().enumerate() {
            if i == 0 {
                path.move_to(x, y);
            } else {
                path.line_to(x, y);
            }
        }
        if closed && !points.is_empty() {
            path.close();
        }
        path
    }

    /// Parse path data. Parsing stops at the first error; everything read
    /// before it is kept.
    pub fn parse(d: &str) -> Self {
        let mut path = PathData::new();
        let mut cursor = Cursor::new(d);
        let mut command: Option<u8> = None;
        let mut current = (0.0, 0.0);
        let mut start = (0.0, 0.0);
        // Reflection sources for S/s and T/t.
        let mut last_cubic_ctrl: Option<(f64, f64)> = None;
        let mut last_quad_ctrl: Option<(f64, f64)> = None;

        loop {
            cursor.skip_separators();
            let Some(next) = cursor.peek() else {
                break;
            };

            if next.is_ascii_alphabetic() {
                cursor.next_byte();
                if matches!(next, b'Z' | b'z') {
                    path.close();
                    current = start;
                    last_cubic_ctrl = None;
                    last_quad_ctrl = None;
                    command = None;
                    continue;
                }
                if path.is_empty() && !matches!(next, b'M' | b'm') {
                    break;
                }
                command = Some(next);
            }

            let Some(cmd) = command else {
                break;
            };
            let relative = cmd.is_ascii_lowercase();
            let (ox, oy) = if relative { current } else { (0.0, 0.0) };

            let segment = match cmd.to_ascii_uppercase() {
                b'M' => {
                    let Some((x, y)) = read_pair(&mut cursor) else { break };
                    let p = (ox + x, oy + y);
                    start = p;
                    // Extra coordinate pairs after a moveto are implicit linetos.
                    command = Some(if relative { b'l' } else { b'L' });
                    PathSegment::MoveTo(p.0, p.1)
                }
                b'L' => {
                    let Some((x, y)) = read_pair(&mut cursor) else { break };
                    PathSegment::LineTo(ox + x, oy + y)
                }
                b'H' => {
                    let Some(x) = cursor.next_double() else { break };
                    let x = if relative { current.0 + x } else { x };
                    PathSegment::LineTo(x, current.1)
                }
                b'V' => {
                    let Some(y) = cursor.next_double() else { break };
                    let y = if relative { current.1 + y } else { y };
                    PathSegment::LineTo(current.0, y)
                }
                b'C' => {
                    let Some(v) = read_n::<6>(&mut cursor) else { break };
                    PathSegment::CubicTo(ox + v[0], oy + v[1], ox + v[2], oy + v[3], ox + v[4], oy + v[5])
                }
                b'S' => {
                    let Some(v) = read_n::<4>(&mut cursor) else { break };
                    let (x1, y1) = reflect(last_cubic_ctrl, current);
                    PathSegment::CubicTo(x1, y1, ox + v[0], oy + v[1], ox + v[2], oy + v[3])
                }
                b'Q' => {
                    let Some(v) = read_n::<4>(&mut cursor) else { break };
                    PathSegment::QuadTo(ox + v[0], oy + v[1], ox + v[2], oy + v[3])
                }
                b'T' => {
                    let Some((x, y)) = read_pair(&mut cursor) else { break };
                    let (x1, y1) = reflect(last_quad_ctrl, current);
                    PathSegment::QuadTo(x1, y1, ox + x, oy + y)
                }
                b'A' => {
                    let (Some(rx), Some(ry), Some(rot), Some(large_arc), Some(sweep), Some((x, y))) = (
                        cursor.next_double(),
                        cursor.next_double(),
                        cursor.next_double(),
                        cursor.next_flag(),
                        cursor.next_flag(),
                        read_pair(&mut cursor),
                    ) else {
                        break;
                    };
                    PathSegment::ArcTo {
                        rx,
                        ry,
                        x_axis_rotation: rot,
                        large_arc,
                        sweep,
                        x: ox + x,
                        y: oy + y,
                    }
                }
                _ => break,
            };

            last_cubic_ctrl = None;
            last_quad_ctrl = None;
            match segment {
                PathSegment::CubicTo(_, _, x2, y2, _, _) => last_cubic_ctrl = Some((x2, y2)),
                PathSegment::QuadTo(x1, y1, _, _) => last_quad_ctrl = Some((x1, y1)),
                _ => {}
            }
            if let Some(end) = end_point(&segment) {
                current = end;
            }
            path.segments.push(segment);
        }

        path
    }

    /// Copy of this outline with every point mapped through `t`. Arcs are
    /// converted to cubics first since an affine map does not keep their
    /// parameterization.
    pub fn transformed(&self, t: &Transform2D) -> PathData {
        if t.is_identity() {
            return self.clone();
        }
        let mut out = PathData::new();
        for segment in self.without_arcs().segments {
            let mapped = match segment {
                PathSegment::MoveTo(x, y) => {
                    let (x, y) = t.apply(x, y);
                    PathSegment::MoveTo(x, y)
                }
                PathSegment::LineTo(x, y) => {
                    let (x, y) = t.apply(x, y);
                    PathSegment::LineTo(x, y)
                }
                PathSegment::CubicTo(x1, y1, x2, y2, x, y) => {
                    let (x1, y1) = t.apply(x1, y1);
                    let (x2, y2) = t.apply(x2, y2);
                    let (x, y) = t.apply(x, y);
                    PathSegment::CubicTo(x1, y1, x2, y2, x, y)
                }
                PathSegment::QuadTo(x1, y1, x, y) => {
                    let (x1, y1) = t.apply(x1, y1);
                    let (x, y) = t.apply(x, y);
                    PathSegment::QuadTo(x1, y1, x, y)
                }
                other => other,
            };
            out.segments.push(mapped);
        }
        out
    }

    /// Copy of this outline with elliptical arcs replaced by cubic beziers.
    pub fn without_arcs(&self) -> PathData {
        let mut out = PathData::new();
        let mut current = (0.0, 0.0);
        let mut start = (0.0, 0.0);
        for segment in &self.segments {
            match *segment {
                PathSegment::ArcTo { rx, ry, x_axis_rotation, large_arc, sweep, x, y } => {
                    match ArcCenter::from_endpoints(current, rx, ry, x_axis_rotation, large_arc, sweep, (x, y)) {
                        Some(arc) => arc.push_cubics(&mut out),
                        None => {
                            out.line_to(x, y);
                        }
                    }
                }
                other => out.segments.push(other),
            }
            update_position(segment, &mut current, &mut start);
        }
        out
    }

    /// Flatten into vertices at the given tolerance (maximum distance
    /// between the curve and its chords).
    pub fn flatten(&self, tolerance: f64) -> Vec<FlatVertex> {
        let tolerance = if tolerance > 0.0 { tolerance } else { 0.25 };
        let mut out = Vec::new();
        let mut current = (0.0, 0.0);
        let mut start = (0.0, 0.0);

        for (index, segment) in self.segments.iter().enumerate() {
            let mut push = |x: f64, y: f64, move_to: bool| {
                out.push(FlatVertex { x, y, segment: index, move_to });
            };
            match *segment {
                PathSegment::MoveTo(x, y) => push(x, y, true),
                PathSegment::LineTo(x, y) => push(x, y, false),
                PathSegment::CubicTo(x1, y1, x2, y2, x, y) => {
                    flatten_cubic(current, (x1, y1), (x2, y2), (x, y), tolerance, 0, &mut push);
                }
                PathSegment::QuadTo(qx, qy, x, y) => {
                    let (c1, c2) = quad_to_cubic(current, (qx, qy), (x, y));
                    flatten_cubic(current, c1, c2, (x, y), tolerance, 0, &mut push);
                }
                PathSegment::ArcTo { rx, ry, x_axis_rotation, large_arc, sweep, x, y } => {
                    match ArcCenter::from_endpoints(current, rx, ry, x_axis_rotation, large_arc, sweep, (x, y)) {
                        Some(arc) => arc.flatten(tolerance, &mut push),
                        None => push(x, y, false),
                    }
                }
                PathSegment::ClosePath => {
                    if current != start {
                        push(start.0, start.1, false);
                    }
                }
            }
            update_position(segment, &mut current, &mut start);
        }

        out
    }

    /// Flatten into one polyline per subpath.
    pub fn polylines(&self, tolerance: f64) -> Vec<Vec<(f64, f64)>> {
        let mut lines: Vec<Vec<(f64, f64)>> = Vec::new();
        for v in self.flatten(tolerance) {
            if v.move_to || lines.is_empty() {
                lines.push(Vec::new());
            }
            if let Some(line) = lines.last_mut() {
                line.push((v.x, v.y));
            }
        }
        lines.retain(|l| !l.is_empty());
        lines
    }

    /// Bounding box of the flattened outline.
    pub fn bounds(&self, tolerance: f64) -> Option<Rect> {
        Rect::from_points(self.flatten(tolerance).iter().map(|v| (v.x, v.y)))
    }
}

fn read_pair(cursor: &mut Cursor<'_>) -> Option<(f64, f64)> {
    let saved = cursor.clone();
    match (cursor.next_double(), cursor.next_double()) {
        (Some(x), Some(y)) => Some((x, y)),
        _ => {
            *cursor = saved;
            None
        }
    }
}

fn read_n<const N: usize>(cursor: &mut Cursor<'_>) -> Option<[f64; N]> {
    let mut out = [0.0; N];
    for slot in out.iter_mut() {
        *slot = cursor.next_double()?;
    }
    Some(out)
}

fn reflect(ctrl: Option<(f64, f64)>, current: (f64, f64)) -> (f64, f64) {
    match ctrl {
        Some((cx, cy)) => (2.0 * current.0 - cx, 2.0 * current.1 - cy),
        None => current,
    }
}

fn end_point(segment: &PathSegment) -> Option<(f64, f64)> {
    match *segment {
        PathSegment::MoveTo(x, y)
        | PathSegment::LineTo(x, y)
        | PathSegment::CubicTo(_, _, _, _, x, y)
        | PathSegment::QuadTo(_, _, x, y)
        | PathSegment::ArcTo { x, y, .. } => Some((x, y)),
        PathSegment::ClosePath => None,
    }
}

fn update_position(segment: &PathSegment, current: &mut (f64, f64), start: &mut (f64, f64)) {
    match segment {
        PathSegment::MoveTo(x, y) => {
            *current = (*x, *y);
            *start = *current;
        }
        PathSegment::ClosePath => *current = *start,
        other => {
            if let Some(end) = end_point(other) {
                *current = end;
            }
        }
    }
}

fn quad_to_cubic(p0: (f64, f64), q: (f64, f64), p3: (f64, f64)) -> ((f64, f64), (f64, f64)) {
    (
        (p0.0 + (q.0 - p0.0) * (2.0 / 3.0), p0.1 + (q.1 - p0.1) * (2.0 / 3.0)),
        (p3.0 + (q.0 - p3.0) * (2.0 / 3.0), p3.1 + (q.1 - p3.1) * (2.0 / 3.0)),
    )
}

// ==================== Curve Flattening ====================

fn flatten_cubic(
    p0: (f64, f64),
    p1: (f64, f64),
    p2: (f64, f64),
    p3: (f64, f64),
    tolerance: f64,
    depth: u32,
    push: &mut impl FnMut(f64, f64, bool),
) {
    if depth >= MAX_BEZIER_DEPTH || is_flat_cubic(p0, p1, p2, p3, tolerance) {
        push(p3.0, p3.1, false);
        return;
    }
    // de Casteljau split at t = 0.5
    let m01 = mid(p0, p1);
    let m12 = mid(p1, p2);
    let m23 = mid(p2, p3);
    let m012 = mid(m01, m12);
    let m123 = mid(m12, m23);
    let m0123 = mid(m012, m123);
    flatten_cubic(p0, m01, m012, m0123, tolerance, depth + 1, push);
    flatten_cubic(m0123, m123, m23, p3, tolerance, depth + 1, push);
}

fn is_flat_cubic(p0: (f64, f64), p1: (f64, f64), p2: (f64, f64), p3: (f64, f64), tolerance: f64) -> bool {
    let dx = p3.0 - p0.0;
    let dy = p3.1 - p0.1;
    let chord = (dx * dx + dy * dy).sqrt();
    if chord < 1e-9 {
        let d1 = distance(p0, p1);
        let d2 = distance(p0, p2);
        return d1 <= tolerance && d2 <= tolerance;
    }
    let d1 = ((p1.0 - p0.0) * dy - (p1.1 - p0.1) * dx).abs() / chord;
    let d2 = ((p2.0 - p0.0) * dy - (p2.1 - p0.1) * dx).abs() / chord;
    d1.max(d2) <= tolerance
}

fn mid(a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
    ((a.0 + b.0) * 0.5, (a.1 + b.1) * 0.5)
}

pub(crate) fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt()
}

// ==================== Elliptical Arcs ====================

/// Center parameterization of an elliptical arc.
#[derive(Debug, Clone, Copy)]
struct ArcCenter {
    cx: f64,
    cy: f64,
    rx: f64,
    ry: f64,
    phi: f64,
    theta1: f64,
    delta: f64,
}

impl ArcCenter {
    /// Endpoint to center conversion. Returns `None` when the arc
    /// degenerates to a straight line (zero radius) or to nothing.
    fn from_endpoints(
        from: (f64, f64),
        rx: f64,
        ry: f64,
        x_axis_rotation: f64,
        large_arc: bool,
        sweep: bool,
        to: (f64, f64),
    ) -> Option<Self> {
        if distance(from, to) < 1e-12 {
            return None;
        }
        let mut rx = rx.abs();
        let mut ry = ry.abs();
        if rx < 1e-12 || ry < 1e-12 {
            return None;
        }

        let phi = x_axis_rotation.to_radians();
        let (sin_phi, cos_phi) = phi.sin_cos();
        let dx2 = (from.0 - to.0) * 0.5;
        let dy2 = (from.1 - to.1) * 0.5;
        let x1p = cos_phi * dx2 + sin_phi * dy2;
        let y1p = -sin_phi * dx2 + cos_phi * dy2;

        let lambda = (x1p * x1p) / (rx * rx) + (y1p * y1p) / (ry * ry);
        if lambda > 1.0 {
            let s = lambda.sqrt();
            rx *= s;
            ry *= s;
        }

        let rx2 = rx * rx;
        let ry2 = ry * ry;
        let num = rx2 * ry2 - rx2 * y1p * y1p - ry2 * x1p * x1p;
        let den = rx2 * y1p * y1p + ry2 * x1p * x1p;
        let mut coef = if den < 1e-18 { 0.0 } else { (num / den).max(0.0).sqrt() };
        if large_arc == sweep {
            coef = -coef;
        }
        let cxp = coef * rx * y1p / ry;
        let cyp = -coef * ry * x1p / rx;

        let cx = cos_phi * cxp - sin_phi * cyp + (from.0 + to.0) * 0.5;
        let cy = sin_phi * cxp + cos_phi * cyp + (from.1 + to.1) * 0.5;

        let ux = (x1p - cxp) / rx;
        let uy = (y1p - cyp) / ry;
        let vx = (-x1p - cxp) / rx;
        let vy = (-y1p - cyp) / ry;

        let theta1 = vector_angle((1.0, 0.0), (ux, uy));
        let mut delta = vector_angle((ux, uy), (vx, vy));
        if !sweep && delta > 0.0 {
            delta -= 2.0 * PI;
        } else if sweep && delta < 0.0 {
            delta += 2.0 * PI;
        }

        Some(Self { cx, cy, rx, ry, phi, theta1, delta })
    }

    fn point(&self, theta: f64) -> (f64, f64) {
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        let (sin_t, cos_t) = theta.sin_cos();
        (
            cos_phi * self.rx * cos_t - sin_phi * self.ry * sin_t + self.cx,
            sin_phi * self.rx * cos_t + cos_phi * self.ry * sin_t + self.cy,
        )
    }

    fn derivative(&self, theta: f64) -> (f64, f64) {
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        let (sin_t, cos_t) = theta.sin_cos();
        (
            -cos_phi * self.rx * sin_t - sin_phi * self.ry * cos_t,
            -sin_phi * self.rx * sin_t + cos_phi * self.ry * cos_t,
        )
    }

    fn flatten(&self, tolerance: f64, push: &mut impl FnMut(f64, f64, bool)) {
        let radius = self.rx.max(self.ry);
        let step = if tolerance < radius {
            2.0 * (1.0 - tolerance / radius).acos()
        } else {
            PI / 2.0
        };
        let steps = (self.delta.abs() / step).ceil().clamp(1.0, MAX_ARC_STEPS) as usize;
        for i in 1..=steps {
            let theta = self.theta1 + self.delta * (i as f64 / steps as f64);
            let (x, y) = self.point(theta);
            push(x, y, false);
        }
    }

    /// Approximate with one cubic per quarter turn (or less).
    fn push_cubics(&self, out: &mut PathData) {
        let pieces = (self.delta.abs() / (PI / 2.0)).ceil().max(1.0) as usize;
        let step = self.delta / pieces as f64;
        let k = 4.0 / 3.0 * (step / 4.0).tan();
        for i in 0..pieces {
            let t0 = self.theta1 + step * i as f64;
            let t1 = t0 + step;
            let p0 = self.point(t0);
            let p3 = self.point(t1);
            let d0 = self.derivative(t0);
            let d1 = self.derivative(t1);
            out.cubic_to(
                p0.0 + k * d0.0,
                p0.1 + k * d0.1,
                p3.0 - k * d1.0,
                p3.1 - k * d1.1,
                p3.0,
                p3.1,
            );
        }
    }
}

fn vector_angle(u: (f64, f64), v: (f64, f64)) -> f64 {
    let dot = u.0 * v.0 + u.1 * v.1;
    let len = ((u.0 * u.0 + u.1 * u.1) * (v.0 * v.0 + v.1 * v.1)).sqrt();
    let angle = (dot / len.max(1e-18)).clamp(-1.0, 1.0).acos();
    if u.0 * v.1 - u.1 * v.0 < 0.0 {
        -angle
    } else {
        angle
    }
}
