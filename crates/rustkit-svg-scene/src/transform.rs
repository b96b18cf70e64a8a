//! Affine transforms and the `transform` attribute compiler.

use crate::parse::Cursor;
use tracing::trace;

/// 2D affine transform matrix.
///
/// Represents: [a c e]
///             [b d f]
///             [0 0 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2D {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Transform2D {
    /// Create identity transform.
    pub const fn identity() -> Self {
        Self {
            a: 1.0, b: 0.0,
            c: 0.0, d: 1.0,
            e: 0.0, f: 0.0,
        }
    }

    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// Pure translation.
    pub const fn from_translate(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// Pure scale.
    pub const fn from_scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Pure rotation (radians).
    pub fn from_rotate(angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(cos, sin, -sin, cos, 0.0, 0.0)
    }

    /// Append a translation (applied before `self`).
    pub fn translate(self, tx: f64, ty: f64) -> Self {
        self.multiply(&Self::from_translate(tx, ty))
    }

    /// Append a scale (applied before `self`).
    pub fn scale(self, sx: f64, sy: f64) -> Self {
        self.multiply(&Self::from_scale(sx, sy))
    }

    /// Append a rotation in radians (applied before `self`).
    pub fn rotate(self, angle: f64) -> Self {
        self.multiply(&Self::from_rotate(angle))
    }

    /// Multiply two transforms. `other` is applied first.
    pub fn multiply(&self, other: &Transform2D) -> Self {
        Transform2D {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    /// Transform a point.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Get inverse transform.
    pub fn inverse(&self) -> Option<Self> {
        let det = self.a * self.d - self.b * self.c;
        if det.abs() < 1e-12 {
            return None;
        }
        let inv_det = 1.0 / det;
        Some(Transform2D {
            a: self.d * inv_det,
            b: -self.b * inv_det,
            c: -self.c * inv_det,
            d: self.a * inv_det,
            e: (self.c * self.f - self.d * self.e) * inv_det,
            f: (self.b * self.e - self.a * self.f) * inv_det,
        })
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// Parse a `transform` attribute, dropping any report of skipped
    /// functions.
    pub fn parse(s: &str) -> Self {
        parse_transform(s).matrix
    }
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::identity()
    }
}

// ==================== Transform Compiler ====================

/// Result of compiling a transform list.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformList {
    /// All recognized functions concatenated left to right.
    pub matrix: Transform2D,
    /// Functions that were recognized but not applied (`skewX`, `skewY`).
    pub unsupported: Vec<String>,
}

/// Compile a transform list such as `translate(10) rotate(45, 5, 5)`.
///
/// Unknown function names are skipped and the rest of the list still
/// applies. A syntax error stops compilation; functions before it are kept.
pub fn parse_transform(s: &str) -> TransformList {
    let mut matrix = Transform2D::identity();
    let mut unsupported = Vec::new();
    let mut cursor = Cursor::new(s);

    loop {
        cursor.skip_separators();
        let Some(name) = cursor.next_ident() else {
            break;
        };
        if !cursor.eat(b'(') {
            break;
        }

        let mut args = Vec::with_capacity(6);
        while args.len() < 6 {
            let arg = if name == "rotate" && args.is_empty() {
                cursor.next_angle().map(f64::to_degrees)
            } else {
                cursor.next_double()
            };
            match arg {
                Some(v) => args.push(v),
                None => break,
            }
        }
        if !cursor.eat(b')') {
            // Unknown functions may take arguments we can't read; resync on ')'.
            if !cursor.skip_past(b')') {
                break;
            }
        }

        let term = match (name, args.as_slice()) {
            ("translate", [tx]) => Some(Transform2D::from_translate(*tx, 0.0)),
            ("translate", [tx, ty, ..]) => Some(Transform2D::from_translate(*tx, *ty)),
            ("translateX", [tx, ..]) => Some(Transform2D::from_translate(*tx, 0.0)),
            ("translateY", [ty, ..]) => Some(Transform2D::from_translate(0.0, *ty)),
            ("scale", [s]) => Some(Transform2D::from_scale(*s, *s)),
            ("scale", [sx, sy, ..]) => Some(Transform2D::from_scale(*sx, *sy)),
            ("scaleX", [sx, ..]) => Some(Transform2D::from_scale(*sx, 1.0)),
            ("scaleY", [sy, ..]) => Some(Transform2D::from_scale(1.0, *sy)),
            ("rotate", [deg]) => Some(Transform2D::from_rotate(deg.to_radians())),
            ("rotate", [deg, cx, cy, ..]) => Some(
                Transform2D::from_translate(*cx, *cy)
                    .rotate(deg.to_radians())
                    .translate(-cx, -cy),
            ),
            ("matrix", [a, b, c, d, e, f]) => Some(Transform2D::new(*a, *b, *c, *d, *e, *f)),
            ("skewX", _) | ("skewY", _) => {
                unsupported.push(name.to_string());
                None
            }
            _ => {
                trace!(function = name, args = args.len(), "skipping transform function");
                None
            }
        };

        if let Some(term) = term {
            matrix = matrix.multiply(&term);
        }
    }

    TransformList { matrix, unsupported }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: (f64, f64), b: (f64, f64)) -> bool {
        (a.0 - b.0).abs() < 1e-9 && (a.1 - b.1).abs() < 1e-9
    }

    #[test]
    fn test_transform_identity() {
        let t = Transform2D::identity();
        assert_eq!(t.apply(10.0, 20.0), (10.0, 20.0));
    }

    #[test]
    fn test_transform_translate() {
        let t = Transform2D::identity().translate(5.0, 10.0);
        assert_eq!(t.apply(10.0, 20.0), (15.0, 30.0));
    }

    #[test]
    fn test_transform_scale() {
        let t = Transform2D::identity().scale(2.0, 3.0);
        assert_eq!(t.apply(10.0, 20.0), (20.0, 60.0));
    }

    #[test]
    fn test_transform_parse() {
        let t = Transform2D::parse("translate(10, 20)");
        assert_eq!(t.apply(0.0, 0.0), (10.0, 20.0));

        let t = Transform2D::parse("scale(2)");
        assert_eq!(t.apply(5.0, 5.0), (10.0, 10.0));
    }

    #[test]
    fn test_parse_concatenates_left_to_right() {
        // translate applies last to the point, scale first.
        let t = Transform2D::parse("translate(10,0) scale(2)");
        assert_eq!(t.apply(1.0, 1.0), (12.0, 2.0));
    }

    #[test]
    fn test_rotate_about_pivot() {
        let t = Transform2D::parse("rotate(90 10 10)");
        assert!(approx(t.apply(20.0, 10.0), (10.0, 20.0)));
    }

    #[test]
    fn test_matrix_and_axis_functions() {
        let t = Transform2D::parse("matrix(1 0 0 1 3 4)");
        assert_eq!(t.apply(0.0, 0.0), (3.0, 4.0));
        let t = Transform2D::parse("translateX(5) translateY(6) scaleY(2)");
        assert_eq!(t.apply(1.0, 1.0), (6.0, 8.0));
    }

    #[test]
    fn test_unknown_function_is_skipped() {
        let t = Transform2D::parse("perspective(3) translate(1 2)");
        assert_eq!(t.apply(0.0, 0.0), (1.0, 2.0));
    }

    #[test]
    fn test_skew_is_reported_not_applied() {
        let list = parse_transform("skewX(30) translate(2)");
        assert_eq!(list.unsupported, vec!["skewX".to_string()]);
        assert_eq!(list.matrix.apply(0.0, 0.0), (2.0, 0.0));
    }

    #[test]
    fn test_malformed_stops_compilation() {
        let t = Transform2D::parse("translate(4) scale");
        assert_eq!(t.apply(0.0, 0.0), (4.0, 0.0));
    }

    #[test]
    fn test_inverse() {
        let t = Transform2D::parse("translate(3 4) scale(2)");
        let inv = t.inverse().unwrap();
        let (x, y) = t.apply(1.5, -2.0);
        assert!(approx(inv.apply(x, y), (1.5, -2.0)));
        assert!(Transform2D::from_scale(0.0, 1.0).inverse().is_none());
    }
}
