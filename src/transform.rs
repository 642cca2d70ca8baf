use crate::rect::Rect;

/// A 2D affine transformation matrix.
///
/// Points are mapped as
/// ```text
/// x' = a * x + c * y + tx
/// y' = b * x + d * y + ty
/// ```
/// Composition follows the display-list convention: `m.append(&n)` yields a
/// matrix that applies `m` first and `n` afterwards.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Matrix {
    /// Identity matrix (no transformation)
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    pub fn new(a: f32, b: f32, c: f32, d: f32, tx: f32, ty: f32) -> Self {
        Self { a, b, c, d, tx, ty }
    }

    pub fn identity() -> Self {
        Self::IDENTITY
    }

    /// Create a translation matrix
    pub fn translation(x: f32, y: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, x, y)
    }

    /// Create a rotation matrix (angle in radians)
    pub fn rotation(angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(cos, sin, -sin, cos, 0.0, 0.0)
    }

    pub fn scaling(sx: f32, sy: f32) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Orthographic projection of the rectangle `(x, y, width, height)` onto
    /// normalized device coordinates, with the top edge at `+1`.
    pub fn ortho(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(
            2.0 / width,
            0.0,
            0.0,
            -2.0 / height,
            -(2.0 * x + width) / width,
            (2.0 * y + height) / height,
        )
    }

    /// Apply `other` after this matrix.
    pub fn append(&mut self, other: &Matrix) {
        *self = Self {
            a: other.a * self.a + other.c * self.b,
            b: other.b * self.a + other.d * self.b,
            c: other.a * self.c + other.c * self.d,
            d: other.b * self.c + other.d * self.d,
            tx: other.a * self.tx + other.c * self.ty + other.tx,
            ty: other.b * self.tx + other.d * self.ty + other.ty,
        };
    }

    /// Apply `other` before this matrix.
    pub fn prepend(&mut self, other: &Matrix) {
        let mut result = *other;
        result.append(self);
        *self = result;
    }

    pub fn appended(&self, other: &Matrix) -> Matrix {
        let mut result = *self;
        result.append(other);
        result
    }

    pub fn prepended(&self, other: &Matrix) -> Matrix {
        let mut result = *self;
        result.prepend(other);
        result
    }

    pub fn translate(&mut self, x: f32, y: f32) {
        self.tx += x;
        self.ty += y;
    }

    pub fn rotate(&mut self, angle: f32) {
        if angle != 0.0 {
            self.append(&Self::rotation(angle));
        }
    }

    pub fn scale(&mut self, sx: f32, sy: f32) {
        if sx != 1.0 {
            self.a *= sx;
            self.c *= sx;
            self.tx *= sx;
        }
        if sy != 1.0 {
            self.b *= sy;
            self.d *= sy;
            self.ty *= sy;
        }
    }

    pub fn determinant(&self) -> f32 {
        self.a * self.d - self.c * self.b
    }

    /// Compute the inverse of this matrix.
    /// A degenerate matrix (zero determinant) inverts to the identity.
    pub fn inverted(&self) -> Matrix {
        let det = self.determinant();
        if det.abs() < 1e-10 {
            return Self::IDENTITY;
        }

        let inv_det = 1.0 / det;
        Self {
            a: self.d * inv_det,
            b: -self.b * inv_det,
            c: -self.c * inv_det,
            d: self.a * inv_det,
            tx: (self.c * self.ty - self.d * self.tx) * inv_det,
            ty: (self.b * self.tx - self.a * self.ty) * inv_det,
        }
    }

    pub fn invert(&mut self) {
        *self = self.inverted();
    }

    /// Transform a 2D point by this matrix
    pub fn transform_point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.tx,
            self.b * x + self.d * y + self.ty,
        )
    }

    /// Axis-aligned bounds of `rect` after transformation.
    pub fn transform_rect_bounds(&self, rect: &Rect) -> Rect {
        let corners = [
            self.transform_point(rect.x, rect.y),
            self.transform_point(rect.right(), rect.y),
            self.transform_point(rect.x, rect.bottom()),
            self.transform_point(rect.right(), rect.bottom()),
        ];
        Rect::bounds_of_points(&corners)
    }

    /// Column-major 4x4 representation, as expected by WGSL `mat4x4<f32>`.
    pub fn to_mat4(&self) -> [[f32; 4]; 4] {
        [
            [self.a, self.b, 0.0, 0.0],
            [self.c, self.d, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [self.tx, self.ty, 0.0, 1.0],
        ]
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_identity() {
        let m = Matrix::identity();
        assert!(m.is_identity());
        assert_eq!(m.transform_point(3.0, 4.0), (3.0, 4.0));
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let m = Matrix::rotation(FRAC_PI_2);
        let (x, y) = m.transform_point(1.0, 0.0);
        assert!(approx_eq(x, 0.0));
        assert!(approx_eq(y, 1.0));
    }

    #[test]
    fn test_append_applies_other_last() {
        // scale first, then translate: (1, 1) -> (2, 2) -> (12, 2)
        let mut m = Matrix::scaling(2.0, 2.0);
        m.append(&Matrix::translation(10.0, 0.0));
        let (x, y) = m.transform_point(1.0, 1.0);
        assert!(approx_eq(x, 12.0));
        assert!(approx_eq(y, 2.0));
    }

    #[test]
    fn test_prepend_applies_other_first() {
        // translate first, then scale: (1, 1) -> (11, 1) -> (22, 2)
        let m = Matrix::scaling(2.0, 2.0).prepended(&Matrix::translation(10.0, 0.0));
        let (x, y) = m.transform_point(1.0, 1.0);
        assert!(approx_eq(x, 22.0));
        assert!(approx_eq(y, 2.0));
    }

    #[test]
    fn test_in_place_ops_match_append() {
        let mut m = Matrix::identity();
        m.scale(2.0, 3.0);
        m.rotate(0.3);
        m.translate(5.0, -7.0);

        let expected = Matrix::scaling(2.0, 3.0)
            .appended(&Matrix::rotation(0.3))
            .appended(&Matrix::translation(5.0, -7.0));

        let (x1, y1) = m.transform_point(1.5, -2.5);
        let (x2, y2) = expected.transform_point(1.5, -2.5);
        assert!(approx_eq(x1, x2));
        assert!(approx_eq(y1, y2));
    }

    #[test]
    fn test_inverse_round_trip() {
        let m = Matrix::scaling(2.0, 0.5)
            .appended(&Matrix::rotation(0.7))
            .appended(&Matrix::translation(3.0, 9.0));
        let composed = m.appended(&m.inverted());

        let (x, y) = composed.transform_point(5.0, 7.0);
        assert!(approx_eq(x, 5.0));
        assert!(approx_eq(y, 7.0));
    }

    #[test]
    fn test_degenerate_inverse_is_identity() {
        let m = Matrix::scaling(0.0, 1.0);
        assert!(m.inverted().is_identity());
    }

    #[test]
    fn test_ortho_maps_corners() {
        let m = Matrix::ortho(0.0, 0.0, 200.0, 100.0);
        let (x, y) = m.transform_point(0.0, 0.0);
        assert!(approx_eq(x, -1.0));
        assert!(approx_eq(y, 1.0));
        let (x, y) = m.transform_point(200.0, 100.0);
        assert!(approx_eq(x, 1.0));
        assert!(approx_eq(y, -1.0));
    }

    #[test]
    fn test_rect_bounds_under_rotation() {
        let m = Matrix::rotation(FRAC_PI_2);
        let bounds = m.transform_rect_bounds(&Rect::new(0.0, 0.0, 10.0, 20.0));
        assert!(approx_eq(bounds.x, -20.0));
        assert!(approx_eq(bounds.y, 0.0));
        assert!(approx_eq(bounds.width, 20.0));
        assert!(approx_eq(bounds.height, 10.0));
    }

    #[test]
    fn test_to_mat4_columns() {
        let cols = Matrix::translation(1.0, 2.0).to_mat4();
        assert_eq!(cols[0], [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(cols[1], [0.0, 1.0, 0.0, 0.0]);
        assert_eq!(cols[3], [1.0, 2.0, 0.0, 1.0]);
    }
}
