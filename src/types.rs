use nalgebra as na;
use std::fmt;

/// Affine map on homogeneous 2-D points. The last row is always `0 0 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    matrix: na::Matrix3<f64>,
}

impl AffineTransform {
    /// Linear part `m` followed by translation `t`.
    pub fn from_parts(m: &na::Matrix2<f64>, t: &na::Vector2<f64>) -> AffineTransform {
        AffineTransform {
            matrix: na::Matrix3::new(
                m[(0, 0)],
                m[(0, 1)],
                t.x,
                m[(1, 0)],
                m[(1, 1)],
                t.y,
                0.0,
                0.0,
                1.0,
            ),
        }
    }

    pub fn matrix(&self) -> &na::Matrix3<f64> {
        &self.matrix
    }

    pub fn linear(&self) -> na::Matrix2<f64> {
        self.matrix.fixed_view::<2, 2>(0, 0).into_owned()
    }

    pub fn translation(&self) -> na::Vector2<f64> {
        na::Vector2::new(self.matrix[(0, 2)], self.matrix[(1, 2)])
    }

    /// Maps a homogeneous point and dehomogenizes the result.
    pub fn apply(&self, p: &na::Vector3<f64>) -> na::Vector2<f64> {
        let q = self.matrix * p;
        na::Vector2::new(q.x / q.z, q.y / q.z)
    }

    pub fn rows(&self) -> [[f64; 3]; 3] {
        let m = &self.matrix;
        [
            [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
            [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
            [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
        ]
    }
}

impl fmt::Display for AffineTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.rows();
        write!(
            f,
            "[3,3](({:.9},{:.9},{:.9}),({:.9},{:.9},{:.9}),({},{},{}))",
            r[0][0], r[0][1], r[0][2], r[1][0], r[1][1], r[1][2], r[2][0], r[2][1], r[2][2]
        )
    }
}

/// Dehomogenized point, `(x/z, y/z)`.
pub fn dehomogenize(p: &na::Vector3<f64>) -> na::Vector2<f64> {
    na::Vector2::new(p.x / p.z, p.y / p.z)
}
