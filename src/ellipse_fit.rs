// src/ellipse_fit.rs - Direct least-squares ellipse fitting of contour points

use imageproc::point::Point;
use nalgebra::{Matrix3, Vector3};

/// Minimum number of points needed to determine a conic
pub const MIN_ELLIPSE_POINTS: usize = 5;

const EPS: f64 = 1e-12;

/// Best-fit ellipse in pixel units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EllipseFit {
    pub center: (f64, f64),
    /// Full length of the major axis
    pub major_axis: f64,
    /// Full length of the minor axis
    pub minor_axis: f64,
    /// Orientation of the major axis in image coordinates (x right, y down),
    /// in degrees within [0, 180)
    pub angle_deg: f64,
}

/// Fit an ellipse to a ring of points.
///
/// Uses the numerically stable form of the direct least-squares method
/// (Halir & Flusser) on centred and scaled coordinates. Returns `None` when
/// there are fewer than `MIN_ELLIPSE_POINTS` points or when the data admits no
/// real ellipse (e.g. collinear points).
pub fn fit_ellipse(points: &[Point<i32>]) -> Option<EllipseFit> {
    if points.len() < MIN_ELLIPSE_POINTS {
        return None;
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.x as f64).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.y as f64).sum::<f64>() / n;
    let scale = (points
        .iter()
        .map(|p| (p.x as f64 - mean_x).powi(2) + (p.y as f64 - mean_y).powi(2))
        .sum::<f64>()
        / n)
        .sqrt();

    if scale < EPS {
        return None;
    }

    // Scatter matrices split into quadratic (D1) and linear (D2) parts
    let mut s1 = Matrix3::<f64>::zeros();
    let mut s2 = Matrix3::<f64>::zeros();
    let mut s3 = Matrix3::<f64>::zeros();

    for p in points {
        let x = (p.x as f64 - mean_x) / scale;
        let y = (p.y as f64 - mean_y) / scale;
        let d1 = Vector3::new(x * x, x * y, y * y);
        let d2 = Vector3::new(x, y, 1.0);

        s1 += d1 * d1.transpose();
        s2 += d1 * d2.transpose();
        s3 += d2 * d2.transpose();
    }

    // Collinear points leave the linear scatter singular
    if s3.determinant().abs() < 1e-9 * n.powi(3) {
        return None;
    }

    let t = -(s3.try_inverse()?) * s2.transpose();
    let m = s1 + s2 * t;

    // Premultiply by the inverse of the ellipse constraint matrix
    let m = Matrix3::new(
        m[(2, 0)] / 2.0, m[(2, 1)] / 2.0, m[(2, 2)] / 2.0,
        -m[(1, 0)], -m[(1, 1)], -m[(1, 2)],
        m[(0, 0)] / 2.0, m[(0, 1)] / 2.0, m[(0, 2)] / 2.0,
    );

    let quadratic = m
        .complex_eigenvalues()
        .iter()
        .filter(|lambda| lambda.im.abs() < 1e-9 * (1.0 + lambda.re.abs()))
        .filter_map(|lambda| null_vector(&(m - Matrix3::identity() * lambda.re)))
        .find(|v| 4.0 * v[0] * v[2] - v[1] * v[1] > 0.0)?;

    let linear = t * quadratic;

    let conic = Conic {
        a: quadratic[0],
        b: quadratic[1],
        c: quadratic[2],
        d: linear[0],
        e: linear[1],
        f: linear[2],
    };

    let unit = conic.to_ellipse()?;

    Some(EllipseFit {
        center: (mean_x + unit.center.0 * scale, mean_y + unit.center.1 * scale),
        major_axis: unit.major_axis * scale,
        minor_axis: unit.minor_axis * scale,
        angle_deg: unit.angle_deg,
    })
}

/// Direction spanning the null space of a (numerically) rank-2 matrix
fn null_vector(n: &Matrix3<f64>) -> Option<Vector3<f64>> {
    let r0 = n.row(0).transpose();
    let r1 = n.row(1).transpose();
    let r2 = n.row(2).transpose();

    [r0.cross(&r1), r0.cross(&r2), r1.cross(&r2)]
        .into_iter()
        .max_by(|a, b| a.norm().total_cmp(&b.norm()))
        .filter(|v| v.norm() > EPS)
        .map(|v| v.normalize())
}

/// General conic `a x² + b xy + c y² + d x + e y + f = 0`
struct Conic {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
}

impl Conic {
    fn to_ellipse(&self) -> Option<EllipseFit> {
        // Normalise the sign so the quadratic part is positive definite
        let sign = if self.a + self.c < 0.0 { -1.0 } else { 1.0 };
        let (a, b, c) = (self.a * sign, self.b * sign, self.c * sign);
        let (d, e, f) = (self.d * sign, self.e * sign, self.f * sign);

        let den = b * b - 4.0 * a * c;
        if den >= 0.0 {
            return None;
        }

        let center_x = (2.0 * c * d - b * e) / den;
        let center_y = (2.0 * a * e - b * d) / den;

        let num = 2.0 * (a * e * e + c * d * d - b * d * e + den * f);
        if num <= 0.0 {
            return None;
        }

        let root = ((a - c).powi(2) + b * b).sqrt();
        let semi_major = -(num * (a + c + root)).sqrt() / den;
        let semi_minor = -(num * (a + c - root)).sqrt() / den;

        let angle = if b.abs() < EPS {
            if a <= c { 0.0 } else { 90.0 }
        } else {
            ((c - a - root) / b).atan().to_degrees()
        };

        Some(EllipseFit {
            center: (center_x, center_y),
            major_axis: 2.0 * semi_major,
            minor_axis: 2.0 * semi_minor,
            angle_deg: angle.rem_euclid(180.0),
        })
    }
}
