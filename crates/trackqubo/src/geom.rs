//! Transverse-plane geometry for triplets: signed curvature and circle fits.
//!
//! - `signed_curvature`: Menger curvature of three points, signed by turning
//!   direction (positive = counterclockwise). Zero for collinear points.
//! - `circle_through`: center/radius of the circle through three points; `None`
//!   for (near-)collinear input.

use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};

/// Relative tolerance for collinearity: `|cross| <= COLLINEAR_EPS * |ab| * |ac|`.
pub(crate) const COLLINEAR_EPS: f64 = 1e-12;

/// Circle in the transverse (x, y) plane.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: [f64; 2],
    pub radius: f64,
}

#[inline]
fn cross2(a: Vector2<f64>, b: Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Signed Menger curvature `2·cross(b−a, c−b) / (|ab|·|bc|·|ca|)`.
///
/// Returns `None` when two of the points coincide.
pub fn signed_curvature(a: Vector2<f64>, b: Vector2<f64>, c: Vector2<f64>) -> Option<f64> {
    let ab = b - a;
    let bc = c - b;
    let ca = a - c;
    let denom = ab.norm() * bc.norm() * ca.norm();
    if !(denom.is_finite() && denom > 0.0) {
        return None;
    }
    Some(2.0 * cross2(ab, bc) / denom)
}

/// Circle through three transverse points.
pub fn circle_through(a: Vector2<f64>, b: Vector2<f64>, c: Vector2<f64>) -> Option<Circle> {
    let ab = b - a;
    let ac = c - a;
    let cross = cross2(ab, ac);
    if cross.abs() <= COLLINEAR_EPS * ab.norm() * ac.norm() {
        return None;
    }
    // Perpendicular bisectors: 2(b−a)·p = |b|²−|a|², 2(c−a)·p = |c|²−|a|².
    let m = Matrix2::new(2.0 * ab.x, 2.0 * ab.y, 2.0 * ac.x, 2.0 * ac.y);
    let rhs = Vector2::new(
        b.norm_squared() - a.norm_squared(),
        c.norm_squared() - a.norm_squared(),
    );
    let center = m.try_inverse()? * rhs;
    let radius = (a - center).norm();
    if !(center.x.is_finite() && center.y.is_finite() && radius.is_finite()) {
        return None;
    }
    Some(Circle {
        center: [center.x, center.y],
        radius,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::vector;

    #[test]
    fn curvature_of_points_on_circle_matches_inverse_radius() {
        let r = 250.0;
        let p = |th: f64| vector![r * th.cos(), r * th.sin()];
        let k = signed_curvature(p(0.1), p(0.4), p(0.9)).unwrap();
        assert!((k - 1.0 / r).abs() < 1e-12);
        // Reversed traversal flips the sign.
        let k_rev = signed_curvature(p(0.9), p(0.4), p(0.1)).unwrap();
        assert!((k_rev + 1.0 / r).abs() < 1e-12);
    }

    #[test]
    fn collinear_points_have_zero_curvature_and_no_circle() {
        let a = vector![10.0, 0.0];
        let b = vector![20.0, 0.0];
        let c = vector![30.0, 0.0];
        assert_eq!(signed_curvature(a, b, c), Some(0.0));
        assert!(circle_through(a, b, c).is_none());
        assert!(signed_curvature(a, a, c).is_none());
    }

    #[test]
    fn circle_fit_recovers_center_and_radius() {
        let center = vector![3.0, -4.0];
        let r = 7.5;
        let p = |th: f64| center + vector![r * th.cos(), r * th.sin()];
        let c = circle_through(p(0.0), p(1.0), p(2.5)).unwrap();
        assert!((c.center[0] - 3.0).abs() < 1e-9);
        assert!((c.center[1] + 4.0).abs() < 1e-9);
        assert!((c.radius - r).abs() < 1e-9);
    }
}
