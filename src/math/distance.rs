//! Hansen distance.
//!
//! Hansen's rule doubles the dispersion axis before taking a Euclidean distance:
//!
//! ```text
//! Ra = sqrt( 4 (δd1 - δd2)^2 + (δp1 - δp2)^2 + (δh1 - δh2)^2 )
//! ```
//!
//! In the scaled space `(2 δd, δp, δh)` solubility regions are spheres, so every
//! distance in this crate goes through `to_hansen_space` and nothing else.

use nalgebra::Vector3;

use crate::domain::HspPoint;

/// Map a point into the scaled space where Hansen distance is Euclidean.
pub fn to_hansen_space(p: HspPoint) -> Vector3<f64> {
    Vector3::new(2.0 * p.delta_d, p.delta_p, p.delta_h)
}

/// Inverse of `to_hansen_space`.
pub fn from_hansen_space(v: &Vector3<f64>) -> HspPoint {
    HspPoint::new(0.5 * v.x, v.y, v.z)
}

/// Hansen distance `Ra` between two points.
pub fn hansen_distance(a: HspPoint, b: HspPoint) -> f64 {
    (to_hansen_space(a) - to_hansen_space(b)).norm()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispersion_offset_counts_double() {
        let center = HspPoint::new(18.0, 6.0, 6.0);
        let d_off = hansen_distance(HspPoint::new(19.0, 6.0, 6.0), center);
        let p_off = hansen_distance(HspPoint::new(18.0, 8.0, 6.0), center);
        let h_off = hansen_distance(HspPoint::new(18.0, 6.0, 8.0), center);
        assert!((d_off - 2.0).abs() < 1e-12);
        assert!((d_off - p_off).abs() < 1e-12);
        assert!((d_off - h_off).abs() < 1e-12);
    }

    #[test]
    fn matches_closed_form() {
        let a = HspPoint::new(18.0, 6.0, 6.0);
        let b = HspPoint::new(22.0, 16.0, 18.0);
        let expected = (4.0 * 16.0 + 100.0 + 144.0_f64).sqrt();
        assert!((hansen_distance(a, b) - expected).abs() < 1e-12);
        assert!((hansen_distance(b, a) - expected).abs() < 1e-12);
    }

    #[test]
    fn hansen_space_round_trip() {
        let p = HspPoint::new(17.3, 4.1, 9.9);
        let back = from_hansen_space(&to_hansen_space(p));
        assert!((back.delta_d - p.delta_d).abs() < 1e-12);
        assert_eq!(back.delta_p, p.delta_p);
        assert_eq!(back.delta_h, p.delta_h);
    }
}
