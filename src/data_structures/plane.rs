//! Infinite mathematical planes.
//!
//! A [`Plane`] is stored in the form `ax + by + cz + d = 0` where `(a, b, c)` is
//! the plane normal. Mesh builders use a normalized plane to position a finite
//! rectangle inside it.

use cgmath::{InnerSpace, Vector3, Zero};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vector3<f32>,
    pub d: f32,
}

impl Plane {
    pub fn new(a: f32, b: f32, c: f32, d: f32) -> Self {
        Self {
            normal: Vector3::new(a, b, c),
            d,
        }
    }

    /// Divide all four coefficients by the length of the normal.
    ///
    /// A plane with a zero normal describes no plane at all and is left untouched.
    pub fn normalize(&mut self) -> &mut Self {
        let magnitude = self.normal.magnitude();
        if magnitude != 0.0 {
            self.normal /= magnitude;
            self.d /= magnitude;
        }
        self
    }

    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    pub fn as_array(&self) -> [f32; 4] {
        [self.normal.x, self.normal.y, self.normal.z, self.d]
    }

    /// Signed distance of `point` to the plane. Only a true distance for normalized planes.
    pub fn signed_distance_to(&self, point: Vector3<f32>) -> f32 {
        self.normal.dot(point) + self.d
    }

    /// The point of the plane that lies closest to the origin.
    pub fn origin_point(&self) -> Vector3<f32> {
        let len2 = self.normal.magnitude2();
        if len2 == 0.0 {
            return Vector3::zero();
        }
        self.normal * (-self.d / len2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_yields_unit_normal_and_keeps_ratio() {
        let plane = Plane::new(0.0, -1.0, 1.0, 0.0).normalized();
        let [a, b, c, d] = plane.as_array();

        assert!((plane.normal.magnitude() - 1.0).abs() < 1e-6);
        assert_eq!(a, 0.0);
        assert!((b + std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
        assert!((c - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
        assert!((b / c + 1.0).abs() < 1e-6);
        assert_eq!(d, 0.0);
    }

    #[test]
    fn normalize_scales_d_too() {
        let plane = Plane::new(0.0, 3.0, 4.0, 10.0).normalized();
        assert!((plane.d - 2.0).abs() < 1e-6);
        assert!(plane.signed_distance_to(plane.origin_point()).abs() < 1e-6);
    }

    #[test]
    fn zero_normal_is_left_alone() {
        let plane = Plane::new(0.0, 0.0, 0.0, 5.0).normalized();
        assert_eq!(plane.as_array(), [0.0, 0.0, 0.0, 5.0]);
        assert_eq!(plane.origin_point(), Vector3::zero());
    }
}
