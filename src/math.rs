//! Small vector helpers shared by the resolvers and the velocity controller.

use nalgebra::{Unit, Vector2, Vector3};

use crate::constants::tolerance;

/// Approximate equality with a relative tolerance and a tiny absolute floor.
#[inline]
pub fn is_almost_equal(a: f32, b: f32) -> bool {
    (b - a).abs() < (tolerance::RELATIVE * a.abs().max(b.abs())).max(tolerance::ABSOLUTE)
}

#[inline]
pub fn is_almost_zero(value: f32) -> bool {
    is_almost_equal(value, 0.0)
}

/// Every component is almost zero.
#[inline]
pub fn is_almost_zero_vec2(v: &Vector2<f32>) -> bool {
    is_almost_zero(v.x) && is_almost_zero(v.y)
}

/// Scales `v` down so its length does not exceed `max`.
pub fn clamp_magnitude(v: Vector3<f32>, max: f32) -> Vector3<f32> {
    let len = v.norm();
    if len == 0.0 || len <= max {
        v
    } else {
        v * (max / len)
    }
}

pub fn clamp_magnitude_vec2(v: Vector2<f32>, max: f32) -> Vector2<f32> {
    let len = v.norm();
    if len == 0.0 || len <= max {
        v
    } else {
        v * (max / len)
    }
}

/// Removes the component of `v` along `normal`.
#[inline]
pub fn project_on_plane(v: &Vector3<f32>, normal: &Unit<Vector3<f32>>) -> Vector3<f32> {
    let n = normal.into_inner();
    v - n * v.dot(&n)
}

/// Angle in radians between two unit vectors.
#[inline]
pub fn angle_between(a: &Unit<Vector3<f32>>, b: &Unit<Vector3<f32>>) -> f32 {
    a.into_inner().dot(&b.into_inner()).clamp(-1.0, 1.0).acos()
}

/// Linear interpolation with `t` clamped to [0, 1].
#[inline]
pub fn lerp(from: Vector3<f32>, to: Vector3<f32>, t: f32) -> Vector3<f32> {
    from + (to - from) * t.clamp(0.0, 1.0)
}

/// (x, y) to (x, 0, y): planar input onto the horizontal XZ plane.
#[inline]
pub fn xz_to_xyz(v: &Vector2<f32>) -> Vector3<f32> {
    Vector3::new(v.x, 0.0, v.y)
}

/// (x, y) to (x, y, 0): planar positions into the XY plane.
#[inline]
pub fn xy_to_xyz(v: &Vector2<f32>) -> Vector3<f32> {
    Vector3::new(v.x, v.y, 0.0)
}

#[inline]
pub fn xyz_to_xy(v: &Vector3<f32>) -> Vector2<f32> {
    Vector2::new(v.x, v.y)
}

#[inline]
pub fn to_array(v: &Vector3<f32>) -> [f32; 3] {
    [v.x, v.y, v.z]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_almost_zero() {
        assert!(is_almost_zero(0.0));
        assert!(is_almost_zero(-0.0));
        assert!(!is_almost_zero(1.0e-6));
        assert!(is_almost_zero_vec2(&Vector2::zeros()));
        assert!(!is_almost_zero_vec2(&Vector2::new(0.0, 0.5)));
    }

    #[test]
    fn test_clamp_magnitude() {
        let v = clamp_magnitude(Vector3::new(30.0, 0.0, 40.0), 10.0);
        assert!((v.norm() - 10.0).abs() < 1e-5);
        assert!((v.x - 6.0).abs() < 1e-5);

        let short = Vector3::new(1.0, 2.0, 0.0);
        assert_eq!(clamp_magnitude(short, 10.0), short);
        assert_eq!(clamp_magnitude(Vector3::zeros(), 1.0), Vector3::zeros());
    }

    #[test]
    fn test_project_on_plane() {
        let up = Vector3::y_axis();
        let v = project_on_plane(&Vector3::new(3.0, -2.0, 1.0), &up);
        assert_eq!(v, Vector3::new(3.0, 0.0, 1.0));
    }

    #[test]
    fn test_angle_between() {
        let up = Vector3::y_axis();
        let tilted = Unit::new_normalize(Vector3::new(1.0, 1.0, 0.0));
        assert!((angle_between(&up, &tilted).to_degrees() - 45.0).abs() < 1e-4);
        assert_eq!(angle_between(&up, &up), 0.0);
    }

    #[test]
    fn test_lerp_clamps_t() {
        let a = Vector3::zeros();
        let b = Vector3::new(2.0, 0.0, 0.0);
        assert_eq!(lerp(a, b, 0.5), Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(lerp(a, b, 3.0), b);
    }
}
