//! Iterative collide-and-slide.
//!
//! The desired displacement is swept through the world; on each hit the shape
//! advances to the contact, backs off the surface by the skin epsilon and the
//! rest of the motion is projected onto the obstacle's tangent plane. The loop
//! ends when the motion is used up, when projection leaves nothing pointing
//! along the original velocity (a corner or dead end), or when the iteration
//! budget runs out. Distance left over in the last two cases is dropped.

use nalgebra::{Isometry3, Translation3, Unit, Vector3};
use serde::Serialize;

use crate::constants::{slide as slide_consts, tolerance};
use crate::math;
use crate::query::ShapeSweepQuery;
use crate::shape::ShapeDescriptor;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlideSettings {
    pub skin_epsilon: f32,
    pub max_iterations: u32,
    pub dead_end_threshold: f32,
    /// Normal of the plane motion is confined to (planar movers).
    pub plane: Option<Unit<Vector3<f32>>>,
}

impl Default for SlideSettings {
    fn default() -> Self {
        Self {
            skin_epsilon: slide_consts::SKIN_EPSILON,
            max_iterations: slide_consts::MAX_ITERATIONS,
            dead_end_threshold: slide_consts::DEAD_END_THRESHOLD,
            plane: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlideStatus {
    /// Velocity was zero; nothing was swept.
    Idle,
    /// The whole displacement was applied.
    Completed,
    /// Projection removed all forward motion; the rest was dropped.
    Blocked,
    /// Iterations ran out with distance left; the rest was dropped.
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlideOutcome {
    pub displacement: Vector3<f32>,
    pub status: SlideStatus,
    /// Sweeps performed.
    pub iterations: u32,
    /// Intended travel that was not applied this tick.
    pub dropped_distance: f32,
    /// Motion direction after the last projection (not normalized).
    pub direction: Vector3<f32>,
    /// Normal of the last surface hit.
    pub last_normal: Option<Unit<Vector3<f32>>>,
}

impl SlideOutcome {
    fn idle() -> Self {
        Self {
            displacement: Vector3::zeros(),
            status: SlideStatus::Idle,
            iterations: 0,
            dropped_distance: 0.0,
            direction: Vector3::zeros(),
            last_normal: None,
        }
    }

    pub fn hit_anything(&self) -> bool {
        self.last_normal.is_some()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IterativeSlideResolver {
    pub settings: SlideSettings,
}

impl IterativeSlideResolver {
    pub fn new(settings: SlideSettings) -> Self {
        Self { settings }
    }

    /// Confines a contact normal to the motion plane, if there is one.
    fn constrain(&self, normal: Unit<Vector3<f32>>) -> Unit<Vector3<f32>> {
        match self.settings.plane {
            Some(plane) => {
                Unit::try_new(math::project_on_plane(&normal, &plane), tolerance::SPEED)
                    .unwrap_or(normal)
            }
            None => normal,
        }
    }

    /// Resolves `velocity * delta_time` for `shape` placed at `pose`.
    /// Returns the obstacle-respecting displacement; `pose` is not modified.
    pub fn resolve(
        &self,
        query: &ShapeSweepQuery<'_>,
        pose: &Isometry3<f32>,
        shape: &ShapeDescriptor,
        velocity: &Vector3<f32>,
        delta_time: f32,
    ) -> SlideOutcome {
        let speed = velocity.norm();
        if speed <= tolerance::SPEED || delta_time <= 0.0 {
            return SlideOutcome::idle();
        }

        let mut direction = velocity / speed;
        let mut distance = speed * delta_time;
        let mut outcome = SlideOutcome {
            status: SlideStatus::Exhausted,
            direction,
            ..SlideOutcome::idle()
        };

        for _ in 0..self.settings.max_iterations {
            // Projection shrinks the direction; sweep along its unit form and
            // scale the distance so the travelled vector stays direction*distance.
            let Some((unit, scale)) = Unit::try_new_and_get(direction, tolerance::SPEED) else {
                outcome.status = SlideStatus::Blocked;
                break;
            };
            let length = distance * scale;
            if length <= tolerance::SPEED {
                distance = 0.0;
                outcome.status = SlideStatus::Completed;
                break;
            }

            outcome.iterations += 1;
            let origin = Translation3::from(outcome.displacement) * *pose;
            let Some(hit) = query.sweep(&origin, shape, &unit, length) else {
                outcome.displacement += direction * distance;
                distance = 0.0;
                outcome.status = SlideStatus::Completed;
                break;
            };

            let normal = self.constrain(hit.normal);
            let n = normal.into_inner();
            let travel = hit.distance.clamp(0.0, length);
            outcome.displacement += unit.into_inner() * travel + n * self.settings.skin_epsilon;
            distance -= travel / scale;
            direction -= n * direction.dot(&n);
            outcome.direction = direction;
            outcome.last_normal = Some(normal);

            if direction.dot(velocity) < self.settings.dead_end_threshold {
                outcome.status = SlideStatus::Blocked;
                break;
            }
        }

        if outcome.status == SlideStatus::Exhausted && distance <= tolerance::SPEED {
            outcome.status = SlideStatus::Completed;
        }
        if outcome.status != SlideStatus::Completed {
            outcome.dropped_distance = distance.max(0.0);
            tracing::debug!(
                status = ?outcome.status,
                iterations = outcome.iterations,
                dropped = outcome.dropped_distance,
                "slide stopped short"
            );
        }
        outcome
    }
}

/// Advances a rendered position toward the authoritative one.
pub fn smooth_toward(
    rendered: Vector3<f32>,
    resolved: Vector3<f32>,
    smoothing: f32,
    delta_time: f32,
) -> Vector3<f32> {
    math::lerp(rendered, resolved, smoothing * delta_time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{ShapeQuery, SweepHit};
    use crate::shape::LayerMask;
    use nalgebra::Point3;
    use rapier3d::prelude::ColliderHandle;

    /// Infinite planes `dot(p, normal) = offset`, swept analytically for a sphere.
    struct Planes(Vec<(Unit<Vector3<f32>>, f32)>);

    impl ShapeQuery for Planes {
        fn sweep(
            &self,
            pose: &Isometry3<f32>,
            shape: &ShapeDescriptor,
            direction: &Unit<Vector3<f32>>,
            max_distance: f32,
            _layers: LayerMask,
        ) -> Vec<SweepHit> {
            let center = pose.translation.vector;
            let mut hits: Vec<SweepHit> = self
                .0
                .iter()
                .enumerate()
                .filter_map(|(i, (normal, offset))| {
                    let n = normal.into_inner();
                    let dir = direction.into_inner();
                    let approach = -dir.dot(&n);
                    if approach <= 0.0 {
                        return None;
                    }
                    let gap = center.dot(&n) - offset - shape.radius();
                    let distance = (gap / approach).max(0.0);
                    (distance <= max_distance).then(|| SweepHit {
                        distance,
                        point: Point3::from(center + dir * distance - n * shape.radius()),
                        normal: *normal,
                        collider: Some(ColliderHandle::from_raw_parts(i as u32, 0)),
                    })
                })
                .collect();
            hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
            hits
        }

        fn overlap(
            &self,
            _pose: &Isometry3<f32>,
            _shape: &ShapeDescriptor,
            _layers: LayerMask,
        ) -> Vec<ColliderHandle> {
            Vec::new()
        }
    }

    fn resolve(planes: &Planes, velocity: Vector3<f32>, dt: f32) -> SlideOutcome {
        let query = ShapeSweepQuery::new(planes, LayerMask::ALL, None);
        IterativeSlideResolver::default().resolve(
            &query,
            &Isometry3::identity(),
            &ShapeDescriptor::sphere(0.5),
            &velocity,
            dt,
        )
    }

    #[test]
    fn test_zero_velocity_is_idle() {
        let outcome = resolve(&Planes(vec![]), Vector3::zeros(), 0.1);
        assert_eq!(outcome.status, SlideStatus::Idle);
        assert_eq!(outcome.iterations, 0);
        assert_eq!(outcome.displacement, Vector3::zeros());
    }

    #[test]
    fn test_free_motion_uses_full_distance() {
        let velocity = Vector3::new(3.0, 0.0, 4.0);
        let outcome = resolve(&Planes(vec![]), velocity, 0.5);
        assert_eq!(outcome.status, SlideStatus::Completed);
        assert_eq!(outcome.iterations, 1);
        assert!((outcome.displacement - velocity * 0.5).norm() < 1e-5);
    }

    #[test]
    fn test_oblique_wall_slides_along_tangent() {
        // Wall at z = 1 facing -Z; sphere of radius 0.5 touches after 0.5 in z.
        let wall = Planes(vec![(-Vector3::z_axis(), -1.0)]);
        let outcome = resolve(&wall, Vector3::new(1.0, 0.0, 1.0), 2.0);

        assert!(outcome.hit_anything());
        assert!(outcome.direction.dot(&-Vector3::z()).abs() < 1e-6);
        // Never past the wall (center z <= 1 - radius).
        assert!(outcome.displacement.z <= 0.5 + 1e-6);
        // The tangential part keeps going.
        assert!(outcome.displacement.x > 1.0);
    }

    #[test]
    fn test_head_on_wall_is_blocked_and_drops_remainder() {
        let wall = Planes(vec![(-Vector3::x_axis(), -1.0)]);
        let outcome = resolve(&wall, Vector3::new(5.0, 0.0, 0.0), 1.0);

        assert_eq!(outcome.status, SlideStatus::Blocked);
        assert_eq!(outcome.iterations, 1);
        let skin = slide_consts::SKIN_EPSILON;
        assert!((outcome.displacement.x - (0.5 - skin)).abs() < 1e-5);
    }

    #[test]
    fn test_opposing_corner_converges() {
        // A 90 degree pocket opening toward -X, apex on the +X side.
        let a = Unit::new_normalize(Vector3::new(-1.0, 0.0, 1.0));
        let b = Unit::new_normalize(Vector3::new(-1.0, 0.0, -1.0));
        let pocket = Planes(vec![(a, -2.0), (b, -2.0)]);
        let outcome = resolve(&pocket, Vector3::new(4.0, 0.0, 0.5), 1.0);

        assert_eq!(outcome.status, SlideStatus::Blocked);
        assert!(outcome.iterations <= IterativeSlideResolver::default().settings.max_iterations);
        let end = outcome.displacement;
        // Inside both half-spaces by at least the radius (no tunnelling).
        assert!(end.dot(&a) - (-2.0) >= 0.5 - 1e-4);
        assert!(end.dot(&b) - (-2.0) >= 0.5 - 1e-4);

        // Pressing again from the resting spot barely moves.
        let query = ShapeSweepQuery::new(&pocket, LayerMask::ALL, None);
        let again = IterativeSlideResolver::default().resolve(
            &query,
            &Isometry3::translation(end.x, end.y, end.z),
            &ShapeDescriptor::sphere(0.5),
            &Vector3::new(4.0, 0.0, 0.5),
            1.0,
        );
        assert!(again.displacement.norm() < 0.01, "moved {:?}", again.displacement);
    }

    #[test]
    fn test_iteration_budget_is_respected() {
        let wall = Planes(vec![(-Vector3::z_axis(), -1.0)]);
        let query = ShapeSweepQuery::new(&wall, LayerMask::ALL, None);
        let resolver = IterativeSlideResolver::new(SlideSettings {
            max_iterations: 1,
            ..SlideSettings::default()
        });
        let outcome = resolver.resolve(
            &query,
            &Isometry3::identity(),
            &ShapeDescriptor::sphere(0.5),
            &Vector3::new(1.0, 0.0, 1.0),
            2.0,
        );
        assert_eq!(outcome.status, SlideStatus::Exhausted);
        assert_eq!(outcome.iterations, 1);
        assert!(outcome.dropped_distance > 0.0);
    }

    #[test]
    fn test_planar_constraint_flattens_normals() {
        // Tilted wall normal has a Z component; planar motion must stay in XY.
        let n = Unit::new_normalize(Vector3::new(-1.0, 0.0, 0.3));
        let wall = Planes(vec![(n, -1.0)]);
        let query = ShapeSweepQuery::new(&wall, LayerMask::ALL, None);
        let resolver = IterativeSlideResolver::new(SlideSettings {
            plane: Some(Vector3::z_axis()),
            ..SlideSettings::default()
        });
        let outcome = resolver.resolve(
            &query,
            &Isometry3::identity(),
            &ShapeDescriptor::sphere(0.5),
            &Vector3::new(2.0, 1.0, 0.0),
            1.0,
        );
        assert!(outcome.displacement.z.abs() < 1e-6);
    }

    #[test]
    fn test_smooth_toward() {
        let rendered = Vector3::zeros();
        let resolved = Vector3::new(1.0, 0.0, 0.0);
        let half = smooth_toward(rendered, resolved, 5.0, 0.1);
        assert!((half.x - 0.5).abs() < 1e-6);
        assert_eq!(smooth_toward(rendered, resolved, 30.0, 1.0), resolved);
    }
}
