//! Shape queries consumed by the mover.
//!
//! A [`ShapeQuery`] provider answers raw sweep and overlap requests against the
//! world it owns. [`ShapeSweepQuery`] binds a provider to one character's layer
//! filter and its own collider, which is always filtered out.

use nalgebra::{Isometry3, Point3, Unit, Vector3};
use rapier3d::prelude::ColliderHandle;

use crate::shape::{LayerMask, ShapeDescriptor};

/// Nearest obstruction reported by a sweep. Never retained past the tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepHit {
    /// Travel along the sweep direction before contact.
    pub distance: f32,
    /// Contact point on the obstacle, world space.
    pub point: Point3<f32>,
    /// Obstacle surface normal at the contact, pointing toward the swept shape.
    pub normal: Unit<Vector3<f32>>,
    pub collider: Option<ColliderHandle>,
}

/// Collision capability a host provides to the mover.
///
/// Results are nearest-first and each hit carries its collider, so the caller
/// can filter itself out.
pub trait ShapeQuery {
    /// Casts `shape` placed at `pose` along `direction` up to `max_distance`.
    fn sweep(
        &self,
        pose: &Isometry3<f32>,
        shape: &ShapeDescriptor,
        direction: &Unit<Vector3<f32>>,
        max_distance: f32,
        layers: LayerMask,
    ) -> Vec<SweepHit>;

    /// Colliders overlapping `shape` placed at `pose`.
    fn overlap(
        &self,
        pose: &Isometry3<f32>,
        shape: &ShapeDescriptor,
        layers: LayerMask,
    ) -> Vec<ColliderHandle>;
}

/// A provider bound to one character's filter and self identity.
pub struct ShapeSweepQuery<'a> {
    provider: &'a dyn ShapeQuery,
    layers: LayerMask,
    self_collider: Option<ColliderHandle>,
}

impl<'a> ShapeSweepQuery<'a> {
    pub fn new(
        provider: &'a dyn ShapeQuery,
        layers: LayerMask,
        self_collider: Option<ColliderHandle>,
    ) -> Self {
        Self {
            provider,
            layers,
            self_collider,
        }
    }

    fn is_self(&self, collider: Option<ColliderHandle>) -> bool {
        self.self_collider.is_some() && collider == self.self_collider
    }

    /// Nearest hit that is not the character itself.
    pub fn sweep(
        &self,
        pose: &Isometry3<f32>,
        shape: &ShapeDescriptor,
        direction: &Unit<Vector3<f32>>,
        max_distance: f32,
    ) -> Option<SweepHit> {
        if max_distance <= 0.0 {
            return None;
        }
        self.provider
            .sweep(pose, shape, direction, max_distance, self.layers)
            .into_iter()
            .filter(|hit| !self.is_self(hit.collider))
            .filter(|hit| hit.distance <= max_distance)
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    /// Sweeps a shape centered at `origin` with no rotation.
    pub fn sweep_from(
        &self,
        origin: &Point3<f32>,
        shape: &ShapeDescriptor,
        direction: &Unit<Vector3<f32>>,
        max_distance: f32,
    ) -> Option<SweepHit> {
        self.sweep(
            &Isometry3::translation(origin.x, origin.y, origin.z),
            shape,
            direction,
            max_distance,
        )
    }

    /// Overlapping colliders minus the character itself, restricted to `layers`.
    pub fn overlaps(
        &self,
        pose: &Isometry3<f32>,
        shape: &ShapeDescriptor,
        layers: LayerMask,
    ) -> Vec<ColliderHandle> {
        self.provider
            .overlap(pose, shape, layers)
            .into_iter()
            .filter(|handle| !self.is_self(Some(*handle)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replays canned hits regardless of the query.
    struct Canned(Vec<SweepHit>);

    impl ShapeQuery for Canned {
        fn sweep(
            &self,
            _pose: &Isometry3<f32>,
            _shape: &ShapeDescriptor,
            _direction: &Unit<Vector3<f32>>,
            _max_distance: f32,
            _layers: LayerMask,
        ) -> Vec<SweepHit> {
            self.0.clone()
        }

        fn overlap(
            &self,
            _pose: &Isometry3<f32>,
            _shape: &ShapeDescriptor,
            _layers: LayerMask,
        ) -> Vec<ColliderHandle> {
            self.0.iter().filter_map(|h| h.collider).collect()
        }
    }

    fn hit(distance: f32, index: u32) -> SweepHit {
        SweepHit {
            distance,
            point: Point3::origin(),
            normal: Vector3::y_axis(),
            collider: Some(ColliderHandle::from_raw_parts(index, 0)),
        }
    }

    #[test]
    fn test_nearest_non_self_hit_wins() {
        let me = ColliderHandle::from_raw_parts(0, 0);
        let provider = Canned(vec![hit(0.0, 0), hit(2.0, 2), hit(1.0, 1)]);
        let query = ShapeSweepQuery::new(&provider, LayerMask::ALL, Some(me));

        let found = query
            .sweep_from(&Point3::origin(), &ShapeDescriptor::sphere(0.5), &Vector3::x_axis(), 5.0)
            .unwrap();
        assert_eq!(found.distance, 1.0);
        assert_eq!(found.collider, Some(ColliderHandle::from_raw_parts(1, 0)));
    }

    #[test]
    fn test_only_self_hits_is_no_obstacle() {
        let me = ColliderHandle::from_raw_parts(7, 0);
        let provider = Canned(vec![hit(0.5, 7)]);
        let query = ShapeSweepQuery::new(&provider, LayerMask::ALL, Some(me));
        let found = query.sweep_from(
            &Point3::origin(),
            &ShapeDescriptor::sphere(0.5),
            &Vector3::x_axis(),
            5.0,
        );
        assert!(found.is_none());
    }

    #[test]
    fn test_zero_distance_sweep_is_empty() {
        let provider = Canned(vec![hit(0.0, 1)]);
        let query = ShapeSweepQuery::new(&provider, LayerMask::ALL, None);
        let found = query.sweep_from(
            &Point3::origin(),
            &ShapeDescriptor::sphere(0.5),
            &Vector3::x_axis(),
            0.0,
        );
        assert!(found.is_none());
    }

    #[test]
    fn test_overlaps_exclude_self() {
        let me = ColliderHandle::from_raw_parts(0, 0);
        let provider = Canned(vec![hit(0.0, 0), hit(0.0, 3)]);
        let query = ShapeSweepQuery::new(&provider, LayerMask::ALL, Some(me));
        let overlaps = query.overlaps(
            &Isometry3::identity(),
            &ShapeDescriptor::sphere(0.5),
            LayerMask::CHARACTER,
        );
        assert_eq!(overlaps, vec![ColliderHandle::from_raw_parts(3, 0)]);
    }
}
