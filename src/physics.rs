use nalgebra::{Isometry3, Translation3, Unit, UnitQuaternion, Vector3};
use rapier3d::parry::query::{self, ShapeCastHit, ShapeCastOptions};
use rapier3d::prelude::*;
use std::collections::HashMap;

use crate::constants::slide as slide_consts;
use crate::query::{ShapeQuery, SweepHit};
use crate::shape::{LayerMask, ShapeDescriptor};

/// Wrapper around the Rapier3D collider set and query pipeline.
/// Owns the static level geometry and the character colliders the movers sweep against.
pub struct CollisionWorld {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub island_manager: IslandManager,
    pub query_pipeline: QueryPipeline,

    /// Upper bound on hits reported per sweep (nearest-first)
    pub max_sweep_hits: usize,
    /// Human-readable names for colliders (for CLI output and test messages)
    pub labels: HashMap<ColliderHandle, String>,
    /// Set when colliders changed since the last `refresh`
    dirty: bool,
}

fn pose_of(position: [f32; 3], rotation: UnitQuaternion<f32>) -> Isometry3<f32> {
    Isometry3::from_parts(
        Translation3::new(position[0], position[1], position[2]),
        rotation,
    )
}

fn groups_for(layers: LayerMask) -> InteractionGroups {
    InteractionGroups::new(layers.to_group(), Group::ALL)
}

impl CollisionWorld {
    /// Creates an empty world
    pub fn new() -> Self {
        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            island_manager: IslandManager::new(),
            query_pipeline: QueryPipeline::new(),
            max_sweep_hits: slide_consts::MAX_SWEEP_HITS,
            labels: HashMap::new(),
            dirty: false,
        }
    }

    fn insert(&mut self, collider: Collider, label: &str) -> ColliderHandle {
        let handle = self.collider_set.insert(collider);
        self.labels.insert(handle, label.to_string());
        self.dirty = true;
        handle
    }

    /// Adds a fixed box (walls, floors, steps, ramps).
    pub fn add_static_box(
        &mut self,
        label: &str,
        position: [f32; 3],
        rotation: UnitQuaternion<f32>,
        half_extents: [f32; 3],
        layers: LayerMask,
    ) -> ColliderHandle {
        let [hx, hy, hz] = half_extents;
        let collider = ColliderBuilder::cuboid(hx, hy, hz)
            .position(pose_of(position, rotation))
            .collision_groups(groups_for(layers))
            .build();
        self.insert(collider, label)
    }

    /// Adds a fixed ball.
    pub fn add_static_ball(
        &mut self,
        label: &str,
        position: [f32; 3],
        radius: f32,
        layers: LayerMask,
    ) -> ColliderHandle {
        let collider = ColliderBuilder::ball(radius)
            .translation(vector![position[0], position[1], position[2]])
            .collision_groups(groups_for(layers))
            .build();
        self.insert(collider, label)
    }

    /// Adds a non-colliding trigger volume. Sweeps and overlaps skip it.
    pub fn add_sensor_box(
        &mut self,
        label: &str,
        position: [f32; 3],
        half_extents: [f32; 3],
    ) -> ColliderHandle {
        let [hx, hy, hz] = half_extents;
        let collider = ColliderBuilder::cuboid(hx, hy, hz)
            .translation(vector![position[0], position[1], position[2]])
            .sensor(true)
            .build();
        self.insert(collider, label)
    }

    /// Adds a character collider centered at `center`.
    /// Other characters' queries can hit it; its owner filters it out by handle.
    pub fn add_character_collider(
        &mut self,
        label: &str,
        shape: &ShapeDescriptor,
        center: [f32; 3],
        layers: LayerMask,
    ) -> ColliderHandle {
        let collider = ColliderBuilder::new(shape.to_shared_shape())
            .translation(vector![center[0], center[1], center[2]])
            .collision_groups(groups_for(layers))
            .build();
        self.insert(collider, label)
    }

    /// Moves a collider without a parent body (character colliders).
    pub fn set_collider_pose(&mut self, handle: ColliderHandle, pose: Isometry3<f32>) -> bool {
        let Some(collider) = self.collider_set.get_mut(handle) else {
            return false;
        };
        collider.set_position(pose);
        self.dirty = true;
        true
    }

    /// Removes a collider
    pub fn remove_collider(&mut self, handle: ColliderHandle) -> bool {
        self.labels.remove(&handle);
        let removed = self
            .collider_set
            .remove(handle, &mut self.island_manager, &mut self.rigid_body_set, true)
            .is_some();
        self.dirty |= removed;
        removed
    }

    pub fn label(&self, handle: ColliderHandle) -> Option<&str> {
        self.labels.get(&handle).map(String::as_str)
    }

    pub fn collider_count(&self) -> usize {
        self.collider_set.len()
    }

    /// Rebuilds the query acceleration structure after colliders changed.
    /// Must be called before ticking movers against modified geometry.
    pub fn refresh(&mut self) {
        if self.dirty {
            self.query_pipeline.update(&self.collider_set);
            self.dirty = false;
        }
    }

    pub fn needs_refresh(&self) -> bool {
        self.dirty
    }

    /// Closes the gap the cast's iterative solver leaves behind. The remaining
    /// separation at the reported pose is covered along the sweep direction,
    /// which never overshoots into the collider for convex pairs.
    fn refine_time_of_impact(
        &self,
        pose: &Isometry3<f32>,
        shape: &dyn Shape,
        velocity: &Vector3<f32>,
        handle: ColliderHandle,
        hit: &ShapeCastHit,
        max_distance: f32,
    ) -> f32 {
        let toi = hit.time_of_impact;
        if toi <= 0.0 {
            return toi;
        }
        let Some(collider) = self.collider_set.get(handle) else {
            return toi;
        };
        let approach = -velocity.dot(&hit.normal1.into_inner());
        if approach < slide_consts::REFINE_MIN_APPROACH {
            return toi;
        }
        let at_impact = Translation3::from(velocity * toi) * pose;
        match query::distance(&at_impact, shape, collider.position(), collider.shape()) {
            Ok(gap) if gap > 0.0 => (toi + gap / approach).min(max_distance),
            _ => toi,
        }
    }

    fn filter<'a>(layers: LayerMask) -> QueryFilter<'a> {
        QueryFilter::default()
            .exclude_sensors()
            .groups(InteractionGroups::new(Group::ALL, layers.to_group()))
    }
}

impl Default for CollisionWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapeQuery for CollisionWorld {
    /// Repeats the pipeline's nearest-hit cast, excluding colliders already
    /// reported, so results come back nearest-first.
    fn sweep(
        &self,
        pose: &Isometry3<f32>,
        shape: &ShapeDescriptor,
        direction: &Unit<Vector3<f32>>,
        max_distance: f32,
        layers: LayerMask,
    ) -> Vec<SweepHit> {
        let shared = shape.to_shared_shape();
        let velocity = direction.into_inner();

        let mut hits = Vec::new();
        let mut seen: Vec<ColliderHandle> = Vec::new();
        while hits.len() < self.max_sweep_hits {
            let not_seen = |handle: ColliderHandle, _: &Collider| !seen.contains(&handle);
            let filter = Self::filter(layers).predicate(&not_seen);
            // Sliding out of an initial overlap must stay possible.
            let options = ShapeCastOptions {
                stop_at_penetration: false,
                compute_impact_geometry_on_penetration: true,
                ..ShapeCastOptions::with_max_time_of_impact(max_distance)
            };
            let Some((handle, hit)) = self.query_pipeline.cast_shape(
                &self.rigid_body_set,
                &self.collider_set,
                pose,
                &velocity,
                &*shared,
                options,
                filter,
            ) else {
                break;
            };
            seen.push(handle);
            let distance = self.refine_time_of_impact(pose, &*shared, &velocity, handle, &hit, max_distance);
            hits.push(SweepHit {
                distance,
                point: hit.witness1,
                normal: hit.normal1,
                collider: Some(handle),
            });
        }
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    fn overlap(
        &self,
        pose: &Isometry3<f32>,
        shape: &ShapeDescriptor,
        layers: LayerMask,
    ) -> Vec<ColliderHandle> {
        let shared = shape.to_shared_shape();
        let mut overlaps = Vec::new();
        self.query_pipeline.intersections_with_shape(
            &self.rigid_body_set,
            &self.collider_set,
            pose,
            &*shared,
            Self::filter(layers),
            |handle| {
                overlaps.push(handle);
                true // continue searching
            },
        );
        overlaps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor_world() -> (CollisionWorld, ColliderHandle) {
        let mut world = CollisionWorld::new();
        let floor = world.add_static_box(
            "floor",
            [0.0, -0.5, 0.0],
            UnitQuaternion::identity(),
            [50.0, 0.5, 50.0],
            LayerMask::STATIC,
        );
        world.refresh();
        (world, floor)
    }

    #[test]
    fn test_world_creation() {
        let world = CollisionWorld::new();
        assert_eq!(world.collider_count(), 0);
        assert!(!world.needs_refresh());
    }

    #[test]
    fn test_sphere_sweep_down_hits_floor() {
        let (world, floor) = floor_world();
        let pose = Isometry3::translation(0.0, 2.0, 0.0);
        let hits = world.sweep(
            &pose,
            &ShapeDescriptor::sphere(0.5),
            &-Vector3::y_axis(),
            10.0,
            LayerMask::ALL,
        );
        assert_eq!(hits.len(), 1);
        let hit = hits[0];
        assert_eq!(hit.collider, Some(floor));
        // Center at 2.0, radius 0.5, floor top at 0.0
        assert!((hit.distance - 1.5).abs() < 1e-3, "distance was {}", hit.distance);
        assert!(hit.normal.y > 0.999, "normal was {:?}", hit.normal);
        assert!(hit.point.y.abs() < 1e-3, "point was {:?}", hit.point);
    }

    #[test]
    fn test_small_sphere_distance_matches_contact() {
        let (world, _) = floor_world();
        for (height, radius) in [(1.0, 0.1), (0.35, 0.1), (3.0, 0.05)] {
            let hits = world.sweep(
                &Isometry3::translation(0.0, height, 0.0),
                &ShapeDescriptor::sphere(radius),
                &-Vector3::y_axis(),
                10.0,
                LayerMask::ALL,
            );
            let hit = hits[0];
            let expected = height - radius;
            assert!(
                (hit.distance - expected).abs() < 1e-4,
                "from {height}: distance was {}",
                hit.distance
            );
            // Travelling the reported distance leaves the sphere touching the contact point.
            let bottom = height - hit.distance - radius;
            assert!((bottom - hit.point.y).abs() < 1e-4);
        }
    }

    #[test]
    fn test_sweep_respects_layers_and_distance() {
        let (world, _) = floor_world();
        let pose = Isometry3::translation(0.0, 2.0, 0.0);
        let sphere = ShapeDescriptor::sphere(0.5);
        let down = -Vector3::y_axis();

        let masked = world.sweep(&pose, &sphere, &down, 10.0, LayerMask::CHARACTER);
        assert!(masked.is_empty(), "character-only mask should skip the floor");

        let short = world.sweep(&pose, &sphere, &down, 1.0, LayerMask::ALL);
        assert!(short.is_empty(), "floor is beyond max distance");
    }

    #[test]
    fn test_sweep_reports_hits_nearest_first() {
        let (mut world, floor) = floor_world();
        let me = world.add_character_collider(
            "me",
            &ShapeDescriptor::sphere(0.5),
            [0.0, 1.0, 0.0],
            LayerMask::CHARACTER,
        );
        world.refresh();

        let pose = Isometry3::translation(0.0, 3.0, 0.0);
        let hits = world.sweep(
            &pose,
            &ShapeDescriptor::sphere(0.25),
            &-Vector3::y_axis(),
            10.0,
            LayerMask::ALL,
        );
        let order: Vec<_> = hits.iter().filter_map(|h| h.collider).collect();
        assert_eq!(order, vec![me, floor]);
        assert!(hits[0].distance < hits[1].distance);
    }

    #[test]
    fn test_sensor_is_ignored() {
        let mut world = CollisionWorld::new();
        world.add_sensor_box("trigger", [0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        world.refresh();

        let pose = Isometry3::translation(-5.0, 0.0, 0.0);
        let hits = world.sweep(
            &pose,
            &ShapeDescriptor::sphere(0.5),
            &Vector3::x_axis(),
            10.0,
            LayerMask::ALL,
        );
        assert!(hits.is_empty());
    }

    #[test]
    fn test_overlap_and_removal() {
        let (mut world, floor) = floor_world();
        let pose = Isometry3::translation(0.0, 0.2, 0.0);
        let sphere = ShapeDescriptor::sphere(0.5);
        assert_eq!(world.overlap(&pose, &sphere, LayerMask::ALL), vec![floor]);

        assert!(world.remove_collider(floor));
        assert!(world.needs_refresh());
        world.refresh();
        assert!(world.overlap(&pose, &sphere, LayerMask::ALL).is_empty());
        assert!(world.label(floor).is_none());
    }

    #[test]
    fn test_moved_character_collider_is_found_at_new_pose() {
        let mut world = CollisionWorld::new();
        let sphere = ShapeDescriptor::sphere(0.5);
        let other = world.add_character_collider("other", &sphere, [0.0, 0.0, 0.0], LayerMask::CHARACTER);
        world.refresh();

        assert!(world.set_collider_pose(other, Isometry3::translation(10.0, 0.0, 0.0)));
        world.refresh();

        let probe = Isometry3::translation(10.0, 0.0, 0.0);
        assert_eq!(world.overlap(&probe, &sphere, LayerMask::CHARACTER), vec![other]);
        assert!(world
            .overlap(&Isometry3::identity(), &sphere, LayerMask::CHARACTER)
            .is_empty());
    }
}
