//! Demo scenes for the CLI and integration tests.
//!
//! Every scene has a floor whose top is at y = 0 and spawns the character at
//! the origin, facing +Z, with obstacles ahead of it.

use nalgebra::{Point3, UnitQuaternion, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::str::FromStr;

use crate::physics::CollisionWorld;
use crate::shape::LayerMask;

const WALL_THICKNESS: f32 = 0.5;
const WALL_HEIGHT: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneKind {
    Flat,
    Wall,
    Corner,
    Stairs,
    Slope,
    Rubble,
}

impl SceneKind {
    pub const ALL: [SceneKind; 6] = [
        SceneKind::Flat,
        SceneKind::Wall,
        SceneKind::Corner,
        SceneKind::Stairs,
        SceneKind::Slope,
        SceneKind::Rubble,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SceneKind::Flat => "flat",
            SceneKind::Wall => "wall",
            SceneKind::Corner => "corner",
            SceneKind::Stairs => "stairs",
            SceneKind::Slope => "slope",
            SceneKind::Rubble => "rubble",
        }
    }

    /// Builds the scene. `seed` only affects `Rubble`.
    pub fn build(self, seed: u64) -> CollisionWorld {
        let mut world = match self {
            SceneKind::Flat => flat(),
            SceneKind::Wall => wall(5.0),
            SceneKind::Corner => corner(6.0),
            SceneKind::Stairs => stairs(0.2, 0.5, 6),
            SceneKind::Slope => slope(30.0),
            SceneKind::Rubble => rubble(seed, 40),
        };
        world.refresh();
        world
    }
}

impl fmt::Display for SceneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SceneKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SceneKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<_> = SceneKind::ALL.iter().map(|k| k.name()).collect();
                format!("unknown scene '{s}', expected one of: {}", names.join(", "))
            })
    }
}

/// Foot position every scene spawns the character at.
pub fn spawn_point() -> Point3<f32> {
    Point3::origin()
}

fn floor(world: &mut CollisionWorld) {
    world.add_static_box(
        "floor",
        [0.0, -0.5, 0.0],
        UnitQuaternion::identity(),
        [50.0, 0.5, 50.0],
        LayerMask::STATIC,
    );
}

/// Adds an upright wall standing on the floor. `face_center` is the middle of
/// its inner face at floor level and `normal` is that face's horizontal normal.
pub fn add_wall(
    world: &mut CollisionWorld,
    label: &str,
    face_center: Point3<f32>,
    normal: Vector3<f32>,
    half_length: f32,
) {
    // Local -Z face ends up facing along `normal`.
    let rotation = UnitQuaternion::face_towards(&-normal, &Vector3::y());
    let center = face_center - normal.normalize() * (WALL_THICKNESS / 2.0)
        + Vector3::y() * (WALL_HEIGHT / 2.0);
    world.add_static_box(
        label,
        [center.x, center.y, center.z],
        rotation,
        [half_length, WALL_HEIGHT / 2.0, WALL_THICKNESS / 2.0],
        LayerMask::STATIC,
    );
}

pub fn flat() -> CollisionWorld {
    let mut world = CollisionWorld::new();
    floor(&mut world);
    world
}

/// Wall across the path at `z = distance`, facing the spawn.
pub fn wall(distance: f32) -> CollisionWorld {
    let mut world = flat();
    add_wall(
        &mut world,
        "wall",
        Point3::new(0.0, 0.0, distance),
        -Vector3::z(),
        10.0,
    );
    world
}

/// Two walls meeting at a right angle with the apex at `z = apex`, opening
/// toward the spawn. Walking +Z pinches the character between them.
pub fn corner(apex: f32) -> CollisionWorld {
    let mut world = flat();
    let apex = Point3::new(0.0, 0.0, apex);
    let half_length = 4.0;
    let sides = [
        ("corner_right", Vector3::new(1.0, 0.0, -1.0), Vector3::new(-1.0, 0.0, -1.0)),
        ("corner_left", Vector3::new(-1.0, 0.0, -1.0), Vector3::new(1.0, 0.0, -1.0)),
    ];
    for (label, along, normal) in sides {
        let face_center = apex + along.normalize() * half_length;
        add_wall(&mut world, label, face_center, normal.normalize(), half_length);
    }
    world
}

/// Solid staircase rising along +Z from `z = 2`.
pub fn stairs(rise: f32, run: f32, steps: usize) -> CollisionWorld {
    let mut world = flat();
    let start = 2.0;
    let end = start + run * steps as f32 + 4.0;
    for i in 0..steps {
        let z0 = start + run * i as f32;
        let top = rise * (i + 1) as f32;
        world.add_static_box(
            &format!("step_{i}"),
            [0.0, top / 2.0, (z0 + end) / 2.0],
            UnitQuaternion::identity(),
            [5.0, top / 2.0, (end - z0) / 2.0],
            LayerMask::STATIC,
        );
    }
    world
}

/// Ramp rising along +Z at `angle_degrees`, its top surface leaving the floor at `z = 2`.
pub fn slope(angle_degrees: f32) -> CollisionWorld {
    let mut world = flat();
    let rotation = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -angle_degrees.to_radians());
    let half = Vector3::new(5.0, 0.5, 10.0);
    let start_edge = rotation * Vector3::new(0.0, half.y, -half.z);
    let center = Vector3::new(0.0, 0.0, 2.0) - start_edge;
    world.add_static_box(
        "ramp",
        [center.x, center.y, center.z],
        rotation,
        [half.x, half.y, half.z],
        LayerMask::STATIC,
    );
    world
}

/// Scattered low boxes and rocks ahead of the spawn, reproducible from `seed`.
pub fn rubble(seed: u64, count: usize) -> CollisionWorld {
    let mut world = flat();
    let mut rng = StdRng::seed_from_u64(seed);
    for i in 0..count {
        // Every fourth piece is a round rock.
        if i % 4 == 3 {
            let radius = rng.gen_range(0.1..0.3);
            let position = [rng.gen_range(-8.0..8.0), radius, rng.gen_range(2.0..16.0)];
            world.add_static_ball(&format!("rock_{i}"), position, radius, LayerMask::STATIC);
            continue;
        }
        let half = [
            rng.gen_range(0.1..0.5),
            rng.gen_range(0.05..0.25),
            rng.gen_range(0.1..0.5),
        ];
        let position = [
            rng.gen_range(-8.0..8.0),
            half[1],
            rng.gen_range(2.0..16.0),
        ];
        let yaw = rng.gen_range(0.0..std::f32::consts::TAU);
        world.add_static_box(
            &format!("rubble_{i}"),
            position,
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), yaw),
            half,
            LayerMask::STATIC,
        );
    }
    world
}
