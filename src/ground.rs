//! Ground classification, step-up snapping and step-stick correction.
//!
//! Positions here are foot points. The character's collider hovers
//! `step_height` above the foot, so anything lower than that passes under the
//! collider during lateral motion and is handled by these downward probes.

use nalgebra::{Point3, Unit, Vector3};
use rapier3d::prelude::ColliderHandle;

use crate::math;
use crate::params::MovementParams;
use crate::query::ShapeSweepQuery;
use crate::shape::ShapeDescriptor;

/// Surface found under the character by the ground probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundContact {
    pub point: Point3<f32>,
    pub normal: Unit<Vector3<f32>>,
    /// Travel of the probe sphere before contact
    pub distance: f32,
    /// Angle between up and the surface normal, radians
    pub slope: f32,
    pub collider: Option<ColliderHandle>,
}

impl GroundContact {
    /// Signed height of the contact point above `foot` along `up`.
    pub fn height_above(&self, foot: &Point3<f32>, up: &Unit<Vector3<f32>>) -> f32 {
        (self.point - foot).dot(&up.into_inner())
    }
}

/// Result of probing and snapping at the end of a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundReport {
    pub foot: Point3<f32>,
    pub contact: Option<GroundContact>,
    pub grounded: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct GroundProbe {
    step_height: f32,
    step_radius: f32,
    threshold: f32,
    skin_epsilon: f32,
    slope_limit: f32,
    up: Unit<Vector3<f32>>,
}

impl GroundProbe {
    pub fn new(params: &MovementParams, up: Unit<Vector3<f32>>) -> Self {
        Self {
            step_height: params.step_height,
            step_radius: params.step_radius,
            threshold: params.probe_threshold,
            skin_epsilon: params.skin_epsilon,
            slope_limit: params.slope_limit_radians(),
            up,
        }
    }

    /// Full length of the downward cast.
    pub fn reach(&self) -> f32 {
        self.step_height + self.step_radius + self.threshold
    }

    /// Casts the step sphere down from just above the collider base.
    pub fn probe(&self, query: &ShapeSweepQuery<'_>, foot: &Point3<f32>) -> Option<GroundContact> {
        let reach = self.reach();
        let origin = foot + self.up.into_inner() * reach;
        let sphere = ShapeDescriptor::sphere(self.step_radius);
        let hit = query.sweep_from(&origin, &sphere, &-self.up, reach)?;
        Some(GroundContact {
            point: hit.point,
            normal: hit.normal,
            distance: hit.distance,
            slope: math::angle_between(&self.up, &hit.normal),
            collider: hit.collider,
        })
    }

    pub fn is_walkable(&self, contact: &GroundContact) -> bool {
        contact.slope <= self.slope_limit
    }

    /// Foot position resting `skin_epsilon` above the contact point.
    pub fn snap(&self, foot: &Point3<f32>, contact: &GroundContact) -> Point3<f32> {
        let rise = contact.height_above(foot, &self.up) + self.skin_epsilon;
        foot + self.up.into_inner() * rise
    }

    /// Probes at `foot`, snapping onto walkable ground. Steep contacts are
    /// reported but neither snap nor ground the character.
    pub fn ground(&self, query: &ShapeSweepQuery<'_>, foot: &Point3<f32>) -> GroundReport {
        match self.probe(query, foot) {
            Some(contact) if self.is_walkable(&contact) => GroundReport {
                foot: self.snap(foot, &contact),
                contact: Some(contact),
                grounded: true,
            },
            contact => GroundReport {
                foot: *foot,
                contact,
                grounded: false,
            },
        }
    }
}

/// Pulls a grounded character back onto the surface after lateral motion,
/// so walking off a low ledge follows the ledge down instead of floating.
#[derive(Debug, Clone, Copy)]
pub struct StepStickResolver {
    step_height: f32,
    step_radius: f32,
    skin_epsilon: f32,
    slope_limit: f32,
    up: Unit<Vector3<f32>>,
}

impl StepStickResolver {
    pub fn new(params: &MovementParams, up: Unit<Vector3<f32>>) -> Self {
        Self {
            step_height: params.step_height,
            step_radius: params.step_radius,
            skin_epsilon: params.skin_epsilon,
            slope_limit: params.slope_limit_radians(),
            up,
        }
    }

    pub fn reach(&self) -> f32 {
        self.step_height + 2.0 * self.step_radius + self.skin_epsilon
    }

    /// Vertical shift along up that puts the foot `skin_epsilon` above the
    /// walkable surface below, or `None` when there is nothing to stick to.
    pub fn correction(&self, query: &ShapeSweepQuery<'_>, foot: &Point3<f32>) -> Option<f32> {
        let reach = self.reach();
        let origin = foot + self.up.into_inner() * reach;
        let sphere = ShapeDescriptor::sphere(self.step_radius);
        let hit = query.sweep_from(&origin, &sphere, &-self.up, reach)?;

        // A zero-distance hit started inside geometry and says nothing about the floor.
        if hit.distance <= 0.0 {
            return None;
        }
        if math::angle_between(&self.up, &hit.normal) > self.slope_limit {
            return None;
        }

        Some((hit.point - foot).dot(&self.up.into_inner()) + self.skin_epsilon)
    }

    pub fn apply(&self, query: &ShapeSweepQuery<'_>, foot: &Point3<f32>) -> Option<Point3<f32>> {
        self.correction(query, foot)
            .map(|shift| foot + self.up.into_inner() * shift)
    }
}
