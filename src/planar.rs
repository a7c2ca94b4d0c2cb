//! Lateral-only mover for side-on and top-down games played in the XY plane.
//!
//! The host sets the velocity directly each tick; there is no regime blending,
//! gravity or ground handling. Colliders live in the same 3D provider with
//! their Z extent spanning the play plane.

use nalgebra::{Isometry3, Point2, Unit, Vector2, Vector3};
use rapier3d::prelude::ColliderHandle;
use tracing::trace;

use crate::error::{ensure_finite, ensure_finite_slice, MoverError};
use crate::math;
use crate::mover::{validate_delta_time, KinematicMover, MoverContext, MoverSnapshot, TickObserver};
use crate::query::{ShapeQuery, ShapeSweepQuery};
use crate::shape::LayerMask;
use crate::slide::{self, IterativeSlideResolver, SlideOutcome, SlideSettings, SlideStatus};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarState {
    /// Collider center in the XY plane
    pub position: Point2<f32>,
    pub rendered_position: Point2<f32>,
    pub velocity: Vector2<f32>,
    /// Counter-clockwise rotation about +Z, radians
    pub rotation: f32,
}

pub struct PlanarMover {
    context: MoverContext,
    state: PlanarState,
    resolver: IterativeSlideResolver,
    observers: Vec<TickObserver>,
    last_outcome: Option<SlideOutcome>,
    ticks: u64,
}

impl std::fmt::Debug for PlanarMover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanarMover")
            .field("context", &self.context)
            .field("state", &self.state)
            .field("ticks", &self.ticks)
            .finish()
    }
}

impl PlanarMover {
    /// `context.up` is unused; motion is confined to the XY plane.
    pub fn new(context: MoverContext, position: Point2<f32>) -> Result<Self, MoverError> {
        context.validate()?;
        ensure_finite_slice(position.coords.as_slice(), "position")?;
        let settings = SlideSettings {
            plane: Some(Vector3::z_axis()),
            ..context.params.slide_settings()
        };
        Ok(Self {
            context,
            state: PlanarState {
                position,
                rendered_position: position,
                velocity: Vector2::zeros(),
                rotation: 0.0,
            },
            resolver: IterativeSlideResolver::new(settings),
            observers: Vec::new(),
            last_outcome: None,
            ticks: 0,
        })
    }

    pub fn state(&self) -> &PlanarState {
        &self.state
    }

    pub fn position(&self) -> Point2<f32> {
        self.state.position
    }

    pub fn rendered_position(&self) -> Point2<f32> {
        self.state.rendered_position
    }

    pub fn velocity(&self) -> Vector2<f32> {
        self.state.velocity
    }

    pub fn rotation(&self) -> f32 {
        self.state.rotation
    }

    pub fn last_outcome(&self) -> Option<&SlideOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn set_velocity(&mut self, velocity: Vector2<f32>) -> Result<(), MoverError> {
        ensure_finite_slice(velocity.as_slice(), "velocity")?;
        self.state.velocity = velocity;
        Ok(())
    }

    pub fn set_rotation(&mut self, angle: f32) -> Result<(), MoverError> {
        self.state.rotation = ensure_finite(angle, "rotation")?;
        Ok(())
    }

    pub fn teleport(&mut self, position: Point2<f32>) -> Result<(), MoverError> {
        ensure_finite_slice(position.coords.as_slice(), "position")?;
        self.state.position = position;
        self.state.rendered_position = position;
        self.state.velocity = Vector2::zeros();
        Ok(())
    }

    pub fn on_tick(&mut self, observer: TickObserver) {
        self.observers.push(observer);
    }

    pub fn collider_pose(&self) -> Isometry3<f32> {
        let p = self.state.position;
        Isometry3::new(Vector3::new(p.x, p.y, 0.0), Vector3::z() * self.state.rotation)
    }

    pub fn overlapping(&self, query: &dyn ShapeQuery, layers: LayerMask) -> Vec<ColliderHandle> {
        let sweep = ShapeSweepQuery::new(query, self.context.layers, self.context.self_collider);
        sweep.overlaps(&self.collider_pose(), &self.context.shape, layers)
    }

    pub fn tick(&mut self, query: &dyn ShapeQuery, delta_time: f32) -> Result<(), MoverError> {
        validate_delta_time(delta_time)?;
        if delta_time == 0.0 {
            return Ok(());
        }

        let sweep = ShapeSweepQuery::new(query, self.context.layers, self.context.self_collider);
        let velocity = math::xy_to_xyz(&self.state.velocity);
        let outcome = self.resolver.resolve(
            &sweep,
            &self.collider_pose(),
            &self.context.shape,
            &velocity,
            delta_time,
        );

        let position = self.state.position + math::xyz_to_xy(&outcome.displacement);
        let rendered = slide::smooth_toward(
            math::xy_to_xyz(&self.state.rendered_position.coords),
            math::xy_to_xyz(&position.coords),
            self.context.params.smoothing,
            delta_time,
        );
        self.state.position = position;
        self.state.rendered_position = Point2::from(math::xyz_to_xy(&rendered));
        self.last_outcome = Some(outcome);
        self.ticks += 1;

        trace!(tick = self.ticks, status = ?outcome.status, "planar tick");

        if !self.observers.is_empty() {
            let snapshot = self.snapshot();
            for observer in &mut self.observers {
                observer(&snapshot);
            }
        }
        Ok(())
    }

    pub fn snapshot(&self) -> MoverSnapshot {
        let lift = |p: &Point2<f32>| [p.x, p.y, 0.0];
        MoverSnapshot {
            tick: self.ticks,
            position: lift(&self.state.position),
            rendered_position: lift(&self.state.rendered_position),
            velocity: [self.state.velocity.x, self.state.velocity.y, 0.0],
            grounded: false,
            ground_normal: None,
            regime: None,
            slide: self.last_outcome.map_or(SlideStatus::Idle, |o| o.status),
        }
    }

    /// Normal of the last surface slid along on the previous tick, in the XY plane.
    pub fn contact_normal(&self) -> Option<Unit<Vector2<f32>>> {
        let normal = self.last_outcome?.last_normal?;
        Unit::try_new(math::xyz_to_xy(&normal), crate::constants::tolerance::SPEED)
    }
}

impl KinematicMover for PlanarMover {
    fn tick(&mut self, query: &dyn ShapeQuery, delta_time: f32) -> Result<(), MoverError> {
        PlanarMover::tick(self, query, delta_time)
    }

    fn snapshot(&self) -> MoverSnapshot {
        PlanarMover::snapshot(self)
    }

    fn is_grounded(&self) -> bool {
        false
    }

    fn on_tick(&mut self, observer: TickObserver) {
        PlanarMover::on_tick(self, observer)
    }

    fn collider_pose(&self) -> Isometry3<f32> {
        PlanarMover::collider_pose(self)
    }
}
