//! The 3D character mover: owns the state and runs one resolution pass per tick.

use nalgebra::{Isometry3, Point3, Translation3, Unit, UnitQuaternion, Vector2, Vector3};
use rapier3d::prelude::ColliderHandle;
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::{ensure_finite, ensure_finite_slice, MoverError};
use crate::ground::{GroundContact, GroundProbe, StepStickResolver};
use crate::math;
use crate::params::MovementParams;
use crate::query::{ShapeQuery, ShapeSweepQuery};
use crate::shape::{LayerMask, ShapeDescriptor};
use crate::slide::{self, IterativeSlideResolver, SlideOutcome, SlideStatus};
use crate::velocity::{Regime, VelocityController};

/// Everything a mover needs from its host, handed over at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoverContext {
    pub shape: ShapeDescriptor,
    pub params: MovementParams,
    /// Layers the character collides with
    pub layers: LayerMask,
    /// The character's own collider, filtered out of every query
    pub self_collider: Option<ColliderHandle>,
    pub up: Unit<Vector3<f32>>,
}

impl Default for MoverContext {
    fn default() -> Self {
        Self::new(ShapeDescriptor::default(), MovementParams::default())
    }
}

impl MoverContext {
    pub fn new(shape: ShapeDescriptor, params: MovementParams) -> Self {
        Self {
            shape,
            params,
            layers: LayerMask::ALL,
            self_collider: None,
            up: Vector3::y_axis(),
        }
    }

    pub fn with_layers(mut self, layers: LayerMask) -> Self {
        self.layers = layers;
        self
    }

    pub fn with_self_collider(mut self, handle: ColliderHandle) -> Self {
        self.self_collider = Some(handle);
        self
    }

    pub fn with_up(mut self, up: Unit<Vector3<f32>>) -> Self {
        self.up = up;
        self
    }

    pub fn validate(&self) -> Result<(), MoverError> {
        self.params.validate()?;
        self.shape.validate()?;
        ensure_finite_slice(self.up.as_slice(), "up vector")
    }
}

/// Authoritative per-character state. Mutated only by the owning mover.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoverState {
    /// World-space foot point
    pub position: Point3<f32>,
    /// Smoothed position for presentation
    pub rendered_position: Point3<f32>,
    /// Orthogonal to up
    pub horizontal_velocity: Vector3<f32>,
    /// Signed speed along up
    pub vertical_velocity: f32,
    /// Velocity handed to the slide resolver on the last tick
    pub velocity: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub grounded: bool,
    pub ground: Option<GroundContact>,
}

impl MoverState {
    pub fn at(position: Point3<f32>) -> Self {
        Self {
            position,
            rendered_position: position,
            horizontal_velocity: Vector3::zeros(),
            vertical_velocity: 0.0,
            velocity: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            grounded: false,
            ground: None,
        }
    }
}

/// What the last tick did, for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub regime: Regime,
    pub slide: SlideOutcome,
    /// Vertical shift applied by the step-stick pass
    pub step_correction: Option<f32>,
}

/// Plain-data view of a mover after a tick, handed to observers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MoverSnapshot {
    pub tick: u64,
    pub position: [f32; 3],
    pub rendered_position: [f32; 3],
    pub velocity: [f32; 3],
    pub grounded: bool,
    pub ground_normal: Option<[f32; 3]>,
    pub regime: Option<Regime>,
    pub slide: SlideStatus,
}

pub type TickObserver = Box<dyn FnMut(&MoverSnapshot)>;

/// Capability shared by the 3D and planar movers.
pub trait KinematicMover {
    fn tick(&mut self, query: &dyn ShapeQuery, delta_time: f32) -> Result<(), MoverError>;
    fn snapshot(&self) -> MoverSnapshot;
    fn is_grounded(&self) -> bool;
    fn on_tick(&mut self, observer: TickObserver);
    /// Pose of the character's collider, for syncing it into the provider.
    fn collider_pose(&self) -> Isometry3<f32>;
}

pub(crate) fn validate_delta_time(delta_time: f32) -> Result<(), MoverError> {
    ensure_finite(delta_time, "delta time")?;
    if delta_time < 0.0 {
        tracing::warn!(delta_time, "rejected negative delta time");
        return Err(MoverError::NegativeDeltaTime(delta_time));
    }
    Ok(())
}

pub struct CharacterMover {
    context: MoverContext,
    state: MoverState,
    move_input: Vector2<f32>,
    controller: VelocityController,
    resolver: IterativeSlideResolver,
    probe: GroundProbe,
    step_stick: StepStickResolver,
    shape_rotation: UnitQuaternion<f32>,
    observers: Vec<TickObserver>,
    last_report: Option<TickReport>,
    ticks: u64,
}

impl std::fmt::Debug for CharacterMover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CharacterMover")
            .field("context", &self.context)
            .field("state", &self.state)
            .field("move_input", &self.move_input)
            .field("ticks", &self.ticks)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl CharacterMover {
    pub fn new(context: MoverContext, position: Point3<f32>) -> Result<Self, MoverError> {
        context.validate()?;
        ensure_finite_slice(position.coords.as_slice(), "position")?;

        let params = context.params;
        let up = context.up;
        // The shape's local +Y is aligned with up.
        let shape_rotation = UnitQuaternion::rotation_between_axis(&Vector3::y_axis(), &up)
            .unwrap_or_else(|| UnitQuaternion::from_axis_angle(&Vector3::x_axis(), std::f32::consts::PI));

        Ok(Self {
            context,
            state: MoverState::at(position),
            move_input: Vector2::zeros(),
            controller: VelocityController::new(params, up),
            resolver: IterativeSlideResolver::new(params.slide_settings()),
            probe: GroundProbe::new(&params, up),
            step_stick: StepStickResolver::new(&params, up),
            shape_rotation,
            observers: Vec::new(),
            last_report: None,
            ticks: 0,
        })
    }

    pub fn context(&self) -> &MoverContext {
        &self.context
    }

    pub fn state(&self) -> &MoverState {
        &self.state
    }

    pub fn position(&self) -> Point3<f32> {
        self.state.position
    }

    pub fn rendered_position(&self) -> Point3<f32> {
        self.state.rendered_position
    }

    pub fn rotation(&self) -> UnitQuaternion<f32> {
        self.state.rotation
    }

    pub fn velocity(&self) -> Vector3<f32> {
        self.state.velocity
    }

    pub fn is_grounded(&self) -> bool {
        self.state.grounded
    }

    /// Normal of the surface under the character, walkable or not.
    pub fn ground_normal(&self) -> Option<Unit<Vector3<f32>>> {
        self.state.ground.map(|contact| contact.normal)
    }

    pub fn move_input(&self) -> Vector2<f32> {
        self.move_input
    }

    pub fn last_report(&self) -> Option<&TickReport> {
        self.last_report.as_ref()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Sets the planar move input (x right, y forward). Longer than unit is clamped on use.
    pub fn set_move_input(&mut self, input: Vector2<f32>) -> Result<(), MoverError> {
        ensure_finite_slice(input.as_slice(), "move input")?;
        self.move_input = input;
        Ok(())
    }

    pub fn set_rotation(&mut self, rotation: UnitQuaternion<f32>) -> Result<(), MoverError> {
        ensure_finite_slice(rotation.coords.as_slice(), "rotation")?;
        self.state.rotation = rotation;
        Ok(())
    }

    /// Faces `forward` projected onto the horizontal plane. A vertical or zero
    /// direction leaves the rotation unchanged.
    pub fn set_forward(&mut self, forward: Vector3<f32>) -> Result<(), MoverError> {
        ensure_finite_slice(forward.as_slice(), "forward")?;
        let flat = math::project_on_plane(&forward, &self.context.up);
        if flat.norm_squared() > crate::constants::tolerance::SPEED {
            self.state.rotation = UnitQuaternion::face_towards(&flat, &self.context.up.into_inner());
        }
        Ok(())
    }

    /// Rotation of `yaw` radians about up.
    pub fn set_yaw(&mut self, yaw: f32) -> Result<(), MoverError> {
        ensure_finite(yaw, "yaw")?;
        self.state.rotation = UnitQuaternion::from_axis_angle(&self.context.up, yaw);
        Ok(())
    }

    /// Moves the character instantly, clearing velocity and ground contact.
    pub fn teleport(&mut self, position: Point3<f32>) -> Result<(), MoverError> {
        ensure_finite_slice(position.coords.as_slice(), "position")?;
        let rotation = self.state.rotation;
        self.state = MoverState {
            rotation,
            ..MoverState::at(position)
        };
        Ok(())
    }

    pub fn on_tick(&mut self, observer: TickObserver) {
        self.observers.push(observer);
    }

    /// Collider center for a foot point: the base hovers `step_height` above the foot.
    fn collider_pose_at(&self, foot: &Point3<f32>) -> Isometry3<f32> {
        let lift = self.context.params.step_height + self.context.shape.vertical_half_extent();
        let center = foot + self.context.up.into_inner() * lift;
        Isometry3::from_parts(Translation3::from(center.coords), self.shape_rotation)
    }

    pub fn collider_pose(&self) -> Isometry3<f32> {
        self.collider_pose_at(&self.state.position)
    }

    /// Colliders overlapping the character's collider in `layers`, excluding itself.
    pub fn overlapping(&self, query: &dyn ShapeQuery, layers: LayerMask) -> Vec<ColliderHandle> {
        let sweep = ShapeSweepQuery::new(query, self.context.layers, self.context.self_collider);
        sweep.overlaps(&self.collider_pose(), &self.context.shape, layers)
    }

    /// Advances the character by `delta_time` seconds.
    pub fn tick(&mut self, query: &dyn ShapeQuery, delta_time: f32) -> Result<(), MoverError> {
        validate_delta_time(delta_time)?;
        if delta_time == 0.0 {
            return Ok(());
        }

        let sweep = ShapeSweepQuery::new(query, self.context.layers, self.context.self_collider);
        let was_grounded = self.state.grounded;

        let (horizontal, regime) = self.controller.update_horizontal(
            &self.state.horizontal_velocity,
            &self.move_input,
            &self.state.rotation,
            delta_time,
        );
        let vertical = self
            .controller
            .update_vertical(self.state.vertical_velocity, was_grounded, delta_time);
        let ground_plane = self
            .state
            .ground
            .as_ref()
            .filter(|_| was_grounded)
            .map(|contact| &contact.normal);
        let velocity = self.controller.compose(&horizontal, vertical, ground_plane);

        let outcome = self.resolver.resolve(
            &sweep,
            &self.collider_pose(),
            &self.context.shape,
            &velocity,
            delta_time,
        );
        let mut foot = self.state.position + outcome.displacement;

        let step_correction = if was_grounded {
            self.step_stick.correction(&sweep, &foot)
        } else {
            None
        };
        if let Some(shift) = step_correction {
            foot += self.context.up.into_inner() * shift;
        }

        let ground = self.probe.ground(&sweep, &foot);
        if ground.grounded != was_grounded {
            if ground.grounded {
                debug!(vertical_velocity = vertical, "landed");
            } else {
                debug!(steep = ground.contact.is_some(), "left ground");
            }
        }

        let rendered = slide::smooth_toward(
            self.state.rendered_position.coords,
            ground.foot.coords,
            self.context.params.smoothing,
            delta_time,
        );

        self.state.position = ground.foot;
        self.state.rendered_position = Point3::from(rendered);
        self.state.horizontal_velocity = horizontal;
        self.state.vertical_velocity = vertical;
        self.state.velocity = velocity;
        self.state.grounded = ground.grounded;
        self.state.ground = ground.contact;
        self.last_report = Some(TickReport {
            regime,
            slide: outcome,
            step_correction,
        });
        self.ticks += 1;

        trace!(
            tick = self.ticks,
            ?regime,
            velocity = ?math::to_array(&velocity),
            grounded = ground.grounded,
            "mover tick"
        );

        self.notify();
        Ok(())
    }

    pub fn snapshot(&self) -> MoverSnapshot {
        MoverSnapshot {
            tick: self.ticks,
            position: math::to_array(&self.state.position.coords),
            rendered_position: math::to_array(&self.state.rendered_position.coords),
            velocity: math::to_array(&self.state.velocity),
            grounded: self.state.grounded,
            ground_normal: self.ground_normal().map(|n| math::to_array(&n)),
            regime: self.last_report.map(|report| report.regime),
            slide: self
                .last_report
                .map_or(SlideStatus::Idle, |report| report.slide.status),
        }
    }

    fn notify(&mut self) {
        if self.observers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for observer in &mut self.observers {
            observer(&snapshot);
        }
    }
}

impl KinematicMover for CharacterMover {
    fn tick(&mut self, query: &dyn ShapeQuery, delta_time: f32) -> Result<(), MoverError> {
        CharacterMover::tick(self, query, delta_time)
    }

    fn snapshot(&self) -> MoverSnapshot {
        CharacterMover::snapshot(self)
    }

    fn is_grounded(&self) -> bool {
        CharacterMover::is_grounded(self)
    }

    fn on_tick(&mut self, observer: TickObserver) {
        CharacterMover::on_tick(self, observer)
    }

    fn collider_pose(&self) -> Isometry3<f32> {
        CharacterMover::collider_pose(self)
    }
}
