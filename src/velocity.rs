//! Per-tick horizontal velocity state machine and gravity integration.

use nalgebra::{Unit, UnitQuaternion, Vector2, Vector3};
use serde::Serialize;

use crate::math;
use crate::params::MovementParams;

/// Which convergence rate drove this tick's blend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    Brake,
    Turnaround,
    Accelerate,
    Decelerate,
}

#[derive(Debug, Clone, Copy)]
pub struct VelocityController {
    params: MovementParams,
    up: Unit<Vector3<f32>>,
}

impl VelocityController {
    pub fn new(params: MovementParams, up: Unit<Vector3<f32>>) -> Self {
        Self { params, up }
    }

    /// World-space horizontal target for a planar input under `facing`.
    /// Input x is right, y is forward (local +Z).
    pub fn target_velocity(&self, move_input: &Vector2<f32>, facing: &UnitQuaternion<f32>) -> Vector3<f32> {
        let local = math::xz_to_xyz(move_input) * self.params.max_speed;
        math::project_on_plane(&(facing * local), &self.up)
    }

    /// Regime selection in priority order: no input brakes, opposing input
    /// turns around, otherwise accelerate or decelerate by comparing speeds.
    /// Opposition is judged against the world-space `target` rather than the
    /// raw input, so it follows the facing; with identity facing both agree.
    pub fn select_regime(
        &self,
        velocity: &Vector3<f32>,
        move_input: &Vector2<f32>,
        target: &Vector3<f32>,
    ) -> Regime {
        if math::is_almost_zero_vec2(move_input) {
            Regime::Brake
        } else if velocity.dot(target) < 0.0 {
            Regime::Turnaround
        } else if velocity.norm_squared() <= target.norm_squared() {
            Regime::Accelerate
        } else {
            Regime::Decelerate
        }
    }

    pub fn rate(&self, regime: Regime) -> f32 {
        match regime {
            Regime::Brake => self.params.brake,
            Regime::Turnaround => self.params.turnaround,
            Regime::Accelerate => self.params.acceleration,
            Regime::Decelerate => self.params.deceleration,
        }
    }

    /// Blends the horizontal velocity one tick toward the input's target.
    pub fn update_horizontal(
        &self,
        velocity: &Vector3<f32>,
        move_input: &Vector2<f32>,
        facing: &UnitQuaternion<f32>,
        delta_time: f32,
    ) -> (Vector3<f32>, Regime) {
        let move_input = math::clamp_magnitude_vec2(*move_input, 1.0);
        let target = if math::is_almost_zero_vec2(&move_input) {
            Vector3::zeros()
        } else {
            self.target_velocity(&move_input, facing)
        };
        let regime = self.select_regime(velocity, &move_input, &target);
        let blended = velocity + (target - velocity) * (self.rate(regime) * delta_time);
        let horizontal = math::project_on_plane(&blended, &self.up);
        (math::clamp_magnitude(horizontal, self.params.max_speed), regime)
    }

    /// Grounded characters carry no fall speed; airborne ones accelerate down uncapped.
    pub fn update_vertical(&self, vertical: f32, grounded: bool, delta_time: f32) -> f32 {
        if grounded {
            0.0
        } else {
            vertical - self.params.gravity * delta_time
        }
    }

    /// Velocity fed to the slide resolver: horizontal motion held flush with
    /// the ground plane plus the vertical component along up.
    pub fn compose(
        &self,
        horizontal: &Vector3<f32>,
        vertical: f32,
        ground_normal: Option<&Unit<Vector3<f32>>>,
    ) -> Vector3<f32> {
        let along_ground = match ground_normal {
            Some(normal) => math::project_on_plane(horizontal, normal),
            None => *horizontal,
        };
        along_ground + self.up.into_inner() * vertical
    }
}
