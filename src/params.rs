//! Per-character movement tuning.

use serde::{Deserialize, Serialize};

use crate::constants::{ground, movement, slide};
use crate::error::MoverError;
use crate::slide::SlideSettings;

/// Immutable movement configuration, one instance per character.
///
/// Rates (`acceleration`, `deceleration`, `brake`, `turnaround`, `smoothing`)
/// are per-second convergence coefficients, not fixed increments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementParams {
    pub max_speed: f32,
    pub acceleration: f32,
    pub deceleration: f32,
    pub brake: f32,
    pub turnaround: f32,
    pub gravity: f32,
    pub step_height: f32,
    pub step_radius: f32,
    /// Steepest walkable surface, degrees between up and the surface normal
    pub slope_limit: f32,
    pub skin_epsilon: f32,
    pub probe_threshold: f32,
    pub smoothing: f32,
    pub max_iterations: u32,
}

impl Default for MovementParams {
    fn default() -> Self {
        Self {
            max_speed: movement::MAX_SPEED,
            acceleration: movement::ACCELERATION,
            deceleration: movement::DECELERATION,
            brake: movement::BRAKE,
            turnaround: movement::TURNAROUND,
            gravity: movement::GRAVITY,
            step_height: ground::STEP_HEIGHT,
            step_radius: ground::STEP_RADIUS,
            slope_limit: ground::SLOPE_LIMIT_DEGREES,
            skin_epsilon: slide::SKIN_EPSILON,
            probe_threshold: ground::PROBE_THRESHOLD,
            smoothing: slide::SMOOTHING,
            max_iterations: slide::MAX_ITERATIONS,
        }
    }
}

impl MovementParams {
    pub fn slope_limit_radians(&self) -> f32 {
        self.slope_limit.to_radians()
    }

    pub fn slide_settings(&self) -> SlideSettings {
        SlideSettings {
            skin_epsilon: self.skin_epsilon,
            max_iterations: self.max_iterations,
            ..SlideSettings::default()
        }
    }

    /// Checks that every field is finite and within its meaningful range.
    pub fn validate(&self) -> Result<(), MoverError> {
        let non_negative = [
            ("max_speed", self.max_speed),
            ("acceleration", self.acceleration),
            ("deceleration", self.deceleration),
            ("brake", self.brake),
            ("turnaround", self.turnaround),
            ("gravity", self.gravity),
            ("step_height", self.step_height),
            ("skin_epsilon", self.skin_epsilon),
            ("probe_threshold", self.probe_threshold),
            ("smoothing", self.smoothing),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(MoverError::InvalidParams(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        if !self.step_radius.is_finite() || self.step_radius <= 0.0 {
            return Err(MoverError::InvalidParams(format!(
                "step_radius must be positive, got {}",
                self.step_radius
            )));
        }
        if !(0.0..=90.0).contains(&self.slope_limit) {
            return Err(MoverError::InvalidParams(format!(
                "slope_limit must be within [0, 90] degrees, got {}",
                self.slope_limit
            )));
        }
        if self.max_iterations == 0 {
            return Err(MoverError::InvalidParams(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
