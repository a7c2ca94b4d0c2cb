//! Movement and collision constants.
//! Centralizing these keeps config defaults, tests and the CLI in agreement.

/// Velocity controller defaults
pub mod movement {
    /// Top horizontal speed in units/second
    pub const MAX_SPEED: f32 = 10.0;

    /// Convergence rate while speeding up toward the target (1/s)
    pub const ACCELERATION: f32 = 10.0;

    /// Convergence rate while slowing down toward a smaller target (1/s)
    pub const DECELERATION: f32 = 10.0;

    /// Convergence rate toward zero when there is no input (1/s)
    pub const BRAKE: f32 = 10.0;

    /// Convergence rate when input opposes current motion (1/s)
    pub const TURNAROUND: f32 = 10.0;

    /// Downward acceleration while airborne in units/s²
    pub const GRAVITY: f32 = 10.0;
}

/// Ground handling defaults
pub mod ground {
    /// Highest ledge the mover climbs by snapping
    pub const STEP_HEIGHT: f32 = 0.3;

    /// Radius of the sphere used by the ground and step probes
    pub const STEP_RADIUS: f32 = 0.3;

    /// Steepest walkable surface, in degrees from up
    pub const SLOPE_LIMIT_DEGREES: f32 = 45.0;

    /// Extra lift applied to the ground probe origin
    pub const PROBE_THRESHOLD: f32 = 0.05;
}

/// Slide resolver defaults
pub mod slide {
    /// Gap kept between the shape and any surface it touched
    pub const SKIN_EPSILON: f32 = 0.001;

    /// Sweep budget per tick
    pub const MAX_ITERATIONS: u32 = 3;

    /// Rendered-position convergence rate (1/s)
    pub const SMOOTHING: f32 = 30.0;

    /// A projected direction whose dot with the original velocity falls
    /// below this is treated as a dead end.
    pub const DEAD_END_THRESHOLD: f32 = 1.0e-6;

    /// Number of nearest-first hits a provider reports per sweep
    pub const MAX_SWEEP_HITS: usize = 4;

    /// Glancing hits below this approach rate keep the solver's time of impact
    pub const REFINE_MIN_APPROACH: f32 = 1.0e-3;
}

/// Default character shape
pub mod shape {
    /// Character capsule radius
    pub const CHARACTER_RADIUS: f32 = 0.5;

    /// Character capsule total height
    pub const CHARACTER_HEIGHT: f32 = 2.0;
}

/// Tolerances for float comparisons
pub mod tolerance {
    /// Relative tolerance used by approximate equality
    pub const RELATIVE: f32 = 1.0e-7;

    /// Smallest normal f32, floor for the absolute tolerance
    pub const ABSOLUTE: f32 = f32::MIN_POSITIVE * 8.0;

    /// Below this a speed is treated as zero
    pub const SPEED: f32 = 1.0e-6;
}
