//! Kinematic character mover library
//!
//! Collide-and-slide resolution, ground probing with step handling and a
//! regime-based velocity controller, driven one tick at a time against any
//! [`query::ShapeQuery`] provider. [`physics::CollisionWorld`] is the
//! rapier3d-backed provider.

pub mod config;
pub mod constants;
pub mod error;
pub mod ground;
pub mod math;
pub mod mover;
pub mod params;
pub mod physics;
pub mod planar;
pub mod query;
pub mod scene;
pub mod shape;
pub mod slide;
pub mod velocity;

pub use config::MoverConfig;
pub use error::{ConfigError, MoverError};
pub use mover::{CharacterMover, KinematicMover, MoverContext, MoverSnapshot, MoverState};
pub use params::MovementParams;
pub use physics::CollisionWorld;
pub use planar::PlanarMover;
pub use query::{ShapeQuery, ShapeSweepQuery, SweepHit};
pub use shape::{LayerMask, ShapeDescriptor};
