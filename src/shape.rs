//! Character shape descriptors and layer masks.

use rapier3d::prelude::*;
use serde::{Deserialize, Serialize};

use crate::constants::shape as shape_consts;
use crate::error::MoverError;

/// Local axis a capsule's segment runs along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    #[default]
    Y,
    Z,
}

/// Immutable description of the character's collision shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShapeDescriptor {
    /// `height` is the total height including both caps.
    Capsule {
        radius: f32,
        height: f32,
        #[serde(default)]
        axis: Axis,
    },
    Sphere { radius: f32 },
}

impl Default for ShapeDescriptor {
    fn default() -> Self {
        ShapeDescriptor::Capsule {
            radius: shape_consts::CHARACTER_RADIUS,
            height: shape_consts::CHARACTER_HEIGHT,
            axis: Axis::Y,
        }
    }
}

impl ShapeDescriptor {
    pub fn capsule(radius: f32, height: f32) -> Self {
        ShapeDescriptor::Capsule {
            radius,
            height,
            axis: Axis::Y,
        }
    }

    pub fn sphere(radius: f32) -> Self {
        ShapeDescriptor::Sphere { radius }
    }

    pub fn radius(&self) -> f32 {
        match *self {
            ShapeDescriptor::Capsule { radius, .. } | ShapeDescriptor::Sphere { radius } => radius,
        }
    }

    /// Half-length of the capsule's inner segment (total height = 2*half + 2*radius).
    pub fn half_segment(&self) -> f32 {
        match *self {
            ShapeDescriptor::Capsule { radius, height, .. } => (height - 2.0 * radius).max(0.0) / 2.0,
            ShapeDescriptor::Sphere { .. } => 0.0,
        }
    }

    /// Distance from the shape's center to its lowest point along its own axis.
    pub fn half_extent(&self) -> f32 {
        self.half_segment() + self.radius()
    }

    /// Distance from the center to the lowest point along local +Y.
    pub fn vertical_half_extent(&self) -> f32 {
        match *self {
            ShapeDescriptor::Capsule { axis: Axis::Y, .. } => self.half_extent(),
            _ => self.radius(),
        }
    }

    pub fn validate(&self) -> Result<(), MoverError> {
        let radius = self.radius();
        if !radius.is_finite() || radius <= 0.0 {
            return Err(MoverError::InvalidParams(format!(
                "shape radius must be positive, got {radius}"
            )));
        }
        if let ShapeDescriptor::Capsule { height, .. } = *self {
            if !height.is_finite() || height < 0.0 {
                return Err(MoverError::InvalidParams(format!(
                    "capsule height must not be negative, got {height}"
                )));
            }
        }
        Ok(())
    }

    /// Builds the parry shape used for queries, in the shape's local frame.
    pub fn to_shared_shape(&self) -> SharedShape {
        match *self {
            ShapeDescriptor::Capsule { radius, axis, .. } => {
                let half = self.half_segment();
                match axis {
                    Axis::X => SharedShape::capsule_x(half, radius),
                    Axis::Y => SharedShape::capsule_y(half, radius),
                    Axis::Z => SharedShape::capsule_z(half, radius),
                }
            }
            ShapeDescriptor::Sphere { radius } => SharedShape::ball(radius),
        }
    }
}

/// Bit set of collision layers a query considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const ALL: LayerMask = LayerMask(u32::MAX);
    pub const NONE: LayerMask = LayerMask(0);
    /// Walls, floors, obstacles
    pub const STATIC: LayerMask = LayerMask(1);
    /// Character colliders
    pub const CHARACTER: LayerMask = LayerMask(1 << 1);

    pub fn contains(self, other: LayerMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: LayerMask) -> bool {
        self.0 & other.0 != 0
    }

    pub fn to_group(self) -> Group {
        Group::from_bits_truncate(self.0)
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        LayerMask::ALL
    }
}

impl std::ops::BitOr for LayerMask {
    type Output = LayerMask;

    fn bitor(self, rhs: LayerMask) -> LayerMask {
        LayerMask(self.0 | rhs.0)
    }
}

impl std::ops::Not for LayerMask {
    type Output = LayerMask;

    fn not(self) -> LayerMask {
        LayerMask(!self.0)
    }
}
