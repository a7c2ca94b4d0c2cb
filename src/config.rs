//! Mover configuration parsing from TOML files

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ConfigError, MoverError};
use crate::mover::MoverContext;
use crate::params::MovementParams;
use crate::shape::{LayerMask, ShapeDescriptor};

/// Slide query section
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SlideConfig {
    /// Layers the character collides with
    pub layers: LayerMask,
}

/// Mover configuration, typically from mover.toml
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MoverConfig {
    pub movement: MovementParams,
    pub shape: ShapeDescriptor,
    pub slide: SlideConfig,
}

impl std::str::FromStr for MoverConfig {
    type Err = toml::de::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s)
    }
}

impl MoverConfig {
    /// Load and validate a mover configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = content.parse::<MoverConfig>().map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        config.validate().map_err(|source| ConfigError::Invalid {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MoverError> {
        self.movement.validate()?;
        self.shape.validate()
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Construction context for a mover using this configuration
    pub fn context(&self) -> MoverContext {
        MoverContext::new(self.shape, self.movement).with_layers(self.slide.layers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Axis;

    #[test]
    fn test_parse_empty_config() {
        let config: MoverConfig = "".parse().unwrap();
        assert_eq!(config, MoverConfig::default());
        assert_eq!(config.slide.layers, LayerMask::ALL);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [movement]
            max_speed = 6.0
            slope_limit = 30.0
            max_iterations = 5

            [shape]
            kind = "capsule"
            radius = 0.4
            height = 1.8
            axis = "y"

            [slide]
            layers = 0x1
        "#;
        let config: MoverConfig = toml.parse().unwrap();
        assert_eq!(config.movement.max_speed, 6.0);
        assert_eq!(config.movement.slope_limit, 30.0);
        assert_eq!(config.movement.max_iterations, 5);
        assert_eq!(config.movement.brake, MovementParams::default().brake);
        assert_eq!(
            config.shape,
            ShapeDescriptor::Capsule {
                radius: 0.4,
                height: 1.8,
                axis: Axis::Y
            }
        );
        assert_eq!(config.slide.layers, LayerMask::STATIC);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = MoverConfig {
            shape: ShapeDescriptor::sphere(0.3),
            slide: SlideConfig {
                layers: LayerMask::STATIC | LayerMask::CHARACTER,
            },
            ..MoverConfig::default()
        };
        let text = config.to_toml_string().unwrap();
        let parsed: MoverConfig = text.parse().unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_from_file_reports_path() {
        let dir = std::env::temp_dir().join(format!("kinemover-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let missing = dir.join("missing.toml");
        assert!(matches!(
            MoverConfig::from_file(&missing),
            Err(ConfigError::Io { path, .. }) if path == missing
        ));

        let broken = dir.join("broken.toml");
        std::fs::write(&broken, "[movement\nmax_speed = ").unwrap();
        assert!(matches!(
            MoverConfig::from_file(&broken),
            Err(ConfigError::Parse { .. })
        ));

        let invalid = dir.join("invalid.toml");
        std::fs::write(&invalid, "[movement]\nmax_iterations = 0\n").unwrap();
        let err = MoverConfig::from_file(&invalid).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert!(err.to_string().contains("invalid.toml"));

        let good = dir.join("good.toml");
        std::fs::write(&good, "[movement]\nmax_speed = 3.0\n").unwrap();
        assert_eq!(MoverConfig::from_file(&good).unwrap().movement.max_speed, 3.0);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_context_carries_layers() {
        let mut config = MoverConfig::default();
        config.slide.layers = LayerMask::STATIC;
        let context = config.context();
        assert_eq!(context.layers, LayerMask::STATIC);
        assert_eq!(context.shape, config.shape);
        assert!(context.self_collider.is_none());
    }
}
