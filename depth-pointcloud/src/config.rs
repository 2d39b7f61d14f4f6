//! Configuration and serialization module.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PointCloudError, Result};

/// Default per-frame point cap. Depth images can be multi-megapixel on
/// devices with a depth sensor; this keeps rendering at frame rate.
pub const DEFAULT_MAX_POINTS: usize = 15000;

/// Coordinate space the emitted points are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PointSpace {
    /// Camera pose applied, points are in world coordinates.
    #[default]
    World,
    /// Points stay in the capturing camera's frame.
    Camera,
}

/// Point cloud assembly configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointCloudConfig {
    /// Maximum number of points emitted per frame.
    pub max_points: usize,
    /// Samples with a normalized confidence below this are dropped (0.0 keeps all).
    pub min_confidence: f32,
    /// Output coordinate space.
    pub point_space: PointSpace,
    /// Process sampled pixels on the rayon thread pool.
    pub parallel: bool,
}

impl Default for PointCloudConfig {
    fn default() -> Self {
        Self {
            max_points: DEFAULT_MAX_POINTS,
            min_confidence: 0.0,
            point_space: PointSpace::World,
            parallel: false,
        }
    }
}

impl PointCloudConfig {
    pub fn with_max_points(max_points: usize) -> Self {
        Self {
            max_points,
            ..Default::default()
        }
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.max_points == 0 {
            return Err(PointCloudError::InvalidConfig(
                "max_points must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(PointCloudError::InvalidConfig(format!(
                "min_confidence must be within [0, 1], got {}",
                self.min_confidence
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|source| PointCloudError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded point cloud config from {:?}", path);
        Ok(config)
    }

    /// Save to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| PointCloudError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Saved point cloud config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = PointCloudConfig::default();
        assert_eq!(config.max_points, 15000);
        assert_eq!(config.min_confidence, 0.0);
        assert_eq!(config.point_space, PointSpace::World);
        assert!(!config.parallel);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = PointCloudConfig::from_json_str(r#"{ "max_points": 500, "point_space": "camera" }"#)
            .unwrap();
        assert_eq!(config.max_points, 500);
        assert_eq!(config.point_space, PointSpace::Camera);
        assert_eq!(config.min_confidence, 0.0);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(PointCloudConfig::from_json_str(r#"{ "max_points": 0 }"#).is_err());
        assert!(PointCloudConfig::from_json_str(r#"{ "min_confidence": 1.5 }"#).is_err());
        assert!(matches!(
            PointCloudConfig::from_json_str("{ not json"),
            Err(PointCloudError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!(
            "depth-pointcloud-config-{}.json",
            std::process::id()
        ));
        let config = PointCloudConfig {
            max_points: 4096,
            min_confidence: 0.25,
            point_space: PointSpace::Camera,
            parallel: true,
        };
        config.save(&path).unwrap();
        let loaded = PointCloudConfig::load(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = PointCloudConfig::load(Path::new("/nonexistent/depth-pointcloud.json")).unwrap_err();
        assert!(matches!(err, PointCloudError::ConfigIo { .. }));
    }
}
