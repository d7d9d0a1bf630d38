use serde::{Deserialize, Serialize};

use crate::classify::BrightnessPolicy;
use crate::error::{Result, SegmentError};
use crate::kmeans::{
    DEFAULT_ATTEMPTS, DEFAULT_CLUSTERS, DEFAULT_EPSILON, DEFAULT_MAX_ITERATIONS, KMeansParams,
};
use crate::source::SourceLimits;

/// Everything a segmentation run can be tuned with.
///
/// Missing JSON fields fall back to their defaults, so `{}` is a valid
/// configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SegmentConfig {
    pub clusters: usize,
    pub attempts: usize,
    pub max_iterations: usize,
    pub epsilon: f32,
    /// Fixed seed for reproducible runs; `None` draws one from the OS.
    pub seed: Option<u64>,
    pub policy: BrightnessPolicy,
    /// Re-cluster the material pixels and keep only the brighter half.
    pub refine: bool,
    pub limits: SourceLimits,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            clusters: DEFAULT_CLUSTERS,
            attempts: DEFAULT_ATTEMPTS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            epsilon: DEFAULT_EPSILON,
            seed: None,
            policy: BrightnessPolicy::default(),
            refine: false,
            limits: SourceLimits::default(),
        }
    }
}

impl SegmentConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| SegmentError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| SegmentError::Config(e.to_string()))
    }

    pub fn kmeans_params(&self) -> KMeansParams {
        KMeansParams {
            k: self.clusters,
            attempts: self.attempts,
            max_iterations: self.max_iterations,
            epsilon: self.epsilon,
        }
    }

    /// Checks that hold regardless of the image. `clusters` is only bounded
    /// by the pixel count later; here it just has to be non-zero.
    pub fn validate(&self) -> Result<()> {
        if self.clusters == 0 {
            return Err(SegmentError::parameter("clusters", "must be at least 1"));
        }
        self.kmeans_params().validate_termination()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_gives_defaults() {
        let config = SegmentConfig::from_json_str("{}").unwrap();
        assert_eq!(config, SegmentConfig::default());
        assert_eq!(config.clusters, 2);
        assert_eq!(config.attempts, 10);
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.epsilon, 1.0);
        assert!(!config.refine);
    }

    #[test]
    fn partial_json_overrides() {
        let config =
            SegmentConfig::from_json_str(r#"{"seed": 42, "policy": "luminance", "attempts": 3}"#)
                .unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.policy, BrightnessPolicy::Luminance);
        assert_eq!(config.attempts, 3);
        assert!(!config.refine);
        assert!(SegmentConfig::from_json_str(r#"{"refine": true}"#).unwrap().refine);
        assert_eq!(config.limits, SourceLimits::default());
    }

    #[test]
    fn json_round_trip() {
        let config = SegmentConfig {
            seed: Some(7),
            policy: BrightnessPolicy::Darker,
            refine: true,
            ..Default::default()
        };
        let json = config.to_json_string().unwrap();
        assert_eq!(SegmentConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn malformed_json_is_config_error() {
        assert!(matches!(
            SegmentConfig::from_json_str("{not json"),
            Err(SegmentError::Config(_))
        ));
        assert!(matches!(
            SegmentConfig::from_json_str(r#"{"clustres": 2}"#),
            Err(SegmentError::Config(_))
        ));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            SegmentConfig::from_json_str(r#"{"clusters": 0}"#),
            Err(SegmentError::InvalidParameter { name: "clusters", .. })
        ));
        assert!(matches!(
            SegmentConfig::from_json_str(r#"{"epsilon": -0.5}"#),
            Err(SegmentError::InvalidParameter { name: "epsilon", .. })
        ));
    }
}
