//! Binary material/background classification of two cluster centroids.
//!
//! The clusterer works for any `K`; this stage does not. It only knows how to
//! pick one material cluster out of exactly two.

use palette::{IntoColor, Lab, LinSrgb, Srgb};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SegmentError};

/// Semantic class of a cluster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Material,
    Background,
}

/// Scores a centroid; the higher-scoring centroid is treated as material.
pub trait MaterialPolicy {
    fn score(&self, centroid: &[f32; 3]) -> f64;
}

/// Sum of the three channel means.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChannelSum;

impl MaterialPolicy for ChannelSum {
    fn score(&self, centroid: &[f32; 3]) -> f64 {
        centroid.iter().map(|&v| f64::from(v)).sum()
    }
}

/// Perceptual lightness (CIE L*) of the centroid color.
#[derive(Clone, Copy, Debug, Default)]
pub struct Luminance;

impl MaterialPolicy for Luminance {
    fn score(&self, centroid: &[f32; 3]) -> f64 {
        let [r, g, b] = centroid.map(|v| (v / 255.0).clamp(0.0, 1.0));
        let linear: LinSrgb<f32> = Srgb::new(r, g, b).into_linear();
        let lab: Lab = linear.into_color();
        f64::from(lab.l)
    }
}

/// Inverse of [`ChannelSum`]: the darker cluster is material.
#[derive(Clone, Copy, Debug, Default)]
pub struct Darker;

impl MaterialPolicy for Darker {
    fn score(&self, centroid: &[f32; 3]) -> f64 {
        -ChannelSum.score(centroid)
    }
}

/// Built-in policies, selectable from configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "native-bin", derive(clap::ValueEnum))]
pub enum BrightnessPolicy {
    /// Brighter cluster by channel sum is material.
    #[default]
    ChannelSum,
    /// Brighter cluster by CIE L* is material.
    Luminance,
    /// Darker cluster by channel sum is material.
    Darker,
}

impl MaterialPolicy for BrightnessPolicy {
    fn score(&self, centroid: &[f32; 3]) -> f64 {
        match self {
            BrightnessPolicy::ChannelSum => ChannelSum.score(centroid),
            BrightnessPolicy::Luminance => Luminance.score(centroid),
            BrightnessPolicy::Darker => Darker.score(centroid),
        }
    }
}

/// Which of the two clusters is material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterLabels {
    pub material: usize,
}

impl ClusterLabels {
    pub fn background(&self) -> usize {
        1 - self.material
    }

    pub fn region(&self, cluster: usize) -> Region {
        if cluster == self.material {
            Region::Material
        } else {
            Region::Background
        }
    }
}

/// Pick the material cluster out of exactly two centroids.
///
/// The strictly higher score wins; equal scores resolve to cluster 0.
pub fn classify<P: MaterialPolicy + ?Sized>(
    centroids: &[[f32; 3]],
    policy: &P,
) -> Result<ClusterLabels> {
    let [first, second] = centroids else {
        return Err(SegmentError::parameter(
            "centroids",
            format!("binary classification needs exactly 2, got {}", centroids.len()),
        ));
    };

    let material = if policy.score(second) > policy.score(first) {
        1
    } else {
        0
    };
    Ok(ClusterLabels { material })
}
