//! The five-stage segmentation run: features → k-means → classification →
//! mask → coverage.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::classify::{ClusterLabels, MaterialPolicy, classify};
use crate::config::SegmentConfig;
use crate::error::{Result, SegmentError};
use crate::features::{FeatureMatrix, extract_features};
use crate::grid::PixelGrid;
use crate::kmeans::{Clustering, kmeans};
use crate::mask::{BinaryMask, build_mask};
use crate::stats::{CoverageStats, coverage};

/// Second clustering pass over the pixels the first pass called material.
///
/// `clustering.assignment` has one entry per first-pass material pixel, in
/// row-major order.
#[derive(Clone, Debug, PartialEq)]
pub struct Refinement {
    pub clustering: Clustering,
    pub labels: ClusterLabels,
}

/// Everything one run produces.
///
/// With refinement on, `mask` and `stats` describe the refined material
/// region; `clustering` and `labels` always describe the first pass.
#[derive(Clone, Debug, PartialEq)]
pub struct Segmentation {
    pub clustering: Clustering,
    pub labels: ClusterLabels,
    pub refinement: Option<Refinement>,
    pub mask: BinaryMask,
    pub stats: CoverageStats,
}

impl Segmentation {
    pub fn material_centroid(&self) -> [f32; 3] {
        match &self.refinement {
            Some(r) => r.clustering.centroids[r.labels.material],
            None => self.clustering.centroids[self.labels.material],
        }
    }

    pub fn background_centroid(&self) -> [f32; 3] {
        self.clustering.centroids[self.labels.background()]
    }
}

/// Runs the segmentation pipeline with a fixed configuration.
#[derive(Clone, Debug, Default)]
pub struct Segmenter {
    config: SegmentConfig,
}

impl Segmenter {
    pub fn new(config: SegmentConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SegmentConfig {
        &self.config
    }

    /// Segment with the configured seed, or an OS-seeded generator when no
    /// seed is set.
    pub fn segment(&self, grid: &PixelGrid) -> Result<Segmentation> {
        let mut rng = match self.config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::try_from_os_rng()
                .map_err(|e| SegmentError::Entropy(e.to_string()))?,
        };
        self.segment_with_rng(grid, &mut rng)
    }

    /// Segment drawing k-means initialisation from `rng`.
    pub fn segment_with_rng<R: Rng + ?Sized>(
        &self,
        grid: &PixelGrid,
        rng: &mut R,
    ) -> Result<Segmentation> {
        self.segment_with_policy(grid, &self.config.policy, rng)
    }

    /// Like [`Segmenter::segment_with_rng`] but with a caller-supplied
    /// material policy instead of the configured one.
    pub fn segment_with_policy<P, R>(
        &self,
        grid: &PixelGrid,
        policy: &P,
        rng: &mut R,
    ) -> Result<Segmentation>
    where
        P: MaterialPolicy + ?Sized,
        R: Rng + ?Sized,
    {
        let features = extract_features(grid)?;
        let clustering = kmeans(&features, &self.config.kmeans_params(), rng)?;
        let labels = classify(&clustering.centroids, policy)?;
        let mut mask = build_mask(
            &clustering.assignment,
            grid.height(),
            grid.width(),
            labels.material,
        )?;

        let refinement = if self.config.refine {
            self.refine(&features, &mask, policy, rng)?
        } else {
            None
        };
        if let Some(r) = &refinement {
            mask = refined_mask(&mask, r)?;
        }
        let stats = coverage(&mask)?;

        info!(
            width = grid.width(),
            height = grid.height(),
            material_cluster = labels.material,
            refined = refinement.is_some(),
            material_pct = stats.material_pct,
            background_pct = stats.background_pct,
            "segmentation finished"
        );

        Ok(Segmentation {
            clustering,
            labels,
            refinement,
            mask,
            stats,
        })
    }

    /// Cluster the material rows again with the same parameters and policy.
    /// Returns `None` when there are too few material pixels to split.
    fn refine<P, R>(
        &self,
        features: &FeatureMatrix,
        mask: &BinaryMask,
        policy: &P,
        rng: &mut R,
    ) -> Result<Option<Refinement>>
    where
        P: MaterialPolicy + ?Sized,
        R: Rng + ?Sized,
    {
        let rows: Vec<[f32; 3]> = features
            .rows()
            .iter()
            .zip(mask.cells())
            .filter(|&(_, &m)| m)
            .map(|(row, _)| *row)
            .collect();
        if rows.len() < self.config.clusters {
            debug!(material = rows.len(), "too few material pixels to refine");
            return Ok(None);
        }

        let subset = FeatureMatrix::from_rows(rows.len(), 1, rows)?;
        let clustering = kmeans(&subset, &self.config.kmeans_params(), rng)?;
        let labels = classify(&clustering.centroids, policy)?;
        debug!(
            sizes = ?clustering.cluster_sizes(),
            material_cluster = labels.material,
            "refined material region"
        );
        Ok(Some(Refinement { clustering, labels }))
    }
}

/// Keep only the first-pass material pixels the refinement also calls
/// material.
fn refined_mask(mask: &BinaryMask, refinement: &Refinement) -> Result<BinaryMask> {
    let mut sub = refinement.clustering.assignment.iter();
    let assignment: Vec<usize> = mask
        .cells()
        .iter()
        .map(|&m| {
            if m {
                sub.next().copied().unwrap_or(usize::MAX)
            } else {
                usize::MAX
            }
        })
        .collect();
    build_mask(
        &assignment,
        mask.height(),
        mask.width(),
        refinement.labels.material,
    )
}
