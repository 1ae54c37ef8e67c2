use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Options of the default LoG interest-point detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Strongest points kept per image.
    pub target_points: usize,
    /// Gaussian sigmas of the scale space, ascending.
    pub scales: Vec<f32>,
    /// Minimum absolute scale-normalized Laplacian response.
    pub threshold: f32,
    /// Half width of the descriptor patch in samples.
    pub patch_radius: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            target_points: 500,
            scales: vec![1.6, 2.26, 3.2, 4.53, 6.4, 9.05],
            threshold: 0.01,
            patch_radius: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Best match is accepted only if closer than `ratio` times the runner-up.
    pub ratio: f64,
    pub show_progress: bool,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            ratio: 0.8,
            show_progress: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacConfig {
    /// Residual bound in geodetic degrees.
    pub inlier_threshold: f64,
    pub max_iterations: usize,
    /// Probability of having drawn at least one all-inlier sample when the loop stops early.
    pub confidence: f64,
    /// Consensus floor, lowered to one less than the number of correspondences
    /// on small inputs and never below 3.
    pub min_inliers: usize,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            inlier_threshold: 0.0001,
            max_iterations: 1000,
            confidence: 0.99,
            min_inliers: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignConfig {
    pub detector: DetectorConfig,
    pub matcher: MatcherConfig,
    pub ransac: RansacConfig,
    /// Directory for cache artifacts; next to the images when unset.
    pub cache_dir: Option<PathBuf>,
}
