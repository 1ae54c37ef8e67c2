//! Orthoimage alignment: cached matching, geodetic projection and RANSAC.

use std::path::Path;

use nalgebra as na;
use rand::Rng;

use crate::cache::FeatureCache;
use crate::config::{AlignConfig, RansacConfig};
use crate::data_loader::{ImageLoader, RasterLoader};
use crate::detected_points::{CorrespondenceSet, InterestPoint};
use crate::detector::{Detector, LogDetector};
use crate::error::AlignError;
use crate::georef::GeoReference;
use crate::matching::{Matcher, RatioMatcher};
use crate::ransac::{self, RansacResult};
use crate::store::ArtifactStore;
use crate::types::AffineTransform;

#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentResult {
    /// Maps left geodetic coordinates onto right geodetic coordinates.
    pub transform: AffineTransform,
    pub inliers: Vec<usize>,
    /// Deduplicated correspondences fed to the estimator.
    pub correspondences: usize,
}

/// Homogeneous `(lon, lat, 1)` of an interest point.
pub fn to_geodetic(point: &InterestPoint, georef: &GeoReference) -> na::Vector3<f64> {
    let lonlat = georef.pixel_to_lonlat(na::Vector2::new(point.x, point.y));
    na::Vector3::new(lonlat.x, lonlat.y, 1.0)
}

/// Projects each side of every correspondence with its own georeference.
pub fn project_correspondences(
    set: &CorrespondenceSet,
    left_geo: &GeoReference,
    right_geo: &GeoReference,
) -> (Vec<na::Vector3<f64>>, Vec<na::Vector3<f64>>) {
    set.iter()
        .map(|(l, r)| (to_geodetic(l, left_geo), to_geodetic(r, right_geo)))
        .unzip()
}

/// Robust transform for an already matched correspondence set.
pub fn align_correspondences<R: Rng + ?Sized>(
    set: &CorrespondenceSet,
    left_geo: &GeoReference,
    right_geo: &GeoReference,
    config: &RansacConfig,
    rng: &mut R,
) -> Result<AlignmentResult, AlignError> {
    let (left, right) = project_correspondences(set, left_geo, right_geo);
    let RansacResult { transform, inliers } = ransac::estimate(&left, &right, config, rng)?;
    Ok(AlignmentResult {
        transform,
        inliers,
        correspondences: set.len(),
    })
}

/// Runs the whole pipeline for one orthoimage pair.
pub struct OrthoAligner<S, L, D, M> {
    features: FeatureCache<S, L, D, M>,
    ransac: RansacConfig,
}

impl<S: ArtifactStore> OrthoAligner<S, RasterLoader, LogDetector, RatioMatcher> {
    pub fn from_config(store: S, config: &AlignConfig) -> Self {
        OrthoAligner {
            features: FeatureCache::with_defaults(store, config),
            ransac: config.ransac.clone(),
        }
    }
}

impl<S, L, D, M> OrthoAligner<S, L, D, M>
where
    S: ArtifactStore,
    L: ImageLoader,
    D: Detector,
    M: Matcher,
{
    pub fn new(features: FeatureCache<S, L, D, M>, ransac: RansacConfig) -> Self {
        OrthoAligner { features, ransac }
    }

    pub fn features(&self) -> &FeatureCache<S, L, D, M> {
        &self.features
    }

    pub fn features_mut(&mut self) -> &mut FeatureCache<S, L, D, M> {
        &mut self.features
    }

    pub fn align<R: Rng + ?Sized>(
        &mut self,
        left: &Path,
        right: &Path,
        left_geo: &GeoReference,
        right_geo: &GeoReference,
        rng: &mut R,
    ) -> Result<AlignmentResult, AlignError> {
        log::info!("--> Finding interest points for the orthoimages");
        let matches = self.features.get_or_match(left, right)?;

        log::info!("--> Rejecting outliers using RANSAC.");
        let result = align_correspondences(&matches, left_geo, right_geo, &self.ransac, rng)?;
        log::info!("    * Ransac result: {}", result.transform);
        log::info!("                     # inliers: {}", result.inliers.len());
        Ok(result)
    }
}
