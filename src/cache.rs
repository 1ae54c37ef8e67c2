//! Interest-point and correspondence caches layered over an [`ArtifactStore`].

use std::path::Path;

use crate::config::AlignConfig;
use crate::data_loader::{ImageLoader, RasterLoader};
use crate::dedup::dedup;
use crate::detected_points::{CorrespondenceSet, InterestPoint};
use crate::detector::{Detector, LogDetector};
use crate::error::AlignError;
use crate::io::{object_from_json_bytes, object_to_json_bytes};
use crate::matching::{Matcher, RatioMatcher};
use crate::store::{ArtifactKey, ArtifactStore};

/// Store plus the collaborators needed to fill it on a miss.
pub struct FeatureCache<S, L = RasterLoader, D = LogDetector, M = RatioMatcher> {
    store: S,
    loader: L,
    detector: D,
    matcher: M,
}

impl<S: ArtifactStore> FeatureCache<S> {
    /// Default loader, detector and matcher.
    pub fn with_defaults(store: S, config: &AlignConfig) -> Self {
        FeatureCache {
            store,
            loader: RasterLoader,
            detector: LogDetector::new(config.detector.clone()),
            matcher: RatioMatcher::new(config.matcher.clone()),
        }
    }
}

impl<S, L, D, M> FeatureCache<S, L, D, M>
where
    S: ArtifactStore,
    L: ImageLoader,
    D: Detector,
    M: Matcher,
{
    pub fn new(store: S, loader: L, detector: D, matcher: M) -> Self {
        FeatureCache {
            store,
            loader,
            detector,
            matcher,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn matcher(&self) -> &M {
        &self.matcher
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    fn load<T: serde::de::DeserializeOwned>(&self, key: &ArtifactKey) -> Result<T, AlignError> {
        let bytes = self.store.read(key)?;
        object_from_json_bytes(&self.store.locate(key), &bytes)
    }

    fn save<T: serde::Serialize>(&mut self, key: &ArtifactKey, value: &T) -> Result<(), AlignError> {
        let location = self.store.locate(key);
        let bytes = object_to_json_bytes(&location, value)?;
        self.store.write(key, &bytes)
    }

    /// Cached interest points of `image`, detected and stored on a miss.
    pub fn get_or_detect(&mut self, image: &Path) -> Result<Vec<InterestPoint>, AlignError> {
        let key = ArtifactKey::interest_points(image);
        if self.store.exists(&key) {
            log::info!("    * Using cached interest points {}", self.store.locate(&key).display());
            return self.load(&key);
        }

        log::info!("    * Locating interest points in {}", image.display());
        let decoded = self.loader.load(image)?;
        let points = self.detector.detect(&decoded);
        log::info!("      Located {} points.", points.len());

        log::info!("    * Caching interest points: {}", self.store.locate(&key).display());
        self.save(&key, &points)?;
        Ok(points)
    }

    /// Cached deduplicated matches of the ordered pair `(left, right)`.
    ///
    /// A pair artifact is trusted as-is, even if the per-image artifacts it
    /// came from have since been regenerated.
    pub fn get_or_match(&mut self, left: &Path, right: &Path) -> Result<CorrespondenceSet, AlignError> {
        let key = ArtifactKey::matches(left, right);
        if self.store.exists(&key) {
            log::info!("    * Using cached match file {}", self.store.locate(&key).display());
            let matches: CorrespondenceSet = self.load(&key)?;
            log::info!("    * {} matches", matches.len());
            return Ok(matches);
        }

        let left_points = self.get_or_detect(left)?;
        let right_points = self.get_or_detect(right)?;

        log::info!("    * Matching interest points");
        let pairs = self.matcher.match_points(&left_points, &right_points);
        let raw = CorrespondenceSet::from_index_pairs(&left_points, &right_points, &pairs);
        let matches = dedup(&raw);
        log::info!(
            "    {} putative matches ({} before duplicate removal).",
            matches.len(),
            raw.len()
        );

        log::info!("    * Caching matches: {}", self.store.locate(&key).display());
        self.save(&key, &matches)?;
        Ok(matches)
    }
}
