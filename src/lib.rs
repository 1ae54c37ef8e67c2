//! Co-registration of two DEMs through their orthoimages.
//!
//! Interest points are detected in both orthoimages, matched, stripped of
//! ambiguous duplicates, projected to longitude/latitude with each image's own
//! georeference, and fed to RANSAC for an affine transform. Interest points and
//! matches are cached in an [`store::ArtifactStore`] so reruns skip detection
//! and matching.

pub mod align;
pub mod cache;
pub mod config;
pub mod data_loader;
pub mod dedup;
pub mod detected_points;
pub mod detector;
pub mod error;
pub mod georef;
pub mod io;
pub mod matching;
pub mod ransac;
pub mod store;
pub mod types;

pub use align::{AlignmentResult, OrthoAligner, align_correspondences, to_geodetic};
pub use config::AlignConfig;
pub use detected_points::{CorrespondenceSet, InterestPoint};
pub use error::AlignError;
pub use georef::{GeoReference, MapProjection};
pub use types::AffineTransform;
