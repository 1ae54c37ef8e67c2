use std::path::Path;

use serde::{Serialize, de::DeserializeOwned};

use crate::align::AlignmentResult;
use crate::error::AlignError;

/// Serializes an object to pretty JSON bytes destined for `target`.
pub fn object_to_json_bytes<T: Serialize>(target: &Path, object: &T) -> Result<Vec<u8>, AlignError> {
    serde_json::to_vec_pretty(object).map_err(|e| AlignError::WriteFailed {
        path: target.to_path_buf(),
        source: std::io::Error::other(e),
    })
}

/// Deserializes an object from JSON bytes read from `origin`.
pub fn object_from_json_bytes<T: DeserializeOwned>(
    origin: &Path,
    bytes: &[u8],
) -> Result<T, AlignError> {
    serde_json::from_slice(bytes).map_err(|e| AlignError::unreadable(origin, e))
}

/// Serializes an object to a JSON file.
pub fn object_to_json<T: Serialize>(output_path: &Path, object: &T) -> Result<(), AlignError> {
    let bytes = object_to_json_bytes(output_path, object)?;
    std::fs::write(output_path, bytes).map_err(|source| {
        AlignError::WriteFailed {
            path: output_path.to_path_buf(),
            source,
        }
    })
}

/// Deserializes an object from a JSON file.
pub fn object_from_json<T: DeserializeOwned>(file_path: &Path) -> Result<T, AlignError> {
    let contents =
        std::fs::read(file_path).map_err(|e| AlignError::unreadable(file_path, e))?;
    object_from_json_bytes(file_path, &contents)
}

#[derive(serde::Serialize)]
struct AlignmentReport<'a> {
    left_image: &'a str,
    right_image: &'a str,
    transform: [[f64; 3]; 3],
    correspondences: usize,
    inlier_count: usize,
    inliers: &'a [usize],
}

/// Writes the estimated transform and its support as JSON.
pub fn write_alignment_report(
    output_path: &Path,
    left_image: &Path,
    right_image: &Path,
    result: &AlignmentResult,
) -> Result<(), AlignError> {
    let left = left_image.to_string_lossy();
    let right = right_image.to_string_lossy();
    let report = AlignmentReport {
        left_image: &left,
        right_image: &right,
        transform: result.transform.rows(),
        correspondences: result.correspondences,
        inlier_count: result.inliers.len(),
        inliers: &result.inliers,
    };
    object_to_json(output_path, &report)
}
