//! Robust affine estimation between homogeneous 2-D point sets.

use nalgebra as na;
use rand::Rng;
use rand::seq::index;

use crate::config::RansacConfig;
use crate::error::AlignError;
use crate::types::{AffineTransform, dehomogenize};

/// Point pairs needed to pin down an affine transform.
pub const SAMPLE_SIZE: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct RansacResult {
    pub transform: AffineTransform,
    /// Ascending indices of the pairs within the threshold under `transform`.
    pub inliers: Vec<usize>,
}

/// Least-squares affine fit through the selected pairs, exact for three.
///
/// Returns `None` when the selected `a` points are collinear or coincident.
pub fn fit_affine(
    a: &[na::Vector3<f64>],
    b: &[na::Vector3<f64>],
    indices: &[usize],
) -> Option<AffineTransform> {
    if indices.len() < SAMPLE_SIZE {
        return None;
    }
    let pa: Vec<_> = indices.iter().map(|&i| dehomogenize(&a[i])).collect();
    let pb: Vec<_> = indices.iter().map(|&i| dehomogenize(&b[i])).collect();
    let n = indices.len() as f64;
    let mean_a = pa.iter().sum::<na::Vector2<f64>>() / n;
    let mean_b = pb.iter().sum::<na::Vector2<f64>>() / n;

    // Centered normal equations: ata * m^T = atb.
    let mut ata = na::Matrix2::zeros();
    let mut atb = na::Matrix2::zeros();
    for (p, q) in pa.iter().zip(&pb) {
        let da = p - mean_a;
        let db = q - mean_b;
        ata += da * da.transpose();
        atb += da * db.transpose();
    }

    let eig = ata.symmetric_eigenvalues();
    let (lo, hi) = (eig.min(), eig.max());
    if hi <= 0.0 || lo <= hi * 1e-12 {
        log::trace!("degenerate affine sample {:?}", indices);
        return None;
    }
    let m = (ata.try_inverse()? * atb).transpose();
    let t = mean_b - m * mean_a;
    Some(AffineTransform::from_parts(&m, &t))
}

/// Distance between `transform(a)` and `b` after dehomogenization.
pub fn residual(transform: &AffineTransform, a: &na::Vector3<f64>, b: &na::Vector3<f64>) -> f64 {
    (transform.apply(a) - dehomogenize(b)).norm()
}

pub fn inlier_indices(
    transform: &AffineTransform,
    a: &[na::Vector3<f64>],
    b: &[na::Vector3<f64>],
    threshold: f64,
) -> Vec<usize> {
    a.iter()
        .zip(b)
        .enumerate()
        .filter(|(_, (p, q))| residual(transform, p, q) < threshold)
        .map(|(i, _)| i)
        .collect()
}

/// Iterations needed to draw one all-inlier sample with probability
/// `confidence`, given inlier ratio `inlier_ratio`.
pub fn required_iterations(inlier_ratio: f64, confidence: f64, cap: usize) -> usize {
    let p = inlier_ratio.powi(SAMPLE_SIZE as i32);
    if p >= 1.0 {
        return 1;
    }
    if p <= 0.0 {
        return cap;
    }
    let k = (1.0 - confidence).ln() / (1.0 - p).ln();
    if k.is_finite() {
        (k.ceil() as usize).clamp(1, cap)
    } else {
        cap
    }
}

/// RANSAC affine estimate mapping `a[i]` onto `b[i]`.
///
/// Samples are drawn from `rng`. The loop runs at most
/// `config.max_iterations` times and stops earlier once the best inlier
/// ratio makes another all-inlier draw unlikely to be missed at
/// `config.confidence`. The returned transform is refit on every inlier of
/// the best sample, unless that refit falls below the consensus floor.
///
/// The floor is `config.min_inliers`, lowered to `n - 1` for small inputs
/// and never below [`SAMPLE_SIZE`].
pub fn estimate<R: Rng + ?Sized>(
    a: &[na::Vector3<f64>],
    b: &[na::Vector3<f64>],
    config: &RansacConfig,
    rng: &mut R,
) -> Result<RansacResult, AlignError> {
    if a.len() != b.len() {
        return Err(AlignError::MismatchedLengths {
            left: a.len(),
            right: b.len(),
        });
    }
    let n = a.len();
    if n < SAMPLE_SIZE {
        return Err(AlignError::InsufficientCorrespondences {
            needed: SAMPLE_SIZE,
            got: n,
        });
    }
    // Leave room for one outlier on small inputs; never below a minimal sample.
    let needed = config.min_inliers.min(n - 1).max(SAMPLE_SIZE);
    let threshold = config.inlier_threshold;

    let mut best: Option<(AffineTransform, Vec<usize>)> = None;
    let mut budget = config.max_iterations.max(1);
    let mut iteration = 0;
    while iteration < budget {
        iteration += 1;
        let sample = index::sample(rng, n, SAMPLE_SIZE).into_vec();
        let Some(candidate) = fit_affine(a, b, &sample) else {
            continue;
        };
        let inliers = inlier_indices(&candidate, a, b, threshold);
        let best_count = best.as_ref().map_or(0, |(_, i)| i.len());
        if inliers.len() > best_count {
            let ratio = inliers.len() as f64 / n as f64;
            budget = budget.min(required_iterations(ratio, config.confidence, config.max_iterations));
            best = Some((candidate, inliers));
        }
    }

    let Some((sample_fit, sample_inliers)) = best else {
        return Err(AlignError::NoConsensus { best: 0, needed });
    };
    log::debug!(
        "ransac: {} iterations, best sample supported by {}/{}",
        iteration,
        sample_inliers.len(),
        n
    );
    if sample_inliers.len() < needed {
        return Err(AlignError::NoConsensus {
            best: sample_inliers.len(),
            needed,
        });
    }

    // The refit may lose support; the sample fit is known to meet the floor.
    let refit = fit_affine(a, b, &sample_inliers)
        .map(|t| {
            let inliers = inlier_indices(&t, a, b, threshold);
            (t, inliers)
        })
        .filter(|(_, inliers)| inliers.len() >= needed);
    let (transform, inliers) = match refit {
        Some(refit) => refit,
        None => {
            log::debug!("refit lost support, keeping the sample fit");
            (sample_fit, sample_inliers)
        }
    };
    Ok(RansacResult { transform, inliers })
}
