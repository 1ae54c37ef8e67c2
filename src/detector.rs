//! Default interest-point detector: scale-normalized Laplacian of Gaussian
//! extrema with normalized patch descriptors.

use image::imageops;

use crate::config::DetectorConfig;
use crate::data_loader::GrayImageF32;
use crate::detected_points::InterestPoint;

/// Finds interest points in a decoded image and attaches descriptors.
pub trait Detector {
    fn detect(&self, image: &GrayImageF32) -> Vec<InterestPoint>;
}

#[derive(Debug, Clone, Default)]
pub struct LogDetector {
    config: DetectorConfig,
}

struct Candidate {
    response: f32,
    x: u32,
    y: u32,
    level: usize,
}

impl LogDetector {
    pub fn new(config: DetectorConfig) -> LogDetector {
        LogDetector { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }
}

/// `sigma^2 * (Lxx + Lyy)`, zero on the border.
fn normalized_laplacian(blurred: &GrayImageF32, sigma: f32) -> Vec<f32> {
    let (w, h) = blurred.dimensions();
    let mut out = vec![0.0f32; (w * h) as usize];
    let norm = sigma * sigma;
    for y in 1..h.saturating_sub(1) {
        for x in 1..w.saturating_sub(1) {
            let c = blurred.get_pixel(x, y)[0];
            let sum = blurred.get_pixel(x - 1, y)[0]
                + blurred.get_pixel(x + 1, y)[0]
                + blurred.get_pixel(x, y - 1)[0]
                + blurred.get_pixel(x, y + 1)[0];
            out[(y * w + x) as usize] = norm * (sum - 4.0 * c);
        }
    }
    out
}

/// Strict extremum over the 3x3x3 scale-space neighborhood.
fn is_extremum(responses: &[Vec<f32>], level: usize, x: u32, y: u32, w: u32) -> bool {
    let v = responses[level][(y * w + x) as usize];
    let lo = level.saturating_sub(1);
    let hi = (level + 1).min(responses.len() - 1);
    for (k, layer) in responses.iter().enumerate().take(hi + 1).skip(lo) {
        for ny in y - 1..=y + 1 {
            for nx in x - 1..=x + 1 {
                if k == level && nx == x && ny == y {
                    continue;
                }
                let n = layer[(ny * w + nx) as usize];
                if (v > 0.0 && n >= v) || (v < 0.0 && n <= v) {
                    return false;
                }
            }
        }
    }
    true
}

fn sample_bilinear(img: &GrayImageF32, x: f32, y: f32) -> f32 {
    let (w, h) = img.dimensions();
    let x = x.clamp(0.0, (w - 1) as f32);
    let y = y.clamp(0.0, (h - 1) as f32);
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;
    let top = img.get_pixel(x0, y0)[0] * (1.0 - fx) + img.get_pixel(x1, y0)[0] * fx;
    let bottom = img.get_pixel(x0, y1)[0] * (1.0 - fx) + img.get_pixel(x1, y1)[0] * fx;
    top * (1.0 - fy) + bottom * fy
}

/// Zero-mean, unit-norm square patch sampled at half-scale spacing.
pub fn patch_descriptor(img: &GrayImageF32, x: f32, y: f32, scale: f32, radius: usize) -> Vec<f64> {
    let r = radius as i32;
    let spacing = (0.5 * scale).max(1.0);
    let mut patch: Vec<f64> = (-r..=r)
        .flat_map(|j| (-r..=r).map(move |i| (i, j)))
        .map(|(i, j)| {
            sample_bilinear(img, x + i as f32 * spacing, y + j as f32 * spacing) as f64
        })
        .collect();
    let mean = patch.iter().sum::<f64>() / patch.len() as f64;
    patch.iter_mut().for_each(|v| *v -= mean);
    let norm = patch.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm > 1e-12 {
        patch.iter_mut().for_each(|v| *v /= norm);
    }
    patch
}

impl Detector for LogDetector {
    fn detect(&self, image: &GrayImageF32) -> Vec<InterestPoint> {
        let (w, h) = image.dimensions();
        let scales = &self.config.scales;
        if w < 3 || h < 3 || scales.is_empty() {
            return Vec::new();
        }

        let blurred: Vec<GrayImageF32> = scales.iter().map(|&s| imageops::blur(image, s)).collect();
        let responses: Vec<Vec<f32>> = blurred
            .iter()
            .zip(scales)
            .map(|(b, &s)| normalized_laplacian(b, s))
            .collect();

        let mut candidates = Vec::new();
        for (level, layer) in responses.iter().enumerate() {
            for y in 1..h - 1 {
                for x in 1..w - 1 {
                    let v = layer[(y * w + x) as usize];
                    if v.abs() < self.config.threshold {
                        continue;
                    }
                    if is_extremum(&responses, level, x, y, w) {
                        candidates.push(Candidate {
                            response: v.abs(),
                            x,
                            y,
                            level,
                        });
                    }
                }
            }
        }
        log::debug!("{} scale-space extrema above threshold", candidates.len());

        candidates.sort_by(|a, b| b.response.total_cmp(&a.response));
        candidates.truncate(self.config.target_points);

        candidates
            .into_iter()
            .map(|c| {
                let scale = scales[c.level];
                let (fx, fy) = (c.x as f32, c.y as f32);
                InterestPoint {
                    x: c.x as f64,
                    y: c.y as f64,
                    scale: scale as f64,
                    orientation: 0.0,
                    interest: c.response as f64,
                    descriptor: patch_descriptor(
                        &blurred[c.level],
                        fx,
                        fy,
                        scale,
                        self.config.patch_radius,
                    ),
                }
            })
            .collect()
    }
}
