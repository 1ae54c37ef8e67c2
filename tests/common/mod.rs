#![allow(dead_code)]

use std::cell::Cell;
use std::path::Path;

use dem_align::data_loader::{GrayImageF32, ImageLoader};
use dem_align::detected_points::InterestPoint;
use dem_align::detector::Detector;
use dem_align::error::AlignError;
use dem_align::matching::Matcher;
use image::{ImageBuffer, Luma};
use rand::Rng;

/// Loader double returning a blank image and counting calls.
#[derive(Default)]
pub struct CountingLoader {
    pub calls: Cell<usize>,
    pub fail: bool,
}

impl ImageLoader for CountingLoader {
    fn load(&self, path: &Path) -> Result<GrayImageF32, AlignError> {
        self.calls.set(self.calls.get() + 1);
        if self.fail {
            return Err(AlignError::SourceUnreadable {
                path: path.to_path_buf(),
                reason: "test failure".into(),
            });
        }
        Ok(ImageBuffer::new(8, 8))
    }
}

/// Detector double returning a fixed point list.
#[derive(Default)]
pub struct CountingDetector {
    pub calls: Cell<usize>,
    pub points: Vec<InterestPoint>,
}

impl Detector for CountingDetector {
    fn detect(&self, _image: &GrayImageF32) -> Vec<InterestPoint> {
        self.calls.set(self.calls.get() + 1);
        self.points.clone()
    }
}

/// Matcher double returning fixed index pairs.
#[derive(Default)]
pub struct CountingMatcher {
    pub calls: Cell<usize>,
    pub pairs: Vec<(usize, usize)>,
}

impl Matcher for CountingMatcher {
    fn match_points(&self, _left: &[InterestPoint], _right: &[InterestPoint]) -> Vec<(usize, usize)> {
        self.calls.set(self.calls.get() + 1);
        self.pairs.clone()
    }
}

pub fn point_with_descriptor(x: f64, y: f64, descriptor: Vec<f64>) -> InterestPoint {
    InterestPoint {
        x,
        y,
        scale: 2.0,
        orientation: 0.0,
        interest: 1.0,
        descriptor,
    }
}

/// Dark raster with gaussian blobs of random size and brightness.
pub fn blob_image<R: Rng>(width: u32, height: u32, blobs: usize, rng: &mut R) -> GrayImageF32 {
    let specs: Vec<(f32, f32, f32, f32)> = (0..blobs)
        .map(|_| {
            (
                rng.random_range(0.0..width as f32),
                rng.random_range(0.0..height as f32),
                rng.random_range(1.5..4.0),
                rng.random_range(0.3..1.0),
            )
        })
        .collect();
    ImageBuffer::from_fn(width, height, |x, y| {
        let v: f32 = specs
            .iter()
            .map(|&(cx, cy, s, a)| {
                let d2 = (x as f32 - cx).powi(2) + (y as f32 - cy).powi(2);
                a * (-d2 / (2.0 * s * s)).exp()
            })
            .sum();
        Luma([v.min(1.0)])
    })
}
